//! Contributions, expenses and transaction log API endpoints.

use api_types::{
    Created, Reason,
    transaction::{
        ContributionEdit, ContributionNew, ExpenseNew, TransactionKind as ApiKind, TransactionList,
        TransactionListResponse, TransactionView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Caller, ContributionCmd, ExpenseCmd, Transaction, TransactionKind};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_kind(kind: TransactionKind) -> ApiKind {
    match kind {
        TransactionKind::ShareDeposit => ApiKind::ShareDeposit,
        TransactionKind::LoanDisbursement => ApiKind::LoanDisbursement,
        TransactionKind::LoanRepayment => ApiKind::LoanRepayment,
        TransactionKind::LoanPenalty => ApiKind::LoanPenalty,
        TransactionKind::FinePayment => ApiKind::FinePayment,
        TransactionKind::Expense => ApiKind::Expense,
    }
}

fn map_api_kind(kind: ApiKind) -> TransactionKind {
    match kind {
        ApiKind::ShareDeposit => TransactionKind::ShareDeposit,
        ApiKind::LoanDisbursement => TransactionKind::LoanDisbursement,
        ApiKind::LoanRepayment => TransactionKind::LoanRepayment,
        ApiKind::LoanPenalty => TransactionKind::LoanPenalty,
        ApiKind::FinePayment => TransactionKind::FinePayment,
        ApiKind::Expense => TransactionKind::Expense,
    }
}

fn view(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        kind: map_kind(tx.kind),
        amount: tx.amount,
        occurred_on: tx.occurred_on,
        member_id: tx.member_id,
        share_count: tx.share_count,
        solidarity_amount: tx.solidarity_amount,
        description: tx.description,
        reference_id: tx.reference_id,
        is_void: tx.is_void,
        created_by: tx.created_by,
    }
}

pub async fn contribution_new(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<ContributionNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = ContributionCmd::new(
        group_id,
        payload.member_id,
        payload.shares,
        payload.occurred_on,
        caller.username.clone(),
    )
    .solidarity(payload.solidarity);
    if let Some(notes) = payload.notes {
        cmd = cmd.notes(notes);
    }

    let tx = state.engine.scoped(&caller).record_contribution(cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id: tx.id })))
}

pub async fn contribution_edit(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<ContributionEdit>,
) -> Result<Json<Transaction>, ServerError> {
    let tx = state
        .engine
        .scoped(&caller)
        .edit_contribution(
            transaction_id,
            payload.shares,
            payload.solidarity,
            &payload.reason,
        )
        .await?;
    Ok(Json(tx))
}

pub async fn contribution_void(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<Reason>,
) -> Result<Json<Transaction>, ServerError> {
    let tx = state
        .engine
        .scoped(&caller)
        .void_contribution(transaction_id, &payload.reason)
        .await?;
    Ok(Json(tx))
}

pub async fn expense_new(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = ExpenseCmd::new(
        group_id,
        payload.amount,
        payload.occurred_on,
        caller.username.clone(),
    );
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }

    let tx = state.engine.scoped(&caller).record_expense(cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id: tx.id })))
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let limit = payload.limit.unwrap_or(50);
    if limit == 0 {
        return Err(ServerError::Generic("limit must be > 0".to_string()));
    }

    let filter = engine::TransactionListFilter {
        from: payload.from,
        to: payload.to,
        kinds: payload
            .kinds
            .map(|kinds| kinds.into_iter().map(map_api_kind).collect()),
        member_id: payload.member_id,
        include_voided: payload.include_voided.unwrap_or(false),
    };

    let (txs, next_cursor) = state
        .engine
        .scoped(&caller)
        .list_transactions_page(group_id, limit, payload.cursor.as_deref(), &filter)
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: txs.into_iter().map(view).collect(),
        next_cursor,
    }))
}

pub async fn get_detail(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<Transaction>, ServerError> {
    let tx = state
        .engine
        .scoped(&caller)
        .transaction_detail(transaction_id)
        .await?;
    Ok(Json(tx))
}

pub async fn void_tx(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<Reason>,
) -> Result<Json<Transaction>, ServerError> {
    let tx = state
        .engine
        .scoped(&caller)
        .void_transaction(transaction_id, &payload.reason)
        .await?;
    Ok(Json(tx))
}
