//! Loans API endpoints.

use api_types::{
    Created,
    loan::{
        LateFeePolicy as ApiPolicy, LateFees, LoanApply, LoanListQuery, LoanRepay,
        LoanStatus as ApiStatus, LoanStatusUpdate,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{
    AuditEntry, Caller, LateFeePolicy, LateFeeReport, Loan, LoanApplicationCmd, LoanStatus,
    RepaymentOutcome,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_status(status: ApiStatus) -> LoanStatus {
    match status {
        ApiStatus::Pending => LoanStatus::Pending,
        ApiStatus::Approved => LoanStatus::Approved,
        ApiStatus::Active => LoanStatus::Active,
        ApiStatus::Cleared => LoanStatus::Cleared,
        ApiStatus::Rejected => LoanStatus::Rejected,
        ApiStatus::Defaulted => LoanStatus::Defaulted,
    }
}

/// A loan with its status history.
#[derive(Serialize)]
pub struct LoanDetail {
    loan: Loan,
    history: Vec<AuditEntry>,
}

pub async fn apply(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<LoanApply>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = LoanApplicationCmd::new(
        group_id,
        payload.member_id,
        payload.principal,
        payload.duration_months,
    );
    if let Some(rate) = payload.interest_rate {
        cmd = cmd.interest_rate(rate);
    }
    if let Some(purpose) = payload.purpose {
        cmd = cmd.purpose(purpose);
    }
    if let Some(start_date) = payload.start_date {
        cmd = cmd.start_date(start_date);
    }

    let loan = state.engine.scoped(&caller).apply_for_loan(cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id: loan.id })))
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<LoanListQuery>,
) -> Result<Json<Vec<Loan>>, ServerError> {
    let loans = state
        .engine
        .scoped(&caller)
        .list_loans(group_id, query.status.map(map_status))
        .await?;
    Ok(Json(loans))
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanDetail>, ServerError> {
    let (loan, history) = state.engine.scoped(&caller).loan(loan_id).await?;
    Ok(Json(LoanDetail { loan, history }))
}

pub async fn set_status(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(loan_id): Path<Uuid>,
    Json(payload): Json<LoanStatusUpdate>,
) -> Result<Json<Loan>, ServerError> {
    let loan = state
        .engine
        .scoped(&caller)
        .update_loan_status(loan_id, map_status(payload.status))
        .await?;
    Ok(Json(loan))
}

pub async fn repay(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(loan_id): Path<Uuid>,
    Json(payload): Json<LoanRepay>,
) -> Result<Json<RepaymentOutcome>, ServerError> {
    let outcome = state
        .engine
        .scoped(&caller)
        .repay_loan(loan_id, payload.amount, payload.occurred_on)
        .await?;
    Ok(Json(outcome))
}

pub async fn late_fees(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<LateFees>,
) -> Result<Json<LateFeeReport>, ServerError> {
    let policy = match payload.policy {
        ApiPolicy::Fixed(amount) => LateFeePolicy::Fixed(amount),
        ApiPolicy::Percentage(rate) => LateFeePolicy::Percentage(rate),
    };
    let today = payload.today.unwrap_or_else(|| Utc::now().date_naive());

    let report = state
        .engine
        .scoped(&caller)
        .apply_late_fees(group_id, policy, today)
        .await?;
    tracing::info!(
        "late fees for group {group_id}: {} loans charged",
        report.count
    );
    Ok(Json(report))
}
