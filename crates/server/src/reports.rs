//! Read-only reports.

use api_types::report::{CashBalance, PortfolioQuery};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use engine::{
    Caller,
    reports::{GroupSummary, MemberStatement, PortfolioSummary, Reconciliation, ShareOut},
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub async fn summary(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupSummary>, ServerError> {
    let summary = state.engine.scoped(&caller).group_summary(group_id).await?;
    Ok(Json(summary))
}

pub async fn cash(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<CashBalance>, ServerError> {
    let cash_balance = state.engine.scoped(&caller).cash_balance(group_id).await?;
    Ok(Json(CashBalance {
        group_id,
        cash_balance,
    }))
}

pub async fn portfolio(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<PortfolioQuery>,
) -> Result<Json<PortfolioSummary>, ServerError> {
    let today = query.today.unwrap_or_else(|| Utc::now().date_naive());
    let summary = state
        .engine
        .scoped(&caller)
        .portfolio_summary(group_id, today)
        .await?;
    Ok(Json(summary))
}

pub async fn share_out(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<ShareOut>, ServerError> {
    let preview = state
        .engine
        .scoped(&caller)
        .share_out_preview(group_id)
        .await?;
    Ok(Json(preview))
}

pub async fn reconcile(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Reconciliation>, ServerError> {
    let report = state.engine.scoped(&caller).reconcile_group(group_id).await?;
    Ok(Json(report))
}

pub async fn statement(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(member_id): Path<Uuid>,
) -> Result<Json<MemberStatement>, ServerError> {
    let statement = state
        .engine
        .scoped(&caller)
        .member_statement(member_id)
        .await?;
    Ok(Json(statement))
}
