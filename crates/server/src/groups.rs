//! Groups and cycles API endpoints.

use api_types::{
    Created,
    cycle::{CycleClose, CycleOpen},
    group::{GroupNew, GroupUpdate},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{
    AuditEntry, Caller, Cycle, Group, NewGroupCmd, UpdateGroupCmd,
    reports::{Reconciliation, ShareOut},
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<Group>>, ServerError> {
    let groups = state.engine.scoped(&caller).list_groups().await?;
    Ok(Json(groups))
}

pub async fn group_new(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = NewGroupCmd::new(payload.name, payload.share_value, payload.cycle_start)
        .branch(payload.branch.unwrap_or_default())
        .location(payload.location.unwrap_or_default());
    if payload.min_shares.is_some() || payload.max_shares.is_some() {
        let min_shares = payload.min_shares.unwrap_or(cmd.min_shares);
        let max_shares = payload.max_shares.unwrap_or(cmd.max_shares);
        cmd = cmd.share_limits(min_shares, max_shares);
    }
    if let Some(rate) = payload.interest_rate {
        cmd = cmd.interest_rate(rate);
    }

    let group = state.engine.scoped(&caller).create_group(cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id: group.id })))
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Group>, ServerError> {
    let group = state.engine.scoped(&caller).group(group_id).await?;
    Ok(Json(group))
}

pub async fn update(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<GroupUpdate>,
) -> Result<Json<Group>, ServerError> {
    let cmd = UpdateGroupCmd {
        name: payload.name,
        branch: payload.branch,
        location: payload.location,
        share_value: payload.share_value,
        min_shares: payload.min_shares,
        max_shares: payload.max_shares,
    };
    let group = state
        .engine
        .scoped(&caller)
        .update_group(group_id, cmd, &payload.reason)
        .await?;
    Ok(Json(group))
}

pub async fn history(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<AuditEntry>>, ServerError> {
    let entries = state.engine.scoped(&caller).group_history(group_id).await?;
    Ok(Json(entries))
}

pub async fn cycles(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<Cycle>>, ServerError> {
    let cycles = state.engine.scoped(&caller).list_cycles(group_id).await?;
    Ok(Json(cycles))
}

pub async fn current_cycle(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Option<Cycle>>, ServerError> {
    let cycle = state.engine.scoped(&caller).current_cycle(group_id).await?;
    Ok(Json(cycle))
}

pub async fn cycle_open(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<CycleOpen>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let cycle = state
        .engine
        .scoped(&caller)
        .open_cycle(group_id, payload.start_date, payload.interest_rate)
        .await?;
    Ok((StatusCode::CREATED, Json(Created { id: cycle.id })))
}

pub async fn cycle_close(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<CycleClose>,
) -> Result<Json<ShareOut>, ServerError> {
    let share_out = state
        .engine
        .scoped(&caller)
        .close_cycle(group_id, payload.end_date)
        .await?;
    Ok(Json(share_out))
}

pub async fn recompute(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Reconciliation>, ServerError> {
    let report = state
        .engine
        .scoped(&caller)
        .recompute_group_totals(group_id)
        .await?;
    Ok(Json(report))
}
