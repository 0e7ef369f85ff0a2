//! Members API endpoints.

use api_types::{
    Created, Reason,
    member::{MemberImport, MemberNew, MemberRemoved, MemberStatus, MemberStatusUpdate},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{BatchReport, Caller, Member, MemberRemoval, NewMemberCmd};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_status(status: MemberStatus) -> engine::MemberStatus {
    match status {
        MemberStatus::Active => engine::MemberStatus::Active,
        MemberStatus::Suspended => engine::MemberStatus::Suspended,
        MemberStatus::Exited => engine::MemberStatus::Exited,
    }
}

fn to_cmd(row: MemberNew) -> NewMemberCmd {
    NewMemberCmd {
        full_name: row.full_name,
        national_id: row.national_id,
        phone: row.phone,
        joined_on: row.joined_on,
    }
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<Member>>, ServerError> {
    let members = state.engine.scoped(&caller).list_members(group_id).await?;
    Ok(Json(members))
}

pub async fn member_new(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<MemberNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let member = state
        .engine
        .scoped(&caller)
        .add_member(group_id, to_cmd(payload))
        .await?;
    Ok((StatusCode::CREATED, Json(Created { id: member.id })))
}

pub async fn import(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<MemberImport>,
) -> Result<Json<BatchReport>, ServerError> {
    if payload.members.is_empty() {
        return Err(ServerError::Generic("members must not be empty".to_string()));
    }
    let rows = payload.members.into_iter().map(to_cmd).collect();
    let report = state
        .engine
        .scoped(&caller)
        .import_members(group_id, rows)
        .await?;
    Ok(Json(report))
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(member_id): Path<Uuid>,
) -> Result<Json<Member>, ServerError> {
    let member = state.engine.scoped(&caller).member(member_id).await?;
    Ok(Json(member))
}

pub async fn set_status(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<MemberStatusUpdate>,
) -> Result<Json<Member>, ServerError> {
    let member = state
        .engine
        .scoped(&caller)
        .set_member_status(member_id, map_status(payload.status), &payload.reason)
        .await?;
    Ok(Json(member))
}

pub async fn remove(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(member_id): Path<Uuid>,
    Json(payload): Json<Reason>,
) -> Result<Json<MemberRemoved>, ServerError> {
    let removal = state
        .engine
        .scoped(&caller)
        .delete_member(member_id, &payload.reason)
        .await?;
    let removed = match removal {
        MemberRemoval::Exited(member) => MemberRemoved::Exited { id: member.id },
        MemberRemoval::Deleted => MemberRemoved::Deleted,
    };
    Ok(Json(removed))
}
