//! The authenticated caller and operator accounts.

use api_types::user::{GroupGrant, Role as ApiRole, UserNew};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Caller, Role, User};

use crate::{ServerError, server::ServerState};

fn map_role(role: ApiRole) -> Role {
    match role {
        ApiRole::SuperAdmin => Role::SuperAdmin,
        ApiRole::Admin => Role::Admin,
        ApiRole::GroupLeader => Role::GroupLeader,
    }
}

/// Returns who the credentials belong to and which groups they reach.
pub async fn me(Extension(caller): Extension<Caller>) -> Json<Caller> {
    Json(caller)
}

pub async fn user_new(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Json(payload): Json<UserNew>,
) -> Result<(StatusCode, Json<User>), ServerError> {
    if payload.password.is_empty() {
        return Err(ServerError::Generic("password must not be empty".to_string()));
    }
    let user = state
        .engine
        .scoped(&caller)
        .create_user(&payload.username, &payload.password, map_role(payload.role))
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn grant(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(username): Path<String>,
    Json(payload): Json<GroupGrant>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .scoped(&caller)
        .grant_group(&username, payload.group_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
