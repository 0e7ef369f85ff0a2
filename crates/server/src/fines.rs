//! Fine categories and fines API endpoints.

use api_types::{
    Created, Reason,
    fine::{FineCategoryNew, FineNew, FinePay, FineUpdate},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Caller, Fine, FineCategory, FinePaymentOutcome, NewFineCmd, UpdateFineCmd};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub async fn categories(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<FineCategory>>, ServerError> {
    let categories = state
        .engine
        .scoped(&caller)
        .list_fine_categories(group_id)
        .await?;
    Ok(Json(categories))
}

pub async fn category_new(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<FineCategoryNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let category = state
        .engine
        .scoped(&caller)
        .create_fine_category(group_id, &payload.name, payload.default_amount)
        .await?;
    Ok((StatusCode::CREATED, Json(Created { id: category.id })))
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<Fine>>, ServerError> {
    let fines = state.engine.scoped(&caller).list_fines(group_id).await?;
    Ok(Json(fines))
}

pub async fn fine_new(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<FineNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut cmd = NewFineCmd::new(
        group_id,
        payload.member_id,
        payload.category_id,
        payload.issued_on,
    );
    if let Some(amount) = payload.amount {
        cmd = cmd.amount(amount);
    }
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }

    let fine = state.engine.scoped(&caller).create_fine(cmd).await?;
    Ok((StatusCode::CREATED, Json(Created { id: fine.id })))
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(fine_id): Path<Uuid>,
) -> Result<Json<Fine>, ServerError> {
    let fine = state.engine.scoped(&caller).fine(fine_id).await?;
    Ok(Json(fine))
}

pub async fn update(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(fine_id): Path<Uuid>,
    Json(payload): Json<FineUpdate>,
) -> Result<Json<Fine>, ServerError> {
    let cmd = UpdateFineCmd {
        amount: payload.amount,
        description: payload.description,
    };
    let fine = state
        .engine
        .scoped(&caller)
        .update_fine(fine_id, cmd, &payload.reason)
        .await?;
    Ok(Json(fine))
}

pub async fn pay(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(fine_id): Path<Uuid>,
    Json(payload): Json<FinePay>,
) -> Result<Json<FinePaymentOutcome>, ServerError> {
    let outcome = state
        .engine
        .scoped(&caller)
        .pay_fine(fine_id, payload.amount, payload.paid_on)
        .await?;
    Ok(Json(outcome))
}

pub async fn void_fine(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(fine_id): Path<Uuid>,
    Json(payload): Json<Reason>,
) -> Result<Json<Fine>, ServerError> {
    let fine = state
        .engine
        .scoped(&caller)
        .void_fine(fine_id, &payload.reason)
        .await?;
    Ok(Json(fine))
}
