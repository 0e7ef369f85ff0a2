use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use std::sync::Arc;

use crate::{fines, groups, loans, meetings, members, reports, transactions, user};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// Resolves Basic credentials to a [`engine::Caller`] stored in the request
/// extensions.
async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let caller = state
        .engine
        .authenticate(auth_header.username(), auth_header.password())
        .await
        .map_err(|err| {
            tracing::error!("authentication failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// The HTTP API over `engine`.
pub fn router(engine: Engine) -> Router {
    let state = ServerState {
        engine: Arc::new(engine),
    };

    Router::new()
        .route("/me", get(user::me))
        .route("/users", post(user::user_new))
        .route("/users/{username}/groups", post(user::grant))
        .route("/groups", get(groups::list).post(groups::group_new))
        .route("/groups/{id}", get(groups::get).patch(groups::update))
        .route("/groups/{id}/history", get(groups::history))
        .route(
            "/groups/{id}/cycles",
            get(groups::cycles).post(groups::cycle_open),
        )
        .route("/groups/{id}/cycles/current", get(groups::current_cycle))
        .route("/groups/{id}/cycles/close", post(groups::cycle_close))
        .route("/groups/{id}/recompute", post(groups::recompute))
        .route(
            "/groups/{id}/members",
            get(members::list).post(members::member_new),
        )
        .route("/groups/{id}/members/import", post(members::import))
        .route(
            "/members/{id}",
            get(members::get).delete(members::remove),
        )
        .route("/members/{id}/status", post(members::set_status))
        .route("/groups/{id}/contributions", post(transactions::contribution_new))
        .route("/contributions/{id}", patch(transactions::contribution_edit))
        .route("/contributions/{id}/void", post(transactions::contribution_void))
        .route("/groups/{id}/transactions", post(transactions::list))
        .route("/transactions/{id}", get(transactions::get_detail))
        .route("/transactions/{id}/void", post(transactions::void_tx))
        .route("/groups/{id}/expenses", post(transactions::expense_new))
        .route(
            "/groups/{id}/loans",
            get(loans::list).post(loans::apply),
        )
        .route("/groups/{id}/late-fees", post(loans::late_fees))
        .route("/loans/{id}", get(loans::get))
        .route("/loans/{id}/status", post(loans::set_status))
        .route("/loans/{id}/repayments", post(loans::repay))
        .route(
            "/groups/{id}/fine-categories",
            get(fines::categories).post(fines::category_new),
        )
        .route(
            "/groups/{id}/fines",
            get(fines::list).post(fines::fine_new),
        )
        .route("/fines/{id}", get(fines::get).patch(fines::update))
        .route("/fines/{id}/payments", post(fines::pay))
        .route("/fines/{id}/void", post(fines::void_fine))
        .route(
            "/groups/{id}/meetings",
            get(meetings::list).post(meetings::meeting_new),
        )
        .route("/meetings/{id}", get(meetings::get))
        .route("/attendance/{id}", patch(meetings::correct_attendance))
        .route("/groups/{id}/summary", get(reports::summary))
        .route("/groups/{id}/cash", get(reports::cash))
        .route("/groups/{id}/portfolio", get(reports::portfolio))
        .route("/groups/{id}/share-out", get(reports::share_out))
        .route("/groups/{id}/reconcile", get(reports::reconcile))
        .route("/members/{id}/statement", get(reports::statement))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(engine)).await
}
