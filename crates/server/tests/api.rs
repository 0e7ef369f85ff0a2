use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use engine::{Engine, NewGroupCmd, NewMemberCmd, Role};
use migration::MigratorTrait;

struct Fixture {
    app: Router,
    group_id: Uuid,
    other_group_id: Uuid,
    member_id: Uuid,
}

/// An admin `root`, a leader `leader` who manages the first group only.
async fn fixture() -> Fixture {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();

    let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let group = engine
        .create_group(NewGroupCmd::new("Abakundakazi", 500, start).interest_rate(5.0))
        .await
        .unwrap();
    let other = engine
        .create_group(NewGroupCmd::new("Twiyubake", 1_000, start))
        .await
        .unwrap();
    let member = engine
        .add_member(group.id, NewMemberCmd::named("Alice Uwase"))
        .await
        .unwrap();

    engine.create_user("root", "root-pw", Role::Admin).await.unwrap();
    engine
        .create_user("leader", "leader-pw", Role::GroupLeader)
        .await
        .unwrap();
    engine.grant_group("leader", group.id).await.unwrap();

    Fixture {
        app: server::router(engine),
        group_id: group.id,
        other_group_id: other.id,
        member_id: member.id,
    }
}

fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

fn get(uri: &str, auth: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, auth)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, auth: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, auth)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let f = fixture().await;
    let res = f
        .app
        .oneshot(get("/me", &basic("root", "nope")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_credentials_are_rejected() {
    let f = fixture().await;
    let req = Request::builder().uri("/groups").body(Body::empty()).unwrap();
    let res = f.app.oneshot(req).await.unwrap();
    assert!(res.status().is_client_error());
}

#[tokio::test]
async fn me_reports_role_and_groups() {
    let f = fixture().await;
    let res = f
        .app
        .oneshot(get("/me", &basic("leader", "leader-pw")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = json_body(res).await;
    assert_eq!(body["username"], "leader");
    assert_eq!(body["role"], "GROUP_LEADER");
    assert_eq!(body["managed_groups"], json!([f.group_id.to_string()]));
}

#[tokio::test]
async fn leaders_see_only_their_groups() {
    let f = fixture().await;
    let leader = basic("leader", "leader-pw");

    let res = f
        .app
        .clone()
        .oneshot(get(&format!("/groups/{}", f.other_group_id), &leader))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = f.app.oneshot(get("/groups", &leader)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    let groups = body.as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["id"], f.group_id.to_string());
}

#[tokio::test]
async fn only_admins_create_groups() {
    let f = fixture().await;
    let payload = json!({
        "name": "Dufatanye",
        "share_value": 200,
        "cycle_start": "2026-02-01",
    });

    let res = f
        .app
        .clone()
        .oneshot(post("/groups", &basic("leader", "leader-pw"), payload.clone()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = f
        .app
        .clone()
        .oneshot(post("/groups", &basic("root", "root-pw"), payload.clone()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert!(json_body(res).await["id"].is_string());

    let res = f
        .app
        .oneshot(post("/groups", &basic("root", "root-pw"), payload))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn deposit_then_summary() {
    let f = fixture().await;
    let leader = basic("leader", "leader-pw");

    let res = f
        .app
        .clone()
        .oneshot(post(
            &format!("/groups/{}/contributions", f.group_id),
            &leader,
            json!({
                "member_id": f.member_id,
                "shares": 4,
                "occurred_on": "2026-01-10",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let tx_id = json_body(res).await["id"].as_str().unwrap().to_string();

    let res = f
        .app
        .clone()
        .oneshot(get(&format!("/transactions/{tx_id}"), &leader))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["amount"], 2_000);
    assert_eq!(body["created_by"], "leader");

    let res = f
        .app
        .oneshot(get(&format!("/groups/{}/cash", f.group_id), &leader))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["cash_balance"], 2_000);
}

#[tokio::test]
async fn void_without_reason_is_unprocessable() {
    let f = fixture().await;
    let leader = basic("leader", "leader-pw");

    let res = f
        .app
        .clone()
        .oneshot(post(
            &format!("/groups/{}/contributions", f.group_id),
            &leader,
            json!({
                "member_id": f.member_id,
                "shares": 1,
                "occurred_on": "2026-01-10",
            }),
        ))
        .await
        .unwrap();
    let tx_id = json_body(res).await["id"].as_str().unwrap().to_string();

    let res = f
        .app
        .oneshot(post(
            &format!("/transactions/{tx_id}/void"),
            &leader,
            json!({ "reason": "  " }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_loan_is_not_found() {
    let f = fixture().await;
    let res = f
        .app
        .oneshot(get(
            &format!("/loans/{}", Uuid::new_v4()),
            &basic("root", "root-pw"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admins_manage_accounts() {
    let f = fixture().await;
    let root = basic("root", "root-pw");

    let res = f
        .app
        .clone()
        .oneshot(post(
            "/users",
            &basic("leader", "leader-pw"),
            json!({ "username": "mallory", "password": "pw", "role": "ADMIN" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = f
        .app
        .clone()
        .oneshot(post(
            "/users/leader/groups",
            &root,
            json!({ "group_id": f.other_group_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = f
        .app
        .oneshot(get("/groups", &basic("leader", "leader-pw")))
        .await
        .unwrap();
    assert_eq!(json_body(res).await.as_array().unwrap().len(), 2);
}
