use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use kinship::config::Config;
use kinship::services::{OtpDelivery, OtpError};
use kinship::state::SharedState;
use serde_json::{Value, json};
use tower::ServiceExt;

#[derive(Default)]
struct CapturingDelivery {
    sent: Mutex<Vec<(String, String)>>,
}

impl CapturingDelivery {
    fn last_code(&self) -> String {
        self.sent
            .lock()
            .unwrap()
            .last()
            .map(|(_, code)| code.clone())
            .expect("no code delivered")
    }
}

#[async_trait]
impl OtpDelivery for CapturingDelivery {
    async fn deliver(&self, email: &str, code: &str) -> Result<(), OtpError> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}

async fn spawn_app() -> (Router, Arc<CapturingDelivery>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.tokens.secret = "api-test-secret".to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let delivery = Arc::new(CapturingDelivery::default());
    let shared = SharedState::with_delivery(config, delivery.clone())
        .await
        .expect("Failed to create shared state");
    let state = kinship::api::create_app_state(Arc::new(shared), None);
    (kinship::api::router(state).await, delivery)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Registers an account and returns the `data` payload of verify-otp.
async fn register(
    app: &Router,
    delivery: &CapturingDelivery,
    email: &str,
    code: &str,
    parent: Option<&str>,
) -> Value {
    let (status, body) = send(
        app,
        post_json(
            "/api/auth/register",
            &json!({
                "name": "Test User",
                "email": email,
                "phone": "5550100",
                "referral_code": code,
                "parent_referral_code": parent,
                "password": "password123",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        app,
        post_json(
            "/api/auth/verify-otp",
            &json!({ "token": token, "email": email, "otp": delivery.last_code() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["data"]["database"], true);
}

#[tokio::test]
async fn test_protected_routes_require_bearer() {
    let (app, _) = spawn_app().await;

    for uri in ["/api/profile", "/api/team/upline", "/api/metrics"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }

    let (status, _) = send(&app, get_with_token("/api/profile", "garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_flow_and_team_views() {
    let (app, delivery) = spawn_app().await;

    let root = register(&app, &delivery, "root@example.com", "ROOT", None).await;
    let child = register(&app, &delivery, "child@example.com", "CHILD", Some("ROOT")).await;
    let grandchild = register(&app, &delivery, "gc@example.com", "GC", Some("CHILD")).await;

    let root_id = root["account"]["id"].as_i64().unwrap();
    let child_id = child["account"]["id"].as_i64().unwrap();
    let gc_id = grandchild["account"]["id"].as_i64().unwrap();
    assert_eq!(child["account"]["parent_id"].as_i64(), Some(root_id));

    let gc_token = grandchild["tokens"]["access"].as_str().unwrap();
    let (status, body) = send(&app, get_with_token("/api/team/upline", gc_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([
            { "account_id": gc_id, "depth": 0 },
            { "account_id": child_id, "depth": 1 },
            { "account_id": root_id, "depth": 2 },
        ])
    );

    let root_token = root["tokens"]["access"].as_str().unwrap();
    let (status, body) = send(
        &app,
        get_with_token("/api/team/downline?max_depth=1", root_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([
            { "account_id": root_id, "depth": 0 },
            { "account_id": child_id, "depth": 1 },
        ])
    );

    let (status, body) = send(&app, get_with_token("/api/team/summary", root_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(
        body["data"]["levels"],
        json!([{ "depth": 1, "count": 1 }, { "depth": 2, "count": 1 }])
    );

    let (status, body) = send(&app, get_with_token("/api/profile", root_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "root@example.com");
    assert!(body["data"].get("password_hash").is_none());

    let (status, _) = send(
        &app,
        get_with_token("/api/team/downline?max_depth=5000", root_token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_registration_errors() {
    let (app, delivery) = spawn_app().await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/register",
            &json!({
                "name": "Nobody",
                "email": "bad-email",
                "phone": "5550100",
                "referral_code": "NOBODY",
                "password": "password123",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        post_json(
            "/api/auth/register",
            &json!({
                "name": "Orphan",
                "email": "orphan@example.com",
                "phone": "5550100",
                "referral_code": "ORPHAN",
                "parent_referral_code": "MISSING",
                "password": "password123",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    register(&app, &delivery, "taken@example.com", "TAKEN", None).await;
    let (status, _) = send(
        &app,
        post_json(
            "/api/auth/register",
            &json!({
                "name": "Copy",
                "email": "taken@example.com",
                "phone": "5550100",
                "referral_code": "COPY",
                "password": "password123",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        post_json(
            "/api/auth/verify-otp",
            &json!({ "token": "unknown", "email": "x@example.com", "otp": "123456" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_and_tokens() {
    let (app, delivery) = spawn_app().await;
    let registered = register(&app, &delivery, "login@example.com", "LOGIN", None).await;
    let username = registered["account"]["username"].as_str().unwrap();

    let (status, _) = send(
        &app,
        post_json(
            "/api/auth/login",
            &json!({ "username": username, "password": "not-the-password" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        post_json("/api/auth/login", &json!({ "username": "", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            &json!({ "username": username, "password": "password123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["data"]["tokens"]["access"].as_str().unwrap().to_string();
    let refresh = body["data"]["tokens"]["refresh"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        post_json("/api/auth/token/verify", &json!({ "token": access })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(body["data"]["username"], username);

    let (status, _) = send(
        &app,
        post_json("/api/auth/token/verify", &json!({ "token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        post_json("/api/auth/token/refresh", &json!({ "refresh": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rotated = body["data"]["access"].as_str().unwrap();

    let (status, _) = send(&app, get_with_token("/api/profile", rotated)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get_with_token("/api/metrics", rotated)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}
