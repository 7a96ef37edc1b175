use std::sync::Arc;

use application::SystemClock;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use config::JwtConfig;
use domain::ProfileRules;
use infrastructure::{Infrastructure, InfrastructureConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

use web_api::{router, AppState};

fn test_router() -> Router {
    let infra = Infrastructure::in_memory(InfrastructureConfig {
        bcrypt_cost: Some(4),
        jwt: JwtConfig {
            secret: "api-flow-test-secret-with-enough-length".to_string(),
            ..JwtConfig::default()
        },
        ..Default::default()
    });
    let state = AppState::new(&infra, ProfileRules::default(), Arc::new(SystemClock));
    router(state)
}

async fn send_request(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));
    (status, body)
}

fn build_request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn register_and_login(app: &Router, email: &str) -> String {
    let (status, _) = send_request(
        app,
        build_request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": email, "password": "Abc12345" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_request(
        app,
        build_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "Abc12345" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    body["access_token"].as_str().expect("token").to_string()
}

async fn lookup_user_id(app: &Router, token: &str, email: &str) -> i64 {
    let (status, body) = send_request(
        app,
        build_request(
            Method::GET,
            &format!("/api/users/lookup?email={email}"),
            Some(token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["user_id"].as_i64().expect("user id")
}

#[tokio::test]
async fn health_check() {
    let app = test_router();
    let (status, _) = send_request(&app, build_request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn register_conflict_and_bad_login() {
    let app = test_router();
    register_and_login(&app, "dup@example.com").await;

    let (status, body) = send_request(
        &app,
        build_request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "DUP@example.com", "password": "whatever" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "EMAIL_TAKEN");

    let (status, _) = send_request(
        &app,
        build_request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "whatever" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_request(
        &app,
        build_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "dup@example.com", "password": "wrong" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_token() {
    let app = test_router();

    let (status, _) =
        send_request(&app, build_request(Method::GET, "/api/sessions", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_request(
        &app,
        build_request(Method::GET, "/api/sessions", Some("garbage"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_flow() {
    let app = test_router();
    let token = register_and_login(&app, "profile@example.com").await;

    let (status, _) = send_request(
        &app,
        build_request(Method::GET, "/api/users/profile", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send_request(
        &app,
        build_request(
            Method::PUT,
            "/api/users/profile",
            Some(&token),
            Some(json!({ "name": "Pat", "birth_date": "2015-01-01" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "invalid_birth_date");

    let (status, body) = send_request(
        &app,
        build_request(
            Method::PUT,
            "/api/users/profile",
            Some(&token),
            Some(json!({
                "name": "Pat",
                "birth_date": "1995-03-10",
                "description": "co-op enjoyer",
                "region": "EU"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let (status, body) = send_request(
        &app,
        build_request(Method::GET, "/api/users/profile", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "Pat");
    assert_eq!(body["region"], "EU");

    let user_id = lookup_user_id(&app, &token, "profile@example.com").await;
    let (status, body) = send_request(
        &app,
        build_request(
            Method::GET,
            &format!("/api/users/profile/{user_id}"),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "co-op enjoyer");

    let (status, _) = send_request(
        &app,
        build_request(
            Method::GET,
            "/api/users/lookup?email=nobody@example.com",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_membership_flow() {
    let app = test_router();
    let owner_token = register_and_login(&app, "owner@example.com").await;
    let guest_token = register_and_login(&app, "guest@example.com").await;
    let guest_id = lookup_user_id(&app, &owner_token, "guest@example.com").await;

    let (status, body) = send_request(
        &app,
        build_request(
            Method::POST,
            "/api/sessions/create-session",
            Some(&owner_token),
            Some(json!({
                "title": "Friday raid",
                "description": "bring snacks",
                "tags": ["mmo", "coop"]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = body["id"].as_i64().expect("session id");
    assert!(body["chat"]["chat_id"].is_i64());
    assert_eq!(body["participants"][0]["status"], "accepted");

    let join_uri = format!("/api/sessions/{session_id}/join");
    let (status, body) = send_request(
        &app,
        build_request(Method::POST, &join_uri, Some(&guest_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");

    let (status, body) = send_request(
        &app,
        build_request(Method::POST, &join_uri, Some(&guest_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["reason"], "already_member");

    let accept_uri = format!("/api/sessions/{session_id}/accept/{guest_id}");
    let (status, body) = send_request(
        &app,
        build_request(Method::POST, &accept_uri, Some(&guest_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["reason"], "not_owner");

    let (status, body) = send_request(
        &app,
        build_request(Method::POST, &accept_uri, Some(&owner_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let messages_uri = format!("/api/sessions/{session_id}/chat/messages");
    let (status, body) = send_request(
        &app,
        build_request(
            Method::POST,
            &messages_uri,
            Some(&guest_token),
            Some(json!({ "content": "hi all" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["sender_id"], guest_id);

    let (status, body) = send_request(
        &app,
        build_request(Method::GET, &messages_uri, Some(&owner_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let (status, body) = send_request(
        &app,
        build_request(Method::GET, "/api/sessions/my", Some(&guest_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let leave_uri = format!("/api/sessions/{session_id}/leave");
    let (status, body) = send_request(
        &app,
        build_request(Method::POST, &leave_uri, Some(&owner_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["reason"], "owner_cannot_leave");

    let (status, body) = send_request(
        &app,
        build_request(Method::POST, &leave_uri, Some(&guest_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let chat_uri = format!("/api/sessions/{session_id}/chat");
    let (status, _) = send_request(
        &app,
        build_request(Method::GET, &chat_uri, Some(&guest_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send_request(
        &app,
        build_request(
            Method::GET,
            &format!("/api/sessions/{session_id}"),
            Some(&guest_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["participants"].as_array().map(Vec::len), Some(1));

    let (status, body) = send_request(
        &app,
        build_request(Method::POST, "/api/sessions/999/join", Some(&guest_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["reason"], "session_not_found");
}

#[tokio::test]
async fn remove_user_deletes_owned_sessions() {
    let app = test_router();
    let token = register_and_login(&app, "leaving@example.com").await;

    let (status, _) = send_request(
        &app,
        build_request(
            Method::POST,
            "/api/sessions/create-session",
            Some(&token),
            Some(json!({ "title": "Soon gone" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_request(
        &app,
        build_request(Method::DELETE, "/api/auth/remove-user", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    // 令牌仍然有效，但活动已随房主删除
    let (status, body) = send_request(
        &app,
        build_request(Method::GET, "/api/sessions", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(0));

    let (status, _) = send_request(
        &app,
        build_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "leaving@example.com", "password": "Abc12345" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn removed_user_cannot_join_or_create() {
    let app = test_router();
    let owner_token = register_and_login(&app, "stays@example.com").await;
    let ghost_token = register_and_login(&app, "ghost@example.com").await;

    let (status, body) = send_request(
        &app,
        build_request(
            Method::POST,
            "/api/sessions/create-session",
            Some(&owner_token),
            Some(json!({ "title": "Open table" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = body["id"].as_i64().expect("session id");

    let (status, _) = send_request(
        &app,
        build_request(Method::DELETE, "/api/auth/remove-user", Some(&ghost_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_request(
        &app,
        build_request(
            Method::POST,
            &format!("/api/sessions/{session_id}/join"),
            Some(&ghost_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "USER_NOT_FOUND");

    let (status, body) = send_request(
        &app,
        build_request(
            Method::POST,
            "/api/sessions/create-session",
            Some(&ghost_token),
            Some(json!({ "title": "Never" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "USER_NOT_FOUND");
}
