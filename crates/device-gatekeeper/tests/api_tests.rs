//! Integration tests for the gatekeeper API.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use device_gatekeeper::{
    api::{create_router, create_router_with_rate_limit, AppState, RateLimitState},
    Backend, RegistrationStore, StaticCredentials,
};
use secrecy::SecretString;
use std::sync::Arc;
use tower::ServiceExt;

/// Create a test app state with memory-only storage.
fn create_test_state() -> AppState {
    let authorizer = StaticCredentials::new("admin", &SecretString::new("admin123".into()));
    AppState::new(RegistrationStore::in_memory(), Arc::new(authorizer))
}

fn test_app(state: AppState) -> Router {
    create_router_with_rate_limit(state, RateLimitState::permissive())
}

fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

fn register_body(computer_id: &str) -> serde_json::Value {
    serde_json::json!({
        "username": "alice",
        "computer_id": computer_id,
        "app_version": "1.0",
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(create_test_state());

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["pending_count"], 0);
    assert_eq!(json["registered_count"], 0);
}

#[tokio::test]
async fn test_register_approve_verify_unregister() {
    let app = test_app(create_test_state());

    let response = app
        .clone()
        .oneshot(json_post("/register", register_body("PC1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Registration request submitted and awaiting admin approval."
    );

    // Not verifiable until approved
    let response = app
        .clone()
        .oneshot(json_post("/verify", serde_json::json!({"computer_id": "PC1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(form_post("/approve_user", "computer_id=PC1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "User alice approved successfully."
    );

    let response = app
        .clone()
        .oneshot(json_post("/verify", serde_json::json!({"computer_id": "PC1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "User alice is verified!");

    let response = app
        .clone()
        .oneshot(form_post("/unregister_user", "computer_id=PC1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_post("/verify", serde_json::json!({"computer_id": "PC1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["message"],
        "Computer not registered!"
    );
}

#[tokio::test]
async fn test_register_missing_fields() {
    let app = test_app(create_test_state());

    for body in [
        serde_json::json!({"username": "alice", "computer_id": "PC1"}),
        serde_json::json!({"username": "", "computer_id": "PC1", "app_version": "1.0"}),
        serde_json::json!({}),
    ] {
        let response = app.clone().oneshot(json_post("/register", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Missing data!");
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_register_wrong_shape_is_validation_error() {
    let state = create_test_state();
    let app = test_app(state.clone());

    for body in [
        serde_json::json!({"username": "alice", "computer_id": 123, "app_version": "1.0"}),
        serde_json::Value::Null,
        serde_json::json!(["PC1"]),
    ] {
        let response = app.clone().oneshot(json_post("/register", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );

        let json = body_json(response).await;
        assert_eq!(json["error"], "Missing data!");
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    assert_eq!(state.store.counts().await, (0, 0));
}

#[tokio::test]
async fn test_verify_wrong_shape_is_not_registered() {
    let app = test_app(create_test_state());

    for body in [serde_json::json!({"computer_id": 123}), serde_json::Value::Null] {
        let response = app.clone().oneshot(json_post("/verify", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await["message"],
            "Computer not registered!"
        );
    }
}

#[tokio::test]
async fn test_register_duplicate() {
    let state = create_test_state();
    let app = test_app(state.clone());

    let response = app
        .clone()
        .oneshot(json_post("/register", register_body("PC1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_post("/register", register_body("PC1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "User with this Computer ID already exists!"
    );

    // Still a conflict once registered
    state.store.approve("PC1").await.unwrap();
    let response = app
        .oneshot(json_post("/register", register_body("PC1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_approve_unknown() {
    let app = test_app(create_test_state());

    let response = app
        .clone()
        .oneshot(form_post("/approve_user", "computer_id=nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"],
        "Computer ID not found in pending approvals."
    );

    // Missing field behaves like an unknown ID
    let response = app.oneshot(form_post("/approve_user", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_approve_twice() {
    let state = create_test_state();
    state.store.register("PC1", "alice", "1.0").await.unwrap();
    let app = test_app(state);

    let response = app
        .clone()
        .oneshot(form_post("/approve_user", "computer_id=PC1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(form_post("/approve_user", "computer_id=PC1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reject_pending() {
    let state = create_test_state();
    state.store.register("PC1", "alice", "1.0").await.unwrap();
    let app = test_app(state.clone());

    let response = app
        .clone()
        .oneshot(form_post("/reject_user", "computer_id=PC1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "User alice rejected.");
    assert_eq!(state.store.counts().await, (0, 0));

    // The ID is free again
    let response = app
        .oneshot(json_post("/register", register_body("PC1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unregister_pending_is_not_found() {
    let state = create_test_state();
    state.store.register("PC1", "alice", "1.0").await.unwrap();
    let app = test_app(state);

    let response = app
        .oneshot(form_post("/unregister_user", "computer_id=PC1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_user_requires_admin() {
    let state = create_test_state();
    state.store.register("PC1", "alice", "1.0").await.unwrap();
    state.store.approve("PC1").await.unwrap();
    let app = test_app(state.clone());

    let response = app
        .clone()
        .oneshot(form_post(
            "/delete_user",
            "computer_id=PC1&admin_username=admin&admin_password=wrong",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(state.store.verify("PC1").await.is_ok());

    let response = app
        .clone()
        .oneshot(form_post(
            "/delete_user",
            "computer_id=PC2&admin_username=admin&admin_password=admin123",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(form_post(
            "/delete_user",
            "computer_id=PC1&admin_username=admin&admin_password=admin123",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "User alice deleted successfully."
    );
    assert!(state.store.verify("PC1").await.is_err());
}

#[tokio::test]
async fn test_views() {
    let state = create_test_state();
    let app = test_app(state.clone());

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Admin Dashboard"));

    let response = app.clone().oneshot(get("/view_users")).await.unwrap();
    assert!(body_text(response).await.contains("No registered users."));

    state
        .store
        .register("PC1", "<b>alice</b>", "1.0")
        .await
        .unwrap();
    state.store.register("PC2", "bob", "2.0").await.unwrap();
    state.store.approve("PC2").await.unwrap();

    let response = app.clone().oneshot(get("/view_pending_users")).await.unwrap();
    let html = body_text(response).await;
    assert!(html.contains("&lt;b&gt;alice&lt;/b&gt;"));
    assert!(!html.contains("<b>alice</b>"));
    assert!(html.contains(r#"action="/approve_user""#));
    assert!(!html.contains("bob"));

    let response = app.clone().oneshot(get("/view_users")).await.unwrap();
    let html = body_text(response).await;
    assert!(html.contains("Username: bob, Computer ID: PC2, App Version: 2.0"));
    assert!(html.contains(r#"action="/unregister_user""#));

    let response = app.oneshot(get("/delete_user_form")).await.unwrap();
    assert!(body_text(response).await.contains(r#"name="admin_password""#));
}

#[tokio::test]
async fn test_storage_failure_returns_500() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();

    let store = RegistrationStore::new(
        Default::default(),
        Backend::json(blocker.join("data.json")),
    );
    let authorizer = StaticCredentials::new("admin", &SecretString::new("admin123".into()));
    let state = AppState::new(store, Arc::new(authorizer));
    let app = test_app(state.clone());

    let response = app
        .oneshot(json_post("/register", register_body("PC1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "STORAGE_ERROR");

    // In-memory state kept the registration
    assert_eq!(state.store.counts().await, (1, 0));
}

#[tokio::test]
async fn test_persists_to_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");

    let store = RegistrationStore::open(Backend::json(&path)).await.unwrap();
    let authorizer = StaticCredentials::new("admin", &SecretString::new("admin123".into()));
    let app = test_app(AppState::new(store, Arc::new(authorizer)));

    let response = app
        .oneshot(json_post("/register", register_body("PC1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["pending_users"]["PC1"]["username"], "alice");
}

#[tokio::test]
async fn test_rate_limiting() {
    // Very restrictive rate limit: 1 request per minute
    let app = create_router_with_rate_limit(create_test_state(), RateLimitState::new(1));

    let response = app.clone().oneshot(get("/view_users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/view_users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "60");
    assert_eq!(body_json(response).await["code"], "RATE_LIMIT_EXCEEDED");

    // Health is not rate limited
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
