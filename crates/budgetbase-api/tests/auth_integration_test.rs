//! Integration tests for authentication endpoints

use axum::{
    body::Body,
    http::{HeaderValue, Request, StatusCode},
    response::Response,
    Router,
};
use budgetbase_api::{models::*, ApiServer, ApiServerConfig};
use budgetbase_auth::{AuthService, HashConfig, PasswordHasher, TokenSigner};
use budgetbase_db::SqlCredentialStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

/// Helper to build a router over an in-memory database with migrations applied
async fn create_test_app() -> Router {
    let db = budgetbase_db::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    budgetbase_db::migrate(&db)
        .await
        .expect("Failed to run migrations");

    // Cheap Argon2 parameters keep the suite fast
    let hasher = PasswordHasher::new(HashConfig {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap();
    let auth = AuthService::new(
        Arc::new(SqlCredentialStore::new(db)),
        hasher,
        TokenSigner::new(b"test-secret"),
    )
    .unwrap();

    let config = ApiServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        enable_cors: true,
    };

    ApiServer::new(config, Arc::new(auth)).build_router()
}

fn signup_body() -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "a@b.com",
        "password": "secret1",
        "dateOfBirth": "1990-01-01",
        "balance": 100
    })
}

async fn post_json(app: &Router, uri: &str, body: &Value) -> Response {
    let request = Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap();

    app.clone().oneshot(request).await.unwrap()
}

async fn get_me(app: &Router, authorization: Option<&str>) -> Response {
    let mut builder = Request::builder().uri("/api/me").method("GET");
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }

    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn signup_token(app: &Router) -> String {
    let response = post_json(app, "/api/signup", &signup_body()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: TokenResponse = serde_json::from_slice(&read_body(response).await).unwrap();
    body.token
}

#[tokio::test]
async fn test_welcome_message() {
    let app = create_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_body(response).await,
        b"Welcome to the Budgetbase API.".to_vec()
    );
}

#[tokio::test]
async fn test_health_reports_user_count() {
    let app = create_test_app().await;
    signup_token(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.users, 1);
}

#[tokio::test]
async fn test_signup_success_returns_token() {
    let app = create_test_app().await;

    let token = signup_token(&app).await;

    assert!(!token.is_empty());
    assert_eq!(token.split('.').count(), 3);
}

#[tokio::test]
async fn test_signup_missing_each_field() {
    let app = create_test_app().await;

    for field in [
        "firstName",
        "lastName",
        "email",
        "password",
        "dateOfBirth",
        "balance",
    ] {
        let mut body = signup_body();
        body.as_object_mut().unwrap().remove(field);

        let response = post_json(&app, "/api/signup", &body).await;
        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "missing {}",
            field
        );

        let error: ErrorResponse = serde_json::from_slice(&read_body(response).await).unwrap();
        assert_eq!(error.error, "Please fill all fields!");
        assert_eq!(error.code.as_deref(), Some("VALIDATION_ERROR"));
        assert_eq!(error.missing_fields, Some(vec![field.to_string()]));
    }

    // Nothing was persisted by the rejected attempts
    signup_token(&app).await;
}

#[tokio::test]
async fn test_signup_empty_body_lists_every_field() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/signup")
                .method("POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(error.missing_fields.map(|f| f.len()), Some(6));
}

#[tokio::test]
async fn test_signup_missing_fields_win_over_bad_balance() {
    let app = create_test_app().await;

    let response = post_json(
        &app,
        "/api/signup",
        &json!({ "email": "a@b.com", "password": "secret1", "balance": "lots" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(error.error, "Please fill all fields!");
    assert_eq!(
        error.missing_fields,
        Some(vec![
            "firstName".to_string(),
            "lastName".to_string(),
            "dateOfBirth".to_string()
        ])
    );
}

#[tokio::test]
async fn test_signup_malformed_json() {
    let app = create_test_app().await;

    let request = Request::builder()
        .uri("/api/signup")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(error.code.as_deref(), Some("VALIDATION_ERROR"));
}

#[tokio::test]
async fn test_signup_without_json_content_type() {
    let app = create_test_app().await;

    let request = Request::builder()
        .uri("/api/signup")
        .method("POST")
        .header("content-type", "text/plain")
        .body(Body::from(signup_body().to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let app = create_test_app().await;
    signup_token(&app).await;

    // Same address in a different case and with surrounding whitespace
    let mut body = signup_body();
    body["email"] = json!("  A@B.COM ");

    let response = post_json(&app, "/api/signup", &body).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(error.error, "Email is in use!");
    assert_eq!(error.code.as_deref(), Some("EMAIL_IN_USE"));
}

#[tokio::test]
async fn test_signin_success() {
    let app = create_test_app().await;
    signup_token(&app).await;

    let response = post_json(
        &app,
        "/api/signin",
        &json!({ "email": "A@B.com", "password": "secret1" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: TokenResponse = serde_json::from_slice(&read_body(response).await).unwrap();
    assert!(!body.token.is_empty());
}

#[tokio::test]
async fn test_signin_failures_are_indistinguishable() {
    let app = create_test_app().await;
    signup_token(&app).await;

    let wrong_password = post_json(
        &app,
        "/api/signin",
        &json!({ "email": "a@b.com", "password": "wrong" }),
    )
    .await;
    let unknown_email = post_json(
        &app,
        "/api/signin",
        &json!({ "email": "nobody@b.com", "password": "secret1" }),
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);

    let wrong_password = read_body(wrong_password).await;
    let unknown_email = read_body(unknown_email).await;
    assert_eq!(wrong_password, unknown_email);

    let error: ErrorResponse = serde_json::from_slice(&wrong_password).unwrap();
    assert_eq!(error.code.as_deref(), Some("INVALID_CREDENTIALS"));
}

#[tokio::test]
async fn test_signin_missing_fields_is_unauthorized() {
    let app = create_test_app().await;
    signup_token(&app).await;

    let response = post_json(&app, "/api/signin", &json!({ "email": "a@b.com" })).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_bearer_token() {
    let app = create_test_app().await;
    let token = signup_token(&app).await;

    let response = get_me(&app, Some(&format!("Bearer {}", token))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    let profile: UserProfile = serde_json::from_slice(&body).unwrap();
    assert_eq!(profile.email, "a@b.com");
    assert_eq!(profile.first_name, "Ada");
    assert_eq!(profile.balance, 100.0);

    // The hash never leaves the server
    let raw: Value = serde_json::from_slice(&body).unwrap();
    assert!(raw.get("passwordHash").is_none());
    assert!(raw.get("password").is_none());
}

#[tokio::test]
async fn test_me_with_raw_token() {
    let app = create_test_app().await;
    let token = signup_token(&app).await;

    let response = get_me(&app, Some(&token)).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_without_header() {
    let app = create_test_app().await;

    let response = get_me(&app, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error: ErrorResponse = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(error.code.as_deref(), Some("MISSING_AUTH"));
}

#[tokio::test]
async fn test_me_with_lowercase_bearer_scheme() {
    let app = create_test_app().await;
    let token = signup_token(&app).await;

    let response = get_me(&app, Some(&format!("bearer {}", token))).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_with_non_ascii_header() {
    let app = create_test_app().await;

    let request = Request::builder()
        .uri("/api/me")
        .method("GET")
        .header(
            "authorization",
            HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap(),
        )
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error: ErrorResponse = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(error.code.as_deref(), Some("INVALID_AUTH_FORMAT"));
}

#[tokio::test]
async fn test_me_with_tampered_token() {
    let app = create_test_app().await;
    let token = signup_token(&app).await;

    // Replace one character inside the signature
    let at = token.len() - 10;
    let original = &token[at..at + 1];
    let replacement = if original == "x" { "y" } else { "x" };
    let tampered = format!("{}{}{}", &token[..at], replacement, &token[at + 1..]);

    let response = get_me(&app, Some(&format!("Bearer {}", tampered))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_me(&app, Some("Bearer not-a-token")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_then_signin_resolve_same_identity() {
    let app = create_test_app().await;
    let signup = signup_token(&app).await;

    let response = post_json(
        &app,
        "/api/signin",
        &json!({ "email": "a@b.com", "password": "secret1" }),
    )
    .await;
    let signin: TokenResponse = serde_json::from_slice(&read_body(response).await).unwrap();

    let first: UserProfile =
        serde_json::from_slice(&read_body(get_me(&app, Some(&signup)).await).await).unwrap();
    let second: UserProfile =
        serde_json::from_slice(&read_body(get_me(&app, Some(&signin.token)).await).await)
            .unwrap();

    assert_ne!(signup, signin.token);
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_openapi_is_served() {
    let app = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
