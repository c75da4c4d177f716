use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use notegate::{
    api,
    gate::{Argon2Hasher, AuthGate, GateConfig, ManualClock, MemoryCredentialStore},
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "0123456789abcdef0123456789abcdef";

fn app() -> Result<(Router, Arc<ManualClock>)> {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .unwrap_or_default(),
    ));
    let config = GateConfig::new(SecretString::from(SECRET.to_string()));
    let gate = AuthGate::builder(config, Arc::new(MemoryCredentialStore::new()))
        .with_hasher(Arc::new(Argon2Hasher::with_params(1024, 1, 1)?))
        .with_clock(clock.clone())
        .build()?;
    Ok((api::app(Arc::new(gate)), clock))
}

fn post_json(uri: &str, body: &Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body)?))?)
}

fn get(uri: &str, bearer: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    Ok(builder.body(Body::empty())?)
}

async fn body_bytes(response: Response) -> Result<Vec<u8>> {
    Ok(response.into_body().collect().await?.to_bytes().to_vec())
}

async fn body_json(response: Response) -> Result<Value> {
    Ok(serde_json::from_slice(&body_bytes(response).await?)?)
}

async fn body_text(response: Response) -> Result<String> {
    Ok(String::from_utf8(body_bytes(response).await?)?)
}

fn credentials(username: &str, password: &str) -> Value {
    json!({ "username": username, "password": password })
}

#[tokio::test]
async fn signup_then_duplicate() -> Result<()> {
    let (app, _) = app()?;

    let response = app
        .clone()
        .oneshot(post_json("/v1/signup", &credentials("alice", "secret"))?)
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await?;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["message"], "User created");

    let response = app
        .oneshot(post_json("/v1/signup", &credentials("alice", "other"))?)
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await?;
    assert_eq!(body["message"], "User already exists");
    Ok(())
}

#[tokio::test]
async fn signup_rejects_empty_fields() -> Result<()> {
    let (app, _) = app()?;
    let response = app
        .oneshot(post_json("/v1/signup", &credentials("", "secret"))?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn login_then_me() -> Result<()> {
    let (app, _) = app()?;
    app.clone()
        .oneshot(post_json("/v1/signup", &credentials("alice", "secret"))?)
        .await?;

    let response = app
        .clone()
        .oneshot(post_json("/v1/login", &credentials("alice", "secret"))?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["expires_at"].is_string());
    let token = body["token"].as_str().unwrap_or_default().to_string();
    assert!(!token.is_empty());

    let response = app.oneshot(get("/v1/me", Some(&token))?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "USER");
    Ok(())
}

#[tokio::test]
async fn me_requires_valid_unexpired_token() -> Result<()> {
    let (app, clock) = app()?;

    let response = app.clone().oneshot(get("/v1/me", None)?).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get("/v1/me", Some("not.a.token"))?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.clone()
        .oneshot(post_json("/v1/signup", &credentials("alice", "secret"))?)
        .await?;
    let response = app
        .clone()
        .oneshot(post_json("/v1/login", &credentials("alice", "secret"))?)
        .await?;
    let token = body_json(response).await?["token"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    clock.advance(chrono::Duration::hours(2));
    let response = app.oneshot(get("/v1/me", Some(&token))?).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_failures_then_locked() -> Result<()> {
    let (app, clock) = app()?;
    app.clone()
        .oneshot(post_json("/v1/signup", &credentials("bob", "secret"))?)
        .await?;

    let response = app
        .clone()
        .oneshot(post_json("/v1/login", &credentials("nobody", "secret"))?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(response).await?, "Invalid credentials");

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(post_json("/v1/login", &credentials("bob", "wrong"))?)
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .clone()
        .oneshot(post_json("/v1/login", &credentials("bob", "secret"))?)
        .await?;
    assert_eq!(response.status(), StatusCode::LOCKED);
    assert_eq!(
        body_text(response).await?,
        "User is locked. Try again later."
    );

    clock.advance(chrono::Duration::minutes(15));
    let response = app
        .oneshot(post_json("/v1/login", &credentials("bob", "secret"))?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn login_without_payload_is_bad_request() -> Result<()> {
    let (app, _) = app()?;
    let request = Request::builder()
        .method("POST")
        .uri("/v1/login")
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn health_reports_database_and_request_id() -> Result<()> {
    let (app, _) = app()?;
    let response = app.oneshot(get("/health", None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key("x-app"));

    let body = body_json(response).await?;
    assert_eq!(body["name"], "notegate");
    assert_eq!(body["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn request_id_is_propagated() -> Result<()> {
    let (app, _) = app()?;
    let request = Request::builder()
        .uri("/")
        .header("x-request-id", "req-123")
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-123")
    );
    assert!(body_text(response).await?.starts_with("notegate/"));
    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> Result<()> {
    let (app, _) = app()?;
    let response = app.oneshot(get("/api-docs/openapi.json", None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert!(body["paths"]["/v1/login"].is_object());
    Ok(())
}
