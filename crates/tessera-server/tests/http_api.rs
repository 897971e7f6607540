//! HTTP API tests for tessera-server.
//!
//! These drive the router in-process; no socket is bound.
//!
//! Run with: cargo test --package tessera-server --test http_api

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use tessera_server::routes::create_router;
use tessera_server::{AppConfig, AppState};
use tessera_token::{FixedClock, KeyPairProvider, TokenEncoder};
use tower::ServiceExt;

fn app_with(cfg: AppConfig) -> (Router, Arc<AppState>) {
    let provider = KeyPairProvider::generate().unwrap();
    let state = Arc::new(AppState::init(&cfg, &provider).unwrap());
    (create_router(state.clone()), state)
}

fn app() -> Router {
    app_with(AppConfig::default()).0
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn issue(app: &Router, user_id: Value, role: Value) -> String {
    let (status, body) = post_json(
        app.clone(),
        "/token",
        json!({ "userId": user_id, "role": role }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "issue failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

/// Issue then verify through the HTTP surface.
#[tokio::test]
async fn test_issue_then_verify() {
    let app = app();
    let token = issue(&app, json!("u-42"), json!("admin")).await;
    assert!(token.starts_with("v4.public."));

    let (status, body) = post_json(app, "/verify", json!({ "token": token })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    let claims = &body["claims"];
    assert_eq!(claims["userId"], "u-42");
    assert_eq!(claims["role"], "admin");
    assert_eq!(claims["iss"], "my-app");
    assert_eq!(claims["aud"], "users");
    assert!(claims["jti"].is_string());

    let iat = claims["iat"].as_str().unwrap();
    let exp = claims["exp"].as_str().unwrap();
    assert!(iat.ends_with('Z') && exp.ends_with('Z'));
}

/// Non-string identity values survive the round trip unchanged.
#[tokio::test]
async fn test_numeric_identity_round_trips() {
    let app = app();
    let token = issue(&app, json!(7), json!(["reader", "writer"])).await;

    let (status, body) = post_json(app, "/verify", json!({ "token": token })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["claims"]["userId"], 7);
    assert_eq!(body["claims"]["role"], json!(["reader", "writer"]));
}

/// Every kind of verification failure gets the same 401 body.
#[tokio::test]
async fn test_failures_share_public_message() {
    let (app, _) = app_with(AppConfig::default());
    let token = issue(&app, json!("u-1"), json!("user")).await;

    let mut tampered: Vec<char> = token.chars().collect();
    let idx = "v4.public.".len() + 5;
    tampered[idx] = if tampered[idx] == 'A' { 'B' } else { 'A' };
    let tampered: String = tampered.into_iter().collect();

    let other = app_with(AppConfig::default()).0;
    let foreign = issue(&other, json!("u-1"), json!("user")).await;

    for bad in [
        tampered,
        foreign,
        "not-a-token".to_string(),
        "v4.local.AAAA".to_string(),
        String::new(),
    ] {
        let (status, body) = post_json(app.clone(), "/verify", json!({ "token": bad })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Invalid or expired token" }));
    }
}

/// A missing `token` field is treated like an empty token.
#[tokio::test]
async fn test_verify_without_token_field() {
    let (status, body) = post_json(app(), "/verify", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

/// A `token` that is not a string is a bad token, not a bad request.
#[tokio::test]
async fn test_verify_non_string_token() {
    for token in [json!(123), Value::Null, json!({ "raw": "v4.public.x" }), json!(["a"])] {
        let (status, body) = post_json(app(), "/verify", json!({ "token": token.clone() })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "token {token}");
        assert_eq!(body, json!({ "error": "Invalid or expired token" }));
    }
}

/// `/verify` does not insist on a JSON content type.
#[tokio::test]
async fn test_verify_without_content_type() {
    let app = app();
    let token = issue(&app, json!("u-3"), json!("user")).await;

    let request = Request::builder()
        .method("POST")
        .uri("/verify")
        .body(Body::from(json!({ "token": token }).to_string()))
        .unwrap();
    let (status, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["claims"]["userId"], "u-3");

    let request = Request::builder()
        .method("POST")
        .uri("/verify")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(r#"{"token":"garbage"}"#))
        .unwrap();
    let (status, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");

    let request = Request::builder()
        .method("POST")
        .uri("/verify")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

/// A body that is not JSON at all is rejected before verification.
#[tokio::test]
async fn test_verify_unparseable_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/verify")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid request body"));
}

/// Out-of-range leeway settings never take the service down.
#[tokio::test]
async fn test_huge_leeway_is_survivable() {
    let cfg = AppConfig::from_toml_str("[token]\nleeway = \"300000years\"").unwrap();
    let (app, _) = app_with(cfg);

    let token = issue(&app, json!("u-5"), json!("user")).await;
    let (status, body) = post_json(app, "/verify", json!({ "token": token })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["claims"]["issuedAt"], body["claims"]["iat"]);
}

/// Expired tokens are refused with the same message.
#[tokio::test]
async fn test_expired_token_rejected() {
    let cfg = AppConfig::default();
    let provider = KeyPairProvider::generate().unwrap();
    let state = AppState::init(&cfg, &provider).unwrap();

    let long_ago = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let stale = TokenEncoder::new(&provider, cfg.token.policy().unwrap())
        .with_clock(Arc::new(FixedClock::new(long_ago)))
        .sign(tessera_token::RawClaims::new("u-1", "user"))
        .unwrap();

    let app = create_router(Arc::new(state));
    let (status, body) = post_json(app, "/verify", json!({ "token": stale })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

/// Missing identity claims are an issuance failure, not a client error.
#[tokio::test]
async fn test_issue_requires_identity() {
    let (status, body) = post_json(app(), "/token", json!({ "role": "user" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("userId"));

    let (status, _) = post_json(app(), "/token", json!({ "userId": "u-1", "role": null })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

/// A configured footer is carried on issued tokens.
#[tokio::test]
async fn test_configured_footer() {
    let cfg = AppConfig::from_toml_str("[token]\nfooter = \"kid:1\"\nttl = \"5m\"").unwrap();
    let (app, _) = app_with(cfg);

    let token = issue(&app, json!("u-9"), json!("ops")).await;
    assert_eq!(token.split('.').count(), 4);

    let (status, body) = post_json(app, "/verify", json!({ "token": token })).await;
    assert_eq!(status, StatusCode::OK);

    let iat = chrono::DateTime::parse_from_rfc3339(body["claims"]["iat"].as_str().unwrap()).unwrap();
    let exp = chrono::DateTime::parse_from_rfc3339(body["claims"]["exp"].as_str().unwrap()).unwrap();
    assert_eq!(exp - iat, Duration::minutes(5));
}

#[tokio::test]
async fn test_public_key_endpoint() {
    let (app, state) = app_with(AppConfig::default());
    let (status, body) = get(app, "/public-key").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["publicKey"], state.public_key().to_hex());
    assert!(body["paserk"].as_str().unwrap().starts_with("k4.public."));
}

#[tokio::test]
async fn test_healthz() {
    let (status, body) = get(app(), "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "service": "tessera-server" }));
}
