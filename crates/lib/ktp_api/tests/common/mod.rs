//! Shared harness: a router over in-memory stores, a manual clock and a
//! mailer that keeps its outbox.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use ktp_api::{AppState, config::ApiConfig};
use ktp_core::auth::service::{AuthService, AuthStores};
use ktp_core::clock::ManualClock;
use ktp_core::config::{AppEnv, AuthConfig};
use ktp_core::mail::{Mailer, MemoryMailer};
use serde_json::Value;
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";

pub struct TestApp {
    pub router: Router,
    pub auth: Arc<AuthService>,
    pub mailer: Arc<MemoryMailer>,
    pub clock: Arc<ManualClock>,
}

pub fn app(env: AppEnv) -> TestApp {
    let mailer = Arc::new(MemoryMailer::new());
    let (router, auth, clock) = app_with_mailer(env, mailer.clone());
    TestApp {
        router,
        auth,
        mailer,
        clock,
    }
}

pub fn app_with_mailer(
    env: AppEnv,
    mailer: Arc<dyn Mailer>,
) -> (Router, Arc<AuthService>, Arc<ManualClock>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut config = AuthConfig::with_secret(SECRET);
    config.bcrypt_cost = 4;
    config.app_env = env;
    config.public_url = "http://client.test".into();

    let clock = Arc::new(ManualClock::starting_now());
    let auth = Arc::new(AuthService::new(
        config,
        AuthStores::in_memory(),
        mailer,
        Duration::from_secs(5),
        clock.clone(),
    ));
    let state = AppState {
        auth: auth.clone(),
        config: ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            app_env: env,
        },
        pool: None,
    };
    (ktp_api::router(state), auth, clock)
}

/// Send one request and return the status plus the JSON body (`Null` when the
/// body is empty or not JSON).
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(json) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = router.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(router, Method::POST, uri, None, Some(body)).await
}

pub async fn get_auth(router: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    send(router, Method::GET, uri, Some(token), None).await
}

/// Sign up and return the access and refresh tokens.
pub async fn signup(router: &Router, name: &str, email: &str, password: &str) -> (String, String) {
    let (status, body) = post(
        router,
        "/api/auth/signup",
        serde_json::json!({"name": name, "email": email, "password": password}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
    tokens(&body)
}

/// Log in and return the access and refresh tokens.
pub async fn login(router: &Router, email: &str, password: &str) -> (String, String) {
    let (status, body) = post(
        router,
        "/api/auth/login",
        serde_json::json!({"email": email, "password": password}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    tokens(&body)
}

pub fn tokens(body: &Value) -> (String, String) {
    (
        body["accessToken"].as_str().expect("accessToken").to_string(),
        body["refreshToken"].as_str().expect("refreshToken").to_string(),
    )
}
