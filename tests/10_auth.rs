mod common;

use anyhow::Result;
use axum::http::{header, Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn health_and_root_respond() -> Result<()> {
    let app = TestApp::new();

    let health = app.request(Method::GET, "/health", None, None).await?;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.data()["status"], "ok");

    let root = app.request(Method::GET, "/", None, None).await?;
    assert_eq!(root.status, StatusCode::OK);
    assert_eq!(root.data()["name"], "fence-estimator-api");
    Ok(())
}

#[tokio::test]
async fn register_login_and_whoami() -> Result<()> {
    let app = TestApp::new();
    let account = app.account("Owner@Example.com", Some("Acme Fence")).await?;

    let me = app.get("/api/auth/me", &account.token).await?;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.data()["email"], "owner@example.com");
    assert_eq!(me.data()["organization_id"], account.organization_id.to_string());
    assert_eq!(me.data()["role"], "owner");
    assert_eq!(me.data()["is_authenticated"], true);
    Ok(())
}

#[tokio::test]
async fn registration_never_returns_password_hash() -> Result<()> {
    let app = TestApp::new();
    let res = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "crew@example.com", "password": "long-enough-pw" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert!(res.data()["user"].get("password_hash").is_none());
    assert!(res.data()["organization"].is_null());
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_rejected() -> Result<()> {
    let app = TestApp::new();
    app.account("dup@example.com", None).await?;

    let res = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "DUP@example.com", "password": "another-password" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), "An account with this email already exists");
    Ok(())
}

#[tokio::test]
async fn weak_registration_reports_field_errors() -> Result<()> {
    let app = TestApp::new();
    let res = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "short" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["field_errors"]["email"].is_string());
    assert!(res.body["field_errors"]["password"].is_string());
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() -> Result<()> {
    let app = TestApp::new();
    app.account("crew@example.com", None).await?;

    let wrong = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "crew@example.com", "password": "nope-nope-nope" })),
        )
        .await?;
    let unknown = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ghost@example.com", "password": "nope-nope-nope" })),
        )
        .await?;

    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.error(), unknown.error());
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let app = TestApp::new();

    let missing = app.request(Method::GET, "/api/jobs", None, None).await?;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["success"], false);

    let garbage = app.get("/api/jobs", "not.a.jwt").await?;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn session_cookie_authenticates_and_logout_expires_it() -> Result<()> {
    let app = TestApp::new();
    app.account("cookie@example.com", Some("Cookie Co")).await?;

    let login = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "cookie@example.com", "password": "correct-horse-battery" })),
        )
        .await?;
    let set_cookie = login.headers.get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    let cookie = set_cookie.split(';').next().unwrap_or_default().to_string();

    let me = app
        .request_with(Method::GET, "/api/auth/me", None, None, &[("cookie", cookie)])
        .await?;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.data()["email"], "cookie@example.com");

    let logout = app.request(Method::POST, "/api/auth/logout", None, None).await?;
    let cleared = logout.headers.get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert!(cleared.contains("Max-Age=0"));
    Ok(())
}
