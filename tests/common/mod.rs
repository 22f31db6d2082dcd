#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use fence_estimator_api::config::AppConfig;
use fence_estimator_api::database::MemoryStore;
use fence_estimator_api::{build_router, AppState};

pub struct TestApp {
    pub router: Router,
}

/// Response as the tests look at it: status, headers and decoded JSON body.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

/// A logged-in user and the organization they own.
pub struct Account {
    pub token: String,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::new(AppConfig::for_tests(), Arc::new(MemoryStore::new()));
        Self {
            router: build_router(state),
        }
    }

    pub async fn request(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<TestResponse> {
        self.request_with(method, path, token, body, &[]).await
    }

    pub async fn request_with(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
        headers: &[(&str, String)],
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        for (name, value) in headers {
            builder = builder.header(*name, value.as_str());
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
        };

        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<TestResponse> {
        self.request(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<TestResponse> {
        self.request(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Result<TestResponse> {
        self.request(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<TestResponse> {
        self.request(Method::DELETE, path, Some(token), None).await
    }

    /// Register a user (optionally with an organization) and log them in.
    pub async fn account(&self, email: &str, organization: Option<&str>) -> Result<Account> {
        let mut body = json!({ "email": email, "password": "correct-horse-battery" });
        if let Some(name) = organization {
            body["organization_name"] = json!(name);
        }
        let registered = self.request(Method::POST, "/api/auth/register", None, Some(body)).await?;
        anyhow::ensure!(registered.status == StatusCode::CREATED, "register failed: {}", registered.body);

        let login = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": "correct-horse-battery" })),
            )
            .await?;
        anyhow::ensure!(login.status == StatusCode::OK, "login failed: {}", login.body);

        let organization_id = registered.data()["organization"]["id"]
            .as_str()
            .map(Uuid::parse_str)
            .transpose()?
            .unwrap_or_else(Uuid::nil);

        Ok(Account {
            token: login.data()["token"].as_str().context("token")?.to_string(),
            user_id: Uuid::parse_str(registered.data()["user"]["id"].as_str().context("user id")?)?,
            organization_id,
            email: email.to_string(),
        })
    }

    /// Create a record and return its id.
    pub async fn create(&self, path: &str, token: &str, body: Value) -> Result<Uuid> {
        let res = self.post(path, token, body).await?;
        anyhow::ensure!(res.status == StatusCode::CREATED, "create {} failed: {} {}", path, res.status, res.body);
        Ok(Uuid::parse_str(res.data()["id"].as_str().context("id")?)?)
    }
}
