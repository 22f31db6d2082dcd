//! Typed HTTP client for the estimator API, used by `fencectl` and the
//! end-to-end tests.

use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::Resource;
use crate::services::{
    AcceptInvitationRequest, AppliedDiscount, CurrentOrganization, EstimateQuery, Invitation, InviteRequest,
    JobEstimate, LoginRequest, LoginResult, MemberView, RegisterRequest, RegisteredAccount, SampleDataSummary,
    UpdateRoleRequest, ValidatePromoRequest,
};
use crate::tenant::ORGANIZATION_HEADER;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{message} ({status})")]
    Api {
        status: StatusCode,
        message: String,
        code: Option<String>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: String,
    code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
    pub id: Uuid,
}

#[derive(Debug, Clone)]
pub struct FenceClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    organization_id: Option<Uuid>,
}

impl FenceClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let parsed = url::Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token: None,
            organization_id: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Send `X-Organization-Id` with every request.
    pub fn with_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Call any endpoint and return the unwrapped `data` payload.
    pub async fn send<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<&Value>) -> Result<T, ClientError> {
        self.execute(method, path, body, None::<&()>).await
    }

    async fn execute<T, Q>(&self, method: Method, path: &str, body: Option<&Value>, query: Option<&Q>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(org_id) = self.organization_id {
            request = request.header(ORGANIZATION_HEADER, org_id.to_string());
        }
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let (message, code) = match serde_json::from_slice::<ErrorEnvelope>(&bytes) {
                Ok(err) => (err.error, err.code),
                Err(_) => (String::from_utf8_lossy(&bytes).into_owned(), None),
            };
            return Err(ClientError::Api { status, message, code });
        }

        serde_json::from_slice::<Envelope<T>>(&bytes)
            .map(|envelope| envelope.data)
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn encode<B: Serialize>(body: &B) -> Result<Value, ClientError> {
        serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        self.send(Method::GET, "/health", None).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisteredAccount, ClientError> {
        self.send(Method::POST, "/api/auth/register", Some(&Self::encode(request)?)).await
    }

    /// Log in and keep the issued token on the returned client.
    pub async fn login(&self, request: &LoginRequest) -> Result<(Self, LoginResult), ClientError> {
        let result: LoginResult = self.send(Method::POST, "/api/auth/login", Some(&Self::encode(request)?)).await?;
        Ok((self.clone().with_token(result.token.clone()), result))
    }

    pub async fn whoami(&self) -> Result<Value, ClientError> {
        self.send(Method::GET, "/api/auth/me", None).await
    }

    pub async fn list<R: Resource>(&self) -> Result<Vec<R>, ClientError> {
        self.send(Method::GET, R::PATH, None).await
    }

    pub async fn get<R: Resource>(&self, id: Uuid) -> Result<R, ClientError> {
        self.send(Method::GET, &format!("{}/{}", R::PATH, id), None).await
    }

    pub async fn create<R: Resource>(&self, body: &Value) -> Result<R, ClientError> {
        self.send(Method::POST, R::PATH, Some(body)).await
    }

    pub async fn update<R: Resource>(&self, id: Uuid, body: &Value) -> Result<R, ClientError> {
        self.send(Method::PUT, &format!("{}/{}", R::PATH, id), Some(body)).await
    }

    pub async fn delete<R: Resource>(&self, id: Uuid) -> Result<Deleted, ClientError> {
        self.send(Method::DELETE, &format!("{}/{}", R::PATH, id), None).await
    }

    pub async fn validate_promo(&self, request: &ValidatePromoRequest) -> Result<AppliedDiscount, ClientError> {
        self.send(Method::POST, "/api/discounts/validate", Some(&Self::encode(request)?)).await
    }

    pub async fn estimate(&self, job_id: Uuid, query: &EstimateQuery) -> Result<JobEstimate, ClientError> {
        self.execute(Method::GET, &format!("/api/jobs/{}/estimate", job_id), None, Some(query)).await
    }

    pub async fn current_organization(&self) -> Result<CurrentOrganization, ClientError> {
        self.send(Method::GET, "/api/organizations/current", None).await
    }

    pub async fn members(&self, org_id: Uuid) -> Result<Vec<MemberView>, ClientError> {
        self.send(Method::GET, &format!("/api/organizations/{}/members", org_id), None).await
    }

    pub async fn invite(&self, org_id: Uuid, request: &InviteRequest) -> Result<Invitation, ClientError> {
        let path = format!("/api/organizations/{}/invitations", org_id);
        self.send(Method::POST, &path, Some(&Self::encode(request)?)).await
    }

    pub async fn accept_invitation(&self, request: &AcceptInvitationRequest) -> Result<MemberView, ClientError> {
        self.send(Method::POST, "/api/organizations/invitations/accept", Some(&Self::encode(request)?)).await
    }

    pub async fn update_role(&self, org_id: Uuid, member_id: Uuid, request: &UpdateRoleRequest) -> Result<MemberView, ClientError> {
        let path = format!("/api/organizations/{}/members/{}/role", org_id, member_id);
        self.send(Method::PUT, &path, Some(&Self::encode(request)?)).await
    }

    pub async fn remove_member(&self, org_id: Uuid, member_id: Uuid) -> Result<Deleted, ClientError> {
        let path = format!("/api/organizations/{}/members/{}", org_id, member_id);
        self.send(Method::DELETE, &path, None).await
    }

    pub async fn seed_sample_data(&self, org_id: Uuid) -> Result<SampleDataSummary, ClientError> {
        self.send(Method::POST, &format!("/api/organizations/{}/sample-data", org_id), None).await
    }
}
