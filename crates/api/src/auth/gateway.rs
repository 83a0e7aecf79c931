//! Client for the external auth service.
//!
//! The service owns credentials and user records. This API only forwards
//! logins, resolves bearer tokens to users, and looks up users by id to
//! label submissions.
//!
//! ```text
//! POST /login          {username, password} -> {token}
//! GET  /users/me       Bearer <token>       -> User
//! GET  /users?ids=a,b  Bearer <token>       -> {users: [User]}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use fichas_core::roles::Role;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::AuthGatewayConfig;

/// A user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
    pub account_active: bool,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Credentials forwarded to `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    users: Vec<User>,
}

/// Errors from the auth service client.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("Auth service request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with anything but 200.
    #[error("Auth service returned status {status}")]
    Status { status: u16 },

    /// The body did not match the expected shape.
    #[error("Auth service returned an invalid body: {0}")]
    InvalidBody(String),
}

/// Operations the API needs from the auth service.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchange credentials for a bearer token.
    async fn login(&self, credentials: &LoginRequest) -> Result<String, AuthError>;

    /// Resolve a bearer token to its user.
    async fn current_user(&self, token: &str) -> Result<User, AuthError>;

    /// Look up users by id. Unknown ids are simply absent from the result.
    async fn users_by_ids(&self, token: &str, ids: &[String]) -> Result<Vec<User>, AuthError>;
}

/// [`AuthGateway`] over HTTP.
pub struct HttpAuthGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthGateway {
    pub fn new(config: &AuthGatewayConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Create a gateway reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    // ---- private helpers ----

    /// Require a 200 and decode the body as `T`.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AuthError> {
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(AuthError::Status {
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| AuthError::InvalidBody(e.to_string()))
    }
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn login(&self, credentials: &LoginRequest) -> Result<String, AuthError> {
        let response = self
            .client
            .post(format!("{}/login", self.base_url))
            .json(credentials)
            .send()
            .await?;

        let body: TokenResponse = Self::parse_response(response).await?;
        Ok(body.token)
    }

    async fn current_user(&self, token: &str) -> Result<User, AuthError> {
        let response = self
            .client
            .get(format!("{}/users/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn users_by_ids(&self, token: &str, ids: &[String]) -> Result<Vec<User>, AuthError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .client
            .get(format!("{}/users", self.base_url))
            .query(&[("ids", ids.join(","))])
            .bearer_auth(token)
            .send()
            .await?;

        let body: UsersResponse = Self::parse_response(response).await?;
        Ok(body.users)
    }
}
