#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use fichas_api::auth::gateway::{AuthError, AuthGateway, LoginRequest, User};
use fichas_api::config::{AuthGatewayConfig, ServerConfig};
use fichas_api::router::build_app_router;
use fichas_api::state::AppState;
use fichas_core::roles::Role;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const SELLER_TOKEN: &str = "seller-token";
pub const OTHER_SELLER_TOKEN: &str = "other-seller-token";
pub const INACTIVE_TOKEN: &str = "inactive-token";

pub const ADMIN_ID: &str = "admin-1";
pub const SELLER_ID: &str = "seller-1";
pub const OTHER_SELLER_ID: &str = "seller-2";

/// Password accepted by [`StaticAuthGateway::login`] for every user.
pub const PASSWORD: &str = "secret";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        auth: AuthGatewayConfig {
            base_url: "http://auth.invalid".to_string(),
            timeout_secs: 1,
        },
    }
}

fn user(id: &str, name: &str, role: Role, account_active: bool) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        full_name: None,
        role,
        account_active,
    }
}

/// In-process auth service with four fixed users, one per token.
pub struct StaticAuthGateway {
    accounts: Vec<(&'static str, User)>,
}

impl Default for StaticAuthGateway {
    fn default() -> Self {
        Self {
            accounts: vec![
                (ADMIN_TOKEN, user(ADMIN_ID, "admin", Role::Admin, true)),
                (SELLER_TOKEN, user(SELLER_ID, "seller", Role::Seller, true)),
                (
                    OTHER_SELLER_TOKEN,
                    user(OTHER_SELLER_ID, "other", Role::Seller, true),
                ),
                (
                    INACTIVE_TOKEN,
                    user("seller-3", "inactive", Role::Seller, false),
                ),
            ],
        }
    }
}

#[async_trait]
impl AuthGateway for StaticAuthGateway {
    async fn login(&self, credentials: &LoginRequest) -> Result<String, AuthError> {
        self.accounts
            .iter()
            .find(|(_, u)| u.name == credentials.username && credentials.password == PASSWORD)
            .map(|(token, _)| token.to_string())
            .ok_or(AuthError::Status { status: 401 })
    }

    async fn current_user(&self, token: &str) -> Result<User, AuthError> {
        self.accounts
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, u)| u.clone())
            .ok_or(AuthError::Status { status: 401 })
    }

    async fn users_by_ids(&self, _token: &str, ids: &[String]) -> Result<Vec<User>, AuthError> {
        Ok(self
            .accounts
            .iter()
            .filter(|(_, u)| ids.contains(&u.id))
            .map(|(_, u)| u.clone())
            .collect())
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool and the static auth gateway.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        auth: Arc::new(StaticAuthGateway::default()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
