use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
pub use reqwest::Method;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::auth::AccessToken;
use crate::error::{ApiError, SeedError};

/// The single primitive every applier talks to.
///
/// Success yields the decoded JSON body, or `Value::Null` for `204` and empty
/// bodies. Any non-2xx status becomes [`ApiError::Status`].
#[async_trait]
pub trait ManagementApi: Send + Sync {
    async fn call(&self, method: Method, path: &str, body: Option<Value>)
    -> Result<Value, ApiError>;
}

#[async_trait]
impl<T: ManagementApi + ?Sized> ManagementApi for Arc<T> {
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        (**self).call(method, path, body).await
    }
}

/// Management API client bound to one bearer token for its whole lifetime.
pub struct KindeClient {
    http: reqwest::Client,
    base_url: String,
    token: AccessToken,
}

impl KindeClient {
    pub fn new(http: reqwest::Client, base_url: &str, token: AccessToken) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl ManagementApi for KindeClient {
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(%method, path, "management API call");

        let mut req = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(self.token.secret())
            .header("Accept", "application/json");
        if let Some(body) = &body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::transport(method.as_str(), path, e.to_string()))?;
        handle_response(&method, path, resp).await
    }
}

async fn handle_response(
    method: &Method,
    path: &str,
    resp: reqwest::Response,
) -> Result<Value, ApiError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| ApiError::transport(method.as_str(), path, e.to_string()))?;

    if !status.is_success() {
        return Err(ApiError::status(method.as_str(), path, status.as_u16(), body));
    }

    if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| ApiError::decode(method.as_str(), path, e.to_string()))
}

/// Shared HTTP transport for the token exchange and the management client.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, SeedError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("kinde-seed/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SeedError::Client(e.to_string()))
}
