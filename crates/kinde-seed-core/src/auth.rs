use std::fmt;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, SeedError};
use crate::settings::Credentials;

/// Bearer token for the management API. Never printed.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// OAuth2 client-credentials exchange against `<origin>/oauth2/token`.
pub async fn exchange_client_credentials(
    http: &reqwest::Client,
    creds: &Credentials,
) -> Result<AccessToken> {
    let url = creds.token_url();
    debug!(%url, client_id = %creds.client_id, "requesting access token");

    let resp = http
        .post(&url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(token_request_body(creds))
        .send()
        .await
        .map_err(|e| SeedError::TokenTransport(e.to_string()))?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(SeedError::TokenExchange { status, body });
    }

    let token: TokenResponse = resp
        .json()
        .await
        .map_err(|e| SeedError::TokenTransport(format!("Failed to parse token response: {e}")))?;

    info!(audience = %creds.audience, "obtained management API token");
    Ok(AccessToken(token.access_token))
}

fn token_request_body(creds: &Credentials) -> String {
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    form.append_pair("grant_type", "client_credentials")
        .append_pair("client_id", &creds.client_id)
        .append_pair("client_secret", &creds.client_secret)
        .append_pair("audience", &creds.audience);
    if !creds.scopes.is_empty() {
        form.append_pair("scope", &creds.scopes);
    }
    form.finish()
}
