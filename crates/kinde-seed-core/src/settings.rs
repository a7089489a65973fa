use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::{Result, SeedError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw connection settings as gathered from flags and environment.
#[derive(Clone, Default)]
pub struct SeedSettings {
    pub domain: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub audience: Option<String>,
    /// Space separated scopes requested during the token exchange
    pub scopes: Option<String>,
    pub timeout: Option<Duration>,
}

impl fmt::Debug for SeedSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedSettings")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("audience", &self.audience)
            .field("scopes", &self.scopes)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SeedSettings {
    /// Validate the settings, naming every missing value at once.
    pub fn credentials(&self) -> Result<Credentials> {
        let required = [
            ("KINDE_DOMAIN", &self.domain),
            ("KINDE_CLIENT_ID", &self.client_id),
            ("KINDE_CLIENT_SECRET", &self.client_secret),
            ("KINDE_AUDIENCE", &self.audience),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(SeedError::MissingSettings(missing));
        }

        // Presence of every value is checked above.
        let get = |value: &Option<String>| value.as_deref().unwrap_or_default().trim().to_string();

        Ok(Credentials {
            origin: parse_origin(&get(&self.domain))?,
            client_id: get(&self.client_id),
            client_secret: get(&self.client_secret),
            audience: get(&self.audience),
            scopes: self
                .scopes
                .as_deref()
                .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
                .unwrap_or_default(),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}

/// Validated credentials for one target environment.
#[derive(Clone)]
pub struct Credentials {
    origin: Url,
    pub client_id: String,
    pub client_secret: String,
    pub audience: String,
    pub scopes: String,
    pub timeout: Duration,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("origin", &self.origin.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("audience", &self.audience)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl Credentials {
    pub fn origin(&self) -> &str {
        self.origin.as_str().trim_end_matches('/')
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.origin())
    }

    /// Base of every management API path
    pub fn api_base(&self) -> String {
        format!("{}/api/v1", self.origin())
    }
}

/// A bare host gets `https://`; an explicit scheme is kept as-is.
fn parse_origin(domain: &str) -> Result<Url> {
    let candidate = if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    };
    let url = Url::parse(&candidate)
        .map_err(|e| SeedError::invalid_config(format!("KINDE_DOMAIN {domain:?}: {e}")))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(SeedError::invalid_config(format!(
            "KINDE_DOMAIN {domain:?} has no host"
        )));
    }
    Ok(url)
}
