use std::path::PathBuf;

use thiserror::Error;

use crate::outcome::ResourceKind;

/// Failure of a single management API call.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("{method} {path} -> {status}: {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[error("{method} {path} failed: {message}")]
    Transport {
        method: String,
        path: String,
        message: String,
    },

    #[error("{method} {path} returned invalid JSON: {message}")]
    Decode {
        method: String,
        path: String,
        message: String,
    },
}

impl ApiError {
    /// Create a new Status error
    pub fn status(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::Status {
            method: method.into(),
            path: path.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a new Transport error
    pub fn transport(
        method: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            method: method.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new Decode error
    pub fn decode(
        method: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Decode {
            method: method.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, if the server answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }

    /// Whether the server rejected the call because the resource already exists.
    ///
    /// The management API is not consistent here: some endpoints answer 409,
    /// others a 400 whose body mentions that the resource already exists.
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Status { status, body, .. } => {
                *status == 409 || body.to_ascii_lowercase().contains("already exists")
            }
            Self::Transport { .. } | Self::Decode { .. } => false,
        }
    }
}

/// Run-level errors. Everything here aborts the run.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Missing Kinde settings: {}", .0.join(", "))]
    MissingSettings(Vec<&'static str>),

    #[error("Invalid seed configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot read configuration {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse configuration {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Token error {status}: {body}")]
    TokenExchange { status: u16, body: String },

    #[error("Token request failed: {0}")]
    TokenTransport(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Dependency cycle between resource kinds: {}", join_kinds(.0))]
    DependencyCycle(Vec<ResourceKind>),
}

fn join_kinds(kinds: &[ResourceKind]) -> String {
    kinds
        .iter()
        .map(ResourceKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl SeedError {
    /// Create a new InvalidConfig error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether the credential exchange is what failed
    pub fn is_fatal_auth(&self) -> bool {
        matches!(self, Self::TokenExchange { .. } | Self::TokenTransport(_))
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingSettings(_)
            | Self::InvalidConfig(_)
            | Self::ConfigRead { .. }
            | Self::ConfigParse { .. } => ErrorCategory::Configuration,
            Self::TokenExchange { .. } | Self::TokenTransport(_) => ErrorCategory::Auth,
            Self::Client(_) | Self::DependencyCycle(_) => ErrorCategory::System,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Auth,
    System,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Auth => write!(f, "auth"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Convenience result type for run-level operations
pub type Result<T> = std::result::Result<T, SeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = ApiError::status("POST", "/roles", 400, "bad key");
        assert_eq!(err.to_string(), "POST /roles -> 400: bad key");
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn test_conflict_by_status() {
        assert!(ApiError::status("POST", "/applications", 409, "").is_conflict());
    }

    #[test]
    fn test_conflict_by_message() {
        let err = ApiError::status("POST", "/applications", 400, "Application Already Exists");
        assert!(err.is_conflict());
    }

    #[test]
    fn test_other_failures_are_not_conflicts() {
        assert!(!ApiError::status("POST", "/applications", 500, "boom").is_conflict());
        assert!(!ApiError::transport("POST", "/applications", "already exists").is_conflict());
        assert_eq!(ApiError::transport("GET", "/x", "refused").status_code(), None);
    }

    #[test]
    fn test_missing_settings_lists_every_name() {
        let err = SeedError::MissingSettings(vec!["KINDE_DOMAIN", "KINDE_AUDIENCE"]);
        assert_eq!(
            err.to_string(),
            "Missing Kinde settings: KINDE_DOMAIN, KINDE_AUDIENCE"
        );
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(!err.is_fatal_auth());
    }

    #[test]
    fn test_token_error_classification() {
        let err = SeedError::TokenExchange {
            status: 401,
            body: "invalid_client".into(),
        };
        assert_eq!(err.to_string(), "Token error 401: invalid_client");
        assert!(err.is_fatal_auth());
        assert_eq!(err.category(), ErrorCategory::Auth);
    }

    #[test]
    fn test_dependency_cycle_names_kinds() {
        let err = SeedError::DependencyCycle(vec![ResourceKind::Api, ResourceKind::Role]);
        assert_eq!(
            err.to_string(),
            "Dependency cycle between resource kinds: api, role"
        );
        assert_eq!(err.category(), ErrorCategory::System);
    }

    #[test]
    fn test_error_categories_display() {
        assert_eq!(ErrorCategory::Configuration.to_string(), "configuration");
        assert_eq!(ErrorCategory::Auth.to_string(), "auth");
        assert_eq!(ErrorCategory::System.to_string(), "system");
    }
}
