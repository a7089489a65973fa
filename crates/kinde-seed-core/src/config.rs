//! Declarative seed document.
//!
//! The document is read once at start-up and never mutated. Every top-level
//! section is optional; an absent section means zero instances of that kind.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SeedError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationSpec>,
    #[serde(default)]
    pub env_vars: Vec<EnvVarSpec>,
    #[serde(default)]
    pub apis: Vec<ApiSpec>,
    #[serde(default)]
    pub feature_flags: Vec<FeatureFlagSpec>,
    #[serde(default)]
    pub roles: Vec<RoleSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub app_type: Option<String>,
    #[serde(default, alias = "redirectUrls")]
    pub redirect_uris: Vec<String>,
    #[serde(default, alias = "logoutUrls")]
    pub logout_uris: Vec<String>,
}

impl ApplicationSpec {
    pub fn identity(&self) -> &str {
        self.key
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.key.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVarSpec {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub sensitive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default)]
    pub scopes: Vec<ScopeSpec>,
}

impl ApiSpec {
    pub fn identity(&self) -> &str {
        self.key
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.key.as_deref())
            .unwrap_or_default()
    }
}

/// A scope may be declared as a bare string (`"read:users"`) or as an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScopeInput")]
pub struct ScopeSpec {
    pub key: String,
    pub description: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScopeInput {
    Key(String),
    Full {
        key: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl From<ScopeInput> for ScopeSpec {
    fn from(input: ScopeInput) -> Self {
        match input {
            ScopeInput::Key(key) => Self {
                description: key.clone(),
                key,
            },
            ScopeInput::Full { key, description } => Self {
                description: description.unwrap_or_else(|| key.clone()),
                key,
            },
        }
    }
}

/// Feature flag object, sent to the API exactly as declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureFlagSpec(pub Map<String, Value>);

impl FeatureFlagSpec {
    pub fn identity(&self) -> &str {
        ["key", "name"]
            .iter()
            .find_map(|field| self.0.get(*field).and_then(Value::as_str))
            .unwrap_or("<unnamed>")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub permissions: Vec<PermissionSpec>,
}

impl RoleSpec {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionSpec {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PermissionSpec {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }
}

impl SeedConfig {
    /// Load and validate a seed document. `.toml` files are parsed as TOML,
    /// anything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| SeedError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let config: Self = if is_toml {
            toml::from_str(&content).map_err(|e| SeedError::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(&content).map_err(|e| SeedError::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the identity fields every applier relies on.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if let Some(app) = &self.application
            && app.identity().is_empty()
        {
            problems.push("config.application.key or config.application.name is required".to_string());
        }

        for (i, var) in self.env_vars.iter().enumerate() {
            if var.key.trim().is_empty() {
                problems.push(format!("envVars[{i}].key is empty"));
            }
        }

        for (i, api) in self.apis.iter().enumerate() {
            if api.identity().is_empty() {
                problems.push(format!("apis[{i}] needs a key or name"));
            }
            for (j, scope) in api.scopes.iter().enumerate() {
                if scope.key.trim().is_empty() {
                    problems.push(format!("apis[{i}].scopes[{j}].key is empty"));
                }
            }
        }

        for (i, role) in self.roles.iter().enumerate() {
            if role.key.trim().is_empty() {
                problems.push(format!("roles[{i}].key is empty"));
            }
            for (j, perm) in role.permissions.iter().enumerate() {
                if perm.key.trim().is_empty() {
                    problems.push(format!("roles[{i}].permissions[{j}].key is empty"));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(SeedError::invalid_config(problems.join("; ")))
        }
    }

    /// Number of top-level resource instances declared.
    pub fn instance_count(&self) -> usize {
        usize::from(self.application.is_some())
            + self.env_vars.len()
            + self.apis.len()
            + self.feature_flags.len()
            + self.roles.len()
    }
}
