pub mod api;
pub mod application;
pub mod env_var;
pub mod feature_flag;
pub mod role;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::ManagementApi;
use crate::outcome::{Outcome, ResourceKind};

/// Realises one declared instance of a resource kind.
///
/// `apply` never fails: every remote error ends up in the returned
/// [`Outcome`], so one instance cannot abort its siblings.
#[async_trait]
pub trait ResourceApplier: Send + Sync {
    type Spec: Send + Sync;

    fn kind(&self) -> ResourceKind;

    fn identity(&self, spec: &Self::Spec) -> String;

    async fn apply(&self, api: &dyn ManagementApi, spec: &Self::Spec) -> Outcome;
}

/// Server id from `{"<wrapper>": {"id": ..}}`, falling back to a top-level `id`.
pub(crate) fn extract_id(value: &Value, wrapper: &str) -> Option<String> {
    value
        .get(wrapper)
        .and_then(|inner| inner.get("id"))
        .and_then(id_text)
        .or_else(|| value.get("id").and_then(id_text))
}

fn id_text(id: &Value) -> Option<String> {
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub use api::ApiApplier;
pub use application::ApplicationApplier;
pub use env_var::EnvVarApplier;
pub use feature_flag::FeatureFlagApplier;
pub use role::RoleApplier;
