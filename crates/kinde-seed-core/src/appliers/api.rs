use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::{ResourceApplier, extract_id};
use crate::client::{ManagementApi, Method};
use crate::config::ApiSpec;
use crate::outcome::{Outcome, ResourceKind, StepRecorder};

/// Creates the API resource, then each of its scopes.
pub struct ApiApplier;

#[async_trait]
impl ResourceApplier for ApiApplier {
    type Spec = ApiSpec;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Api
    }

    fn identity(&self, spec: &ApiSpec) -> String {
        spec.identity().to_string()
    }

    async fn apply(&self, api: &dyn ManagementApi, spec: &ApiSpec) -> Outcome {
        let mut recorder = StepRecorder::new(self.kind(), self.identity(spec));

        let mut body = json!({ "name": spec.display_name() });
        if let Some(key) = &spec.key {
            body["key"] = json!(key);
        }
        if let Some(audience) = &spec.audience {
            body["audience"] = json!(audience);
        }

        let Some(created) = recorder
            .attempt("create api", api.call(Method::POST, "/apis", Some(body)))
            .await
        else {
            // Scopes have no parent to hang off.
            return recorder.fail();
        };

        // Scopes are addressed by the server id when we got one, otherwise by key.
        let api_ref = extract_id(&created, "api").unwrap_or_else(|| spec.identity().to_string());
        info!(api = spec.identity(), api_ref = %api_ref, "created api");

        let scopes_path = format!("/apis/{api_ref}/scopes");
        for scope in &spec.scopes {
            recorder
                .attempt(
                    &format!("create scope {}", scope.key),
                    api.call(
                        Method::POST,
                        &scopes_path,
                        Some(json!({ "key": scope.key, "description": scope.description })),
                    ),
                )
                .await;
        }

        recorder.finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::config::ScopeSpec;
    use crate::outcome::OutcomeStatus;
    use crate::testing::ScriptedApi;

    fn spec(scopes: &[&str]) -> ApiSpec {
        ApiSpec {
            key: Some("orders".into()),
            name: Some("Orders API".into()),
            audience: Some("https://orders.example.com".into()),
            scopes: scopes
                .iter()
                .map(|s| ScopeSpec {
                    key: s.to_string(),
                    description: format!("{s} access"),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_scopes_follow_api_create() {
        let api = ScriptedApi::new();
        let outcome = ApiApplier.apply(&api, &spec(&["read:orders", "write:orders"])).await;

        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(
            api.paths(),
            vec![
                "POST /apis",
                "POST /apis/api_orders/scopes",
                "POST /apis/api_orders/scopes",
            ]
        );
        let calls = api.calls();
        assert_eq!(
            calls[0].body,
            Some(json!({
                "name": "Orders API",
                "key": "orders",
                "audience": "https://orders.example.com"
            }))
        );
        assert_eq!(
            calls[2].body,
            Some(json!({ "key": "write:orders", "description": "write:orders access" }))
        );
    }

    #[tokio::test]
    async fn test_failed_api_skips_scopes() {
        let api = ScriptedApi::new().fail(Method::POST, "/apis", 403, "forbidden");
        let outcome = ApiApplier.apply(&api, &spec(&["read:orders"])).await;

        assert_eq!(outcome.status, OutcomeStatus::Failure);
        assert_eq!(api.paths(), vec!["POST /apis"]);
    }

    #[tokio::test]
    async fn test_scope_failures_are_partial() {
        let api = ScriptedApi::new()
            .reply(Method::POST, "/apis", json!({ "api": { "id": "api_x" } }))
            .fail(Method::POST, "/apis/api_x/scopes", 400, "invalid scope");
        let outcome = ApiApplier.apply(&api, &spec(&["read:orders", "bad scope"])).await;

        // The first rejection does not stop the second scope from being tried.
        assert_eq!(outcome.status, OutcomeStatus::PartialFailure);
        assert_eq!(api.paths().len(), 3);
        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome.errors[0].starts_with("create scope read:orders"));
        assert!(outcome.errors[1].starts_with("create scope bad scope"));
    }

    #[tokio::test]
    async fn test_missing_id_falls_back_to_key() {
        let api = ScriptedApi::new().reply(Method::POST, "/apis", Value::Null);
        let outcome = ApiApplier.apply(&api, &spec(&["read:orders"])).await;

        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(api.position("POST /apis/orders/scopes"), Some(1));
    }
}
