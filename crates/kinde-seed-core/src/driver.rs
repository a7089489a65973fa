use std::time::Instant;

use futures_util::future::{BoxFuture, join_all};
use tracing::{info, warn};

use crate::appliers::{
    ApiApplier, ApplicationApplier, EnvVarApplier, FeatureFlagApplier, ResourceApplier,
    RoleApplier,
};
use crate::auth::exchange_client_credentials;
use crate::client::{KindeClient, ManagementApi, build_http_client};
use crate::config::SeedConfig;
use crate::error::Result;
use crate::outcome::{Outcome, ReconciliationReport, ResourceKind};
use crate::sequencer::{Sequencer, present_kinds};
use crate::settings::SeedSettings;

/// Everything a run needs, built once and shared read-only by every applier.
pub struct ReconciliationContext {
    api: Box<dyn ManagementApi>,
    sequencer: Sequencer,
}

impl ReconciliationContext {
    pub fn new(api: impl ManagementApi + 'static) -> Self {
        Self {
            api: Box::new(api),
            sequencer: Sequencer::default(),
        }
    }

    pub fn with_sequencer(mut self, sequencer: Sequencer) -> Self {
        self.sequencer = sequencer;
        self
    }

    /// Validate settings, exchange credentials and bind a client to the token.
    ///
    /// Nothing is sent before the settings check passes, and no management
    /// call can happen without a token.
    pub async fn connect(settings: &SeedSettings) -> Result<Self> {
        let creds = settings.credentials()?;
        let http = build_http_client(creds.timeout)?;
        let token = exchange_client_credentials(&http, &creds).await?;
        Ok(Self::new(KindeClient::new(http, &creds.api_base(), token)))
    }

    pub fn api(&self) -> &dyn ManagementApi {
        self.api.as_ref()
    }

    /// Apply every declared instance and collect one outcome per instance.
    ///
    /// Kinds in the same wave, and all instances within them, run
    /// concurrently. Every task runs to completion; the report never depends
    /// on how many outcomes failed.
    pub async fn reconcile(&self, config: &SeedConfig) -> ReconciliationReport {
        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(config.instance_count());

        for (index, wave) in self
            .sequencer
            .waves(&present_kinds(config))
            .into_iter()
            .enumerate()
        {
            let tasks: Vec<BoxFuture<'_, Outcome>> = wave
                .iter()
                .flat_map(|kind| self.instance_tasks(*kind, config))
                .collect();
            info!(wave = index, kinds = ?wave, instances = tasks.len(), "applying wave");
            outcomes.extend(join_all(tasks).await);
        }

        let report = ReconciliationReport::new(outcomes);
        let summary = report.summary();
        if report.is_clean() {
            info!(
                total = summary.total,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "reconciliation complete"
            );
        } else {
            warn!(
                total = summary.total,
                succeeded = summary.succeeded,
                partial = summary.partial,
                failed = summary.failed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "reconciliation complete with errors"
            );
        }
        report
    }

    fn instance_tasks<'a>(
        &'a self,
        kind: ResourceKind,
        config: &'a SeedConfig,
    ) -> Vec<BoxFuture<'a, Outcome>> {
        let api = self.api();
        match kind {
            ResourceKind::Application => fan_out(&ApplicationApplier, api, &config.application),
            ResourceKind::EnvironmentVariable => fan_out(&EnvVarApplier, api, &config.env_vars),
            ResourceKind::Api => fan_out(&ApiApplier, api, &config.apis),
            ResourceKind::FeatureFlag => fan_out(&FeatureFlagApplier, api, &config.feature_flags),
            ResourceKind::Role => fan_out(&RoleApplier, api, &config.roles),
        }
    }
}

/// One future per declared instance of a kind.
fn fan_out<'a, A, I>(
    applier: &'a A,
    api: &'a dyn ManagementApi,
    specs: I,
) -> Vec<BoxFuture<'a, Outcome>>
where
    A: ResourceApplier,
    A::Spec: 'a,
    I: IntoIterator<Item = &'a A::Spec>,
{
    specs
        .into_iter()
        .map(|spec| applier.apply(api, spec))
        .collect()
}

/// Connect and reconcile in one go: the whole run for one environment.
pub async fn seed(settings: &SeedSettings, config: &SeedConfig) -> Result<ReconciliationReport> {
    config.validate()?;
    let context = ReconciliationContext::connect(settings).await?;
    Ok(context.reconcile(config).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::client::Method;
    use crate::outcome::OutcomeStatus;
    use crate::testing::ScriptedApi;

    fn config(value: serde_json::Value) -> SeedConfig {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let context = ReconciliationContext::new(ScriptedApi::new());
        let report = context
            .reconcile(&config(json!({
                "application": { "key": "app1", "redirectUris": ["https://x/cb"] },
                "roles": [{
                    "key": "admin",
                    "name": "Admin",
                    "permissions": [{ "key": "read", "name": "Read" }]
                }]
            })))
            .await;

        assert_eq!(report.outcomes.len(), 2);
        assert!(report.is_clean());
        let labels: Vec<_> = report.outcomes.iter().map(Outcome::label).collect();
        assert!(labels.contains(&"application:app1".to_string()));
        assert!(labels.contains(&"role:admin".to_string()));
    }

    #[tokio::test]
    async fn test_empty_config_makes_no_calls() {
        let api = Arc::new(ScriptedApi::new());
        let context = ReconciliationContext::new(Arc::clone(&api));
        let report = context.reconcile(&SeedConfig::default()).await;

        assert!(report.outcomes.is_empty());
        assert!(report.is_clean());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_absent_kinds_are_never_applied() {
        let context = ReconciliationContext::new(ScriptedApi::new());
        let report = context
            .reconcile(&config(json!({
                "envVars": [{ "key": "A", "value": "1" }, { "key": "B", "value": "2" }]
            })))
            .await;

        assert_eq!(report.outcomes.len(), 2);
        assert!(
            report
                .outcomes
                .iter()
                .all(|o| o.kind == ResourceKind::EnvironmentVariable)
        );
    }

    #[tokio::test]
    async fn test_one_role_failure_does_not_touch_another() {
        let api = ScriptedApi::new().fail(Method::PATCH, "/roles/rol_a/permissions", 500, "boom");
        let context = ReconciliationContext::new(api);
        let report = context
            .reconcile(&config(json!({
                "roles": [
                    { "key": "a", "permissions": [{ "key": "p1" }] },
                    { "key": "b", "permissions": [{ "key": "p2" }] }
                ]
            })))
            .await;

        assert_eq!(
            report.find(ResourceKind::Role, "a").map(|o| o.status),
            Some(OutcomeStatus::PartialFailure)
        );
        let b = report.find(ResourceKind::Role, "b").unwrap();
        assert_eq!(b.status, OutcomeStatus::Success);
        assert!(b.errors.is_empty());
    }

    #[tokio::test]
    async fn test_failures_in_every_kind_still_complete() {
        let api = ScriptedApi::new()
            .fail(Method::POST, "/applications", 400, "bad")
            .fail(Method::GET, "/applications/app1", 404, "")
            .fail(Method::POST, "/environment_variables", 500, "")
            .fail(Method::POST, "/apis", 500, "")
            .fail(Method::POST, "/feature_flags", 500, "")
            .fail(Method::POST, "/roles", 500, "");
        let context = ReconciliationContext::new(api);
        let report = context
            .reconcile(&config(json!({
                "application": { "key": "app1" },
                "envVars": [{ "key": "A", "value": "1" }],
                "apis": [{ "key": "orders" }],
                "featureFlags": [{ "key": "beta" }],
                "roles": [{ "key": "admin" }]
            })))
            .await;

        let summary = report.summary();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.failed, 5);
    }

    #[tokio::test]
    async fn test_parent_precedes_children_under_concurrency() {
        let api = Arc::new(ScriptedApi::new());
        let context = ReconciliationContext::new(Arc::clone(&api));
        let report = context
            .reconcile(&config(json!({
                "apis": [
                    { "key": "orders", "scopes": ["read", "write"] },
                    { "key": "billing", "scopes": ["read"] }
                ],
                "roles": [
                    { "key": "a", "permissions": [{ "key": "p1" }, { "key": "p2" }] },
                    { "key": "b", "permissions": [{ "key": "p3" }] }
                ]
            })))
            .await;
        assert!(report.is_clean());

        let calls = api.calls();
        let index_of = |method: &Method, path: &str, key: &str| {
            calls
                .iter()
                .position(|c| {
                    c.method == *method
                        && c.path == path
                        && c.body.as_ref().and_then(|b| b.get("key")) == Some(&json!(key))
                })
                .unwrap()
        };
        let last_index = |method: &Method, path: &str| {
            calls
                .iter()
                .rposition(|c| c.method == *method && c.path == path)
                .unwrap()
        };
        let first_index = |method: &Method, path: &str| {
            calls
                .iter()
                .position(|c| c.method == *method && c.path == path)
                .unwrap()
        };

        for key in ["orders", "billing"] {
            let created = index_of(&Method::POST, "/apis", key);
            let scopes = format!("/apis/api_{key}/scopes");
            assert!(created < first_index(&Method::POST, &scopes));
        }
        for (key, permissions) in [("a", vec!["p1", "p2"]), ("b", vec!["p3"])] {
            let created = index_of(&Method::POST, "/roles", key);
            let links = format!("/roles/rol_{key}/permissions");
            assert!(created < first_index(&Method::PATCH, &links));
            for permission in permissions {
                let permission_created = index_of(&Method::POST, "/permissions", permission);
                assert!(permission_created < last_index(&Method::PATCH, &links));
            }
        }
    }

    #[tokio::test]
    async fn test_waves_run_in_order() {
        let api = Arc::new(ScriptedApi::new());
        let sequencer = Sequencer::new(vec![(ResourceKind::Role, ResourceKind::Api)]).unwrap();
        let context = ReconciliationContext::new(Arc::clone(&api)).with_sequencer(sequencer);
        let report = context
            .reconcile(&config(json!({
                "apis": [{ "key": "orders", "scopes": ["read", "write"] }],
                "roles": [{ "key": "admin" }]
            })))
            .await;

        assert!(report.is_clean());
        assert_eq!(
            api.paths(),
            vec![
                "POST /apis",
                "POST /apis/api_orders/scopes",
                "POST /apis/api_orders/scopes",
                "POST /roles",
            ]
        );
    }
}
