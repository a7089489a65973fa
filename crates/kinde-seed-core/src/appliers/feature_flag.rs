use async_trait::async_trait;
use serde_json::Value;

use super::ResourceApplier;
use crate::client::{ManagementApi, Method};
use crate::config::FeatureFlagSpec;
use crate::outcome::{Outcome, ResourceKind, StepRecorder};

/// Posts the declared flag object untouched.
pub struct FeatureFlagApplier;

#[async_trait]
impl ResourceApplier for FeatureFlagApplier {
    type Spec = FeatureFlagSpec;

    fn kind(&self) -> ResourceKind {
        ResourceKind::FeatureFlag
    }

    fn identity(&self, spec: &FeatureFlagSpec) -> String {
        spec.identity().to_string()
    }

    async fn apply(&self, api: &dyn ManagementApi, spec: &FeatureFlagSpec) -> Outcome {
        let mut recorder = StepRecorder::new(self.kind(), self.identity(spec));
        let body = Value::Object(spec.0.clone());

        match recorder
            .attempt(
                "create feature flag",
                api.call(Method::POST, "/feature_flags", Some(body)),
            )
            .await
        {
            Some(_) => recorder.finish(),
            None => recorder.fail(),
        }
    }
}
