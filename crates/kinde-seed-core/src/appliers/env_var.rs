use async_trait::async_trait;
use serde_json::json;

use super::ResourceApplier;
use crate::client::{ManagementApi, Method};
use crate::config::EnvVarSpec;
use crate::outcome::{Outcome, ResourceKind, StepRecorder};

pub struct EnvVarApplier;

#[async_trait]
impl ResourceApplier for EnvVarApplier {
    type Spec = EnvVarSpec;

    fn kind(&self) -> ResourceKind {
        ResourceKind::EnvironmentVariable
    }

    fn identity(&self, spec: &EnvVarSpec) -> String {
        spec.key.clone()
    }

    async fn apply(&self, api: &dyn ManagementApi, spec: &EnvVarSpec) -> Outcome {
        let mut recorder = StepRecorder::new(self.kind(), self.identity(spec));
        let body = json!({
            "key": spec.key,
            "value": spec.value,
            "is_secret": spec.sensitive,
        });

        match recorder
            .attempt(
                "create environment variable",
                api.call(Method::POST, "/environment_variables", Some(body)),
            )
            .await
        {
            Some(_) => recorder.finish(),
            None => recorder.fail(),
        }
    }
}
