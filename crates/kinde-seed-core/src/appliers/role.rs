use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::{ResourceApplier, extract_id};
use crate::client::{ManagementApi, Method};
use crate::config::{PermissionSpec, RoleSpec};
use crate::outcome::{Outcome, ResourceKind, StepRecorder};

/// Three strictly ordered phases: create the role, create each permission,
/// link each created permission to the role.
pub struct RoleApplier;

#[async_trait]
impl ResourceApplier for RoleApplier {
    type Spec = RoleSpec;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Role
    }

    fn identity(&self, spec: &RoleSpec) -> String {
        spec.key.clone()
    }

    async fn apply(&self, api: &dyn ManagementApi, spec: &RoleSpec) -> Outcome {
        let mut recorder = StepRecorder::new(self.kind(), self.identity(spec));

        let Some(created) = recorder
            .attempt(
                "create role",
                api.call(
                    Method::POST,
                    "/roles",
                    Some(json!({ "key": spec.key, "name": spec.display_name() })),
                ),
            )
            .await
        else {
            return recorder.fail();
        };
        let Some(role_id) = extract_id(&created, "role") else {
            recorder.record("create role", "response carried no role id");
            return recorder.fail();
        };
        info!(role = %spec.key, role_id = %role_id, "created role");

        let mut created_permissions: Vec<(&PermissionSpec, String)> = Vec::new();
        for permission in &spec.permissions {
            let step = format!("create permission {}", permission.key);
            let Some(created) = recorder
                .attempt(
                    &step,
                    api.call(
                        Method::POST,
                        "/permissions",
                        Some(json!({
                            "key": permission.key,
                            "name": permission.display_name(),
                        })),
                    ),
                )
                .await
            else {
                continue;
            };
            match extract_id(&created, "permission") {
                Some(id) => created_permissions.push((permission, id)),
                None => recorder.record(&step, "response carried no permission id"),
            }
        }

        let link_path = format!("/roles/{role_id}/permissions");
        for (permission, permission_id) in created_permissions {
            recorder
                .attempt(
                    &format!("link permission {}", permission.key),
                    api.call(
                        Method::PATCH,
                        &link_path,
                        Some(json!({ "permissions": [{ "id": permission_id }] })),
                    ),
                )
                .await;
        }

        recorder.finish()
    }
}
