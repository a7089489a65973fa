use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::{ResourceApplier, extract_id};
use crate::client::{ManagementApi, Method};
use crate::config::ApplicationSpec;
use crate::error::ApiError;
use crate::outcome::{Outcome, ResourceKind, StepRecorder};

const CREATE_STEP: &str = "create application";
const LOOKUP_STEP: &str = "existence check";

/// Creates the application, or adopts an existing one, then attaches its
/// redirect and logout URIs.
pub struct ApplicationApplier;

#[async_trait]
impl ResourceApplier for ApplicationApplier {
    type Spec = ApplicationSpec;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Application
    }

    fn identity(&self, spec: &ApplicationSpec) -> String {
        spec.identity().to_string()
    }

    async fn apply(&self, api: &dyn ManagementApi, spec: &ApplicationSpec) -> Outcome {
        let mut recorder = StepRecorder::new(self.kind(), self.identity(spec));

        let app_id = match create(api, spec).await {
            Ok(id) => {
                info!(application = spec.identity(), id = ?id, "created application");
                id
            }
            Err(err) => {
                let resolution = resolve_existing(api, spec, &err).await;
                for (step, reason) in resolution.reasons {
                    recorder.record(step, reason);
                }
                match resolution.existing {
                    Some(id) => {
                        info!(application = spec.identity(), id = ?id, "application already exists");
                        id
                    }
                    None => return recorder.fail(),
                }
            }
        };

        let url_sets = [
            ("attach redirect URIs", "auth_redirect_urls", &spec.redirect_uris),
            ("attach logout URIs", "auth_logout_urls", &spec.logout_uris),
        ];

        match app_id {
            Some(id) => {
                for (step, endpoint, urls) in url_sets {
                    if urls.is_empty() {
                        continue;
                    }
                    // Each set is attached on its own; one rejection leaves the other alone.
                    recorder
                        .attempt(
                            step,
                            api.call(
                                Method::POST,
                                &format!("/applications/{id}/{endpoint}"),
                                Some(json!({ "urls": urls })),
                            ),
                        )
                        .await;
                }
            }
            None => {
                for (step, _, urls) in url_sets {
                    if !urls.is_empty() {
                        recorder.record(step, "application id unknown; URIs not attached");
                    }
                }
            }
        }

        recorder.finish()
    }
}

async fn create(api: &dyn ManagementApi, spec: &ApplicationSpec) -> Result<Option<String>, ApiError> {
    let mut body = json!({ "name": spec.display_name() });
    if let Some(key) = &spec.key {
        body["key"] = json!(key);
    }
    if let Some(app_type) = &spec.app_type {
        body["type"] = json!(app_type);
    }
    let created = api.call(Method::POST, "/applications", Some(body)).await?;
    Ok(extract_id(&created, "application"))
}

/// What a failed create left behind.
///
/// `existing` is `Some` when the application is known to exist, holding its
/// id if one could be read. `reasons` keeps every error met on the way, even
/// when the application turned out to exist.
struct Resolution {
    existing: Option<Option<String>>,
    reasons: Vec<(&'static str, String)>,
}

/// A conflict means the application exists even when the lookup fails or no
/// key allows one (the id is then unknown). Any other failure only counts as
/// existing when the lookup confirms it.
async fn resolve_existing(
    api: &dyn ManagementApi,
    spec: &ApplicationSpec,
    create_err: &ApiError,
) -> Resolution {
    let conflict = create_err.is_conflict();
    let mut reasons = Vec::new();
    if !conflict {
        reasons.push((CREATE_STEP, create_err.to_string()));
    }

    let Some(key) = spec.key.as_deref() else {
        return Resolution {
            existing: conflict.then_some(None),
            reasons,
        };
    };

    match api.call(Method::GET, &format!("/applications/{key}"), None).await {
        Ok(found) => Resolution {
            existing: Some(extract_id(&found, "application")),
            reasons,
        },
        Err(lookup_err) => {
            reasons.push((LOOKUP_STEP, lookup_err.to_string()));
            Resolution {
                existing: conflict.then_some(None),
                reasons,
            }
        }
    }
}
