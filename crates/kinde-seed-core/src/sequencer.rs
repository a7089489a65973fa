//! Ordering between resource kinds and between the steps of one instance.
//!
//! Kinds are layered into waves: every kind in a wave depends only on kinds
//! in earlier waves, so a whole wave may run concurrently. Inside one
//! instance, steps are grouped into phases that must run in order; steps of
//! the same phase are independent of each other.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::SeedConfig;
use crate::error::{Result, SeedError};
use crate::outcome::ResourceKind;

/// `(kind, depends_on)` edges. The management API has no cross-kind
/// prerequisites for anything this tool creates.
const KIND_DEPENDENCIES: &[(ResourceKind, ResourceKind)] = &[];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// The parent resource itself
    Create,
    /// Children that need the parent's id: URL sets, scopes, permissions
    Attach,
    /// Links that need both parent and child ids
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub phase: Phase,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedInstance {
    pub kind: ResourceKind,
    pub identity: String,
    pub steps: Vec<PlannedStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanWave {
    pub kinds: Vec<ResourceKind>,
    pub instances: Vec<PlannedInstance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub waves: Vec<PlanWave>,
}

impl Plan {
    pub fn instance_count(&self) -> usize {
        self.waves.iter().map(|w| w.instances.len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    edges: Vec<(ResourceKind, ResourceKind)>,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self {
            edges: KIND_DEPENDENCIES.to_vec(),
        }
    }
}

impl Sequencer {
    /// Build a sequencer from explicit edges, rejecting cycles.
    pub fn new(edges: Vec<(ResourceKind, ResourceKind)>) -> Result<Self> {
        let sequencer = Self { edges };
        sequencer.layer(&ResourceKind::ALL)?;
        Ok(sequencer)
    }

    pub fn depends_on(&self, kind: ResourceKind) -> Vec<ResourceKind> {
        self.edges
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, dep)| *dep)
            .collect()
    }

    /// Waves for the given kinds. A dependency on a kind that is not present
    /// is already satisfied.
    pub fn waves(&self, present: &[ResourceKind]) -> Vec<Vec<ResourceKind>> {
        // `new` rejected cycles over every kind, so any subset layers cleanly.
        self.layer(present).unwrap_or_else(|_| vec![present.to_vec()])
    }

    fn layer(&self, present: &[ResourceKind]) -> Result<Vec<Vec<ResourceKind>>> {
        let mut remaining: BTreeSet<ResourceKind> = present.iter().copied().collect();
        let mut placed: BTreeSet<ResourceKind> = BTreeSet::new();
        let mut waves = Vec::new();

        while !remaining.is_empty() {
            let ready: Vec<ResourceKind> = remaining
                .iter()
                .copied()
                .filter(|kind| {
                    self.depends_on(*kind)
                        .iter()
                        .all(|dep| placed.contains(dep) || !present.contains(dep))
                })
                .collect();

            if ready.is_empty() {
                return Err(SeedError::DependencyCycle(remaining.into_iter().collect()));
            }
            for kind in &ready {
                remaining.remove(kind);
                placed.insert(*kind);
            }
            waves.push(ready);
        }

        Ok(waves)
    }

    /// Everything a run would do, without touching the API.
    pub fn plan(&self, config: &SeedConfig) -> Plan {
        let waves = self
            .waves(&present_kinds(config))
            .into_iter()
            .map(|kinds| PlanWave {
                instances: kinds
                    .iter()
                    .flat_map(|kind| plan_kind(*kind, config))
                    .collect(),
                kinds,
            })
            .collect();
        Plan { waves }
    }
}

/// Kinds with at least one declared instance, in canonical order.
pub fn present_kinds(config: &SeedConfig) -> Vec<ResourceKind> {
    ResourceKind::ALL
        .into_iter()
        .filter(|kind| match kind {
            ResourceKind::Application => config.application.is_some(),
            ResourceKind::EnvironmentVariable => !config.env_vars.is_empty(),
            ResourceKind::Api => !config.apis.is_empty(),
            ResourceKind::FeatureFlag => !config.feature_flags.is_empty(),
            ResourceKind::Role => !config.roles.is_empty(),
        })
        .collect()
}

fn step(phase: Phase, description: impl Into<String>) -> PlannedStep {
    PlannedStep {
        phase,
        description: description.into(),
    }
}

fn plan_kind(kind: ResourceKind, config: &SeedConfig) -> Vec<PlannedInstance> {
    match kind {
        ResourceKind::Application => config
            .application
            .iter()
            .map(|app| {
                let mut steps = vec![step(Phase::Create, "create application")];
                if !app.redirect_uris.is_empty() {
                    steps.push(step(
                        Phase::Attach,
                        format!("attach {} redirect URIs", app.redirect_uris.len()),
                    ));
                }
                if !app.logout_uris.is_empty() {
                    steps.push(step(
                        Phase::Attach,
                        format!("attach {} logout URIs", app.logout_uris.len()),
                    ));
                }
                PlannedInstance {
                    kind,
                    identity: app.identity().to_string(),
                    steps,
                }
            })
            .collect(),
        ResourceKind::EnvironmentVariable => config
            .env_vars
            .iter()
            .map(|var| PlannedInstance {
                kind,
                identity: var.key.clone(),
                steps: vec![step(
                    Phase::Create,
                    if var.sensitive {
                        "create environment variable (secret)"
                    } else {
                        "create environment variable"
                    },
                )],
            })
            .collect(),
        ResourceKind::Api => config
            .apis
            .iter()
            .map(|api| {
                let mut steps = vec![step(Phase::Create, "create api")];
                steps.extend(
                    api.scopes
                        .iter()
                        .map(|s| step(Phase::Attach, format!("create scope {}", s.key))),
                );
                PlannedInstance {
                    kind,
                    identity: api.identity().to_string(),
                    steps,
                }
            })
            .collect(),
        ResourceKind::FeatureFlag => config
            .feature_flags
            .iter()
            .map(|flag| PlannedInstance {
                kind,
                identity: flag.identity().to_string(),
                steps: vec![step(Phase::Create, "create feature flag")],
            })
            .collect(),
        ResourceKind::Role => config
            .roles
            .iter()
            .map(|role| {
                let mut steps = vec![step(Phase::Create, "create role")];
                steps.extend(
                    role.permissions
                        .iter()
                        .map(|p| step(Phase::Attach, format!("create permission {}", p.key))),
                );
                steps.extend(
                    role.permissions
                        .iter()
                        .map(|p| step(Phase::Link, format!("link permission {}", p.key))),
                );
                PlannedInstance {
                    kind,
                    identity: role.key.clone(),
                    steps,
                }
            })
            .collect(),
    }
}
