//! Per-instance reconciliation results and the recorder appliers use to
//! build them.

use std::fmt;
use std::future::Future;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Application,
    EnvironmentVariable,
    Api,
    FeatureFlag,
    Role,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        Self::Application,
        Self::EnvironmentVariable,
        Self::Api,
        Self::FeatureFlag,
        Self::Role,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::EnvironmentVariable => "env_var",
            Self::Api => "api",
            Self::FeatureFlag => "feature_flag",
            Self::Role => "role",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    PartialFailure,
    Failure,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::PartialFailure => write!(f, "partial_failure"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub kind: ResourceKind,
    pub identity: String,
    pub status: OutcomeStatus,
    pub errors: Vec<String>,
}

impl Outcome {
    /// `kind:identity`, e.g. `role:admin`
    pub fn label(&self) -> String {
        format!("{}:{}", self.kind, self.identity)
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Isolates every remote call of one resource instance and keeps the reason
/// of each failed step.
///
/// Appliers route all calls through [`StepRecorder::attempt`], so a failing
/// step becomes data instead of an early return, and finish with
/// [`StepRecorder::finish`] or [`StepRecorder::fail`].
#[derive(Debug)]
pub struct StepRecorder {
    kind: ResourceKind,
    identity: String,
    errors: Vec<String>,
}

impl StepRecorder {
    pub fn new(kind: ResourceKind, identity: impl Into<String>) -> Self {
        Self {
            kind,
            identity: identity.into(),
            errors: Vec::new(),
        }
    }

    /// Await one step; on failure log it, remember it and return `None`.
    pub async fn attempt<T, F>(&mut self, step: &str, call: F) -> Option<T>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        match call.await {
            Ok(value) => Some(value),
            Err(err) => {
                self.record(step, err.to_string());
                None
            }
        }
    }

    /// Remember a failed step that did not come from an API call.
    pub fn record(&mut self, step: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(
            kind = %self.kind,
            identity = %self.identity,
            step,
            error = %reason,
            "step failed"
        );
        self.errors.push(format!("{step}: {reason}"));
    }

    /// The parent resource exists; children decide between success and partial.
    pub fn finish(self) -> Outcome {
        let status = if self.errors.is_empty() {
            OutcomeStatus::Success
        } else {
            OutcomeStatus::PartialFailure
        };
        self.into_outcome(status)
    }

    /// The parent resource could not be created or resolved.
    pub fn fail(self) -> Outcome {
        self.into_outcome(OutcomeStatus::Failure)
    }

    fn into_outcome(self, status: OutcomeStatus) -> Outcome {
        match status {
            OutcomeStatus::Success => {
                info!(kind = %self.kind, identity = %self.identity, "applied")
            }
            OutcomeStatus::PartialFailure => warn!(
                kind = %self.kind,
                identity = %self.identity,
                failed_steps = self.errors.len(),
                "applied with errors"
            ),
            OutcomeStatus::Failure => {
                warn!(kind = %self.kind, identity = %self.identity, "not applied")
            }
        }
        Outcome {
            kind: self.kind,
            identity: self.identity,
            status,
            errors: self.errors,
        }
    }
}

/// Aggregated result of one run. Outcome order carries no meaning.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationReport {
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
}

impl ReconciliationReport {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self { outcomes }
    }

    pub fn summary(&self) -> ReportSummary {
        let count = |status| self.outcomes.iter().filter(|o| o.status == status).count();
        ReportSummary {
            total: self.outcomes.len(),
            succeeded: count(OutcomeStatus::Success),
            partial: count(OutcomeStatus::PartialFailure),
            failed: count(OutcomeStatus::Failure),
        }
    }

    /// True when every declared instance was fully applied.
    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(Outcome::is_success)
    }

    pub fn find(&self, kind: ResourceKind, identity: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.kind == kind && o.identity == identity)
    }
}
