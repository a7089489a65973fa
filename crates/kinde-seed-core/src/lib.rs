//! Provisions a Kinde tenant (applications, environment variables, APIs and
//! scopes, feature flags, roles and permissions) from one declarative document.
//!
//! A run validates its settings, exchanges client credentials for a bearer
//! token once, then hands every declared instance to the applier for its
//! kind. Appliers never fail the run: each one reports an [`Outcome`], and
//! the [`ReconciliationReport`] collects them.

pub mod appliers;
pub mod auth;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod outcome;
pub mod sequencer;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AccessToken, exchange_client_credentials};
pub use client::{KindeClient, ManagementApi, Method, build_http_client};
pub use config::{
    ApiSpec, ApplicationSpec, EnvVarSpec, FeatureFlagSpec, PermissionSpec, RoleSpec, ScopeSpec,
    SeedConfig,
};
pub use driver::{ReconciliationContext, seed};
pub use error::{ApiError, ErrorCategory, Result, SeedError};
pub use outcome::{
    Outcome, OutcomeStatus, ReconciliationReport, ReportSummary, ResourceKind, StepRecorder,
};
pub use sequencer::{Phase, Plan, PlanWave, PlannedInstance, PlannedStep, Sequencer};
pub use settings::{Credentials, SeedSettings};
