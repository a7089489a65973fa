use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use kinde_seed_core::SeedSettings;

#[derive(Parser)]
#[command(name = "kinde-seed")]
#[command(about = "Seed a Kinde environment from a declarative config document")]
#[command(version)]
pub struct Cli {
    /// Path to the seed document (JSON, or TOML by extension)
    #[arg(short, long, env = "CONFIG_PATH", default_value = "./config/app.json")]
    pub config: PathBuf,

    /// Kinde domain, e.g. acme.kinde.com
    #[arg(long, env = "KINDE_DOMAIN")]
    pub domain: Option<String>,

    /// M2M application client ID
    #[arg(long, env = "KINDE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// M2M application client secret
    #[arg(long, env = "KINDE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Management API audience
    #[arg(long, env = "KINDE_AUDIENCE")]
    pub audience: Option<String>,

    /// Space separated scopes requested with the token
    #[arg(long, env = "KINDE_SCOPES")]
    pub scopes: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Print the plan without calling the API
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with status 2 when any resource was not fully applied
    #[arg(long)]
    pub fail_on_error: bool,

    /// Report format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Table,
}

impl Cli {
    pub fn settings(&self) -> SeedSettings {
        SeedSettings {
            domain: self.domain.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            audience: self.audience.clone(),
            scopes: self.scopes.clone(),
            timeout: Some(Duration::from_secs(self.timeout_secs)),
        }
    }
}
