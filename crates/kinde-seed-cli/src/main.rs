mod cli;
mod observability;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use kinde_seed_core::{
    ErrorCategory, ReconciliationContext, ReconciliationReport, SeedConfig, SeedError, Sequencer,
};
use tracing::{error, info};

use cli::Cli;
use output::{print_error, print_plan, print_report};

/// Exit status for settings, config and token failures.
const EXIT_FATAL: i32 = 1;
/// Exit status for a run that completed but left resources unapplied.
const EXIT_RESOURCE_FAILURES: i32 = 2;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real environments set variables directly.
    let _ = dotenvy::dotenv();

    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            match error_category(&e) {
                Some(category) => error!(%category, "run aborted"),
                None => error!("run aborted"),
            }
            print_error(&format!("{e:#}"));
            std::process::exit(EXIT_FATAL);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    observability::init_tracing_with_level(&cli.log_level);

    let settings = cli.settings();
    // Settings are checked before the document so that a misconfigured
    // pipeline fails the same way regardless of which file it points at.
    let creds = settings.credentials()?;
    let config = SeedConfig::load(&cli.config)
        .with_context(|| format!("Failed to load seed config {}", cli.config.display()))?;
    info!(
        config = %cli.config.display(),
        origin = creds.origin(),
        instances = config.instance_count(),
        "loaded seed config"
    );

    if cli.dry_run {
        print_plan(&Sequencer::default().plan(&config), cli.format);
        return Ok(0);
    }

    let context = ReconciliationContext::connect(&settings)
        .await
        .context("Cannot obtain a Kinde management API token")?;
    let report = context.reconcile(&config).await;
    print_report(&report, cli.format);

    Ok(exit_code(&report, cli.fail_on_error))
}

/// Resource failures only change the exit status when asked to.
fn exit_code(report: &ReconciliationReport, fail_on_error: bool) -> i32 {
    if fail_on_error && !report.is_clean() {
        EXIT_RESOURCE_FAILURES
    } else {
        0
    }
}

fn error_category(err: &anyhow::Error) -> Option<ErrorCategory> {
    err.downcast_ref::<SeedError>().map(SeedError::category)
}
