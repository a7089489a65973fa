use colored::Colorize;
use kinde_seed_core::{Outcome, OutcomeStatus, Plan, ReconciliationReport};
use serde_json::json;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "!".yellow(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_report(report: &ReconciliationReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let value = json!({
                "outcomes": report.outcomes,
                "summary": report.summary(),
            });
            println!("{}", to_pretty(&value));
        }
        OutputFormat::Table => {
            if report.outcomes.is_empty() {
                println!("Nothing declared.");
            } else {
                println!("{}", report_table(&sorted(report)));
            }
            print_summary(report);
        }
        OutputFormat::Text => {
            for outcome in sorted(report) {
                print_outcome(outcome);
            }
            print_summary(report);
        }
    }
}

fn print_outcome(outcome: &Outcome) {
    let label = outcome.label();
    match outcome.status {
        OutcomeStatus::Success => print_success(&label),
        OutcomeStatus::PartialFailure => {
            print_warning(&format!("{label} (partially applied)"));
            for error in &outcome.errors {
                println!("    {}", error.yellow());
            }
        }
        OutcomeStatus::Failure => {
            println!("{} {} (failed)", "✗".red(), label);
            for error in &outcome.errors {
                println!("    {}", error.red());
            }
        }
    }
}

fn print_summary(report: &ReconciliationReport) {
    let summary = report.summary();
    let line = format!(
        "{} resources: {} applied, {} partial, {} failed",
        summary.total, summary.succeeded, summary.partial, summary.failed
    );
    if report.is_clean() {
        println!("{}", line.green());
    } else {
        println!("{}", line.yellow());
    }
}

/// Outcomes complete in any order; sort for stable output.
fn sorted(report: &ReconciliationReport) -> Vec<&Outcome> {
    let mut outcomes: Vec<&Outcome> = report.outcomes.iter().collect();
    outcomes.sort_by(|a, b| (a.kind, &a.identity).cmp(&(b.kind, &b.identity)));
    outcomes
}

fn report_table(outcomes: &[&Outcome]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Kind", "Identity", "Status", "Errors"]);
    for outcome in outcomes {
        builder.push_record([
            outcome.kind.to_string(),
            outcome.identity.clone(),
            outcome.status.to_string(),
            outcome.errors.join("\n"),
        ]);
    }
    builder.build().with(Style::rounded()).to_string()
}

pub fn print_plan(plan: &Plan, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", to_pretty(&json!(plan))),
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(["Wave", "Kind", "Identity", "Steps"]);
            for (index, wave) in plan.waves.iter().enumerate() {
                for instance in &wave.instances {
                    let steps: Vec<&str> =
                        instance.steps.iter().map(|s| s.description.as_str()).collect();
                    builder.push_record([
                        index.to_string(),
                        instance.kind.to_string(),
                        instance.identity.clone(),
                        steps.join("\n"),
                    ]);
                }
            }
            println!("{}", builder.build().with(Style::rounded()).to_string());
        }
        OutputFormat::Text => {
            for (index, wave) in plan.waves.iter().enumerate() {
                let kinds: Vec<String> = wave.kinds.iter().map(ToString::to_string).collect();
                println!("{} {} ({})", "Wave".cyan(), index, kinds.join(", "));
                for instance in &wave.instances {
                    println!("  {}:{}", instance.kind, instance.identity.cyan());
                    for step in &instance.steps {
                        println!("    - {}", step.description);
                    }
                }
            }
        }
    }
    println!("{} resources planned, nothing sent (dry run)", plan.instance_count());
}

fn to_pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
