//! reflow CLI - Manufacturing Schedule Reflow Engine
//!
//! Command-line interface for loading schedule documents, reflowing work
//! orders, and validating schedules.

mod ingest;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reflow_core::{ReflowResult, Schedule, WorkOrder};
use reflow_engine::{reflow, validate_schedule};

#[derive(Parser)]
#[command(name = "reflow")]
#[command(author, version, about = "Manufacturing schedule reflow engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reflow a schedule document and print the result
    Reflow {
        /// Input file path (JSON document array)
        #[arg(value_name = "FILE")]
        file: std::path::PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },

    /// Validate the schedule exactly as stored, without moving anything
    Check {
        /// Input file path (JSON document array)
        #[arg(value_name = "FILE")]
        file: std::path::PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() -> Result<()> {
    // Initialize tracing; results go to stdout, logs to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Reflow {
            file,
            format,
            output,
        } => cmd_reflow(&file, &format, output.as_deref()),
        Commands::Check { file, format } => cmd_check(&file, &format),
    }
}

/// Run the engine and print its result.
///
/// The process exits 0 whenever the engine completes, whether or not the
/// run was `success`; only fatal engine errors exit non-zero.
fn cmd_reflow(file: &Path, format: &str, output: Option<&Path>) -> Result<()> {
    let (centers, orders) = ingest::load_documents(file)?;
    tracing::info!(
        centers = centers.len(),
        orders = orders.len(),
        "loaded schedule documents"
    );

    let result = reflow(&centers, &orders).context("reflow failed")?;

    let rendered = match format {
        "json" => serde_json::to_string_pretty(&result).context("serializing result")?,
        "text" => render_text(&result),
        other => bail!("unknown output format '{}' (expected text or json)", other),
    };

    write_output(&rendered, output)
}

/// Validate the stored placements without rescheduling anything.
///
/// Exits 0 when the schedule is valid, 1 when violations are found.
fn cmd_check(file: &Path, format: &str) -> Result<()> {
    let (centers, orders) = ingest::load_documents(file)?;

    let schedule = as_stored(&orders);
    let report = validate_schedule(&schedule, &centers);

    match format {
        "json" => {
            let body = serde_json::json!({
                "valid": report.valid,
                "errors": report.errors,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        "text" => {
            if report.valid {
                println!(
                    "Schedule is valid: {} work order(s) on {} work center(s)",
                    orders.len(),
                    centers.len()
                );
            } else {
                println!("Schedule has {} violation(s):", report.errors.len());
                for error in &report.errors {
                    println!("  - {}", error);
                }
            }
        }
        other => bail!("unknown output format '{}' (expected text or json)", other),
    }

    if !report.valid {
        std::process::exit(1);
    }
    Ok(())
}

/// Group the input orders by machine, keeping their stored times
fn as_stored(orders: &[WorkOrder]) -> Schedule {
    let mut schedule = Schedule::new();
    for order in orders {
        schedule.place(order.clone());
    }
    schedule
}

fn render_text(result: &ReflowResult) -> String {
    let mut out = String::new();
    out.push_str(if result.success {
        "Reflow succeeded\n"
    } else {
        "Reflow FAILED\n"
    });
    out.push_str(&format!("  {}\n", result.explanation));

    if !result.changes.is_empty() {
        out.push_str("\nChanges:\n");
        for change in &result.changes {
            out.push_str(&format!(
                "  {}: {} -> {} (delay {} min) - {}\n",
                change.work_order_number,
                change.old_start,
                change.new_start,
                change.delay_minutes,
                change.reason
            ));
        }
    }

    if !result.errors.is_empty() {
        out.push_str("\nErrors:\n");
        for error in &result.errors {
            out.push_str(&format!("  - {}\n", error));
        }
    }

    out
}

fn write_output(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{}", rendered),
    }
    Ok(())
}
