//! curfew - sweeps idle AWS resources
//!
//! Inventories compute, storage, and network resources across regions and
//! stops, scales down, or deletes the ones that have been running longer
//! than the configured age, subject to protection rules, cost approval, and
//! schedule windows.

use anyhow::Result;
use clap::{Parser, Subcommand};
use curfew_sweeper::config::{self, RegionSelection, RunConfig};
use curfew_sweeper::metrics::MetricsPublisher;
use curfew_sweeper::notify::{self, Notifier};
use curfew_sweeper::{orchestrator, report};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "curfew")]
#[command(about = "Sweeps idle AWS resources: stop, scale down, or delete by age")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "CURFEW_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

/// Arguments for the sweep command
#[derive(clap::Args, Debug)]
struct SweepArgs {
    /// Resources at least this many days old are eligible
    #[arg(long, default_value = "3", env = "CURFEW_MAX_AGE_DAYS")]
    max_age_days: u32,

    /// Comma-separated regions to sweep, or "all" to discover
    #[arg(long, default_value = "all", env = "CURFEW_REGIONS")]
    regions: String,

    /// Region used for discovery, notification, and metrics
    #[arg(long, default_value = "us-east-1", env = "CURFEW_HOME_REGION")]
    home_region: String,

    /// Maximum regions processed concurrently
    #[arg(long, default_value = "4")]
    max_concurrent_regions: usize,

    /// Actually apply actions (default is dry-run)
    #[arg(long)]
    execute: bool,

    /// Policy file with protection rules, thresholds, and windows
    #[arg(long, env = "CURFEW_POLICY_FILE")]
    policy: Option<PathBuf>,

    /// SNS topic for the run report
    #[arg(long, env = "CURFEW_SNS_TOPIC_ARN")]
    sns_topic_arn: Option<String>,

    /// Send the report even when nothing was processed
    #[arg(long)]
    always_notify: bool,

    /// Skip publishing run metrics to CloudWatch
    #[arg(long)]
    no_metrics: bool,

    /// Act on requires-approval resources without manual approval
    #[arg(long)]
    override_approval: bool,
}

#[derive(clap::Args, Debug)]
struct ReportArgs {
    /// Comma-separated regions to inventory, or "all" to discover
    #[arg(long, default_value = "all", env = "CURFEW_REGIONS")]
    regions: String,

    /// Region used for discovery
    #[arg(long, default_value = "us-east-1", env = "CURFEW_HOME_REGION")]
    home_region: String,

    /// Age threshold used to flag resources
    #[arg(long, default_value = "3", env = "CURFEW_MAX_AGE_DAYS")]
    max_age_days: u32,

    /// Policy file (for cost table overrides)
    #[arg(long, env = "CURFEW_POLICY_FILE")]
    policy: Option<PathBuf>,

    /// Write the full report as JSON to this file
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inventory, decide, and apply deactivation actions
    Sweep(SweepArgs),

    /// Inventory resources with ages and estimated costs, without acting
    Report(ReportArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error and its cause chain to stderr
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins when set; otherwise the CLI level with the AWS SDK's
    // internals quieted down
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "{},aws_config=warn,aws_smithy_runtime=warn,hyper=warn",
            args.log_level
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match args.command {
        Command::Sweep(sweep_args) => handle_sweep(sweep_args).await,
        Command::Report(report_args) => handle_report(report_args).await,
    }
}

async fn handle_sweep(args: SweepArgs) -> Result<()> {
    let policy = config::load_policy(args.policy.as_deref())?;
    let run_config = RunConfig {
        sweep: config::SweepSettings {
            max_age_days: args.max_age_days,
            dry_run: !args.execute,
            override_approval: args.override_approval,
        },
        regions: config::RegionSettings {
            selection: RegionSelection::parse(&args.regions),
            home_region: args.home_region.clone(),
            max_concurrent: args.max_concurrent_regions,
        },
        notify: config::NotifySettings {
            topic_arn: args.sns_topic_arn.clone(),
            always_notify: args.always_notify,
        },
        policy,
        metrics_enabled: !args.no_metrics,
    };

    let start = Instant::now();
    let summary = orchestrator::run_sweep(&run_config).await?;
    let duration = start.elapsed();

    report::print_summary(&summary);

    if let Some(topic_arn) = &run_config.notify.topic_arn {
        if notify::should_notify(&summary, run_config.notify.always_notify) {
            let notifier = Notifier::new(&run_config.regions.home_region, topic_arn).await;
            if let Err(e) = notifier.publish(&summary).await {
                warn!(error = ?e, "Failed to send run report");
            }
        } else {
            info!("Nothing processed, notification suppressed");
        }
    }

    if run_config.metrics_enabled {
        let publisher = MetricsPublisher::new(&run_config.regions.home_region).await;
        if let Err(e) = publisher.publish(&summary, duration).await {
            warn!(error = ?e, "Failed to publish run metrics");
        }
    }

    info!(
        duration_secs = duration.as_secs(),
        processed = summary.total_processed,
        acted = summary.acted(),
        errors = summary.error_count(),
        "Sweep complete"
    );
    if !run_config.sweep.dry_run {
        println!("\nRun took {:.1}s", duration.as_secs_f64());
    } else {
        println!("\nDry run; re-run with --execute to apply actions.");
    }

    Ok(())
}

async fn handle_report(args: ReportArgs) -> Result<()> {
    let policy = config::load_policy(args.policy.as_deref())?;
    let options = report::ReportOptions {
        selection: RegionSelection::parse(&args.regions),
        home_region: args.home_region,
        max_age_days: args.max_age_days,
        policy,
        output: args.output,
    };
    report::run_report(&options).await
}
