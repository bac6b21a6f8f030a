//! Human- and machine-readable reporting
//!
//! Two surfaces: the post-sweep summary table printed after every run, and
//! the `report` subcommand, which inventories resources with their ages and
//! estimated costs without deciding or acting, optionally writing the full
//! report as JSON.

use crate::aws::provider::{AwsProvider, ResourceProvider};
use crate::aws::resolve_regions;
use crate::config::RegionSelection;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use curfew_common::age::evaluate_age;
use curfew_common::cost::classify;
use curfew_common::{ResourceKind, RunSummary, SweepPolicy};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Print the post-sweep summary as a table plus error details.
pub fn print_summary(summary: &RunSummary) {
    println!("\n=== Sweep Summary ===\n");
    println!(
        "Mode: {}",
        if summary.dry_run { "DRY RUN" } else { "EXECUTED" }
    );
    println!("Resources processed: {}", summary.total_processed);

    if !summary.by_kind.is_empty() {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Kind"),
                Cell::new("Acted"),
                Cell::new("Failed"),
                Cell::new("Too young"),
                Cell::new("Protected"),
                Cell::new("Needs approval"),
                Cell::new("Outside window"),
            ]);

        for (kind, counts) in &summary.by_kind {
            table.add_row(vec![
                Cell::new(kind),
                Cell::new(counts.acted),
                Cell::new(counts.failed),
                Cell::new(counts.too_young),
                Cell::new(counts.protected),
                Cell::new(counts.needs_approval),
                Cell::new(counts.outside_window),
            ]);
        }
        println!("{table}");
    }

    if summary.acted() > 0 {
        println!(
            "Estimated monthly savings: ${:.2}",
            summary.estimated_monthly_savings_usd
        );
    }

    if !summary.errors.is_empty() {
        println!("\nExecution errors:");
        for error in &summary.errors {
            println!("  - {}: {}", error.resource, error.message);
        }
    }
    if !summary.region_failures.is_empty() {
        println!("\nRegion failures:");
        for failure in &summary.region_failures {
            println!("  - {}: {}", failure.region, failure.message);
        }
    }
}

/// Options for the `report` subcommand
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub selection: RegionSelection,
    pub home_region: String,
    pub max_age_days: u32,
    pub policy: SweepPolicy,
    /// Write the full report as JSON to this path
    pub output: Option<PathBuf>,
}

/// One inventoried resource in the report
#[derive(Debug, Clone, Serialize)]
pub struct ReportedResource {
    pub kind: ResourceKind,
    pub region: String,
    pub id: String,
    pub name: String,
    pub age_days: Option<i64>,
    pub estimated_monthly_usd: f64,
    /// Past the age threshold, would be considered for action
    pub flagged: bool,
}

/// Full inventory report
#[derive(Debug, Clone, Serialize)]
pub struct InventoryReport {
    pub generated_at: DateTime<Utc>,
    pub max_age_days: u32,
    pub total_resources: usize,
    pub flagged_for_shutdown: usize,
    pub estimated_monthly_savings_usd: f64,
    pub resources: Vec<ReportedResource>,
}

/// Inventory every region and build the age/cost report.
pub async fn run_report(options: &ReportOptions) -> Result<()> {
    let regions = resolve_regions(&options.selection, &options.home_region).await?;
    let now = Utc::now();
    info!(regions = ?regions, max_age_days = options.max_age_days, "Building inventory report");

    let mut resources = Vec::new();
    for region in &regions {
        let provider = AwsProvider::new(region).await;
        for kind in ResourceKind::ALL {
            match provider.list_resources(kind).await {
                Ok(records) => {
                    for record in records {
                        let age_days = record.age_days(now);
                        let estimate = classify(
                            &record,
                            &options.policy.cost_table,
                            &options.policy.cost_thresholds,
                        );
                        let flagged = evaluate_age(record.created_at, options.max_age_days, now)
                            .is_eligible();
                        resources.push(ReportedResource {
                            kind: record.kind,
                            region: record.region,
                            id: record.id,
                            name: record.name,
                            age_days,
                            estimated_monthly_usd: estimate.monthly_usd,
                            flagged,
                        });
                    }
                }
                Err(e) => {
                    warn!(region = %region, kind = %kind, error = ?e, "Scan failed, continuing");
                }
            }
        }
    }

    let report = build_report(resources, options.max_age_days, now);
    print_report(&report);

    if let Some(path) = &options.output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("\nFull report saved to: {}", path.display());
    }

    Ok(())
}

fn build_report(
    resources: Vec<ReportedResource>,
    max_age_days: u32,
    generated_at: DateTime<Utc>,
) -> InventoryReport {
    let flagged_for_shutdown = resources.iter().filter(|r| r.flagged).count();
    let estimated_monthly_savings_usd = resources
        .iter()
        .filter(|r| r.flagged)
        .map(|r| r.estimated_monthly_usd)
        .sum();

    InventoryReport {
        generated_at,
        max_age_days,
        total_resources: resources.len(),
        flagged_for_shutdown,
        estimated_monthly_savings_usd,
        resources,
    }
}

fn print_report(report: &InventoryReport) {
    if report.resources.is_empty() {
        println!("No resources found.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Kind"),
            Cell::new("Region"),
            Cell::new("Name"),
            Cell::new("Age (days)"),
            Cell::new("Est. $/month"),
            Cell::new("Flagged"),
        ]);

    for resource in &report.resources {
        let age = resource
            .age_days
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        table.add_row(vec![
            Cell::new(resource.kind),
            Cell::new(&resource.region),
            Cell::new(&resource.name),
            Cell::new(age),
            Cell::new(format!("{:.2}", resource.estimated_monthly_usd)),
            Cell::new(if resource.flagged { "yes" } else { "" }),
        ]);
    }
    println!("{table}");

    println!(
        "\nTotal: {} resources, {} older than {} days (~${:.2}/month)",
        report.total_resources,
        report.flagged_for_shutdown,
        report.max_age_days,
        report.estimated_monthly_savings_usd,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(flagged: bool, monthly: f64) -> ReportedResource {
        ReportedResource {
            kind: ResourceKind::ComputeInstance,
            region: "us-east-1".to_string(),
            id: "i-1".to_string(),
            name: "i-1".to_string(),
            age_days: Some(if flagged { 10 } else { 1 }),
            estimated_monthly_usd: monthly,
            flagged,
        }
    }

    #[test]
    fn savings_sum_only_flagged_resources() {
        let report = build_report(
            vec![resource(true, 10.0), resource(false, 99.0), resource(true, 5.0)],
            3,
            Utc::now(),
        );
        assert_eq!(report.total_resources, 3);
        assert_eq!(report.flagged_for_shutdown, 2);
        assert!((report.estimated_monthly_savings_usd - 15.0).abs() < 1e-9);
    }

    #[test]
    fn empty_report_counts_zero() {
        let report = build_report(Vec::new(), 3, Utc::now());
        assert_eq!(report.total_resources, 0);
        assert_eq!(report.flagged_for_shutdown, 0);
    }
}
