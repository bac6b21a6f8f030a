//! Region fan-out and the per-region sweep pipeline
//!
//! Each region runs scan → decide → execute independently. Regions are
//! processed with bounded concurrency; a failure inside one region is
//! recorded against that region and never aborts the others. Every worker
//! owns its records and accumulates a partial summary; the partials are
//! merged in region order so the final summary is deterministic regardless
//! of completion order.

use crate::aws::error::provider_error_message;
use crate::aws::provider::{AwsProvider, ResourceProvider};
use crate::aws::resolve_regions;
use crate::config::RunConfig;
use crate::executor;
use anyhow::Result;
use chrono::{DateTime, Utc};
use curfew_common::{DecisionEngine, ResourceKind, RunSummary};
use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Run one full sweep: resolve regions, fan out, merge, finalize.
pub async fn run_sweep(config: &RunConfig) -> Result<RunSummary> {
    let engine = build_engine(config)?;
    let run_id = Uuid::now_v7();
    let now = Utc::now();

    let regions = resolve_regions(&config.regions.selection, &config.regions.home_region).await?;
    info!(
        run_id = %run_id,
        regions = ?regions,
        max_age_days = config.sweep.max_age_days,
        dry_run = config.sweep.dry_run,
        "Starting sweep"
    );

    let mut summary = sweep_regions(
        &regions,
        |region: String| async move { Ok(AwsProvider::new(&region).await) },
        &engine,
        config.sweep.dry_run,
        config.regions.max_concurrent,
        now,
    )
    .await;

    // A malformed protection rule disables its kind for the whole run;
    // surface that in the summary rather than dropping it silently
    for kind in ResourceKind::ALL {
        if let Some(err) = engine.kind_error(kind) {
            error!(kind = %kind, error = %err, "Kind disabled by malformed protection rule");
            summary.record_region_failure("all", format!("{kind} skipped: {err}"));
        }
    }

    Ok(summary.finalize(Utc::now()))
}

/// Assemble the decision engine from the resolved configuration.
/// Schedule parsing is the only fatal path here: without a usable window
/// configuration the run parameters are unknown.
fn build_engine(config: &RunConfig) -> Result<DecisionEngine> {
    let gate = config.policy.schedule_gate()?;
    let override_enabled = config.sweep.override_approval || config.policy.override_enabled;
    Ok(DecisionEngine::new(
        config.sweep.max_age_days,
        override_enabled,
        config.policy.cost_thresholds,
        config.policy.cost_table.clone(),
        gate,
        &config.policy.protection,
    ))
}

/// Fan the sweep out over regions with bounded concurrency.
///
/// `make_provider` builds the provider for each region; a provider that
/// cannot be built marks the region failed without touching the others.
pub async fn sweep_regions<P, F, Fut>(
    regions: &[String],
    make_provider: F,
    engine: &DecisionEngine,
    dry_run: bool,
    max_concurrent: usize,
    now: DateTime<Utc>,
) -> RunSummary
where
    P: ResourceProvider,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<P>>,
{
    let mut partials: Vec<(String, RunSummary)> = stream::iter(regions.iter().cloned())
        .map(|region| {
            let make_provider = &make_provider;
            async move {
                match make_provider(region.clone()).await {
                    Ok(provider) => {
                        let partial = sweep_region(&provider, engine, dry_run, now).await;
                        (region, partial)
                    }
                    Err(e) => {
                        warn!(region = %region, error = ?e, "Region unavailable");
                        let mut partial = RunSummary::new(dry_run);
                        partial.record_region_failure(&region, format!("region unavailable: {e}"));
                        (region, partial)
                    }
                }
            }
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    // Merge in region order, not completion order
    partials.sort_by(|a, b| a.0.cmp(&b.0));

    let mut summary = RunSummary::new(dry_run);
    for (_, partial) in partials {
        summary.merge(partial);
    }
    summary
}

/// Scan, decide, and execute for one region. Never returns an error: every
/// failure is recorded in the partial summary.
async fn sweep_region<P: ResourceProvider>(
    provider: &P,
    engine: &DecisionEngine,
    dry_run: bool,
    now: DateTime<Utc>,
) -> RunSummary {
    let region = provider.region().to_string();
    let mut summary = RunSummary::new(dry_run);

    for kind in ResourceKind::ALL {
        // Kinds disabled by a malformed rule are reported once at run level
        if engine.kind_error(kind).is_some() {
            continue;
        }

        let records = match provider.list_resources(kind).await {
            Ok(records) => records,
            Err(e) => {
                warn!(region = %region, kind = %kind, error = ?e, "Scan failed");
                summary.record_region_failure(
                    &region,
                    format!("{kind} scan failed: {}", provider_error_message(&e)),
                );
                continue;
            }
        };

        for record in records {
            let mut decision = engine.evaluate(&record, now);
            if decision.outcome.is_act() {
                let result = executor::execute(provider, &record, &mut decision, dry_run).await;
                if let Some(message) = result.error {
                    summary.record_error(decision.resource.clone(), message);
                }
                summary.record(&decision, Some(result.outcome));
            } else {
                debug!(
                    resource = %decision.resource,
                    outcome = %decision.outcome,
                    reason = %decision.reason,
                    "Skipping resource"
                );
                summary.record(&decision, None);
            }
        }
    }

    info!(
        region = %region,
        processed = summary.total_processed,
        acted = summary.acted(),
        failed = summary.failed(),
        "Region sweep complete"
    );
    summary
}
