//! Mergeable per-run outcome accumulation
//!
//! Each region worker accumulates outcomes into its own partial summary as
//! they arrive; the orchestrator merges the partials deterministically once
//! all workers complete. Counters sum, error lists concatenate.

use crate::decision::{Decision, Outcome};
use crate::record::ResourceRef;
use crate::resource_kind::ResourceKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// How an attempted action ended. Dry-run simulations count as succeeded so
/// a dry run and a live run over the same inventory report the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionOutcome {
    Succeeded,
    Failed,
}

/// Outcome counters for one grouping key (kind or region)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub acted: usize,
    pub failed: usize,
    pub too_young: usize,
    pub protected: usize,
    pub needs_approval: usize,
    pub outside_window: usize,
}

impl OutcomeCounts {
    fn bump(&mut self, outcome: Outcome, execution: Option<ActionOutcome>) {
        match outcome {
            Outcome::Act => match execution {
                Some(ActionOutcome::Succeeded) => self.acted += 1,
                // An ACT decision without a successful attempt is a failure;
                // it is never silently dropped
                Some(ActionOutcome::Failed) | None => self.failed += 1,
            },
            Outcome::SkipTooYoung => self.too_young += 1,
            Outcome::SkipProtected => self.protected += 1,
            Outcome::SkipNeedsApproval => self.needs_approval += 1,
            Outcome::SkipOutsideWindow => self.outside_window += 1,
        }
    }

    fn merge(&mut self, other: &OutcomeCounts) {
        self.acted += other.acted;
        self.failed += other.failed;
        self.too_young += other.too_young;
        self.protected += other.protected;
        self.needs_approval += other.needs_approval;
        self.outside_window += other.outside_window;
    }

    pub fn total(&self) -> usize {
        self.acted
            + self.failed
            + self.too_young
            + self.protected
            + self.needs_approval
            + self.outside_window
    }
}

/// A per-resource execution failure surfaced in the report
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionError {
    pub resource: ResourceRef,
    pub message: String,
}

/// A region (or region+kind) scan that could not run at all
#[derive(Debug, Clone, Serialize)]
pub struct RegionFailure {
    pub region: String,
    pub message: String,
}

/// Structured report of one sweep run.
///
/// `total_processed == 0` means nothing was discovered, which is distinct
/// from a run that evaluated resources and skipped them all.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub by_kind: BTreeMap<ResourceKind, OutcomeCounts>,
    pub by_region: BTreeMap<String, OutcomeCounts>,
    pub errors: Vec<ExecutionError>,
    pub region_failures: Vec<RegionFailure>,
    pub total_processed: usize,
    /// Coarse estimate of the monthly spend removed by successful actions
    pub estimated_monthly_savings_usd: f64,
    pub dry_run: bool,
    pub generated_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            by_kind: BTreeMap::new(),
            by_region: BTreeMap::new(),
            errors: Vec::new(),
            region_failures: Vec::new(),
            total_processed: 0,
            estimated_monthly_savings_usd: 0.0,
            dry_run,
            generated_at: None,
        }
    }

    /// Record one decision (and, for ACT decisions, its execution outcome).
    pub fn record(&mut self, decision: &Decision, execution: Option<ActionOutcome>) {
        self.total_processed += 1;
        self.by_kind
            .entry(decision.resource.kind)
            .or_default()
            .bump(decision.outcome, execution);
        self.by_region
            .entry(decision.resource.region.clone())
            .or_default()
            .bump(decision.outcome, execution);

        if decision.outcome.is_act() && execution == Some(ActionOutcome::Succeeded) {
            self.estimated_monthly_savings_usd += decision.cost.monthly_usd;
        }
    }

    pub fn record_error(&mut self, resource: ResourceRef, message: impl Into<String>) {
        self.errors.push(ExecutionError {
            resource,
            message: message.into(),
        });
    }

    pub fn record_region_failure(&mut self, region: impl Into<String>, message: impl Into<String>) {
        self.region_failures.push(RegionFailure {
            region: region.into(),
            message: message.into(),
        });
    }

    /// Fold another partial summary into this one.
    pub fn merge(&mut self, other: RunSummary) {
        for (kind, counts) in other.by_kind {
            self.by_kind.entry(kind).or_default().merge(&counts);
        }
        for (region, counts) in other.by_region {
            self.by_region.entry(region).or_default().merge(&counts);
        }
        self.errors.extend(other.errors);
        self.region_failures.extend(other.region_failures);
        self.total_processed += other.total_processed;
        self.estimated_monthly_savings_usd += other.estimated_monthly_savings_usd;
    }

    /// Stamp the summary at run end; it is read-only afterwards.
    pub fn finalize(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    pub fn acted(&self) -> usize {
        self.by_kind.values().map(|c| c.acted).sum()
    }

    pub fn failed(&self) -> usize {
        self.by_kind.values().map(|c| c.failed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.total_processed - self.acted() - self.failed()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len() + self.region_failures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{CostEstimate, CostTier};
    use crate::decision::ReasonCode;

    fn decision(kind: ResourceKind, region: &str, outcome: Outcome) -> Decision {
        Decision {
            resource: ResourceRef {
                kind,
                region: region.to_string(),
                id: "r-1".to_string(),
            },
            outcome,
            reason: ReasonCode::AgeExceeded {
                age_days: 5,
                max_age_days: 3,
            },
            cost: CostEstimate {
                monthly_usd: 10.0,
                tier: CostTier::Normal,
            },
            applied_at: None,
        }
    }

    #[test]
    fn records_by_kind_and_region() {
        let mut summary = RunSummary::new(false);
        summary.record(
            &decision(ResourceKind::ComputeInstance, "us-east-1", Outcome::Act),
            Some(ActionOutcome::Succeeded),
        );
        summary.record(
            &decision(
                ResourceKind::ComputeInstance,
                "us-east-1",
                Outcome::SkipProtected,
            ),
            None,
        );
        summary.record(
            &decision(ResourceKind::NatGateway, "eu-west-1", Outcome::Act),
            Some(ActionOutcome::Failed),
        );

        assert_eq!(summary.total_processed, 3);
        assert_eq!(summary.acted(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.skipped(), 1);

        let compute = &summary.by_kind[&ResourceKind::ComputeInstance];
        assert_eq!(compute.acted, 1);
        assert_eq!(compute.protected, 1);
        assert_eq!(summary.by_region["eu-west-1"].failed, 1);
    }

    #[test]
    fn savings_count_only_successful_actions() {
        let mut summary = RunSummary::new(false);
        summary.record(
            &decision(ResourceKind::ComputeInstance, "us-east-1", Outcome::Act),
            Some(ActionOutcome::Succeeded),
        );
        summary.record(
            &decision(ResourceKind::ComputeInstance, "us-east-1", Outcome::Act),
            Some(ActionOutcome::Failed),
        );
        summary.record(
            &decision(
                ResourceKind::ComputeInstance,
                "us-east-1",
                Outcome::SkipTooYoung,
            ),
            None,
        );
        assert!((summary.estimated_monthly_savings_usd - 10.0).abs() < 1e-9);
    }

    #[test]
    fn merge_sums_counters_and_concatenates_errors() {
        let mut a = RunSummary::new(false);
        a.record(
            &decision(ResourceKind::ComputeInstance, "us-east-1", Outcome::Act),
            Some(ActionOutcome::Succeeded),
        );
        a.record_error(
            ResourceRef {
                kind: ResourceKind::ComputeInstance,
                region: "us-east-1".to_string(),
                id: "i-1".to_string(),
            },
            "stop failed",
        );

        let mut b = RunSummary::new(false);
        b.record(
            &decision(ResourceKind::ComputeInstance, "us-west-2", Outcome::Act),
            Some(ActionOutcome::Succeeded),
        );
        b.record_region_failure("ap-southeast-2", "scan failed");

        a.merge(b);
        assert_eq!(a.total_processed, 2);
        assert_eq!(a.by_kind[&ResourceKind::ComputeInstance].acted, 2);
        assert_eq!(a.by_region.len(), 2);
        assert_eq!(a.errors.len(), 1);
        assert_eq!(a.region_failures.len(), 1);
        assert_eq!(a.error_count(), 2);
    }

    #[test]
    fn empty_run_is_distinct_from_all_skipped() {
        let empty = RunSummary::new(true).finalize(Utc::now());
        assert_eq!(empty.total_processed, 0);

        let mut skipped = RunSummary::new(true);
        skipped.record(
            &decision(
                ResourceKind::ComputeInstance,
                "us-east-1",
                Outcome::SkipTooYoung,
            ),
            None,
        );
        let skipped = skipped.finalize(Utc::now());
        assert_eq!(skipped.total_processed, 1);
        assert_eq!(skipped.acted(), 0);
        assert_ne!(empty.total_processed, skipped.total_processed);
    }

    #[test]
    fn act_without_execution_counts_as_failed() {
        let mut summary = RunSummary::new(false);
        summary.record(
            &decision(ResourceKind::ComputeInstance, "us-east-1", Outcome::Act),
            None,
        );
        assert_eq!(summary.failed(), 1);
    }

    #[test]
    fn counts_total_matches_processed() {
        let mut summary = RunSummary::new(false);
        for outcome in [
            Outcome::Act,
            Outcome::SkipTooYoung,
            Outcome::SkipProtected,
            Outcome::SkipNeedsApproval,
            Outcome::SkipOutsideWindow,
        ] {
            summary.record(
                &decision(ResourceKind::ComputeInstance, "us-east-1", outcome),
                Some(ActionOutcome::Succeeded),
            );
        }
        assert_eq!(
            summary.by_kind[&ResourceKind::ComputeInstance].total(),
            summary.total_processed
        );
    }
}
