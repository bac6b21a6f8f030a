//! Run configuration
//!
//! The CLI resolves its flags, environment variables, and the YAML policy
//! document into one `RunConfig`. Failure to load or parse the policy file
//! is fatal: without it the run parameters are unknown and no region is
//! touched.

use anyhow::{Context, Result};
use curfew_common::SweepPolicy;
use std::path::Path;

/// Which regions a run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionSelection {
    /// Sweep exactly these regions
    Explicit(Vec<String>),
    /// Discover all regions enabled for the account
    DiscoverAll,
}

impl RegionSelection {
    /// Parse a `--regions` value: comma-separated region names, or `all`
    /// to discover dynamically. An empty value also means discover.
    pub fn parse(spec: &str) -> Self {
        let names: Vec<String> = spec
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if names.is_empty() || names.iter().any(|n| n.eq_ignore_ascii_case("all")) {
            RegionSelection::DiscoverAll
        } else {
            RegionSelection::Explicit(names)
        }
    }
}

/// What to sweep and how aggressively
#[derive(Debug, Clone)]
pub struct SweepSettings {
    /// Resources at least this many days old are eligible
    pub max_age_days: u32,
    /// Simulate without mutating anything
    pub dry_run: bool,
    /// Let requires-approval resources act (CLI-side override; the policy
    /// document has its own switch)
    pub override_approval: bool,
}

/// Region fan-out settings
#[derive(Debug, Clone)]
pub struct RegionSettings {
    pub selection: RegionSelection,
    /// Region used for discovery, notification, and metrics
    pub home_region: String,
    /// Bound on concurrently processed regions
    pub max_concurrent: usize,
}

/// Notification settings
#[derive(Debug, Clone)]
pub struct NotifySettings {
    /// SNS topic for the run report; no topic means no notification
    pub topic_arn: Option<String>,
    /// Send the report even when nothing was processed
    pub always_notify: bool,
}

/// Resolved configuration for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub sweep: SweepSettings,
    pub regions: RegionSettings,
    pub notify: NotifySettings,
    pub policy: SweepPolicy,
    /// Publish run metrics to CloudWatch
    pub metrics_enabled: bool,
}

/// Load the policy document, or built-in defaults when no path is given.
pub fn load_policy(path: Option<&Path>) -> Result<SweepPolicy> {
    let Some(path) = path else {
        return Ok(SweepPolicy::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy file {}", path.display()))?;
    serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse policy file {}", path.display()))
}
