//! AWS adapters for the sweeper
//!
//! Thin wrappers around the AWS SDK clients:
//! - context: one loaded SDK config per region, shared by all clients
//! - error: error-code classification into `ProviderError`
//! - tags: tag extraction across SDK tag types, curfew marker tags
//! - inventory: per-kind listings producing `ResourceRecord`s
//! - actions: per-kind stop/scale/delete and terminal-state waits
//! - provider: the `ResourceProvider` trait and its AWS implementation

pub mod actions;
pub mod context;
pub mod error;
pub mod inventory;
pub mod provider;
pub mod tags;

pub use context::AwsContext;
pub use error::{classify_provider_error, provider_error_message, ProviderError};
pub use provider::{AwsProvider, ResourceProvider};

use crate::config::RegionSelection;
use anyhow::{Context as _, Result};

/// Resolve the configured region selection into a concrete region list.
pub async fn resolve_regions(
    selection: &RegionSelection,
    home_region: &str,
) -> Result<Vec<String>> {
    match selection {
        RegionSelection::Explicit(regions) => Ok(regions.clone()),
        RegionSelection::DiscoverAll => discover_regions(home_region).await,
    }
}

/// Discover every region enabled for the account.
pub async fn discover_regions(home_region: &str) -> Result<Vec<String>> {
    let ctx = AwsContext::new(home_region).await;
    let response = ctx
        .ec2_client()
        .describe_regions()
        .send()
        .await
        .context("Failed to discover regions")?;

    let mut regions: Vec<String> = response
        .regions()
        .iter()
        .filter_map(|r| r.region_name().map(|s| s.to_string()))
        .collect();
    regions.sort();
    Ok(regions)
}
