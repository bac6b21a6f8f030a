//! Coarse monthly-cost estimation and tiering
//!
//! Estimates come from a static rate table and are deliberately rough; they
//! exist to rank resources, not to reconcile a bill. The classifier only
//! annotates decisions — it never blocks an action by itself.

use crate::record::ResourceRecord;
use crate::resource_kind::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hours used to extrapolate an hourly rate to a month
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Cost tier assigned to a resource
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CostTier {
    Normal,
    HighValue,
    RequiresApproval,
}

/// Thresholds (monthly USD) separating the tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostThresholds {
    /// At or above this, a resource is high-value
    pub high: f64,
    /// At or above this, acting requires approval
    pub approval: f64,
}

impl Default for CostThresholds {
    fn default() -> Self {
        Self {
            high: 100.0,
            approval: 500.0,
        }
    }
}

/// Static rate table for the estimate.
///
/// Classed kinds (compute instances, databases) are priced per instance
/// class and extrapolated to a month; everything else gets a flat per-kind
/// monthly rate scaled by the record's unit count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostTable {
    /// Hourly USD by instance class
    pub hourly_by_class: BTreeMap<String, f64>,
    /// Fallback hourly rate for classes not in the table. Deliberately
    /// pessimistic so unknown hardware can still trip the approval gate.
    pub default_hourly: f64,
    /// Flat monthly USD per unit for kinds without an instance class
    pub monthly_by_kind: BTreeMap<ResourceKind, f64>,
}

impl Default for CostTable {
    fn default() -> Self {
        let hourly_by_class: BTreeMap<String, f64> = [
            ("t2.micro", 0.0116),
            ("t2.small", 0.023),
            ("t2.medium", 0.0464),
            ("t3.micro", 0.0104),
            ("t3.small", 0.0208),
            ("t3.medium", 0.0416),
            ("m5.large", 0.096),
            ("m5.xlarge", 0.192),
            ("c5.large", 0.085),
            ("c5.xlarge", 0.17),
            ("db.t2.micro", 0.017),
            ("db.t2.small", 0.034),
            ("db.t3.micro", 0.017),
            ("db.t3.small", 0.034),
            ("db.m5.large", 0.171),
            ("db.m5.xlarge", 0.342),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let monthly_by_kind: BTreeMap<ResourceKind, f64> = [
            (ResourceKind::ServiceGroup, 22.5), // per desired task
            (ResourceKind::NatGateway, 32.85),
            (ResourceKind::LoadBalancer, 16.43),
            (ResourceKind::ObjectStoreBucket, 5.0),
            (ResourceKind::SearchDomain, 26.28), // per data node
            (ResourceKind::VirtualDesktop, 35.0),
        ]
        .into_iter()
        .collect();

        Self {
            hourly_by_class,
            default_hourly: 0.21,
            monthly_by_kind,
        }
    }
}

impl CostTable {
    fn monthly_usd(&self, record: &ResourceRecord) -> f64 {
        let units = if record.size_factor > 0.0 {
            record.size_factor
        } else {
            1.0
        };

        match &record.instance_class {
            Some(class) => {
                let hourly = self
                    .hourly_by_class
                    .get(class)
                    .copied()
                    .unwrap_or(self.default_hourly);
                hourly * HOURS_PER_MONTH * units
            }
            None => {
                let per_unit = self
                    .monthly_by_kind
                    .get(&record.kind)
                    .copied()
                    .unwrap_or(self.default_hourly * HOURS_PER_MONTH);
                per_unit * units
            }
        }
    }
}

/// Derived, non-authoritative cost annotation for one resource
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostEstimate {
    pub monthly_usd: f64,
    pub tier: CostTier,
}

/// Estimate a resource's monthly cost and classify it against the thresholds.
pub fn classify(
    record: &ResourceRecord,
    table: &CostTable,
    thresholds: &CostThresholds,
) -> CostEstimate {
    let monthly_usd = table.monthly_usd(record);
    let tier = if monthly_usd >= thresholds.approval {
        CostTier::RequiresApproval
    } else if monthly_usd >= thresholds.high {
        CostTier::HighValue
    } else {
        CostTier::Normal
    };
    CostEstimate { monthly_usd, tier }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(
        kind: ResourceKind,
        instance_class: Option<&str>,
        size_factor: f64,
    ) -> ResourceRecord {
        ResourceRecord {
            kind,
            region: "us-east-1".to_string(),
            id: "r-1".to_string(),
            name: "r-1".to_string(),
            created_at: None,
            tags: HashMap::new(),
            parent: None,
            arn: None,
            instance_class: instance_class.map(|s| s.to_string()),
            size_factor,
        }
    }

    #[test]
    fn classed_kind_uses_hourly_rate() {
        let table = CostTable::default();
        let est = classify(
            &record(ResourceKind::ComputeInstance, Some("t3.micro"), 1.0),
            &table,
            &CostThresholds::default(),
        );
        assert!((est.monthly_usd - 0.0104 * HOURS_PER_MONTH).abs() < 1e-9);
        assert_eq!(est.tier, CostTier::Normal);
    }

    #[test]
    fn unknown_class_falls_back_to_default_rate() {
        let table = CostTable::default();
        let est = classify(
            &record(ResourceKind::ComputeInstance, Some("p5.48xlarge"), 1.0),
            &table,
            &CostThresholds::default(),
        );
        assert!((est.monthly_usd - 0.21 * HOURS_PER_MONTH).abs() < 1e-9);
        // Pessimistic fallback lands in the high-value tier, not Normal
        assert_eq!(est.tier, CostTier::HighValue);
    }

    #[test]
    fn unclassed_kind_scales_with_units() {
        let table = CostTable::default();
        let est = classify(
            &record(ResourceKind::ServiceGroup, None, 4.0),
            &table,
            &CostThresholds::default(),
        );
        assert!((est.monthly_usd - 22.5 * 4.0).abs() < 1e-9);
    }

    #[test]
    fn thresholds_are_inclusive() {
        let thresholds = CostThresholds {
            high: 100.0,
            approval: 500.0,
        };
        let mut table = CostTable::default();
        table
            .monthly_by_kind
            .insert(ResourceKind::NatGateway, 500.0);
        let est = classify(
            &record(ResourceKind::NatGateway, None, 1.0),
            &table,
            &thresholds,
        );
        assert_eq!(est.tier, CostTier::RequiresApproval);

        table
            .monthly_by_kind
            .insert(ResourceKind::NatGateway, 100.0);
        let est = classify(
            &record(ResourceKind::NatGateway, None, 1.0),
            &table,
            &thresholds,
        );
        assert_eq!(est.tier, CostTier::HighValue);
    }

    #[test]
    fn zero_size_factor_counts_as_one_unit() {
        let table = CostTable::default();
        let est = classify(
            &record(ResourceKind::VirtualDesktop, None, 0.0),
            &table,
            &CostThresholds::default(),
        );
        assert!((est.monthly_usd - 35.0).abs() < 1e-9);
    }
}
