//! Immutable resource snapshots produced by discovery

use crate::resource_kind::ResourceKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Reference to a discovered resource: kind + region + id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub region: String,
    pub id: String,
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.region, self.id)
    }
}

/// Immutable snapshot of one discovered resource.
///
/// Created once per scan by the provider adapter and never mutated. Owned by
/// the region worker processing it until the decision aggregator consumes it.
#[derive(Debug, Clone)]
pub struct ResourceRecord {
    pub kind: ResourceKind,
    pub region: String,
    /// Identifier the control API acts on (instance id, db identifier,
    /// service name, bucket name, ...)
    pub id: String,
    /// Human-facing name; falls back to the id when the provider has none
    pub name: String,
    /// Creation timestamp as reported by the provider.
    /// `None` when missing or unparsable; such resources are never acted on.
    pub created_at: Option<DateTime<Utc>>,
    pub tags: HashMap<String, String>,
    /// Parent identifier for kinds that need one to act (the owning cluster
    /// for service groups). Populated at discovery time.
    pub parent: Option<String>,
    /// Provider ARN, for control calls and tagging that require one
    pub arn: Option<String>,
    /// Instance class driving the cost estimate, where the kind has one
    pub instance_class: Option<String>,
    /// Unit-count multiplier for the cost estimate (task count, node count);
    /// 1.0 for single-unit kinds
    pub size_factor: f64,
}

impl ResourceRecord {
    pub fn reference(&self) -> ResourceRef {
        ResourceRef {
            kind: self.kind,
            region: self.region.clone(),
            id: self.id.clone(),
        }
    }

    /// Whole days since creation, `None` when the timestamp is unknown
    pub fn age_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.created_at.map(|created| (now - created).num_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(created_at: Option<DateTime<Utc>>) -> ResourceRecord {
        ResourceRecord {
            kind: ResourceKind::ComputeInstance,
            region: "us-east-1".to_string(),
            id: "i-0abc".to_string(),
            name: "builder".to_string(),
            created_at,
            tags: HashMap::new(),
            parent: None,
            arn: None,
            instance_class: None,
            size_factor: 1.0,
        }
    }

    #[test]
    fn age_in_whole_days() {
        let now = Utc::now();
        let r = record(Some(now - Duration::days(5) - Duration::hours(3)));
        assert_eq!(r.age_days(now), Some(5));
    }

    #[test]
    fn age_unknown_without_timestamp() {
        assert_eq!(record(None).age_days(Utc::now()), None);
    }

    #[test]
    fn reference_display() {
        let r = record(None);
        assert_eq!(r.reference().to_string(), "compute-instance/us-east-1/i-0abc");
    }
}
