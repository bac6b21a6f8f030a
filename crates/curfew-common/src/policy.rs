//! The sweep policy document
//!
//! Everything an operator tunes about the decision pipeline lives in one
//! document: protection rules, cost thresholds, rate-table overrides, and
//! schedule windows. The sweeper loads it once per run; a failure to parse
//! the document is fatal (the run cannot determine its parameters), while a
//! malformed protection rule disables only the affected kind.

use crate::cost::{CostTable, CostThresholds};
use crate::protection::ProtectionRule;
use crate::resource_kind::ResourceKind;
use crate::schedule::{parse_windows, BusinessHours, ScheduleConfigError, ScheduleGate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Operator policy for a sweep run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepPolicy {
    /// Protection rules per resource kind; kinds without an entry are
    /// unprotected
    pub protection: BTreeMap<ResourceKind, ProtectionRule>,
    pub cost_thresholds: CostThresholds,
    pub cost_table: CostTable,
    pub business_hours: BusinessHours,
    /// Cost-optimized cleanup windows, e.g. `"22-23,0-6"`. Empty or absent
    /// disables the window constraint.
    pub cleanup_windows: Option<String>,
    /// Let requires-approval resources act without manual approval
    pub override_enabled: bool,
}

impl SweepPolicy {
    /// Build the schedule gate from the configured hours and windows.
    pub fn schedule_gate(&self) -> Result<ScheduleGate, ScheduleConfigError> {
        let windows = match &self.cleanup_windows {
            Some(spec) => parse_windows(spec)?,
            None => Vec::new(),
        };
        Ok(ScheduleGate::new(self.business_hours, windows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_has_no_protection() {
        let policy = SweepPolicy::default();
        assert!(policy.protection.is_empty());
        assert!(!policy.override_enabled);
        let gate = policy.schedule_gate().unwrap();
        // Default business hours exclude noon, allow night
        assert!(!gate.allows(12));
        assert!(gate.allows(3));
    }

    #[test]
    fn parses_a_full_document() {
        let yaml = r#"
protection:
  compute-instance:
    blacklist_patterns: ["prod-*", "bastion"]
    protected_tags:
      Environment: ["production"]
  managed-database:
    protected_tags:
      Criticality: ["high", "critical"]
cost_thresholds:
  high: 200.0
  approval: 800.0
business_hours:
  start: 9
  end: 17
cleanup_windows: "22-23,0-6"
override_enabled: true
"#;
        let policy: SweepPolicy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(policy.protection.len(), 2);
        let rule = &policy.protection[&ResourceKind::ComputeInstance];
        assert_eq!(rule.blacklist_patterns, vec!["prod-*", "bastion"]);
        assert_eq!(policy.cost_thresholds.approval, 800.0);
        assert!(policy.override_enabled);

        let gate = policy.schedule_gate().unwrap();
        assert!(gate.allows(23));
        assert!(gate.allows(2));
        assert!(!gate.allows(12));
    }

    #[test]
    fn bad_window_spec_is_an_error() {
        let policy = SweepPolicy {
            cleanup_windows: Some("25-26".to_string()),
            ..SweepPolicy::default()
        };
        assert!(policy.schedule_gate().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = "max_age_days: 3\n";
        assert!(serde_yaml::from_str::<SweepPolicy>(yaml).is_err());
    }

    #[test]
    fn rate_table_overrides_round_trip() {
        let yaml = r#"
cost_table:
  hourly_by_class:
    m7i.large: 0.1
  default_hourly: 0.5
  monthly_by_kind:
    nat-gateway: 40.0
"#;
        let policy: SweepPolicy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(policy.cost_table.hourly_by_class["m7i.large"], 0.1);
        assert_eq!(
            policy.cost_table.monthly_by_kind[&ResourceKind::NatGateway],
            40.0
        );
    }
}
