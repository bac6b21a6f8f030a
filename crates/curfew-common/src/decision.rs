//! The decision aggregator
//!
//! Combines the four evaluators — age, protection, cost, schedule — into one
//! outcome per resource. Gates are checked in strict priority order and the
//! first match wins: age and protection are safety gates and dominate, the
//! cost-approval business gate comes next, and scheduling is checked last so
//! a resource that would otherwise act is deferred to the next run rather
//! than silently dropped.

use crate::age::{evaluate_age, AgeCheck};
use crate::cost::{classify, CostEstimate, CostTable, CostThresholds, CostTier};
use crate::protection::{CompiledProtection, ProtectionConfigError, ProtectionMatch};
use crate::record::{ResourceRecord, ResourceRef};
use crate::resource_kind::ResourceKind;
use crate::schedule::ScheduleGate;
use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of evaluating one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// Apply the kind's deactivation action
    Act,
    /// Younger than the age threshold, or age unknown
    SkipTooYoung,
    /// A protection rule matched
    SkipProtected,
    /// Cost tier requires approval and the override is not enabled
    SkipNeedsApproval,
    /// Outside the allowed schedule window; re-evaluated next run
    SkipOutsideWindow,
}

impl Outcome {
    pub fn is_act(self) -> bool {
        matches!(self, Outcome::Act)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Act => "act",
            Outcome::SkipTooYoung => "skip-too-young",
            Outcome::SkipProtected => "skip-protected",
            Outcome::SkipNeedsApproval => "skip-needs-approval",
            Outcome::SkipOutsideWindow => "skip-outside-window",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable reason behind an outcome, for audit and reporting
#[derive(Debug, Clone, PartialEq)]
pub enum ReasonCode {
    /// Resource exceeded the age threshold and will be acted on
    AgeExceeded { age_days: i64, max_age_days: u32 },
    /// Resource is younger than the threshold
    TooYoung { age_days: i64, max_age_days: u32 },
    /// Creation timestamp missing or unparsable; treated as not eligible
    MissingCreationTimestamp,
    /// The protection rule that matched
    Protected(ProtectionMatch),
    /// Estimated cost crossed the approval threshold
    NeedsApproval { monthly_usd: f64 },
    /// Current hour is outside the allowed window
    OutsideWindow { hour_utc: u8 },
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReasonCode::AgeExceeded {
                age_days,
                max_age_days,
            } => write!(f, "idle for {age_days} days (threshold {max_age_days})"),
            ReasonCode::TooYoung {
                age_days,
                max_age_days,
            } => write!(f, "only {age_days} days old (threshold {max_age_days})"),
            ReasonCode::MissingCreationTimestamp => {
                f.write_str("creation timestamp missing or unparsable")
            }
            ReasonCode::Protected(m) => write!(f, "protected: {m}"),
            ReasonCode::NeedsApproval { monthly_usd } => {
                write!(f, "~${monthly_usd:.0}/month requires approval")
            }
            ReasonCode::OutsideWindow { hour_utc } => {
                write!(f, "hour {hour_utc}:00 UTC is outside the action window")
            }
        }
    }
}

/// One decision per discovered resource.
///
/// Created by the aggregator; `applied_at` is set exactly once when the
/// executor attempts the action, and the decision is immutable afterwards.
#[derive(Debug, Clone)]
pub struct Decision {
    pub resource: ResourceRef,
    pub outcome: Outcome,
    pub reason: ReasonCode,
    pub cost: CostEstimate,
    pub applied_at: Option<DateTime<Utc>>,
}

/// Everything needed to evaluate records, assembled once per run.
///
/// Protection rules are compiled up front; a malformed rule disables only
/// the affected kind and is reported through [`DecisionEngine::kind_error`].
#[derive(Debug)]
pub struct DecisionEngine {
    max_age_days: u32,
    override_enabled: bool,
    thresholds: CostThresholds,
    cost_table: CostTable,
    gate: ScheduleGate,
    protection: BTreeMap<ResourceKind, CompiledProtection>,
    disabled: BTreeMap<ResourceKind, ProtectionConfigError>,
}

impl DecisionEngine {
    pub fn new(
        max_age_days: u32,
        override_enabled: bool,
        thresholds: CostThresholds,
        cost_table: CostTable,
        gate: ScheduleGate,
        rules: &BTreeMap<ResourceKind, crate::protection::ProtectionRule>,
    ) -> Self {
        let mut protection = BTreeMap::new();
        let mut disabled = BTreeMap::new();
        for (kind, rule) in rules {
            match CompiledProtection::compile(rule) {
                Ok(compiled) => {
                    protection.insert(*kind, compiled);
                }
                Err(err) => {
                    disabled.insert(*kind, err);
                }
            }
        }

        Self {
            max_age_days,
            override_enabled,
            thresholds,
            cost_table,
            gate,
            protection,
            disabled,
        }
    }

    /// The configuration error disabling this kind for the run, if any
    pub fn kind_error(&self, kind: ResourceKind) -> Option<&ProtectionConfigError> {
        self.disabled.get(&kind)
    }

    pub fn max_age_days(&self) -> u32 {
        self.max_age_days
    }

    /// Evaluate one record at the given clock.
    ///
    /// Priority order (first match wins):
    /// 1. not age-eligible
    /// 2. protected
    /// 3. requires approval without override
    /// 4. outside the schedule window
    /// 5. act
    pub fn evaluate(&self, record: &ResourceRecord, now: DateTime<Utc>) -> Decision {
        let hour_utc = now.hour() as u8;
        let age = evaluate_age(record.created_at, self.max_age_days, now);
        let cost = classify(record, &self.cost_table, &self.thresholds);

        let (outcome, reason) = match age {
            AgeCheck::UnknownAge => (
                Outcome::SkipTooYoung,
                ReasonCode::MissingCreationTimestamp,
            ),
            AgeCheck::TooYoung { age_days } => (
                Outcome::SkipTooYoung,
                ReasonCode::TooYoung {
                    age_days,
                    max_age_days: self.max_age_days,
                },
            ),
            AgeCheck::Eligible { age_days } => {
                let protection = self
                    .protection
                    .get(&record.kind)
                    .and_then(|p| p.evaluate(record));

                if let Some(matched) = protection {
                    (Outcome::SkipProtected, ReasonCode::Protected(matched))
                } else if cost.tier == CostTier::RequiresApproval && !self.override_enabled {
                    (
                        Outcome::SkipNeedsApproval,
                        ReasonCode::NeedsApproval {
                            monthly_usd: cost.monthly_usd,
                        },
                    )
                } else if !self.gate.allows(hour_utc) {
                    (
                        Outcome::SkipOutsideWindow,
                        ReasonCode::OutsideWindow { hour_utc },
                    )
                } else {
                    (
                        Outcome::Act,
                        ReasonCode::AgeExceeded {
                            age_days,
                            max_age_days: self.max_age_days,
                        },
                    )
                }
            }
        };

        Decision {
            resource: record.reference(),
            outcome,
            reason,
            cost,
            applied_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protection::ProtectionRule;
    use crate::schedule::BusinessHours;
    use chrono::{Duration, TimeZone};
    use std::collections::{BTreeSet, HashMap};

    /// 03:00 UTC, outside default business hours
    fn night() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap()
    }

    /// 12:00 UTC, inside default business hours
    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn record(age_days: i64, now: DateTime<Utc>) -> ResourceRecord {
        ResourceRecord {
            kind: ResourceKind::ComputeInstance,
            region: "us-east-1".to_string(),
            id: "i-0abc".to_string(),
            name: "builder-7".to_string(),
            created_at: Some(now - Duration::days(age_days)),
            tags: HashMap::new(),
            parent: None,
            arn: None,
            instance_class: Some("t3.micro".to_string()),
            size_factor: 1.0,
        }
    }

    fn production_rule() -> BTreeMap<ResourceKind, ProtectionRule> {
        let mut tags = BTreeMap::new();
        tags.insert(
            "Environment".to_string(),
            BTreeSet::from(["production".to_string()]),
        );
        let mut rules = BTreeMap::new();
        rules.insert(
            ResourceKind::ComputeInstance,
            ProtectionRule {
                blacklist_patterns: vec!["prod-*".to_string()],
                protected_tags: tags,
            },
        );
        rules
    }

    fn engine(override_enabled: bool) -> DecisionEngine {
        DecisionEngine::new(
            3,
            override_enabled,
            CostThresholds::default(),
            CostTable::default(),
            ScheduleGate::new(BusinessHours::default(), Vec::new()),
            &production_rule(),
        )
    }

    #[test]
    fn eligible_unprotected_resource_acts() {
        let now = night();
        let d = engine(false).evaluate(&record(5, now), now);
        assert_eq!(d.outcome, Outcome::Act);
        assert_eq!(
            d.reason,
            ReasonCode::AgeExceeded {
                age_days: 5,
                max_age_days: 3
            }
        );
        assert!(d.applied_at.is_none());
    }

    #[test]
    fn young_resource_never_acts() {
        let now = night();
        let d = engine(false).evaluate(&record(1, now), now);
        assert_eq!(d.outcome, Outcome::SkipTooYoung);
    }

    #[test]
    fn unknown_age_skips_with_data_quality_reason() {
        let now = night();
        let mut r = record(5, now);
        r.created_at = None;
        let d = engine(false).evaluate(&r, now);
        assert_eq!(d.outcome, Outcome::SkipTooYoung);
        assert_eq!(d.reason, ReasonCode::MissingCreationTimestamp);
    }

    #[test]
    fn protection_dominates_cost_and_schedule() {
        let now = noon(); // also outside the window
        let mut r = record(5, now);
        r.tags
            .insert("Environment".to_string(), "production".to_string());
        r.instance_class = Some("p5.48xlarge".to_string()); // would need approval too
        let d = engine(false).evaluate(&r, now);
        assert_eq!(d.outcome, Outcome::SkipProtected);
    }

    #[test]
    fn age_is_checked_before_protection() {
        // Too-young AND protected resolves to too-young: exact tie-break order
        let now = night();
        let mut r = record(1, now);
        r.tags
            .insert("Environment".to_string(), "production".to_string());
        let d = engine(false).evaluate(&r, now);
        assert_eq!(d.outcome, Outcome::SkipTooYoung);
    }

    #[test]
    fn blacklist_pattern_protects_by_name() {
        let now = night();
        let mut r = record(5, now);
        r.name = "prod-api".to_string();
        let d = engine(false).evaluate(&r, now);
        assert_eq!(d.outcome, Outcome::SkipProtected);
        assert!(matches!(
            d.reason,
            ReasonCode::Protected(ProtectionMatch::Pattern(_))
        ));
    }

    #[test]
    fn approval_gate_blocks_expensive_resources() {
        let now = night();
        let mut r = record(5, now);
        // Unknown class -> pessimistic fallback, but below approval; use a
        // large unit count to cross the threshold
        r.instance_class = Some("p5.48xlarge".to_string());
        r.size_factor = 8.0;
        let d = engine(false).evaluate(&r, now);
        assert_eq!(d.outcome, Outcome::SkipNeedsApproval);
    }

    #[test]
    fn approval_override_lets_expensive_resources_act() {
        let now = night();
        let mut r = record(5, now);
        r.instance_class = Some("p5.48xlarge".to_string());
        r.size_factor = 8.0;
        let d = engine(true).evaluate(&r, now);
        assert_eq!(d.outcome, Outcome::Act);
    }

    #[test]
    fn approval_is_checked_before_schedule() {
        let now = noon();
        let mut r = record(5, now);
        r.instance_class = Some("p5.48xlarge".to_string());
        r.size_factor = 8.0;
        let d = engine(false).evaluate(&r, now);
        assert_eq!(d.outcome, Outcome::SkipNeedsApproval);
    }

    #[test]
    fn business_hours_defer_the_action() {
        let now = noon();
        let d = engine(false).evaluate(&record(5, now), now);
        assert_eq!(d.outcome, Outcome::SkipOutsideWindow);
        assert_eq!(d.reason, ReasonCode::OutsideWindow { hour_utc: 12 });
    }

    #[test]
    fn same_inputs_same_decisions() {
        let now = night();
        let r = record(5, now);
        let engine = engine(false);
        let first = engine.evaluate(&r, now);
        let second = engine.evaluate(&r, now);
        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.reason, second.reason);
    }

    #[test]
    fn malformed_rule_disables_only_that_kind() {
        let mut rules = production_rule();
        rules.insert(
            ResourceKind::ManagedDatabase,
            ProtectionRule {
                blacklist_patterns: vec![String::new()],
                protected_tags: BTreeMap::new(),
            },
        );
        let engine = DecisionEngine::new(
            3,
            false,
            CostThresholds::default(),
            CostTable::default(),
            ScheduleGate::new(BusinessHours::default(), Vec::new()),
            &rules,
        );
        assert!(engine.kind_error(ResourceKind::ManagedDatabase).is_some());
        assert!(engine.kind_error(ResourceKind::ComputeInstance).is_none());

        // The healthy kind still evaluates normally
        let now = night();
        let d = engine.evaluate(&record(5, now), now);
        assert_eq!(d.outcome, Outcome::Act);
    }
}
