//! curfew-common - Resource-lifecycle decision engine
//!
//! This crate holds the pure core of the sweeper: the resource model and the
//! evaluators that turn a discovered resource into an act/skip decision. It
//! has no AWS dependencies so the decision logic can be tested without a
//! cloud account.
//!
//! ## Modules
//!
//! - [`resource_kind`]: the closed set of swept resource kinds
//! - [`record`]: immutable resource snapshots from discovery
//! - [`age`]: age eligibility against the configured threshold
//! - [`protection`]: name-pattern blacklists and tag whitelists
//! - [`cost`]: coarse monthly-cost estimation and tiering
//! - [`schedule`]: allowed action windows over wall-clock hours
//! - [`decision`]: the priority-ordered decision aggregator
//! - [`summary`]: mergeable per-run outcome accumulation
//! - [`policy`]: the sweep policy document

pub mod age;
pub mod cost;
pub mod decision;
pub mod policy;
pub mod protection;
pub mod record;
pub mod resource_kind;
pub mod schedule;
pub mod summary;

// Re-export commonly used types
pub use age::AgeCheck;
pub use cost::{CostEstimate, CostTable, CostThresholds, CostTier};
pub use decision::{Decision, DecisionEngine, Outcome, ReasonCode};
pub use policy::SweepPolicy;
pub use protection::{CompiledProtection, ProtectionMatch, ProtectionRule};
pub use record::{ResourceRecord, ResourceRef};
pub use resource_kind::{Action, ResourceKind};
pub use schedule::ScheduleGate;
pub use summary::{ActionOutcome, OutcomeCounts, RunSummary};
