//! curfew-sweeper - idle-resource sweeper for AWS
//!
//! This crate provides the `curfew` binary: it inventories resources across
//! regions, runs each through the decision engine in `curfew-common`, applies
//! stop/scale-to-zero/delete actions with dry-run support, and reports the
//! outcome via SNS and CloudWatch.

pub mod aws;
pub mod config;
pub mod executor;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod report;
pub mod wait;
