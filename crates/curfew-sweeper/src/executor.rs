//! Action execution
//!
//! Applies ACT decisions through the provider, honoring dry-run. Each
//! decision gets exactly one attempt; provider failures are classified and
//! reported, never propagated past the resource.

use crate::aws::error::classify_sdk_error;
use crate::aws::provider::ResourceProvider;
use crate::aws::tags::sweep_reason;
use chrono::Utc;
use curfew_common::{ActionOutcome, Decision, ReasonCode, ResourceRecord};
use tracing::{debug, info, warn};

/// Outcome of one execution attempt, with the failure message when there is
/// one.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub outcome: ActionOutcome,
    pub error: Option<String>,
}

impl ExecutionResult {
    fn succeeded() -> Self {
        Self {
            outcome: ActionOutcome::Succeeded,
            error: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            outcome: ActionOutcome::Failed,
            error: Some(message),
        }
    }
}

/// Apply one ACT decision.
///
/// In dry-run mode this records the would-be action and returns success
/// without touching the provider — no side effects, no waiting. In live
/// mode it applies the kind's action, waits for the terminal state where
/// the kind has one, and marker-tags the resource best-effort.
pub async fn execute<P: ResourceProvider>(
    provider: &P,
    record: &ResourceRecord,
    decision: &mut Decision,
    dry_run: bool,
) -> ExecutionResult {
    debug_assert!(decision.outcome.is_act());
    decision.applied_at = Some(Utc::now());

    let action = record.kind.action();
    if dry_run {
        info!(
            resource = %decision.resource,
            action = %action,
            "[DRY RUN] Would apply action"
        );
        return ExecutionResult::succeeded();
    }

    if let Err(e) = provider.apply_action(record).await {
        let classified = classify_sdk_error(&e);
        if classified.is_already_settled() {
            // Gone or already transitioning between scan and act: the goal
            // state holds, so the action is idempotently complete
            debug!(
                resource = %decision.resource,
                error = %classified,
                "Action already settled"
            );
            return ExecutionResult::succeeded();
        }
        warn!(resource = %decision.resource, error = ?e, "Action failed");
        return ExecutionResult::failed(classified.to_string());
    }

    if record.kind.awaits_terminal_state() {
        if let Err(e) = provider.await_terminal_state(record).await {
            warn!(
                resource = %decision.resource,
                error = ?e,
                "Resource did not reach terminal state"
            );
            return ExecutionResult::failed(format!("did not reach terminal state: {e}"));
        }
    }

    // Marker tagging is informational; a tagging failure does not undo a
    // successful action
    let reason = match &decision.reason {
        ReasonCode::AgeExceeded { age_days, .. } => sweep_reason(*age_days),
        other => other.to_string(),
    };
    if let Err(e) = provider.tag_swept(record, &reason).await {
        warn!(resource = %decision.resource, error = ?e, "Failed to apply sweep tags");
    }

    info!(resource = %decision.resource, action = %action, "Action applied");
    ExecutionResult::succeeded()
}
