//! Age eligibility evaluation
//!
//! A resource becomes eligible once it has existed for at least the
//! configured number of days. A missing or unparsable creation timestamp
//! makes the resource ineligible rather than eligible: when the age is
//! unknown the sweeper must not act.

use chrono::{DateTime, Utc};

/// Result of checking a resource's age against the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeCheck {
    /// Old enough to act on
    Eligible { age_days: i64 },
    /// Younger than the threshold
    TooYoung { age_days: i64 },
    /// Creation timestamp missing or unparsable; never acted on
    UnknownAge,
}

impl AgeCheck {
    pub fn is_eligible(self) -> bool {
        matches!(self, AgeCheck::Eligible { .. })
    }
}

/// Compare a resource's age to `max_age_days` at the given clock.
pub fn evaluate_age(
    created_at: Option<DateTime<Utc>>,
    max_age_days: u32,
    now: DateTime<Utc>,
) -> AgeCheck {
    let Some(created) = created_at else {
        return AgeCheck::UnknownAge;
    };

    let age_days = (now - created).num_days();
    if age_days >= i64::from(max_age_days) {
        AgeCheck::Eligible { age_days }
    } else {
        AgeCheck::TooYoung { age_days }
    }
}
