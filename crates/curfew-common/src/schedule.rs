//! Allowed action windows over wall-clock hours
//!
//! Destructive actions run only outside business hours and — when
//! cost-optimized cleanup windows are configured — only inside one of those
//! windows. All hours are UTC. Ranges wrap across midnight, so `22-6` covers
//! the late evening and the early morning as one window.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed schedule configuration. Fatal: the run cannot start without a
/// usable schedule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleConfigError {
    #[error("invalid hour `{0}`: expected 0-23")]
    InvalidHour(String),

    #[error("invalid hour range `{0}`: expected `H` or `H-H`")]
    InvalidRange(String),
}

/// Inclusive hour range; wraps across midnight when `start > end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourRange {
    pub start: u8,
    pub end: u8,
}

impl HourRange {
    pub fn contains(&self, hour: u8) -> bool {
        if self.start <= self.end {
            hour >= self.start && hour <= self.end
        } else {
            hour >= self.start || hour <= self.end
        }
    }
}

fn parse_hour(s: &str) -> Result<u8, ScheduleConfigError> {
    let hour: u8 = s
        .trim()
        .parse()
        .map_err(|_| ScheduleConfigError::InvalidHour(s.trim().to_string()))?;
    if hour > 23 {
        return Err(ScheduleConfigError::InvalidHour(s.trim().to_string()));
    }
    Ok(hour)
}

/// Parse a window spec like `"22-23,0-6"` or `"2"` into hour ranges.
pub fn parse_windows(spec: &str) -> Result<Vec<HourRange>, ScheduleConfigError> {
    let mut windows = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let range = match part.split_once('-') {
            Some((start, end)) => HourRange {
                start: parse_hour(start)?,
                end: parse_hour(end)?,
            },
            None => {
                let hour = parse_hour(part)?;
                HourRange {
                    start: hour,
                    end: hour,
                }
            }
        };
        windows.push(range);
    }
    Ok(windows)
}

/// Business hours during which no action runs. Half-open: `start <= h < end`,
/// wrapping across midnight; `start == end` disables the exclusion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusinessHours {
    pub start: u8,
    pub end: u8,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self { start: 8, end: 18 }
    }
}

impl BusinessHours {
    fn contains(&self, hour: u8) -> bool {
        if self.start == self.end {
            false
        } else if self.start < self.end {
            hour >= self.start && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

/// Decides whether the current hour permits destructive actions
#[derive(Debug, Clone)]
pub struct ScheduleGate {
    business_hours: BusinessHours,
    /// Cost-optimized cleanup windows; empty means no window constraint
    cleanup_windows: Vec<HourRange>,
}

impl ScheduleGate {
    pub fn new(business_hours: BusinessHours, cleanup_windows: Vec<HourRange>) -> Self {
        Self {
            business_hours,
            cleanup_windows,
        }
    }

    /// Actions are allowed outside business hours and, when cleanup windows
    /// are configured, only inside one of them.
    pub fn allows(&self, hour_utc: u8) -> bool {
        if self.business_hours.contains(hour_utc) {
            return false;
        }
        if self.cleanup_windows.is_empty() {
            return true;
        }
        self.cleanup_windows.iter().any(|w| w.contains(hour_utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_hours_and_ranges() {
        let windows = parse_windows("22-23,0-6").unwrap();
        assert_eq!(
            windows,
            vec![
                HourRange { start: 22, end: 23 },
                HourRange { start: 0, end: 6 }
            ]
        );

        let windows = parse_windows("2").unwrap();
        assert_eq!(windows, vec![HourRange { start: 2, end: 2 }]);
    }

    #[test]
    fn parse_rejects_bad_hours() {
        assert_eq!(
            parse_windows("25"),
            Err(ScheduleConfigError::InvalidHour("25".to_string()))
        );
        assert!(parse_windows("a-b").is_err());
    }

    #[test]
    fn empty_spec_means_no_windows() {
        assert!(parse_windows("").unwrap().is_empty());
        assert!(parse_windows(" , ").unwrap().is_empty());
    }

    #[test]
    fn range_wraps_across_midnight() {
        let range = HourRange { start: 22, end: 6 };
        assert!(range.contains(23));
        assert!(range.contains(0));
        assert!(range.contains(2));
        assert!(range.contains(6));
        assert!(!range.contains(12));
        assert!(!range.contains(21));
    }

    #[test]
    fn configured_windows_allow_23_and_2_not_12() {
        let gate = ScheduleGate::new(
            BusinessHours { start: 8, end: 18 },
            parse_windows("22-23,0-6").unwrap(),
        );
        assert!(gate.allows(23));
        assert!(gate.allows(2));
        assert!(!gate.allows(12));
    }

    #[test]
    fn business_hours_exclude_even_without_windows() {
        let gate = ScheduleGate::new(BusinessHours { start: 8, end: 18 }, Vec::new());
        assert!(!gate.allows(8));
        assert!(!gate.allows(12));
        assert!(!gate.allows(17));
        // Half-open: end itself is allowed
        assert!(gate.allows(18));
        assert!(gate.allows(3));
    }

    #[test]
    fn business_hours_wrap_across_midnight() {
        let gate = ScheduleGate::new(BusinessHours { start: 22, end: 2 }, Vec::new());
        assert!(!gate.allows(23));
        assert!(!gate.allows(1));
        assert!(gate.allows(2));
        assert!(gate.allows(12));
    }

    #[test]
    fn disabled_business_hours_allow_everything() {
        let gate = ScheduleGate::new(BusinessHours { start: 0, end: 0 }, Vec::new());
        for hour in 0..24 {
            assert!(gate.allows(hour));
        }
    }

    #[test]
    fn window_inside_business_hours_is_still_excluded() {
        // Business hours win over a configured window
        let gate = ScheduleGate::new(
            BusinessHours { start: 8, end: 18 },
            parse_windows("10-11").unwrap(),
        );
        assert!(!gate.allows(10));
    }
}
