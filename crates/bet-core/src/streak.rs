//! Calendar-day streak transitions.
//!
//! Streak continuity is judged on calendar days in the deployment's reference
//! timezone, never on wall-clock deltas, so a 23:59 check-in followed by a
//! 00:01 check-in still counts as adjacent days.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Streak state as last persisted for a (habit, user) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSnapshot {
    pub current: i64,
    pub longest: i64,
    pub last_log_date: Option<NaiveDate>,
}

/// Result of applying one check-in day to a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakUpdate {
    pub current: i64,
    pub longest: i64,
    /// False when the day was already logged and the values are unchanged.
    pub advanced: bool,
}

/// Apply a check-in on `today` to an existing streak, or start a new one.
///
/// - Same day as the last log: values unchanged (re-logging is idempotent).
/// - Last log was yesterday: the run continues, `current` grows by one.
/// - Gap of two or more days, or first log ever: `current` resets to 1.
///
/// `longest` is monotonic. A reset never erases it.
pub fn advance(prev: Option<&StreakSnapshot>, today: NaiveDate) -> StreakUpdate {
    let Some(prev) = prev else {
        return StreakUpdate {
            current: 1,
            longest: 1,
            advanced: true,
        };
    };

    match prev.last_log_date {
        Some(last) if last == today => StreakUpdate {
            current: prev.current,
            longest: prev.longest,
            advanced: false,
        },
        Some(last) if Some(last) == today.pred_opt() => {
            let current = prev.current + 1;
            StreakUpdate {
                current,
                longest: prev.longest.max(current),
                advanced: true,
            }
        }
        _ => StreakUpdate {
            current: 1,
            longest: prev.longest.max(1),
            advanced: true,
        },
    }
}
