//! Outcome determination and payout arithmetic for expired bets.
//!
//! All value arithmetic is integer floor division on minor units. Rounding
//! remainders are always assigned to the platform side so that the split is
//! exact: `user_payout + platform_rake == stake_amount`.

use crate::error::ValidationError;
use crate::types::{BetOutcome, Payout};

/// Shortest allowed bet duration.
pub const MIN_DURATION_DAYS: i64 = 1;
/// Longest allowed bet duration.
pub const MAX_DURATION_DAYS: i64 = 365;
/// Platform cut, in percent, skimmed from the returned half of a lost stake.
pub const RAKE_PERCENT: i64 = 5;

/// The bet fields that outcome determination reads.
#[derive(Debug, Clone, Copy)]
pub struct BetTerms {
    pub duration_days: i64,
    pub daily_log_required: bool,
    pub missed_days: i64,
}

/// An outcome plus the human-readable audit trail of how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeDecision {
    pub outcome: BetOutcome,
    pub reason: String,
}

/// Missed days above this forfeit a bet that requires daily logging.
///
/// 30% of the duration, floored.
pub fn missed_days_threshold(duration_days: i64) -> i64 {
    duration_days * 3 / 10
}

/// Distinct logged days needed to win a habit-linked bet.
///
/// 70% of the duration, rounded up.
pub fn required_logged_days(duration_days: i64) -> i64 {
    (duration_days * 7 + 9) / 10
}

/// Judge an expired bet.
///
/// `logged_days` is the snapshot count of distinct check-in days inside the
/// bet window, supplied only for habit-linked bets; pass `None` otherwise.
///
/// 1. Daily logging required and too many missed days: forfeited.
/// 2. Habit-linked with daily logging: won iff at least 70% of days logged.
/// 3. Otherwise the missed-day threshold alone decides won or lost.
pub fn determine_outcome(terms: &BetTerms, logged_days: Option<i64>) -> OutcomeDecision {
    let threshold = missed_days_threshold(terms.duration_days);

    if terms.daily_log_required && terms.missed_days > threshold {
        return OutcomeDecision {
            outcome: BetOutcome::Forfeited,
            reason: format!(
                "Missed {} days (threshold: {})",
                terms.missed_days, threshold
            ),
        };
    }

    if terms.daily_log_required {
        if let Some(logged) = logged_days {
            let required = required_logged_days(terms.duration_days);
            return if logged >= required {
                OutcomeDecision {
                    outcome: BetOutcome::Won,
                    reason: format!(
                        "Logged {}/{} days (required: {})",
                        logged, terms.duration_days, required
                    ),
                }
            } else {
                OutcomeDecision {
                    outcome: BetOutcome::Lost,
                    reason: format!(
                        "Only logged {}/{} days (required: {})",
                        logged, terms.duration_days, required
                    ),
                }
            };
        }
    }

    if terms.missed_days <= threshold {
        OutcomeDecision {
            outcome: BetOutcome::Won,
            reason: format!(
                "Completed with {} missed days (threshold: {})",
                terms.missed_days, threshold
            ),
        }
    } else {
        OutcomeDecision {
            outcome: BetOutcome::Lost,
            reason: format!(
                "Missed {} days (threshold: {})",
                terms.missed_days, threshold
            ),
        }
    }
}

/// Split a stake according to the outcome.
///
/// - Won: the full stake returns to the user, no rake.
/// - Lost: half the stake is at risk. The user gets the floored half minus a
///   5% rake on it; the platform keeps the unreturned half plus that rake.
/// - Forfeited: the platform keeps everything.
pub fn compute_payout(stake_amount: i64, outcome: BetOutcome) -> Payout {
    let payout = match outcome {
        BetOutcome::Won => Payout {
            user_payout: stake_amount,
            platform_rake: 0,
        },
        BetOutcome::Lost => {
            let half = stake_amount / 2;
            let rake = half * RAKE_PERCENT / 100;
            Payout {
                user_payout: half - rake,
                platform_rake: rake + (stake_amount - half),
            }
        }
        BetOutcome::Forfeited => Payout {
            user_payout: 0,
            platform_rake: stake_amount,
        },
    };
    debug_assert_eq!(payout.user_payout + payout.platform_rake, stake_amount);
    payout
}

/// Validate bet creation parameters.
pub fn validate_new_bet(stake_amount: i64, duration_days: i64) -> Result<(), ValidationError> {
    if stake_amount <= 0 {
        return Err(ValidationError::InvalidStake(stake_amount));
    }
    if !(MIN_DURATION_DAYS..=MAX_DURATION_DAYS).contains(&duration_days) {
        return Err(ValidationError::InvalidDuration(duration_days));
    }
    Ok(())
}

/// Validate a missed-day count pushed by the scheduler.
pub fn validate_missed_days(count: i64) -> Result<(), ValidationError> {
    if count < 0 {
        return Err(ValidationError::InvalidCount(count));
    }
    Ok(())
}
