//! Core types and settlement rules for HabitStake.
//!
//! This crate holds the pure, storage-free half of the system:
//!
//! - [`BetStatus`] / [`BetOutcome`] - the bet state machine vocabulary
//! - [`advance`] - the calendar-day streak transition
//! - [`check_in_points`] / [`PointsConfig`] - point accrual with streak bonuses
//! - [`determine_outcome`] / [`compute_payout`] - how an expired stake is judged
//!   and split between the user and the platform
//! - [`Clock`] / [`IdGenerator`] - injected collaborators, so every rule above
//!   is deterministic under test
//!
//! # Example
//!
//! ```rust
//! use bet_core::{compute_payout, determine_outcome, BetOutcome, BetTerms};
//!
//! let terms = BetTerms {
//!     duration_days: 10,
//!     daily_log_required: true,
//!     missed_days: 2,
//! };
//! let decision = determine_outcome(&terms, None);
//! assert_eq!(decision.outcome, BetOutcome::Won);
//!
//! let payout = compute_payout(1_000_000, decision.outcome);
//! assert_eq!(payout.user_payout + payout.platform_rake, 1_000_000);
//! ```

mod clock;
mod error;
mod points;
mod settle;
mod streak;
mod types;

pub use clock::{Clock, FixedClock, IdGenerator, SequentialIds, SystemClock};
pub use error::{ParseEnumError, ValidationError};
pub use points::{check_in_points, milestone_reached, outcome_points, PointsConfig};
pub use settle::{
    compute_payout, determine_outcome, missed_days_threshold, required_logged_days,
    validate_missed_days, validate_new_bet, BetTerms, OutcomeDecision, MAX_DURATION_DAYS,
    MIN_DURATION_DAYS, RAKE_PERCENT,
};
pub use streak::{advance, StreakSnapshot, StreakUpdate};
pub use types::{ActionKind, BetOutcome, BetStatus, HabitAction, Payout, PointsKind};
