//! Error types for core validation and parsing.

use thiserror::Error;

/// Rejected input. Surfaced to the caller unmodified, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Stake must be a positive number of minor units.
    #[error("stake amount must be positive (got {0})")]
    InvalidStake(i64),

    /// Duration outside the allowed range.
    #[error("duration must be between 1 and 365 days (got {0})")]
    InvalidDuration(i64),

    /// The referenced habit belongs to a different user.
    #[error("habit {habit_id} does not belong to user {user_id}")]
    ForeignHabit { habit_id: String, user_id: String },

    /// Missed-day counts are non-negative.
    #[error("missed day count must be non-negative (got {0})")]
    InvalidCount(i64),
}

/// A stored tag did not match any known enum value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub(crate) kind: &'static str,
    pub(crate) value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
