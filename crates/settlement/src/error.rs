//! Error types for settlement operations.

use bet_core::{BetOutcome, BetStatus, ValidationError};
use chrono::NaiveDate;
use database::DatabaseError;
use thiserror::Error;

/// Errors that can occur while operating on bets, check-ins, and points.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// Rejected input. Never retried.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The bet already left `active`. The caller acted on stale state.
    #[error("bet already resolved with status: {status}")]
    AlreadyResolved { status: BetStatus },

    /// Resolution attempted before the bet's end date.
    #[error("bet cannot be resolved before its end date ({end_date})")]
    TooEarly { end_date: NaiveDate },

    /// Outcome points requested for a bet that has not been resolved.
    #[error("bet {bet_id} is still active")]
    StillActive { bet_id: String },

    /// Entity lookup failed.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Underlying store failure. Safe for the caller to retry with backoff;
    /// this layer never retries on its own.
    #[error("storage error: {0}")]
    Storage(DatabaseError),

    /// A store call exceeded the configured timeout. No partial mutation
    /// was made.
    #[error("storage operation timed out")]
    StorageTimeout,

    /// The bet transition committed but the outcome points append failed.
    ///
    /// The settlement itself is final; only the award is missing. Retry
    /// just the points step; the deterministic dedup key makes that
    /// idempotent.
    #[error("bet {bet_id} settled as {outcome} but awarding {points} points failed")]
    PartialSettlement {
        bet_id: String,
        outcome: BetOutcome,
        points: i64,
        #[source]
        source: Box<SettlementError>,
    },
}

impl From<DatabaseError> for SettlementError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Storage(other),
        }
    }
}
