//! Storage port for the settlement service.
//!
//! The service depends on this trait rather than on a concrete database, so
//! the conditional-write guarantees can be exercised against the in-memory
//! implementation without a live store. [`SqliteStore`] is the production
//! implementation; [`MemoryStore`] backs unit tests and local development.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use bet_core::{BetOutcome, BetStatus};
use database::{Bet, CheckInLog, Habit, LeaderboardRow, PointsEntry, Result, Streak, User};

/// Persistence operations the settlement service needs.
///
/// The three boolean-returning writes are conditional: `false` means the
/// guard failed (another writer got there first), never that the operation
/// errored.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<()>;
    async fn user_by_wallet(&self, wallet_address: &str) -> Result<Option<User>>;

    async fn create_habit(&self, habit: &Habit) -> Result<()>;
    async fn habit(&self, id: &str) -> Result<Habit>;

    async fn insert_log(&self, log: &CheckInLog) -> Result<()>;

    /// Distinct calendar days with check-ins in the inclusive window.
    async fn count_logged_days(
        &self,
        habit_id: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64>;

    async fn streak(&self, habit_id: &str, user_id: &str) -> Result<Option<Streak>>;

    /// Initialize a zeroed streak row for a new habit; no-op if present.
    async fn init_streak(&self, streak: &Streak) -> Result<()>;

    /// Upsert a streak row, conditioned on the previously-read
    /// `last_log_date`. Returns `false` when a concurrent check-in won.
    async fn upsert_streak(&self, streak: &Streak, prev_last_log_date: Option<NaiveDate>)
        -> Result<bool>;

    /// Append a ledger entry. Returns `false` when its dedup key exists.
    async fn insert_points(&self, entry: &PointsEntry) -> Result<bool>;

    /// Sum of all ledger entries for a user.
    async fn points_total(&self, user_id: &str) -> Result<i64>;

    /// Recent ledger entries for a user, newest first.
    async fn points_history(&self, user_id: &str, limit: i64) -> Result<Vec<PointsEntry>>;

    async fn points_leaderboard(&self) -> Result<Vec<LeaderboardRow>>;
    async fn streak_leaderboard(&self) -> Result<Vec<LeaderboardRow>>;

    /// Recent check-ins for a habit, newest first.
    async fn list_logs(&self, habit_id: &str, limit: i64) -> Result<Vec<CheckInLog>>;

    async fn create_bet(&self, bet: &Bet) -> Result<()>;
    async fn bet(&self, id: &str) -> Result<Bet>;
    async fn list_bets(&self, user_id: &str, status: Option<BetStatus>) -> Result<Vec<Bet>>;

    /// Overwrite the missed-day counter. Returns `false` once the bet has
    /// left `active`.
    async fn set_missed_days(&self, bet_id: &str, missed_days: i64) -> Result<bool>;

    /// Transition an active bet to the outcome's terminal status. Returns
    /// `false` if the bet was no longer active, so resolution is
    /// at-most-once.
    async fn resolve_bet(
        &self,
        bet_id: &str,
        outcome: BetOutcome,
        resolved_at: DateTime<Utc>,
        payout_reference: Option<&str>,
    ) -> Result<bool>;

    /// Attach a settlement reference to a bet after resolution.
    async fn attach_payout_reference(&self, bet_id: &str, payout_reference: &str) -> Result<()>;
}
