//! Settlement orchestrator for HabitStake.
//!
//! This crate coordinates the bet lifecycle over a pluggable [`Store`]:
//!
//! - [`SettlementService::create_bet`] validates and opens a staking
//!   commitment
//! - [`SettlementService::record_check_in`] advances streaks and accrues
//!   points for habit activity
//! - [`SettlementService::update_missed_days`] accepts scheduler pushes of
//!   the missed-day counter
//! - [`SettlementService::resolve_bet`] judges an expired bet, splits the
//!   stake, persists the terminal transition exactly once, and awards
//!   outcome points
//! - [`SettlementService::leaderboard`] ranks users by points or streaks
//!
//! # Architecture
//!
//! ```text
//! check-in ──> streak upsert (guarded) ──> points ledger (habit_log,
//!     │                                     streak_milestone)
//!     └──> immutable log row
//!
//! resolve ──> outcome determination (reads logged-day snapshot)
//!     ──> payout split (integer minor units, remainder to platform)
//!     ──> conditional status write (active -> won | lost | forfeited)
//!     ──> points ledger (bet_won | bet_lost, dedup-keyed)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use database::Database;
//! use settlement::{NewBet, SettlementService, SqliteStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:habitstake.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let service = SettlementService::with_defaults(SqliteStore::new(db));
//!     let bet = service
//!         .create_bet(
//!             "9xQeWvG8...",
//!             NewBet {
//!                 goal_description: "Run every day for a month".to_string(),
//!                 stake_amount: 1_000_000,
//!                 duration_days: 30,
//!                 daily_log_required: true,
//!                 habit_id: None,
//!                 stake_reference: None,
//!             },
//!         )
//!         .await?;
//!     println!("bet {} runs until {}", bet.id, bet.end_date);
//!     Ok(())
//! }
//! ```

mod error;
mod ids;
mod service;
mod store;
mod views;

pub use error::SettlementError;
pub use ids::UuidIds;
pub use service::{ServiceConfig, SettlementService};
pub use store::{MemoryStore, SqliteStore, Store};
pub use views::{
    BetProgress, BetView, CheckInReceipt, Leaderboard, LeaderboardEntry, LeaderboardKind, NewBet,
    NewHabit, Resolution,
};

// Re-export commonly used types from dependencies
pub use bet_core::{
    ActionKind, BetOutcome, BetStatus, Clock, FixedClock, HabitAction, IdGenerator, Payout,
    PointsConfig, PointsKind, SystemClock,
};
pub use database::{Bet, CheckInLog, Habit, PointsEntry, Streak, User};
