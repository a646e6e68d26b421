//! Database models.

use bet_core::{ActionKind, BetStatus, HabitAction, PointsKind};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Open string-keyed metadata attached to a points ledger entry.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A user, anchored to a unique wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    /// Opaque, stable wallet address (e.g., a base58 public key).
    pub wallet_address: String,
    /// Optional display name.
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A named behavior with point-earning and point-losing actions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub goal: Option<String>,
    /// Actions with non-negative point deltas.
    pub positive_actions: Json<Vec<HabitAction>>,
    /// Actions with non-positive point deltas.
    pub negative_actions: Json<Vec<HabitAction>>,
    pub created_at: DateTime<Utc>,
}

/// An immutable record of one action performed on one habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CheckInLog {
    pub id: String,
    pub habit_id: String,
    pub user_id: String,
    #[sqlx(try_from = "String")]
    pub action_kind: ActionKind,
    pub action_name: String,
    /// Base plus streak bonus, computed at creation and never recomputed.
    pub points_earned: i64,
    pub logged_at: DateTime<Utc>,
}

/// Streak state for one (habit, user) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Streak {
    pub id: String,
    pub habit_id: String,
    pub user_id: String,
    pub current_streak: i64,
    /// Maximum `current_streak` ever observed for the pair. Monotonic.
    pub longest_streak: i64,
    pub last_log_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the append-only points ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PointsEntry {
    pub id: String,
    pub user_id: String,
    #[sqlx(try_from = "String")]
    pub kind: PointsKind,
    pub amount: i64,
    pub metadata: Json<Metadata>,
    /// When set, at most one entry with this key can ever exist.
    pub dedup_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A staking commitment against a behavioral goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Bet {
    pub id: String,
    pub user_id: String,
    pub habit_id: Option<String>,
    pub goal_description: String,
    /// Positive, in minor units of the staking asset.
    pub stake_amount: i64,
    pub duration_days: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: BetStatus,
    pub daily_log_required: bool,
    pub missed_days: i64,
    /// Opaque escrow lock reference, stored but never interpreted.
    pub stake_reference: Option<String>,
    /// Opaque settlement reference, absent until paid out.
    pub payout_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// One aggregated leaderboard row, joined with the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LeaderboardRow {
    pub user_id: String,
    pub wallet_address: String,
    pub username: Option<String>,
    /// Total points or maximum current streak, depending on the query.
    pub value: i64,
}
