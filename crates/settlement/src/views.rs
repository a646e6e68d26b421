//! Request and response types for the service boundary.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bet_core::{BetOutcome, HabitAction, ParseEnumError};
use database::Bet;

/// Parameters for creating a habit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewHabit {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub goal: Option<String>,
    pub positive_actions: Vec<HabitAction>,
    pub negative_actions: Vec<HabitAction>,
}

/// Parameters for placing a bet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBet {
    pub goal_description: String,
    /// Minor units; must be positive.
    pub stake_amount: i64,
    /// 1 to 365 inclusive.
    pub duration_days: i64,
    pub daily_log_required: bool,
    /// Judge progress against this habit's check-ins.
    pub habit_id: Option<String>,
    /// Opaque reference to the escrow lock, if already placed.
    pub stake_reference: Option<String>,
}

/// What a check-in earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInReceipt {
    pub log_id: String,
    /// Base plus streak bonus.
    pub points_earned: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    /// Extra points from a streak milestone, if one was just reached.
    pub milestone_bonus: Option<i64>,
}

/// The outcome of a settled bet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub bet_id: String,
    pub outcome: BetOutcome,
    /// Human-readable account of the counts behind the outcome.
    pub reason: String,
    pub stake_amount: i64,
    pub user_payout: i64,
    pub platform_rake: i64,
    pub payout_reference: Option<String>,
    pub points_awarded: i64,
    pub resolved_at: DateTime<Utc>,
}

/// Advisory progress numbers for a habit-linked bet.
///
/// Display-only: `on_track` extrapolates the logging pace over elapsed days.
/// The settlement decision is made solely from the recorded counters at
/// resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetProgress {
    pub logged_days: i64,
    pub total_days: i64,
    pub required_days: i64,
    pub percent_complete: i64,
    pub on_track: bool,
}

/// A bet together with derived display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetView {
    pub bet: Bet,
    pub days_remaining: i64,
    pub progress: Option<BetProgress>,
}

/// Which ranking a leaderboard request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardKind {
    /// Total points from the ledger.
    Points,
    /// Single highest active streak across all habits.
    Streak,
}

impl FromStr for LeaderboardKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "points" => Ok(Self::Points),
            "streak" | "streaks" => Ok(Self::Streak),
            other => Err(ParseEnumError::new("leaderboard kind", other)),
        }
    }
}

/// One ranked leaderboard entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based rank.
    pub rank: usize,
    pub wallet_address: String,
    pub username: Option<String>,
    pub value: i64,
}

/// A ranked leaderboard, with the caller's own rank when requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    pub kind: LeaderboardKind,
    pub entries: Vec<LeaderboardEntry>,
    /// The caller's entry over the full ranking, even past the limit cut.
    pub caller_rank: Option<LeaderboardEntry>,
}
