//! Shared vocabulary types for bets, habits, and the points ledger.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;

/// Lifecycle state of a bet.
///
/// `Active` is the only initial state. The three terminal states are reached
/// exactly once, through the guarded resolution path, and never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Active,
    Won,
    Lost,
    Forfeited,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Won => "won",
            Self::Lost => "lost",
            Self::Forfeited => "forfeited",
        }
    }

    /// Whether the bet has left `Active`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BetStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "won" => Ok(Self::Won),
            "lost" => Ok(Self::Lost),
            "forfeited" => Ok(Self::Forfeited),
            other => Err(ParseEnumError::new("bet status", other)),
        }
    }
}

impl TryFrom<String> for BetStatus {
    type Error = ParseEnumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Terminal result of a resolved bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetOutcome {
    Won,
    Lost,
    Forfeited,
}

impl BetOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Won => "won",
            Self::Lost => "lost",
            Self::Forfeited => "forfeited",
        }
    }

    /// Ledger tag for the outcome award, if the outcome earns points.
    pub fn points_kind(&self) -> Option<PointsKind> {
        match self {
            Self::Won => Some(PointsKind::BetWon),
            Self::Lost => Some(PointsKind::BetLost),
            Self::Forfeited => None,
        }
    }
}

impl fmt::Display for BetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<BetOutcome> for BetStatus {
    fn from(outcome: BetOutcome) -> Self {
        match outcome {
            BetOutcome::Won => Self::Won,
            BetOutcome::Lost => Self::Lost,
            BetOutcome::Forfeited => Self::Forfeited,
        }
    }
}

/// Classification of a habit action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Positive,
    Negative,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            other => Err(ParseEnumError::new("action kind", other)),
        }
    }
}

impl TryFrom<String> for ActionKind {
    type Error = ParseEnumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Tag on a points ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsKind {
    HabitLog,
    HabitCreated,
    BetCreated,
    StreakMilestone,
    BetWon,
    BetLost,
}

impl PointsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HabitLog => "habit_log",
            Self::HabitCreated => "habit_created",
            Self::BetCreated => "bet_created",
            Self::StreakMilestone => "streak_milestone",
            Self::BetWon => "bet_won",
            Self::BetLost => "bet_lost",
        }
    }
}

impl fmt::Display for PointsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointsKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "habit_log" => Ok(Self::HabitLog),
            "habit_created" => Ok(Self::HabitCreated),
            "bet_created" => Ok(Self::BetCreated),
            "streak_milestone" => Ok(Self::StreakMilestone),
            "bet_won" => Ok(Self::BetWon),
            "bet_lost" => Ok(Self::BetLost),
            other => Err(ParseEnumError::new("points kind", other)),
        }
    }
}

impl TryFrom<String> for PointsKind {
    type Error = ParseEnumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// One named action on a habit, with the point delta it earns.
///
/// Positive actions carry non-negative deltas; negative actions carry
/// non-positive deltas (conventionally negative).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitAction {
    pub name: String,
    pub points: i64,
}

/// How a resolved stake splits between the user and the platform.
///
/// Invariant: `user_payout + platform_rake` equals the stake exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Minor units returned to the user.
    pub user_payout: i64,
    /// Minor units retained by the platform treasury.
    pub platform_rake: i64,
}
