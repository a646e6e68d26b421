//! Point accrual rules: check-in bonuses, milestones, outcome awards.

use crate::streak::StreakUpdate;
use crate::types::BetOutcome;

/// Tunable point amounts, injected into the service rather than read from
/// ambient state. `Default` carries the canonical production values.
#[derive(Debug, Clone)]
pub struct PointsConfig {
    /// Base points for a check-in when the caller supplies none.
    pub default_base_points: i64,
    /// Bonus per day of current streak, applied to positive check-ins.
    pub streak_bonus_per_day: i64,
    /// Ceiling on the per-check-in streak bonus.
    pub streak_bonus_cap: i64,
    /// Streak lengths that are a positive multiple of this earn a milestone.
    pub milestone_interval: i64,
    /// Flat award for reaching a milestone streak length.
    pub milestone_bonus: i64,
    /// Award for creating a habit.
    pub habit_created_points: i64,
    /// Award for placing a bet.
    pub bet_created_points: i64,
    /// Award for winning a bet.
    pub bet_won_points: i64,
    /// Consolation award for losing a bet.
    pub bet_lost_points: i64,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            default_base_points: 10,
            streak_bonus_per_day: 5,
            streak_bonus_cap: 50,
            milestone_interval: 7,
            milestone_bonus: 50,
            habit_created_points: 25,
            bet_created_points: 50,
            bet_won_points: 100,
            bet_lost_points: 25,
        }
    }
}

/// Points earned by one check-in: base plus a capped streak bonus.
///
/// The bonus only amplifies positive actions. A penalty (base <= 0) is
/// recorded as-is, never inflated by the streak.
pub fn check_in_points(base: i64, current_streak: i64, config: &PointsConfig) -> i64 {
    if base <= 0 {
        return base;
    }
    let bonus = (current_streak * config.streak_bonus_per_day).min(config.streak_bonus_cap);
    base + bonus
}

/// Whether this check-in just carried the streak onto a milestone length.
///
/// Only an advancing check-in qualifies. A same-day re-log that leaves the
/// streak sitting on a multiple of the interval earns nothing.
pub fn milestone_reached(update: &StreakUpdate, config: &PointsConfig) -> bool {
    update.advanced && update.current > 0 && update.current % config.milestone_interval == 0
}

/// Flat award for a bet outcome. Forfeited bets earn nothing.
pub fn outcome_points(outcome: BetOutcome, config: &PointsConfig) -> i64 {
    match outcome {
        BetOutcome::Won => config.bet_won_points,
        BetOutcome::Lost => config.bet_lost_points,
        BetOutcome::Forfeited => 0,
    }
}
