//! SQLite-backed store, delegating to the `database` crate.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use bet_core::{BetOutcome, BetStatus};
use database::{
    bet, habit, log, points, streak, user, Bet, CheckInLog, Database, Habit, LeaderboardRow,
    PointsEntry, Result, Streak, User,
};

use super::Store;

/// Production store backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Access the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_user(&self, record: &User) -> Result<()> {
        user::create_user(self.db.pool(), record).await
    }

    async fn user_by_wallet(&self, wallet_address: &str) -> Result<Option<User>> {
        user::get_user_by_wallet(self.db.pool(), wallet_address).await
    }

    async fn create_habit(&self, record: &Habit) -> Result<()> {
        habit::create_habit(self.db.pool(), record).await
    }

    async fn habit(&self, id: &str) -> Result<Habit> {
        habit::get_habit(self.db.pool(), id).await
    }

    async fn insert_log(&self, record: &CheckInLog) -> Result<()> {
        log::insert_log(self.db.pool(), record).await
    }

    async fn count_logged_days(
        &self,
        habit_id: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64> {
        log::count_logged_days(self.db.pool(), habit_id, user_id, from, to).await
    }

    async fn streak(&self, habit_id: &str, user_id: &str) -> Result<Option<Streak>> {
        streak::get_streak(self.db.pool(), habit_id, user_id).await
    }

    async fn init_streak(&self, record: &Streak) -> Result<()> {
        streak::init_streak(self.db.pool(), record).await
    }

    async fn upsert_streak(
        &self,
        record: &Streak,
        prev_last_log_date: Option<NaiveDate>,
    ) -> Result<bool> {
        streak::upsert_streak_guarded(self.db.pool(), record, prev_last_log_date).await
    }

    async fn insert_points(&self, entry: &PointsEntry) -> Result<bool> {
        points::insert_entry(self.db.pool(), entry).await
    }

    async fn points_total(&self, user_id: &str) -> Result<i64> {
        points::total_for_user(self.db.pool(), user_id).await
    }

    async fn points_history(&self, user_id: &str, limit: i64) -> Result<Vec<PointsEntry>> {
        points::list_entries(self.db.pool(), user_id, limit).await
    }

    async fn points_leaderboard(&self) -> Result<Vec<LeaderboardRow>> {
        points::points_leaderboard(self.db.pool()).await
    }

    async fn streak_leaderboard(&self) -> Result<Vec<LeaderboardRow>> {
        points::streak_leaderboard(self.db.pool()).await
    }

    async fn list_logs(&self, habit_id: &str, limit: i64) -> Result<Vec<CheckInLog>> {
        log::list_logs(self.db.pool(), habit_id, limit).await
    }

    async fn create_bet(&self, record: &Bet) -> Result<()> {
        bet::create_bet(self.db.pool(), record).await
    }

    async fn bet(&self, id: &str) -> Result<Bet> {
        bet::get_bet(self.db.pool(), id).await
    }

    async fn list_bets(&self, user_id: &str, status: Option<BetStatus>) -> Result<Vec<Bet>> {
        bet::list_bets(self.db.pool(), user_id, status).await
    }

    async fn set_missed_days(&self, bet_id: &str, missed_days: i64) -> Result<bool> {
        bet::set_missed_days(self.db.pool(), bet_id, missed_days).await
    }

    async fn resolve_bet(
        &self,
        bet_id: &str,
        outcome: BetOutcome,
        resolved_at: DateTime<Utc>,
        payout_reference: Option<&str>,
    ) -> Result<bool> {
        bet::resolve_bet(self.db.pool(), bet_id, outcome, resolved_at, payout_reference).await
    }

    async fn attach_payout_reference(&self, bet_id: &str, payout_reference: &str) -> Result<()> {
        bet::attach_payout_reference(self.db.pool(), bet_id, payout_reference).await
    }
}
