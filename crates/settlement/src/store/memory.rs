//! In-memory store for tests and local development.
//!
//! Mirrors the conditional-write semantics of the SQLite layer: guarded
//! streak upserts, active-only bet transitions, and dedup-keyed points
//! appends all behave the same way here, so the service's concurrency
//! discipline can be unit-tested without a database.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use bet_core::{BetOutcome, BetStatus};
use database::{
    Bet, CheckInLog, DatabaseError, Habit, LeaderboardRow, PointsEntry, Result, Streak, User,
};

use super::Store;

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    habits: HashMap<String, Habit>,
    logs: Vec<CheckInLog>,
    streaks: HashMap<(String, String), Streak>,
    points: Vec<PointsEntry>,
    bets: HashMap<String, Bet>,
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    fail_points: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next points append fail with a storage error.
    ///
    /// Lets tests exercise the partial-settlement path.
    pub fn fail_next_points_append(&self) {
        self.fail_points.store(true, Ordering::SeqCst);
    }

    /// All ledger entries for a user, in append order.
    pub async fn points_for_user(&self, user_id: &str) -> Vec<PointsEntry> {
        self.inner
            .read()
            .await
            .points
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.wallet_address == user.wallet_address)
        {
            return Err(DatabaseError::AlreadyExists {
                entity: "User",
                id: user.wallet_address.clone(),
            });
        }
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn user_by_wallet(&self, wallet_address: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.wallet_address == wallet_address)
            .cloned())
    }

    async fn create_habit(&self, habit: &Habit) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.habits.insert(habit.id.clone(), habit.clone());
        Ok(())
    }

    async fn habit(&self, id: &str) -> Result<Habit> {
        let inner = self.inner.read().await;
        inner
            .habits
            .get(id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "Habit",
                id: id.to_string(),
            })
    }

    async fn insert_log(&self, log: &CheckInLog) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.logs.push(log.clone());
        Ok(())
    }

    async fn count_logged_days(
        &self,
        habit_id: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64> {
        let inner = self.inner.read().await;
        let days: HashSet<NaiveDate> = inner
            .logs
            .iter()
            .filter(|l| l.habit_id == habit_id && l.user_id == user_id)
            .map(|l| l.logged_at.date_naive())
            .filter(|d| (from..=to).contains(d))
            .collect();
        Ok(days.len() as i64)
    }

    async fn streak(&self, habit_id: &str, user_id: &str) -> Result<Option<Streak>> {
        let inner = self.inner.read().await;
        Ok(inner
            .streaks
            .get(&(habit_id.to_string(), user_id.to_string()))
            .cloned())
    }

    async fn init_streak(&self, streak: &Streak) -> Result<()> {
        let mut inner = self.inner.write().await;
        let key = (streak.habit_id.clone(), streak.user_id.clone());
        inner.streaks.entry(key).or_insert_with(|| streak.clone());
        Ok(())
    }

    async fn upsert_streak(
        &self,
        streak: &Streak,
        prev_last_log_date: Option<NaiveDate>,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let key = (streak.habit_id.clone(), streak.user_id.clone());
        match inner.streaks.get(&key) {
            None => {
                if prev_last_log_date.is_some() {
                    return Ok(false);
                }
                inner.streaks.insert(key, streak.clone());
                Ok(true)
            }
            Some(existing) if existing.last_log_date == prev_last_log_date => {
                inner.streaks.insert(key, streak.clone());
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }

    async fn insert_points(&self, entry: &PointsEntry) -> Result<bool> {
        if self.fail_points.swap(false, Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable(
                "injected points append failure".to_string(),
            ));
        }
        let mut inner = self.inner.write().await;
        if let Some(key) = &entry.dedup_key {
            if inner
                .points
                .iter()
                .any(|e| e.dedup_key.as_deref() == Some(key))
            {
                return Ok(false);
            }
        }
        inner.points.push(entry.clone());
        Ok(true)
    }

    async fn points_total(&self, user_id: &str) -> Result<i64> {
        let inner = self.inner.read().await;
        Ok(inner
            .points
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.amount)
            .sum())
    }

    async fn points_history(&self, user_id: &str, limit: i64) -> Result<Vec<PointsEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<PointsEntry> = inner
            .points
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn points_leaderboard(&self) -> Result<Vec<LeaderboardRow>> {
        let inner = self.inner.read().await;
        let mut totals: HashMap<&str, i64> = HashMap::new();
        for entry in &inner.points {
            *totals.entry(entry.user_id.as_str()).or_default() += entry.amount;
        }
        Ok(ranked_rows(&inner.users, totals))
    }

    async fn streak_leaderboard(&self) -> Result<Vec<LeaderboardRow>> {
        let inner = self.inner.read().await;
        let mut best: HashMap<&str, i64> = HashMap::new();
        for streak in inner.streaks.values() {
            let entry = best.entry(streak.user_id.as_str()).or_default();
            *entry = (*entry).max(streak.current_streak);
        }
        best.retain(|_, v| *v > 0);
        Ok(ranked_rows(&inner.users, best))
    }

    async fn list_logs(&self, habit_id: &str, limit: i64) -> Result<Vec<CheckInLog>> {
        let inner = self.inner.read().await;
        let mut logs: Vec<CheckInLog> = inner
            .logs
            .iter()
            .filter(|l| l.habit_id == habit_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
        logs.truncate(limit.max(0) as usize);
        Ok(logs)
    }

    async fn create_bet(&self, bet: &Bet) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.bets.insert(bet.id.clone(), bet.clone());
        Ok(())
    }

    async fn bet(&self, id: &str) -> Result<Bet> {
        let inner = self.inner.read().await;
        inner
            .bets
            .get(id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "Bet",
                id: id.to_string(),
            })
    }

    async fn list_bets(&self, user_id: &str, status: Option<BetStatus>) -> Result<Vec<Bet>> {
        let inner = self.inner.read().await;
        let mut bets: Vec<Bet> = inner
            .bets
            .values()
            .filter(|b| b.user_id == user_id && status.map_or(true, |s| b.status == s))
            .cloned()
            .collect();
        bets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bets)
    }

    async fn set_missed_days(&self, bet_id: &str, missed_days: i64) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.bets.get_mut(bet_id) {
            Some(bet) if bet.status == BetStatus::Active => {
                bet.missed_days = missed_days;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn resolve_bet(
        &self,
        bet_id: &str,
        outcome: BetOutcome,
        resolved_at: DateTime<Utc>,
        payout_reference: Option<&str>,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.bets.get_mut(bet_id) {
            Some(bet) if bet.status == BetStatus::Active => {
                bet.status = outcome.into();
                bet.resolved_at = Some(resolved_at);
                bet.payout_reference = payout_reference.map(str::to_string);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn attach_payout_reference(&self, bet_id: &str, payout_reference: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.bets.get_mut(bet_id) {
            Some(bet) => {
                bet.payout_reference = Some(payout_reference.to_string());
                Ok(())
            }
            None => Err(DatabaseError::NotFound {
                entity: "Bet",
                id: bet_id.to_string(),
            }),
        }
    }
}

fn ranked_rows(users: &HashMap<String, User>, values: HashMap<&str, i64>) -> Vec<LeaderboardRow> {
    let mut rows: Vec<LeaderboardRow> = values
        .into_iter()
        .filter_map(|(user_id, value)| {
            users.get(user_id).map(|user| LeaderboardRow {
                user_id: user.id.clone(),
                wallet_address: user.wallet_address.clone(),
                username: user.username.clone(),
                value,
            })
        })
        .collect();
    rows.sort_by(|a, b| b.value.cmp(&a.value).then(a.user_id.cmp(&b.user_id)));
    rows
}
