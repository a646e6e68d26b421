//! SQLite persistence layer for HabitStake.
//!
//! This crate provides async database operations for users, habits, check-in
//! logs, streaks, the points ledger, and bets, using SQLx with SQLite.
//!
//! The writes that back the settlement guarantees live here:
//!
//! - [`bet::resolve_bet`] transitions a bet out of `active` with a
//!   conditional update, so concurrent resolution attempts produce exactly
//!   one winner.
//! - [`streak::upsert_streak_guarded`] conditions the streak upsert on the
//!   previously-read `last_log_date`, so concurrent same-day check-ins
//!   cannot double-increment a streak.
//! - [`points::insert_entry`] ignores duplicate dedup keys, so outcome
//!   awards can be retried without double-paying points.
//!
//! # Example
//!
//! ```no_run
//! use database::{user, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:habitstake.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let found = user::get_user_by_wallet(db.pool(), "9xQeWvG8...").await?;
//!     println!("{:?}", found);
//!     Ok(())
//! }
//! ```

pub mod bet;
pub mod error;
pub mod habit;
pub mod log;
pub mod models;
pub mod points;
pub mod streak;
pub mod user;

pub use error::{DatabaseError, Result};
pub use models::{
    Bet, CheckInLog, Habit, LeaderboardRow, Metadata, PointsEntry, Streak, User,
};
pub use sqlx::types::Json;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `sqlite::memory:` for an in-memory database in tests.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!("Connected to database: {} (pool size: {})", url, pool_size);

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up
    /// to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bet_core::{ActionKind, BetOutcome, BetStatus, HabitAction, PointsKind};
    use chrono::{DateTime, NaiveDate, Utc};
    use sqlx::types::Json;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn test_user(id: &str, wallet: &str) -> User {
        User {
            id: id.to_string(),
            wallet_address: wallet.to_string(),
            username: None,
            created_at: ts("2026-08-01T00:00:00Z"),
        }
    }

    fn test_habit(id: &str, user_id: &str) -> Habit {
        Habit {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: "Morning run".to_string(),
            description: None,
            category: Some("fitness".to_string()),
            goal: None,
            positive_actions: Json(vec![HabitAction {
                name: "Ran 5k".to_string(),
                points: 10,
            }]),
            negative_actions: Json(vec![HabitAction {
                name: "Skipped".to_string(),
                points: -5,
            }]),
            created_at: ts("2026-08-01T00:00:00Z"),
        }
    }

    fn test_bet(id: &str, user_id: &str) -> Bet {
        Bet {
            id: id.to_string(),
            user_id: user_id.to_string(),
            habit_id: None,
            goal_description: "Run every day".to_string(),
            stake_amount: 1_000_000,
            duration_days: 10,
            start_date: day("2026-08-01"),
            end_date: day("2026-08-11"),
            status: BetStatus::Active,
            daily_log_required: true,
            missed_days: 0,
            stake_reference: None,
            payout_reference: None,
            created_at: ts("2026-08-01T00:00:00Z"),
            resolved_at: None,
        }
    }

    fn test_log(id: &str, habit_id: &str, user_id: &str, logged_at: &str) -> CheckInLog {
        CheckInLog {
            id: id.to_string(),
            habit_id: habit_id.to_string(),
            user_id: user_id.to_string(),
            action_kind: ActionKind::Positive,
            action_name: "Ran 5k".to_string(),
            points_earned: 10,
            logged_at: ts(logged_at),
        }
    }

    #[tokio::test]
    async fn test_user_round_trip() {
        let db = test_db().await;

        let user = test_user("u1", "wallet-1");
        user::create_user(db.pool(), &user).await.unwrap();

        let fetched = user::get_user(db.pool(), "u1").await.unwrap();
        assert_eq!(fetched, user);

        let by_wallet = user::get_user_by_wallet(db.pool(), "wallet-1")
            .await
            .unwrap();
        assert_eq!(by_wallet, Some(user.clone()));

        assert!(user::get_user_by_wallet(db.pool(), "wallet-2")
            .await
            .unwrap()
            .is_none());

        // duplicate wallet is rejected
        let dup = test_user("u2", "wallet-1");
        let result = user::create_user(db.pool(), &dup).await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_habit_actions_round_trip() {
        let db = test_db().await;
        user::create_user(db.pool(), &test_user("u1", "wallet-1"))
            .await
            .unwrap();

        let habit = test_habit("h1", "u1");
        habit::create_habit(db.pool(), &habit).await.unwrap();

        let fetched = habit::get_habit(db.pool(), "h1").await.unwrap();
        assert_eq!(fetched.positive_actions.0, habit.positive_actions.0);
        assert_eq!(fetched.negative_actions.0[0].points, -5);

        let result = habit::get_habit(db.pool(), "missing").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_guarded_streak_upsert() {
        let db = test_db().await;
        user::create_user(db.pool(), &test_user("u1", "wallet-1"))
            .await
            .unwrap();
        habit::create_habit(db.pool(), &test_habit("h1", "u1"))
            .await
            .unwrap();

        // first write inserts
        let first = Streak {
            id: "s1".to_string(),
            habit_id: "h1".to_string(),
            user_id: "u1".to_string(),
            current_streak: 1,
            longest_streak: 1,
            last_log_date: Some(day("2026-08-01")),
            updated_at: ts("2026-08-01T08:00:00Z"),
        };
        assert!(streak::upsert_streak_guarded(db.pool(), &first, None)
            .await
            .unwrap());

        // next-day write with the correct guard succeeds
        let second = Streak {
            current_streak: 2,
            longest_streak: 2,
            last_log_date: Some(day("2026-08-02")),
            ..first.clone()
        };
        assert!(
            streak::upsert_streak_guarded(db.pool(), &second, Some(day("2026-08-01")))
                .await
                .unwrap()
        );

        // a write racing on a stale guard is rejected and changes nothing
        let stale = Streak {
            current_streak: 3,
            longest_streak: 3,
            last_log_date: Some(day("2026-08-02")),
            ..first.clone()
        };
        assert!(
            !streak::upsert_streak_guarded(db.pool(), &stale, Some(day("2026-08-01")))
                .await
                .unwrap()
        );

        let stored = streak::get_streak(db.pool(), "h1", "u1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.current_streak, 2);
        assert_eq!(stored.last_log_date, Some(day("2026-08-02")));
    }

    #[tokio::test]
    async fn test_count_logged_days_is_distinct_and_inclusive() {
        let db = test_db().await;
        user::create_user(db.pool(), &test_user("u1", "wallet-1"))
            .await
            .unwrap();
        habit::create_habit(db.pool(), &test_habit("h1", "u1"))
            .await
            .unwrap();

        // two logs on the same day, one on the window edges, one outside
        for (id, at) in [
            ("l1", "2026-08-01T08:00:00Z"),
            ("l2", "2026-08-01T21:00:00Z"),
            ("l3", "2026-08-03T12:00:00Z"),
            ("l4", "2026-08-05T23:59:59Z"),
            ("l5", "2026-08-06T00:00:00Z"),
        ] {
            log::insert_log(db.pool(), &test_log(id, "h1", "u1", at))
                .await
                .unwrap();
        }

        let count = log::count_logged_days(
            db.pool(),
            "h1",
            "u1",
            day("2026-08-01"),
            day("2026-08-05"),
        )
        .await
        .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_points_dedup_key() {
        let db = test_db().await;
        user::create_user(db.pool(), &test_user("u1", "wallet-1"))
            .await
            .unwrap();

        let entry = PointsEntry {
            id: "p1".to_string(),
            user_id: "u1".to_string(),
            kind: PointsKind::BetWon,
            amount: 100,
            metadata: Json(Metadata::new()),
            dedup_key: Some("bet-outcome:b1".to_string()),
            created_at: ts("2026-08-11T00:00:00Z"),
        };
        assert!(points::insert_entry(db.pool(), &entry).await.unwrap());

        // same dedup key again: ignored
        let retry = PointsEntry {
            id: "p2".to_string(),
            ..entry.clone()
        };
        assert!(!points::insert_entry(db.pool(), &retry).await.unwrap());

        assert_eq!(points::total_for_user(db.pool(), "u1").await.unwrap(), 100);

        // entries without a dedup key stack freely
        let plain = PointsEntry {
            id: "p3".to_string(),
            kind: PointsKind::HabitLog,
            amount: 15,
            dedup_key: None,
            ..entry.clone()
        };
        assert!(points::insert_entry(db.pool(), &plain).await.unwrap());
        let plain2 = PointsEntry {
            id: "p4".to_string(),
            ..plain.clone()
        };
        assert!(points::insert_entry(db.pool(), &plain2).await.unwrap());
        assert_eq!(points::total_for_user(db.pool(), "u1").await.unwrap(), 130);
    }

    #[tokio::test]
    async fn test_conditional_bet_resolution() {
        let db = test_db().await;
        user::create_user(db.pool(), &test_user("u1", "wallet-1"))
            .await
            .unwrap();

        let bet = test_bet("b1", "u1");
        bet::create_bet(db.pool(), &bet).await.unwrap();

        let resolved_at = ts("2026-08-11T00:00:00Z");
        assert!(
            bet::resolve_bet(db.pool(), "b1", BetOutcome::Won, resolved_at, Some("sig-1"))
                .await
                .unwrap()
        );

        // a second resolution attempt loses the conditional write
        assert!(
            !bet::resolve_bet(db.pool(), "b1", BetOutcome::Lost, resolved_at, None)
                .await
                .unwrap()
        );

        let stored = bet::get_bet(db.pool(), "b1").await.unwrap();
        assert_eq!(stored.status, BetStatus::Won);
        assert_eq!(stored.resolved_at, Some(resolved_at));
        assert_eq!(stored.payout_reference.as_deref(), Some("sig-1"));
    }

    #[tokio::test]
    async fn test_missed_days_only_while_active() {
        let db = test_db().await;
        user::create_user(db.pool(), &test_user("u1", "wallet-1"))
            .await
            .unwrap();
        bet::create_bet(db.pool(), &test_bet("b1", "u1")).await.unwrap();

        assert!(bet::set_missed_days(db.pool(), "b1", 2).await.unwrap());
        assert_eq!(bet::get_bet(db.pool(), "b1").await.unwrap().missed_days, 2);

        bet::resolve_bet(
            db.pool(),
            "b1",
            BetOutcome::Won,
            ts("2026-08-11T00:00:00Z"),
            None,
        )
        .await
        .unwrap();

        // resolved bets are immutable
        assert!(!bet::set_missed_days(db.pool(), "b1", 9).await.unwrap());
        assert_eq!(bet::get_bet(db.pool(), "b1").await.unwrap().missed_days, 2);
    }

    #[tokio::test]
    async fn test_leaderboards() {
        let db = test_db().await;
        for (id, wallet) in [("u1", "w1"), ("u2", "w2"), ("u3", "w3")] {
            user::create_user(db.pool(), &test_user(id, wallet))
                .await
                .unwrap();
        }
        for (id, user_id, amount) in [("p1", "u1", 100), ("p2", "u2", 40), ("p3", "u2", 70)] {
            let entry = PointsEntry {
                id: id.to_string(),
                user_id: user_id.to_string(),
                kind: PointsKind::HabitLog,
                amount,
                metadata: Json(Metadata::new()),
                dedup_key: None,
                created_at: ts("2026-08-01T00:00:00Z"),
            };
            points::insert_entry(db.pool(), &entry).await.unwrap();
        }

        let rows = points::points_leaderboard(db.pool()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].user_id, "u2");
        assert_eq!(rows[0].value, 110);
        assert_eq!(rows[1].user_id, "u1");
        assert_eq!(rows[1].value, 100);

        // streak board excludes zero streaks
        habit::create_habit(db.pool(), &test_habit("h1", "u1"))
            .await
            .unwrap();
        habit::create_habit(db.pool(), &test_habit("h2", "u3"))
            .await
            .unwrap();
        for (id, habit_id, user_id, current) in [("s1", "h1", "u1", 4), ("s2", "h2", "u3", 0)] {
            let row = Streak {
                id: id.to_string(),
                habit_id: habit_id.to_string(),
                user_id: user_id.to_string(),
                current_streak: current,
                longest_streak: current,
                last_log_date: None,
                updated_at: ts("2026-08-01T00:00:00Z"),
            };
            streak::init_streak(db.pool(), &row).await.unwrap();
        }

        let rows = points::streak_leaderboard(db.pool()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, "u1");
        assert_eq!(rows[0].value, 4);
    }
}
