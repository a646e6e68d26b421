//! Streak persistence.
//!
//! The guarded upsert here is the only mutation path for streak state. The
//! unique (habit_id, user_id) key plus the `last_log_date` condition make
//! concurrent same-day check-ins converge on a single increment.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::Streak;

/// Get the streak row for a (habit, user) pair, if one exists.
pub async fn get_streak(
    pool: &SqlitePool,
    habit_id: &str,
    user_id: &str,
) -> Result<Option<Streak>> {
    let streak = sqlx::query_as::<_, Streak>(
        r#"
        SELECT id, habit_id, user_id, current_streak, longest_streak,
               last_log_date, updated_at
        FROM streaks
        WHERE habit_id = ? AND user_id = ?
        "#,
    )
    .bind(habit_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(streak)
}

/// Insert or update the streak row for `(streak.habit_id, streak.user_id)`,
/// but only if the stored `last_log_date` still equals `prev_last_log_date`
/// (the value read before computing the new state).
///
/// Returns `false` when the guard failed: a concurrent check-in updated the
/// row first. The caller should re-read and treat the day as already logged.
pub async fn upsert_streak_guarded(
    pool: &SqlitePool,
    streak: &Streak,
    prev_last_log_date: Option<NaiveDate>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO streaks (id, habit_id, user_id, current_streak,
                             longest_streak, last_log_date, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(habit_id, user_id) DO UPDATE SET
            current_streak = excluded.current_streak,
            longest_streak = excluded.longest_streak,
            last_log_date = excluded.last_log_date,
            updated_at = excluded.updated_at
        WHERE streaks.last_log_date IS ?
        "#,
    )
    .bind(&streak.id)
    .bind(&streak.habit_id)
    .bind(&streak.user_id)
    .bind(streak.current_streak)
    .bind(streak.longest_streak)
    .bind(streak.last_log_date)
    .bind(streak.updated_at)
    .bind(prev_last_log_date)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Initialize a zeroed streak row for a new habit. Ignored if one exists.
pub async fn init_streak(pool: &SqlitePool, streak: &Streak) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO streaks (id, habit_id, user_id, current_streak,
                                       longest_streak, last_log_date, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&streak.id)
    .bind(&streak.habit_id)
    .bind(&streak.user_id)
    .bind(streak.current_streak)
    .bind(streak.longest_streak)
    .bind(streak.last_log_date)
    .bind(streak.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}
