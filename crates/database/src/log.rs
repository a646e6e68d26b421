//! Check-in log persistence.
//!
//! Logs are append-only: there is deliberately no update or delete here.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::CheckInLog;

/// Insert a check-in record.
pub async fn insert_log(pool: &SqlitePool, log: &CheckInLog) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO logs (id, habit_id, user_id, action_kind, action_name,
                          points_earned, logged_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&log.id)
    .bind(&log.habit_id)
    .bind(&log.user_id)
    .bind(log.action_kind.as_str())
    .bind(&log.action_name)
    .bind(log.points_earned)
    .bind(log.logged_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Recent check-ins for a habit, newest first.
pub async fn list_logs(pool: &SqlitePool, habit_id: &str, limit: i64) -> Result<Vec<CheckInLog>> {
    let logs = sqlx::query_as::<_, CheckInLog>(
        r#"
        SELECT id, habit_id, user_id, action_kind, action_name,
               points_earned, logged_at
        FROM logs
        WHERE habit_id = ?
        ORDER BY logged_at DESC
        LIMIT ?
        "#,
    )
    .bind(habit_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(logs)
}

/// Count the distinct calendar days with check-ins for a habit inside an
/// inclusive date window.
///
/// Distinct days, not raw rows: several same-day check-ins count once toward
/// a bet's logged-days requirement.
pub async fn count_logged_days(
    pool: &SqlitePool,
    habit_id: &str,
    user_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT date(logged_at))
        FROM logs
        WHERE habit_id = ? AND user_id = ?
          AND date(logged_at) BETWEEN ? AND ?
        "#,
    )
    .bind(habit_id)
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
