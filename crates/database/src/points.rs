//! Points ledger persistence.
//!
//! The ledger is append-only. Totals and rankings are always derived by
//! aggregation at query time so they can never drift from the entries.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{LeaderboardRow, PointsEntry};

/// Append a ledger entry.
///
/// Returns `false` when the entry carried a `dedup_key` that already exists;
/// the ledger is unchanged in that case. This is what makes retrying an
/// outcome award safe.
pub async fn insert_entry(pool: &SqlitePool, entry: &PointsEntry) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO points (id, user_id, kind, amount, metadata,
                                      dedup_key, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.user_id)
    .bind(entry.kind.as_str())
    .bind(entry.amount)
    .bind(&entry.metadata)
    .bind(&entry.dedup_key)
    .bind(entry.created_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// A user's total score: the sum of all their ledger entries.
pub async fn total_for_user(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM points
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(total)
}

/// Recent ledger entries for a user, newest first.
pub async fn list_entries(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<PointsEntry>> {
    let entries = sqlx::query_as::<_, PointsEntry>(
        r#"
        SELECT id, user_id, kind, amount, metadata, dedup_key, created_at
        FROM points
        WHERE user_id = ?
        ORDER BY created_at DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// All users ranked by total points, descending. Ties break on user id so
/// the order is consistent within one query.
pub async fn points_leaderboard(pool: &SqlitePool) -> Result<Vec<LeaderboardRow>> {
    let rows = sqlx::query_as::<_, LeaderboardRow>(
        r#"
        SELECT u.id AS user_id, u.wallet_address, u.username,
               SUM(p.amount) AS value
        FROM points p
        JOIN users u ON u.id = p.user_id
        GROUP BY p.user_id
        ORDER BY value DESC, u.id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// All users ranked by their single highest active streak across habits,
/// descending. Users whose best streak is zero are excluded.
pub async fn streak_leaderboard(pool: &SqlitePool) -> Result<Vec<LeaderboardRow>> {
    let rows = sqlx::query_as::<_, LeaderboardRow>(
        r#"
        SELECT u.id AS user_id, u.wallet_address, u.username,
               MAX(s.current_streak) AS value
        FROM streaks s
        JOIN users u ON u.id = s.user_id
        GROUP BY s.user_id
        HAVING MAX(s.current_streak) > 0
        ORDER BY value DESC, u.id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
