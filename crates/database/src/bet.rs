//! Bet persistence.
//!
//! The two conditional writes here (`set_missed_days`, `resolve_bet`) are
//! guarded on `status = 'active'`. Of two concurrent resolution attempts,
//! exactly one update succeeds; the loser sees zero rows affected.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use bet_core::{BetOutcome, BetStatus};

use crate::error::{DatabaseError, Result};
use crate::models::Bet;

const BET_COLUMNS: &str = r#"
    id, user_id, habit_id, goal_description, stake_amount, duration_days,
    start_date, end_date, status, daily_log_required, missed_days,
    stake_reference, payout_reference, created_at, resolved_at
"#;

/// Create a new bet.
pub async fn create_bet(pool: &SqlitePool, bet: &Bet) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bets (id, user_id, habit_id, goal_description, stake_amount,
                          duration_days, start_date, end_date, status,
                          daily_log_required, missed_days, stake_reference,
                          payout_reference, created_at, resolved_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&bet.id)
    .bind(&bet.user_id)
    .bind(&bet.habit_id)
    .bind(&bet.goal_description)
    .bind(bet.stake_amount)
    .bind(bet.duration_days)
    .bind(bet.start_date)
    .bind(bet.end_date)
    .bind(bet.status.as_str())
    .bind(bet.daily_log_required)
    .bind(bet.missed_days)
    .bind(&bet.stake_reference)
    .bind(&bet.payout_reference)
    .bind(bet.created_at)
    .bind(bet.resolved_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a bet by ID.
pub async fn get_bet(pool: &SqlitePool, id: &str) -> Result<Bet> {
    sqlx::query_as::<_, Bet>(&format!(
        r#"
        SELECT {BET_COLUMNS}
        FROM bets
        WHERE id = ?
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Bet",
        id: id.to_string(),
    })
}

/// List a user's bets, newest first, optionally filtered by status.
pub async fn list_bets(
    pool: &SqlitePool,
    user_id: &str,
    status: Option<BetStatus>,
) -> Result<Vec<Bet>> {
    let bets = match status {
        Some(status) => {
            sqlx::query_as::<_, Bet>(&format!(
                r#"
                SELECT {BET_COLUMNS}
                FROM bets
                WHERE user_id = ? AND status = ?
                ORDER BY created_at DESC
                "#
            ))
            .bind(user_id)
            .bind(status.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Bet>(&format!(
                r#"
                SELECT {BET_COLUMNS}
                FROM bets
                WHERE user_id = ?
                ORDER BY created_at DESC
                "#
            ))
            .bind(user_id)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(bets)
}

/// Overwrite the missed-day counter (set semantics, last write wins).
///
/// Returns `false` if the bet is no longer active; resolved bets are
/// immutable.
pub async fn set_missed_days(pool: &SqlitePool, bet_id: &str, missed_days: i64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE bets
        SET missed_days = ?
        WHERE id = ? AND status = 'active'
        "#,
    )
    .bind(missed_days)
    .bind(bet_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Transition an active bet to a terminal state.
///
/// The `status = 'active'` guard makes this at-most-once: of two concurrent
/// resolution attempts, only the first returns `true`.
pub async fn resolve_bet(
    pool: &SqlitePool,
    bet_id: &str,
    outcome: BetOutcome,
    resolved_at: DateTime<Utc>,
    payout_reference: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE bets
        SET status = ?, resolved_at = ?, payout_reference = ?
        WHERE id = ? AND status = 'active'
        "#,
    )
    .bind(BetStatus::from(outcome).as_str())
    .bind(resolved_at)
    .bind(payout_reference)
    .bind(bet_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Attach a settlement reference that arrived after resolution.
///
/// The only field of a resolved bet that may still change.
pub async fn attach_payout_reference(
    pool: &SqlitePool,
    bet_id: &str,
    payout_reference: &str,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE bets
        SET payout_reference = ?
        WHERE id = ?
        "#,
    )
    .bind(payout_reference)
    .bind(bet_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Bet",
            id: bet_id.to_string(),
        });
    }

    Ok(())
}
