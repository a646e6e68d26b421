//! Habit persistence.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Habit;

/// Create a new habit.
pub async fn create_habit(pool: &SqlitePool, habit: &Habit) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO habits (id, user_id, name, description, category, goal,
                            positive_actions, negative_actions, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&habit.id)
    .bind(&habit.user_id)
    .bind(&habit.name)
    .bind(&habit.description)
    .bind(&habit.category)
    .bind(&habit.goal)
    .bind(&habit.positive_actions)
    .bind(&habit.negative_actions)
    .bind(habit.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a habit by ID.
pub async fn get_habit(pool: &SqlitePool, id: &str) -> Result<Habit> {
    sqlx::query_as::<_, Habit>(
        r#"
        SELECT id, user_id, name, description, category, goal,
               positive_actions, negative_actions, created_at
        FROM habits
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Habit",
        id: id.to_string(),
    })
}

/// List a user's habits, newest first.
pub async fn list_habits(pool: &SqlitePool, user_id: &str) -> Result<Vec<Habit>> {
    let habits = sqlx::query_as::<_, Habit>(
        r#"
        SELECT id, user_id, name, description, category, goal,
               positive_actions, negative_actions, created_at
        FROM habits
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(habits)
}
