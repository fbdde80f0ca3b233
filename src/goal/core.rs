//! Goal model, storage, and the progress computation.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    transaction::{Transaction, TransactionKind},
    user::UserID,
};

/// Alias for the integer type used for goal IDs.
pub type GoalId = i64;

/// A savings objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// The ID of the goal.
    pub id: GoalId,
    /// The user that owns the goal.
    pub user_id: UserID,
    /// The display name, e.g. "Europe Trip".
    pub name: String,
    /// The canonical form of `name` used for matching transactions.
    ///
    /// Written once at creation time so matching never depends on how the
    /// transaction form happened to capitalize the goal name.
    pub slug: String,
    /// The amount the user wants to save up.
    pub target_amount: f64,
    /// When the goal was created.
    pub created_at: OffsetDateTime,
    /// Whether the goal-reached celebration has already fired.
    pub celebrated: bool,
}

/// The canonical, match-safe form of a goal or category name.
pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Create the goal table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS goal (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                target_amount REAL NOT NULL,
                created_at TEXT NOT NULL,
                celebrated INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Goal.
fn map_goal_row(row: &Row) -> Result<Goal, rusqlite::Error> {
    Ok(Goal {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        slug: row.get(3)?,
        target_amount: row.get(4)?,
        created_at: row.get(5)?,
        celebrated: row.get(6)?,
    })
}

/// Create a new goal owned by `user_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn create_goal(
    user_id: UserID,
    name: &str,
    target_amount: f64,
    connection: &Connection,
) -> Result<Goal, Error> {
    let goal = connection
        .prepare(
            "INSERT INTO goal (user_id, name, slug, target_amount, created_at, celebrated)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)
             RETURNING id, user_id, name, slug, target_amount, created_at, celebrated",
        )?
        .query_row(
            (
                user_id.as_i64(),
                name,
                slugify(name),
                target_amount,
                OffsetDateTime::now_utc(),
            ),
            map_goal_row,
        )?;

    Ok(goal)
}

/// Retrieve a goal by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid goal,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_goal(id: GoalId, connection: &Connection) -> Result<Goal, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, slug, target_amount, created_at, celebrated
             FROM goal WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_goal_row)
        .map_err(|error| error.into())
}

/// Retrieve the goals owned by `user_id`, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn list_goals(user_id: UserID, connection: &Connection) -> Result<Vec<Goal>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, slug, target_amount, created_at, celebrated
             FROM goal WHERE user_id = :user_id ORDER BY created_at DESC, id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_goal_row)?
        .map(|maybe_goal| maybe_goal.map_err(|error| error.into()))
        .collect()
}

/// Delete the goal with `id`.
///
/// The SAVING transactions that funded the goal are history and stay put.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid goal,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_goal(id: GoalId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM goal WHERE id = ?1", (id,))?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Record that the goal-reached celebration has fired for the goal with `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid goal,
/// - or [Error::SqlError] there is some other SQL error.
pub fn mark_celebrated(id: GoalId, connection: &Connection) -> Result<(), Error> {
    let rows_affected =
        connection.execute("UPDATE goal SET celebrated = 1 WHERE id = ?1", (id,))?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// A goal with its derived progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    /// The ID of the goal.
    pub id: GoalId,
    /// The display name.
    pub name: String,
    /// The amount the user wants to save up.
    pub target_amount: f64,
    /// The summed SAVING contributions matching the goal.
    pub saved: f64,
    /// Percent of the target reached, clamped to 100.
    pub progress: f64,
    /// The amount still missing, never negative.
    pub remaining: f64,
    /// Whether the target has been reached.
    pub is_reached: bool,
    /// True exactly once: on the first read after the goal reached 100%.
    pub just_reached: bool,
}

/// Compute the progress of `goal` from the owner's transactions.
///
/// Contributions are SAVING transactions whose category matches the goal name
/// after normalization. Progress is monotone in the contributions and clamped
/// at 100 regardless of overshoot. `just_reached` is left false; the endpoint
/// layer sets it from the persisted celebration flag.
pub fn goal_progress(goal: &Goal, transactions: &[Transaction]) -> GoalProgress {
    let saved: f64 = transactions
        .iter()
        .filter(|transaction| {
            transaction.kind == TransactionKind::Saving
                && slugify(&transaction.category) == goal.slug
        })
        .map(|transaction| transaction.amount)
        .sum();

    let progress = if goal.target_amount > 0.0 {
        (saved / goal.target_amount * 100.0).min(100.0)
    } else {
        0.0
    };

    GoalProgress {
        id: goal.id,
        name: goal.name.clone(),
        target_amount: goal.target_amount,
        saved,
        progress,
        remaining: (goal.target_amount - saved).max(0.0),
        is_reached: progress >= 100.0,
        just_reached: false,
    }
}
