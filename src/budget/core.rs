//! Budget model, storage, and the saturation computation.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Month;

use crate::{
    Error,
    ledger::monthly_category_spending,
    transaction::Transaction,
    user::UserID,
};

/// Alias for the integer type used for budget IDs.
pub type BudgetId = i64;

/// A spending cap for one expense category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The user that owns the budget.
    pub user_id: UserID,
    /// The guarded expense category.
    pub category: String,
    /// The monthly spending cap.
    pub cap: f64,
}

/// Create the budget table.
///
/// One budget per user and category; setting a cap twice updates in place.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                category TEXT NOT NULL,
                cap REAL NOT NULL,
                UNIQUE(user_id, category),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        category: row.get(2)?,
        cap: row.get(3)?,
    })
}

/// Set the cap for a category, inserting or updating as needed.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn upsert_budget(
    user_id: UserID,
    category: &str,
    cap: f64,
    connection: &Connection,
) -> Result<Budget, Error> {
    let budget = connection
        .prepare(
            "INSERT INTO budget (user_id, category, cap) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, category) DO UPDATE SET cap = excluded.cap
             RETURNING id, user_id, category, cap",
        )?
        .query_row((user_id.as_i64(), category, cap), map_budget_row)?;

    Ok(budget)
}

/// Retrieve a budget by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid budget,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_budget(id: BudgetId, connection: &Connection) -> Result<Budget, Error> {
    connection
        .prepare("SELECT id, user_id, category, cap FROM budget WHERE id = :id")?
        .query_row(&[(":id", &id)], map_budget_row)
        .map_err(|error| error.into())
}

/// Retrieve the budgets owned by `user_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn list_budgets(user_id: UserID, connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, category, cap FROM budget
             WHERE user_id = :user_id ORDER BY category",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_budget_row)?
        .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
        .collect()
}

/// Delete the budget with `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid budget,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_budget(id: BudgetId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM budget WHERE id = ?1", (id,))?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// One budget with its derived saturation for the evaluated month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The guarded expense category.
    pub category: String,
    /// The monthly spending cap.
    pub cap: f64,
    /// The matching expense spend in the evaluated month.
    pub spent: f64,
    /// Percent of the cap consumed. Not clamped, so the overshoot is visible.
    pub progress: f64,
    /// `cap - spent`; negative when breached, and the magnitude of the
    /// negative value is the breach size.
    pub remaining: f64,
    /// Whether the spend exceeds the cap.
    pub is_breached: bool,
}

/// The evaluation of all of a user's budgets for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetReport {
    /// Per-budget saturation, in category order.
    pub budgets: Vec<BudgetStatus>,
    /// The summed caps.
    pub total_cap: f64,
    /// The month's total expense spend across all categories, budgeted or not.
    pub total_spent: f64,
    /// `total_spent / total_cap` as a percentage, 0 when no caps are set.
    pub saturation: f64,
}

/// Evaluate `budgets` against the month's expenses.
///
/// Pure: reads the fully-materialized transaction list and derives every
/// number fresh, so callers may re-run it on every request.
pub fn evaluate_budgets(
    budgets: &[Budget],
    transactions: &[Transaction],
    year: i32,
    month: Month,
) -> BudgetReport {
    let spending = monthly_category_spending(transactions, year, month);
    let spent_for = |category: &str| {
        spending
            .iter()
            .find(|spend| spend.category == category)
            .map(|spend| spend.total)
            .unwrap_or(0.0)
    };

    let statuses: Vec<BudgetStatus> = budgets
        .iter()
        .map(|budget| {
            let spent = spent_for(&budget.category);
            let progress = if budget.cap > 0.0 {
                spent / budget.cap * 100.0
            } else {
                0.0
            };

            BudgetStatus {
                id: budget.id,
                category: budget.category.clone(),
                cap: budget.cap,
                spent,
                progress,
                remaining: budget.cap - spent,
                is_breached: spent > budget.cap,
            }
        })
        .collect();

    let total_cap: f64 = budgets.iter().map(|budget| budget.cap).sum();
    let total_spent: f64 = spending.iter().map(|spend| spend.total).sum();
    let saturation = if total_cap > 0.0 {
        total_spent / total_cap * 100.0
    } else {
        0.0
    };

    BudgetReport {
        budgets: statuses,
        total_cap,
        total_spent,
        saturation,
    }
}
