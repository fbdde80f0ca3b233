//! Defines the core data models and database queries for transactions.

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, user::UserID};

// ============================================================================
// MODELS
// ============================================================================

/// Alias for the integer type used for transaction IDs.
pub type TransactionId = i64;

/// The kind of financial event a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
    /// Money lent out to a counterparty.
    Credit,
    /// Money borrowed in from a counterparty.
    Debt,
    /// Money moved from general liquidity into a savings goal.
    Saving,
}

impl TransactionKind {
    /// The kind name as stored in the database, e.g. "INCOME".
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "INCOME",
            TransactionKind::Expense => "EXPENSE",
            TransactionKind::Credit => "CREDIT",
            TransactionKind::Debt => "DEBT",
            TransactionKind::Saving => "SAVING",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "INCOME" => Some(TransactionKind::Income),
            "EXPENSE" => Some(TransactionKind::Expense),
            "CREDIT" => Some(TransactionKind::Credit),
            "DEBT" => Some(TransactionKind::Debt),
            "SAVING" => Some(TransactionKind::Saving),
            _ => None,
        }
    }

    /// Whether the resolution state machine applies to this kind.
    pub fn is_loan(&self) -> bool {
        matches!(self, TransactionKind::Credit | TransactionKind::Debt)
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let name = value.as_str()?;
        TransactionKind::from_name(name).ok_or(FromSqlError::InvalidType)
    }
}

/// The settlement state of a CREDIT or DEBT transaction.
///
/// `Settled` and `Defaulted` are both terminal: either way the record stops
/// affecting liquidity. The distinction only matters for the receivables and
/// payables summaries. Other transaction kinds stay `Pending` forever and the
/// state has no effect on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Resolution {
    /// The loan or debt is still open.
    Pending,
    /// The counterparty settled in full.
    Settled,
    /// The counterparty defaulted; the record is closed without repayment.
    Defaulted,
}

impl Resolution {
    /// The resolution name as stored in the database, e.g. "PENDING".
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Pending => "PENDING",
            Resolution::Settled => "SETTLED",
            Resolution::Defaulted => "DEFAULTED",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "PENDING" => Some(Resolution::Pending),
            "SETTLED" => Some(Resolution::Settled),
            "DEFAULTED" => Some(Resolution::Defaulted),
            _ => None,
        }
    }

    /// Whether the record is still open.
    pub fn is_pending(&self) -> bool {
        matches!(self, Resolution::Pending)
    }
}

impl ToSql for Resolution {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Resolution {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let name = value.as_str()?;
        Resolution::from_name(name).ok_or(FromSqlError::InvalidType)
    }
}

/// A financial event recorded by a user.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// The magnitude of money that moved. Always non-negative; the kind
    /// decides the sign of the balance contribution.
    pub amount: f64,
    /// What sort of event this is.
    pub kind: TransactionKind,
    /// A free-text label. For SAVING this is the goal name; for CREDIT and
    /// DEBT it names the counterparty.
    pub category: String,
    /// The account or medium the money moved through, e.g. "CASH".
    pub channel: String,
    /// A free-text annotation, may be empty.
    pub note: String,
    /// When the event occurred (not necessarily when it was recorded).
    pub date: Date,
    /// The settlement state, meaningful for CREDIT and DEBT only.
    pub resolution: Resolution,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: f64, date: Date, kind: TransactionKind, category: &str) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            date,
            kind,
            category: category.to_owned(),
            channel: String::new(),
            note: String::new(),
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// New transactions always start in the `Pending` resolution state; loans are
/// settled later through [set_resolution], never at creation time.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The magnitude of money that moved.
    pub amount: f64,
    /// When the event occurred.
    pub date: Date,
    /// What sort of event this is.
    pub kind: TransactionKind,
    /// Category, goal name, or counterparty depending on `kind`.
    pub category: String,
    /// The account or medium the money moved through.
    pub channel: String,
    /// A free-text annotation.
    pub note: String,
}

impl TransactionBuilder {
    /// Set the channel for the transaction.
    pub fn channel(mut self, channel: &str) -> Self {
        self.channel = channel.to_owned();
        self
    }

    /// Set the note for the transaction.
    pub fn note(mut self, note: &str) -> Self {
        self.note = note.to_owned();
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction owned by `user_id` from a builder.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error,
/// e.g. `user_id` does not refer to a registered user.
pub fn create_transaction(
    user_id: UserID,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (user_id, amount, kind, category, channel, note, date, resolution)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING id, user_id, amount, kind, category, channel, note, date, resolution",
        )?
        .query_row(
            (
                user_id.as_i64(),
                builder.amount,
                builder.kind,
                builder.category,
                builder.channel,
                builder.note,
                builder.date,
                Resolution::Pending,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, user_id, amount, kind, category, channel, note, date, resolution
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve the transactions owned by `user_id`, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn list_transactions_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, kind, category, channel, note, date, resolution
             FROM \"transaction\" WHERE user_id = :user_id
             ORDER BY date DESC, id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Retrieve every transaction in the database, newest first.
///
/// Only the admin console lists across users.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn list_all_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, kind, category, channel, note, date, resolution
             FROM \"transaction\" ORDER BY date DESC, id DESC",
        )?
        .query_map([], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Overwrite the editable fields of the transaction with `id`.
///
/// Editing never re-triggers the reward engine.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "UPDATE \"transaction\"
             SET amount = ?1, kind = ?2, category = ?3, channel = ?4, note = ?5, date = ?6
             WHERE id = ?7
             RETURNING id, user_id, amount, kind, category, channel, note, date, resolution",
        )?
        .query_row(
            (
                builder.amount,
                builder.kind,
                builder.category,
                builder.channel,
                builder.note,
                builder.date,
                id,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Delete the transaction with `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", (id,))?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Set the settlement state of the transaction with `id`.
///
/// This is a state transition on the existing row only. It never deletes or
/// creates records, and it is the only way a loan's liquidity contribution is
/// neutralized. Moving back to `Pending` is allowed as a correction.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn set_resolution(
    id: TransactionId,
    resolution: Resolution,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "UPDATE \"transaction\" SET resolution = ?1 WHERE id = ?2
             RETURNING id, user_id, amount, kind, category, channel, note, date, resolution",
        )?
        .query_row((resolution, id), map_transaction_row)?;

    Ok(transaction)
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                amount REAL NOT NULL,
                kind TEXT NOT NULL,
                category TEXT NOT NULL,
                channel TEXT NOT NULL,
                note TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL,
                resolution TEXT NOT NULL DEFAULT 'PENDING',
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Composite index used by the per-user listing and the dashboard.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let amount = row.get(2)?;
    let kind = row.get(3)?;
    let category = row.get(4)?;
    let channel = row.get(5)?;
    let note = row.get(6)?;
    let date = row.get(7)?;
    let resolution = row.get(8)?;

    Ok(Transaction {
        id,
        user_id,
        amount,
        kind,
        category,
        channel,
        note,
        date,
        resolution,
    })
}

// ============================================================================
// TESTS
// ============================================================================
