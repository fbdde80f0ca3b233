//! The endpoint for editing an existing transaction.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    timezone::local_today,
    transaction::{
        Transaction, TransactionId, TransactionKind, get_transaction, update_transaction,
    },
    user::UserID,
};

/// The data for editing a transaction. All fields are replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditTransactionData {
    /// The magnitude of money that moved.
    pub amount: f64,
    /// What sort of event this is.
    pub kind: TransactionKind,
    /// Category, goal name, or counterparty depending on `kind`.
    pub category: String,
    /// The account or medium the money moved through.
    #[serde(default)]
    pub channel: String,
    /// A free-text annotation.
    #[serde(default)]
    pub note: String,
    /// When the event occurred. Must not be in the future.
    pub date: Date,
}

/// Handler for editing a transaction.
///
/// Edits never re-trigger the reward engine; coins and streaks are only
/// awarded at creation time. The resolution state is also left untouched.
///
/// # Errors
///
/// Returns a:
/// - [Error::NotFound] if the transaction does not exist or belongs to
///   another user,
/// - [Error::InvalidAmount], [Error::EmptyCategory], or [Error::FutureDate]
///   for invalid field values.
pub async fn edit_transaction_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
    Json(transaction_data): Json<EditTransactionData>,
) -> Result<Json<Transaction>, Error> {
    let today = local_today(&state.local_timezone)?;

    if !transaction_data.amount.is_finite() || transaction_data.amount < 0.0 {
        return Err(Error::InvalidAmount(transaction_data.amount));
    }

    if transaction_data.category.trim().is_empty() {
        return Err(Error::EmptyCategory);
    }

    if transaction_data.date > today {
        return Err(Error::FutureDate(transaction_data.date));
    }

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let existing = get_transaction(transaction_id, &connection)?;
    // Do not reveal whether the transaction exists for someone else.
    if existing.user_id != user_id {
        return Err(Error::NotFound);
    }

    let updated = update_transaction(
        transaction_id,
        Transaction::build(
            transaction_data.amount,
            transaction_data.date,
            transaction_data.kind,
            transaction_data.category.trim(),
        )
        .channel(transaction_data.channel.trim())
        .note(&transaction_data.note),
        &connection,
    )?;

    Ok(Json(updated))
}
