//! The endpoint for recording a new transaction.
//!
//! Creating a transaction is the one operation that both writes the ledger
//! and mutates the user record: the insert and the coin/streak write-back run
//! inside a single SQL transaction so concurrent clients can never observe or
//! produce a half-applied reward.

use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    reward::register_entry,
    timezone::local_today,
    transaction::{Transaction, TransactionKind, create_transaction},
    user::{UserID, UserProfile, apply_entry_reward, get_user_by_id},
};

/// The data for creating a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionData {
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

/// The created transaction together with the rewarded user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionResponse {
    /// The stored transaction.
    pub transaction: Transaction,
    /// The owner's profile after coins, streak, and tier were updated.
    pub user: UserProfile,
}

/// Handler for creating a transaction.
///
/// Persists the transaction and applies the reward engine (coins, streak,
/// tier) to the caller's user record as one atomic step.
///
/// # Errors
///
/// Returns a:
/// - [Error::InvalidAmount] if the amount is negative or not finite,
/// - [Error::EmptyCategory] if the category is blank,
/// - [Error::FutureDate] if the date is after today in the reference timezone.
pub async fn create_transaction_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Json(transaction_data): Json<CreateTransactionData>,
) -> Result<(StatusCode, Json<CreateTransactionResponse>), Error> {
    let today = local_today(&state.local_timezone)?;
    validate_transaction_data(&transaction_data, today)?;

    let mut connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let sql_transaction = connection.transaction().map_err(Error::from)?;

    let transaction = create_transaction(
        user_id,
        Transaction::build(
            transaction_data.amount,
            transaction_data.date,
            transaction_data.kind,
            transaction_data.category.trim(),
        )
        .channel(transaction_data.channel.trim())
        .note(&transaction_data.note),
        &sql_transaction,
    )?;

    let user = get_user_by_id(user_id, &sql_transaction)?;
    let reward = register_entry(&user, transaction_data.kind, today);
    apply_entry_reward(user_id, &reward, &sql_transaction)?;
    let rewarded_user = get_user_by_id(user_id, &sql_transaction)?;

    sql_transaction.commit().map_err(Error::from)?;

    tracing::info!(
        "user {user_id} recorded a {} of {}",
        transaction.kind.as_str(),
        transaction.amount
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateTransactionResponse {
            transaction,
            user: rewarded_user.profile(),
        }),
    ))
}

fn validate_transaction_data(
    transaction_data: &CreateTransactionData,
    today: Date,
) -> Result<(), Error> {
    if !transaction_data.amount.is_finite() || transaction_data.amount < 0.0 {
        return Err(Error::InvalidAmount(transaction_data.amount));
    }

    if transaction_data.category.trim().is_empty() {
        return Err(Error::EmptyCategory);
    }

    if transaction_data.date > today {
        return Err(Error::FutureDate(transaction_data.date));
    }

    Ok(())
}
