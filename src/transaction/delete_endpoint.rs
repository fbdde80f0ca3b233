//! The endpoint for deleting a transaction.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState, Error,
    transaction::{TransactionId, delete_transaction, get_transaction},
    user::UserID,
};

/// Handler for deleting a transaction.
///
/// Deleting never claws back coins or streaks; rewards are only granted at
/// creation time and are not reversible.
///
/// # Errors
///
/// Returns a [Error::NotFound] if the transaction does not exist or belongs
/// to another user.
pub async fn delete_transaction_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let existing = get_transaction(transaction_id, &connection)?;
    // Do not reveal whether the transaction exists for someone else.
    if existing.user_id != user_id {
        return Err(Error::NotFound);
    }

    delete_transaction(transaction_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
