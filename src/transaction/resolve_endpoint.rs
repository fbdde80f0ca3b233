//! The endpoint for settling, defaulting, or reopening a loan transaction.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    transaction::{Resolution, Transaction, TransactionId, get_transaction, set_resolution},
    user::UserID,
};

/// The data for changing a transaction's settlement state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetResolutionData {
    /// The new settlement state.
    pub resolution: Resolution,
}

/// Handler for changing the settlement state of a CREDIT or DEBT transaction.
///
/// This transitions the existing record only; nothing is created or deleted,
/// and no coins are awarded. Moving back to `PENDING` is allowed as a
/// correction mechanism.
///
/// # Errors
///
/// Returns a:
/// - [Error::NotFound] if the transaction does not exist, belongs to another
///   user, or is not a CREDIT/DEBT record.
pub async fn set_resolution_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
    Json(resolution_data): Json<SetResolutionData>,
) -> Result<Json<Transaction>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let existing = get_transaction(transaction_id, &connection)?;
    // Do not reveal whether the transaction exists for someone else.
    if existing.user_id != user_id {
        return Err(Error::NotFound);
    }

    // Settlement only makes sense for lends and borrows.
    if !existing.kind.is_loan() {
        return Err(Error::NotFound);
    }

    let updated = set_resolution(transaction_id, resolution_data.resolution, &connection)?;

    Ok(Json(updated))
}
