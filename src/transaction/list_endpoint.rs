//! The endpoint for listing transactions.

use axum::{Extension, Json, extract::State};

use crate::{
    AppState, Error,
    transaction::{Transaction, list_all_transactions, list_transactions_for_user},
    user::{UserID, get_user_by_id},
};

/// Handler for listing transactions, newest first.
///
/// Regular users see their own records; admins see every user's records, as
/// the admin console audits across accounts.
pub async fn get_transactions(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = get_user_by_id(user_id, &connection)?;

    let transactions = if user.is_admin {
        list_all_transactions(&connection)?
    } else {
        list_transactions_for_user(user_id, &connection)?
    };

    Ok(Json(transactions))
}

#[cfg(test)]
mod list_endpoint_tests {
    use axum::{Extension, Json, extract::State};
    use time::macros::date;

    use crate::{
        test_utils::{add_test_user, state_with_user},
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    use super::get_transactions;

    #[tokio::test]
    async fn regular_user_sees_only_their_records() {
        let (state, user_id) = state_with_user();
        let other_id = add_test_user(&state, "other@test.com");
        {
            let connection = state.db_connection.lock().unwrap();
            create_transaction(
                user_id,
                Transaction::build(1.0, date!(2024 - 01 - 01), TransactionKind::Expense, "Rent"),
                &connection,
            )
            .unwrap();
            create_transaction(
                other_id,
                Transaction::build(2.0, date!(2024 - 01 - 01), TransactionKind::Expense, "Rent"),
                &connection,
            )
            .unwrap();
        }

        let Json(transactions) = get_transactions(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].user_id, user_id);
    }

    #[tokio::test]
    async fn admin_sees_all_records() {
        let (state, user_id) = state_with_user();
        let admin_id = add_test_user(&state, "admin@test.com");
        {
            let connection = state.db_connection.lock().unwrap();
            connection
                .execute(
                    "UPDATE user SET is_admin = 1 WHERE id = ?1",
                    (admin_id.as_i64(),),
                )
                .unwrap();
            create_transaction(
                user_id,
                Transaction::build(1.0, date!(2024 - 01 - 01), TransactionKind::Expense, "Rent"),
                &connection,
            )
            .unwrap();
        }

        let Json(transactions) = get_transactions(State(state), Extension(admin_id))
            .await
            .unwrap();

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].user_id, user_id);
    }
}
