//! Database initialization for the application.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error, budget::create_budget_table, category::create_category_table,
    channel::create_channel_table, goal::create_goal_table,
    transaction::create_transaction_table,
    user::{create_purged_user_table, create_user_table},
};

/// Create the tables for the application's domain models.
///
/// The tables are created in a single exclusive transaction so a half
/// initialized schema is never left behind.
///
/// # Errors
///
/// This function will return an error if any table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_purged_user_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_goal_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_category_table(&transaction)?;
    create_channel_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod initialize_tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn schema_is_valid() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        assert_eq!(Ok(()), initialize(&connection));
    }

    #[test]
    fn initialize_is_idempotent() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        initialize(&connection).unwrap();

        assert_eq!(Ok(()), initialize(&connection));
    }
}
