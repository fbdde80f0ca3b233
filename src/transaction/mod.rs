//! Transaction management.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model, the kind and resolution enums, and the
//!   `TransactionBuilder` for creating transactions
//! - Database functions for storing, querying, and managing transactions
//! - Handlers for the transaction endpoints

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;
mod resolve_endpoint;

pub use self::core::{
    Resolution, Transaction, TransactionBuilder, TransactionId, TransactionKind,
    create_transaction, create_transaction_table, delete_transaction, get_transaction,
    list_all_transactions, list_transactions_for_user, map_transaction_row, set_resolution,
    update_transaction,
};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use list_endpoint::get_transactions;
pub use resolve_endpoint::set_resolution_endpoint;

#[cfg(test)]
pub use self::core::count_transactions;
