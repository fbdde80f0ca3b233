//! Per-category spending caps.
//!
//! A budget guards one expense category for the current calendar month.
//! Saturation and breach state are derived from the transaction list on every
//! read; only the cap itself is stored.

mod core;
mod endpoints;

pub use self::core::{
    Budget, BudgetId, BudgetReport, BudgetStatus, create_budget_table, delete_budget,
    evaluate_budgets, get_budget, list_budgets, upsert_budget,
};
pub use endpoints::{delete_budget_endpoint, get_budgets, set_budget_endpoint};
