//! Handlers for the budget endpoints.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    budget::{
        Budget, BudgetId, BudgetReport, delete_budget, evaluate_budgets, get_budget, list_budgets,
        upsert_budget,
    },
    timezone::local_today,
    transaction::list_transactions_for_user,
    user::UserID,
};

/// The data for setting a budget cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetBudgetData {
    /// The expense category to guard.
    pub category: String,
    /// The monthly spending cap.
    pub cap: f64,
}

/// Handler for setting the cap on a category.
///
/// Setting a category that already has a budget updates the cap in place.
///
/// # Errors
///
/// Returns a [Error::EmptyCategory] if the category is blank or a
/// [Error::InvalidTarget] if the cap is not a positive number.
pub async fn set_budget_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Json(budget_data): Json<SetBudgetData>,
) -> Result<(StatusCode, Json<Budget>), Error> {
    if budget_data.category.trim().is_empty() {
        return Err(Error::EmptyCategory);
    }

    if !budget_data.cap.is_finite() || budget_data.cap <= 0.0 {
        return Err(Error::InvalidTarget(budget_data.cap));
    }

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let budget = upsert_budget(user_id, &budget_data.category, budget_data.cap, &connection)?;

    Ok((StatusCode::CREATED, Json(budget)))
}

/// Handler for the budget report of the current calendar month.
pub async fn get_budgets(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<BudgetReport>, Error> {
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let budgets = list_budgets(user_id, &connection)?;
    let transactions = list_transactions_for_user(user_id, &connection)?;

    Ok(Json(evaluate_budgets(
        &budgets,
        &transactions,
        today.year(),
        today.month(),
    )))
}

/// Handler for deleting a budget.
///
/// # Errors
///
/// Returns a [Error::NotFound] if the budget does not exist or belongs to
/// another user.
pub async fn delete_budget_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Path(budget_id): Path<BudgetId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let budget = get_budget(budget_id, &connection)?;
    // Do not reveal whether the budget exists for someone else.
    if budget.user_id != user_id {
        return Err(Error::NotFound);
    }

    delete_budget(budget_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
