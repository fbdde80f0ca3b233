//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde_json::json;

use crate::{
    AppState,
    admin::{get_users, purge_user_endpoint},
    advice::get_advice,
    auth::auth_guard,
    budget::{delete_budget_endpoint, get_budgets, set_budget_endpoint},
    category::{create_category_endpoint, delete_category_endpoint, get_categories},
    channel::{create_channel_endpoint, delete_channel_endpoint, get_channels},
    dashboard::get_dashboard,
    endpoints,
    goal::{create_goal_endpoint, delete_goal_endpoint, get_goals},
    leaderboard::get_leaderboard,
    log_in::post_log_in,
    log_out::get_log_out,
    profile::{get_profile, update_profile_endpoint},
    register_user::register_user,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        get_transactions, set_resolution_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::REGISTER, post(register_user))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out));

    let protected_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS,
            get(get_transactions).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(edit_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION_RESOLUTION,
            post(set_resolution_endpoint),
        )
        .route(endpoints::DASHBOARD, get(get_dashboard))
        .route(endpoints::GOALS, get(get_goals).post(create_goal_endpoint))
        .route(endpoints::GOAL, delete(delete_goal_endpoint))
        .route(
            endpoints::BUDGETS,
            get(get_budgets).put(set_budget_endpoint),
        )
        .route(endpoints::BUDGET, delete(delete_budget_endpoint))
        .route(
            endpoints::CATEGORIES,
            get(get_categories).post(create_category_endpoint),
        )
        .route(endpoints::CATEGORY, delete(delete_category_endpoint))
        .route(
            endpoints::CHANNELS,
            get(get_channels).post(create_channel_endpoint),
        )
        .route(endpoints::CHANNEL, delete(delete_channel_endpoint))
        .route(endpoints::LEADERBOARD, get(get_leaderboard))
        .route(
            endpoints::PROFILE,
            get(get_profile).put(update_profile_endpoint),
        )
        .route(endpoints::ADVICE, post(get_advice))
        .route(endpoints::ADMIN_USERS, get(get_users))
        .route(endpoints::ADMIN_USER, delete(purge_user_endpoint))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The health probe consumed by the client's periodic connectivity check.
///
/// Runs a trivial query so a wedged or corrupted database shows up as
/// degraded instead of a hard failure on the next real request.
async fn get_health(State(state): State<AppState>) -> Response {
    let database_ok = state
        .db_connection
        .lock()
        .map(|connection| {
            connection
                .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .is_ok()
        })
        .unwrap_or(false);

    if database_ok {
        (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded" })),
        )
            .into_response()
    }
}

async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "the requested resource could not be found" })),
    )
        .into_response()
}
