//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/goals/{goal_id}', use [format_endpoint].

/// The liveness and database probe.
pub const HEALTH: &str = "/api/health";
/// The route for registering a new account.
pub const REGISTER: &str = "/api/register";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route for reading and updating the caller's profile.
pub const PROFILE: &str = "/api/profile";
/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to edit or delete a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to change a loan transaction's settlement state.
pub const TRANSACTION_RESOLUTION: &str = "/api/transactions/{transaction_id}/resolution";
/// The route for the derived dashboard numbers.
pub const DASHBOARD: &str = "/api/dashboard";
/// The route to list and create savings goals.
pub const GOALS: &str = "/api/goals";
/// The route to delete a single savings goal.
pub const GOAL: &str = "/api/goals/{goal_id}";
/// The route to list budgets and set a category cap.
pub const BUDGETS: &str = "/api/budgets";
/// The route to delete a single budget.
pub const BUDGET: &str = "/api/budgets/{budget_id}";
/// The route to list and add category labels.
pub const CATEGORIES: &str = "/api/categories";
/// The route to delete a single category label.
pub const CATEGORY: &str = "/api/categories/{category_id}";
/// The route to list and add channel labels.
pub const CHANNELS: &str = "/api/channels";
/// The route to delete a single channel label.
pub const CHANNEL: &str = "/api/channels/{channel_id}";
/// The route for the streak/coin leaderboard.
pub const LEADERBOARD: &str = "/api/leaderboard";
/// The route for generated financial advice.
pub const ADVICE: &str = "/api/advice";
/// The route for the admin user roster.
pub const ADMIN_USERS: &str = "/api/admin/users";
/// The route for purging a user account.
pub const ADMIN_USER: &str = "/api/admin/users/{user_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/goals/{goal_id}', '{goal_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::HEALTH);
        assert_endpoint_is_valid_uri(endpoints::REGISTER);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN);
        assert_endpoint_is_valid_uri(endpoints::LOG_OUT);
        assert_endpoint_is_valid_uri(endpoints::PROFILE);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTION);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTION_RESOLUTION);
        assert_endpoint_is_valid_uri(endpoints::DASHBOARD);
        assert_endpoint_is_valid_uri(endpoints::GOALS);
        assert_endpoint_is_valid_uri(endpoints::GOAL);
        assert_endpoint_is_valid_uri(endpoints::BUDGETS);
        assert_endpoint_is_valid_uri(endpoints::BUDGET);
        assert_endpoint_is_valid_uri(endpoints::CATEGORIES);
        assert_endpoint_is_valid_uri(endpoints::CATEGORY);
        assert_endpoint_is_valid_uri(endpoints::CHANNELS);
        assert_endpoint_is_valid_uri(endpoints::CHANNEL);
        assert_endpoint_is_valid_uri(endpoints::LEADERBOARD);
        assert_endpoint_is_valid_uri(endpoints::ADVICE);
        assert_endpoint_is_valid_uri(endpoints::ADMIN_USERS);
        assert_endpoint_is_valid_uri(endpoints::ADMIN_USER);
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint("/hello/{world_id}", 1);

        assert_eq!(formatted_path, "/hello/1");
        assert!(formatted_path.parse::<Uri>().is_ok());

        // Parameter with single word should also work.
        let formatted_path = format_endpoint("/hello/{world}", 1);

        assert_eq!(formatted_path, "/hello/1");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/hello/world", 1);

        assert_eq!(formatted_path, "/hello/world");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn parameter_in_middle() {
        let formatted_path = format_endpoint("/hello/{world}/bye", 1);

        assert_eq!(formatted_path, "/hello/1/bye");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }
}
