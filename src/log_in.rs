//! This file defines the handler for log-in requests.
//! The auth module handles the lower level authentication and cookie logic.

use axum::{Json, extract::State, response::IntoResponse, response::Response};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::set_auth_cookie,
    user::{User, UserProfile, get_user_by_email},
};

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The raw data entered by the user in the log-in form.
///
/// The email and password are stored as plain strings. There is no need for validation here since
/// they will be compared against the email and password in the database, which have been verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Email entered during log-in.
    pub email: String,
    /// Password entered during log-in.
    pub password: String,
    /// Whether to extend the initial auth cookie duration.
    #[serde(default)]
    pub remember_me: bool,
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request the auth cookie is set and the user's
/// profile is returned for the client to render.
///
/// # Errors
///
/// Returns a [Error::InvalidCredentials] in all of these cases, so the
/// response does not reveal whether the email is registered:
/// - the email does not belong to a registered (non-purged) user,
/// - the password is not correct.
pub async fn post_log_in(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(log_in_data): Json<LogInData>,
) -> Result<Response, Error> {
    let user: User = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        match get_user_by_email(log_in_data.email.trim(), &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Err(Error::InvalidCredentials),
            Err(error) => {
                tracing::error!("Unhandled error while verifying credentials: {error}");
                return Err(error);
            }
        }
    };

    let is_password_valid = user
        .password_hash
        .verify(&log_in_data.password)
        .map_err(|error| {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            Error::HashingError(error.to_string())
        })?;

    if !is_password_valid {
        return Err(Error::InvalidCredentials);
    }

    let cookie_duration = if log_in_data.remember_me {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let updated_jar = set_auth_cookie(jar, user.id, cookie_duration)
        .map_err(|error| Error::InvalidDateFormat(error.to_string(), cookie_duration.to_string()))?;

    Ok((updated_jar, Json::<UserProfile>(user.profile())).into_response())
}
