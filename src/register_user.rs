//! The registration endpoint for creating a new account.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse, response::Response};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    auth::set_auth_cookie,
    user::{UserProfile, create_user},
};

/// The data a new user registers with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterData {
    /// The email address to register.
    pub email: String,
    /// The display name. Defaults to the email's local part when blank.
    #[serde(default)]
    pub name: String,
    /// The raw password. Validated for strength before hashing.
    pub password: String,
}

/// Handler for registration requests.
///
/// Creates the user with the starting reward balances, logs them in by
/// setting the auth cookie, and returns the new profile.
///
/// # Errors
///
/// Returns a:
/// - [Error::InvalidEmail] if the email does not look like an email address,
/// - [Error::TooWeak] if the password is too easy to guess,
/// - [Error::DuplicateEmail] if the email is already registered.
pub async fn register_user(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(register_data): Json<RegisterData>,
) -> Result<Response, Error> {
    let email = register_data.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::InvalidEmail(register_data.email.clone()));
    }

    let name = match register_data.name.trim() {
        "" => email.split('@').next().unwrap_or(email),
        name => name,
    };

    let validated_password = ValidatedPassword::new(&register_data.password)?;
    let password_hash = PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST)?;

    let user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        create_user(email, name, password_hash, &connection)?
    };

    let updated_jar = set_auth_cookie(jar, user.id, state.cookie_duration).map_err(|error| {
        Error::InvalidDateFormat(error.to_string(), state.cookie_duration.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        updated_jar,
        Json::<UserProfile>(user.profile()),
    )
        .into_response())
}
