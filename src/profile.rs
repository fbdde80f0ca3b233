//! The profile endpoint for updating account details.

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    reward::longest_streak,
    transaction::list_transactions_for_user,
    user::{UserID, UserProfile, get_user_by_id, update_profile},
};

/// The editable profile fields. Absent fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileData {
    /// A new display name.
    pub name: Option<String>,
    /// A new email address.
    pub email: Option<String>,
    /// A new raw password, validated for strength before hashing.
    pub password: Option<String>,
}

/// The profile plus statistics derived from the transaction history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileStats {
    /// The account profile.
    pub user: UserProfile,
    /// The longest consecutive-day run in the whole history.
    pub longest_streak: i64,
}

/// Handler for reading the caller's profile with streak statistics.
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<ProfileStats>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = get_user_by_id(user_id, &connection)?;
    let transactions = list_transactions_for_user(user_id, &connection)?;

    Ok(Json(ProfileStats {
        user: user.profile(),
        longest_streak: longest_streak(&transactions),
    }))
}

/// Handler for updating the caller's name, email, or password.
///
/// # Errors
///
/// Returns a:
/// - [Error::InvalidEmail] if the new email does not look like an email address,
/// - [Error::TooWeak] if the new password is too easy to guess,
/// - [Error::DuplicateEmail] if the new email belongs to another account.
pub async fn update_profile_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Json(profile_data): Json<UpdateProfileData>,
) -> Result<Json<UserProfile>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = get_user_by_id(user_id, &connection)?;

    let name = profile_data.name.unwrap_or(user.name);
    let email = profile_data.email.unwrap_or(user.email);
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::InvalidEmail(email.to_owned()));
    }

    let password_hash = match profile_data.password.as_deref() {
        Some(raw_password) => {
            let validated = ValidatedPassword::new(raw_password)?;
            Some(PasswordHash::new(validated, PasswordHash::DEFAULT_COST)?)
        }
        None => None,
    };

    let updated = update_profile(user_id, name.trim(), email, password_hash, &connection)?;

    Ok(Json(updated.profile()))
}
