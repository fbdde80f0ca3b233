//! The admin console endpoints.
//!
//! Admin access is a flag on the user record, checked server-side on every
//! request. There are no special credentials baked into any client.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    user::{User, UserID, UserProfile, get_user_by_id, list_users, purge_user},
};

/// Load the calling user and confirm they are an admin.
fn require_admin(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    let user = get_user_by_id(user_id, connection)?;

    if !user.is_admin {
        return Err(Error::Forbidden);
    }

    Ok(user)
}

/// Handler for the admin user roster.
///
/// # Errors
///
/// Returns a [Error::Forbidden] if the caller is not an admin.
pub async fn get_users(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<UserProfile>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    require_admin(user_id, &connection)?;

    let users = list_users(&connection)?;

    Ok(Json(users.iter().map(User::profile).collect()))
}

/// Handler for purging a user account.
///
/// The account is tombstoned first so it disappears from every lookup even if
/// the data cleanup is interrupted, then its transactions, goals, budgets,
/// and labels are removed along with the user row.
///
/// # Errors
///
/// Returns a:
/// - [Error::Forbidden] if the caller is not an admin or tries to purge
///   themselves,
/// - [Error::NotFound] if the target does not exist.
pub async fn purge_user_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Path(target_id): Path<i64>,
) -> Result<StatusCode, Error> {
    let target_id = UserID::new(target_id);

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    require_admin(user_id, &connection)?;

    if target_id == user_id {
        return Err(Error::Forbidden);
    }

    purge_user(target_id, &connection)?;

    tracing::info!("admin {user_id} purged user {target_id}");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod admin_tests {
    use axum::{
        Extension, Json,
        extract::{Path, State},
        http::StatusCode,
    };

    use crate::{
        AppState, Error,
        test_utils::{add_test_user, state_with_user},
        user::UserID,
    };

    use super::{get_users, purge_user_endpoint};

    fn make_admin(state: &AppState, user_id: UserID) {
        let connection = state.db_connection.lock().unwrap();
        connection
            .execute(
                "UPDATE user SET is_admin = 1 WHERE id = ?1",
                (user_id.as_i64(),),
            )
            .unwrap();
    }

    #[tokio::test]
    async fn roster_requires_admin() {
        let (state, user_id) = state_with_user();

        let result = get_users(State(state), Extension(user_id)).await;

        assert_eq!(result.err(), Some(Error::Forbidden));
    }

    #[tokio::test]
    async fn roster_lists_every_user() {
        let (state, user_id) = state_with_user();
        make_admin(&state, user_id);
        add_test_user(&state, "other@test.com");

        let Json(roster) = get_users(State(state), Extension(user_id)).await.unwrap();

        assert_eq!(roster.len(), 2);
    }

    #[tokio::test]
    async fn purge_requires_admin() {
        let (state, user_id) = state_with_user();
        let other_id = add_test_user(&state, "other@test.com");

        let result =
            purge_user_endpoint(State(state), Extension(user_id), Path(other_id.as_i64())).await;

        assert_eq!(result.err(), Some(Error::Forbidden));
    }

    #[tokio::test]
    async fn admin_cannot_purge_themselves() {
        let (state, user_id) = state_with_user();
        make_admin(&state, user_id);

        let result =
            purge_user_endpoint(State(state), Extension(user_id), Path(user_id.as_i64())).await;

        assert_eq!(result.err(), Some(Error::Forbidden));
    }

    #[tokio::test]
    async fn purge_removes_the_user_from_the_roster() {
        let (state, user_id) = state_with_user();
        make_admin(&state, user_id);
        let other_id = add_test_user(&state, "other@test.com");

        let status = purge_user_endpoint(
            State(state.clone()),
            Extension(user_id),
            Path(other_id.as_i64()),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::NO_CONTENT);
        let Json(roster) = get_users(State(state), Extension(user_id)).await.unwrap();
        assert_eq!(roster.len(), 1);
    }
}
