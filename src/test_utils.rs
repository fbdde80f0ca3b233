//! Helpers shared by the endpoint tests.

use rusqlite::Connection;

use crate::{
    AppState,
    advice::AdviceConfig,
    password::PasswordHash,
    user::{UserID, create_user},
};

/// An app state backed by a fresh in-memory database.
pub fn new_test_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");

    AppState::new(connection, "foobar", "Etc/UTC", AdviceConfig::default())
        .expect("Could not create test app state")
}

/// An app state with one registered user.
pub fn state_with_user() -> (AppState, UserID) {
    let state = new_test_state();
    let user_id = add_test_user(&state, "test@test.com");

    (state, user_id)
}

/// Register another user directly against the database.
pub fn add_test_user(state: &AppState, email: &str) -> UserID {
    let connection = state.db_connection.lock().unwrap();

    create_user(
        email,
        "Test",
        PasswordHash::new_unchecked("$2b$12$Gwf0uvxH3L7JLfo0CC/NCOoijK2vQ/wbgP.LeNup8vj6gg31IiFkm"),
        &connection,
    )
    .expect("Could not create test user")
    .id
}
