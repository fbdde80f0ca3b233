//! User-scoped payment channel labels.
//!
//! A channel names the account or medium money moved through, e.g. "CASH" or
//! "WALLET". Channels are open-ended free text; this registry only feeds the
//! form suggestions. Balances are accumulated per observed channel string by
//! the ledger engine regardless of what is registered here.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{AppState, Error, user::UserID};

/// Alias for the integer type used for channel IDs.
pub type ChannelId = i64;

/// The built-in channel suggestions.
pub const DEFAULT_CHANNELS: [&str; 3] = ["CASH", "ONLINE", "WALLET"];

/// A custom channel label added by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// The ID of the label.
    pub id: ChannelId,
    /// The user that owns the label.
    pub user_id: UserID,
    /// The label text.
    pub name: String,
}

/// Create the channel table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_channel_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS channel (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn map_channel_row(row: &Row) -> Result<Channel, rusqlite::Error> {
    Ok(Channel {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
    })
}

/// Add a custom channel label for `user_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn create_channel(
    user_id: UserID,
    name: &str,
    connection: &Connection,
) -> Result<Channel, Error> {
    let channel = connection
        .prepare(
            "INSERT INTO channel (user_id, name) VALUES (?1, ?2)
             RETURNING id, user_id, name",
        )?
        .query_row((user_id.as_i64(), name), map_channel_row)?;

    Ok(channel)
}

/// Retrieve the custom channel labels of `user_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn list_channels(user_id: UserID, connection: &Connection) -> Result<Vec<Channel>, Error> {
    connection
        .prepare("SELECT id, user_id, name FROM channel WHERE user_id = ?1 ORDER BY name")?
        .query_map((user_id.as_i64(),), map_channel_row)?
        .map(|maybe_channel| maybe_channel.map_err(|error| error.into()))
        .collect()
}

/// Retrieve a channel label by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid label,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_channel(id: ChannelId, connection: &Connection) -> Result<Channel, Error> {
    connection
        .prepare("SELECT id, user_id, name FROM channel WHERE id = :id")?
        .query_row(&[(":id", &id)], map_channel_row)
        .map_err(|error| error.into())
}

/// Delete the channel label with `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid label,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_channel(id: ChannelId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM channel WHERE id = ?1", (id,))?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// The default and custom channel labels for a user.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelSuggestions {
    /// The built-in labels.
    pub defaults: Vec<String>,
    /// The user's custom labels.
    pub custom: Vec<Channel>,
}

/// The data for adding a custom channel label.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateChannelData {
    /// The label text.
    pub name: String,
}

/// Handler for listing the default and custom channel labels.
pub async fn get_channels(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<ChannelSuggestions>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let custom = list_channels(user_id, &connection)?;

    Ok(Json(ChannelSuggestions {
        defaults: DEFAULT_CHANNELS.iter().map(|name| (*name).to_owned()).collect(),
        custom,
    }))
}

/// Handler for adding a custom channel label.
///
/// # Errors
///
/// Returns a [Error::EmptyName] if the label is blank.
pub async fn create_channel_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Json(channel_data): Json<CreateChannelData>,
) -> Result<(StatusCode, Json<Channel>), Error> {
    if channel_data.name.trim().is_empty() {
        return Err(Error::EmptyName);
    }

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let channel = create_channel(user_id, channel_data.name.trim(), &connection)?;

    Ok((StatusCode::CREATED, Json(channel)))
}

/// Handler for removing a custom channel label.
///
/// # Errors
///
/// Returns a [Error::NotFound] if the label does not exist or belongs to
/// another user.
pub async fn delete_channel_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Path(channel_id): Path<ChannelId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let channel = get_channel(channel_id, &connection)?;
    if channel.user_id != user_id {
        return Err(Error::NotFound);
    }

    delete_channel(channel_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
