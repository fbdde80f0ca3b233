//! Code for creating the user tables and fetching and updating users.
//!
//! Lookups consult the purge tombstone table so that an admin-purged account
//! stays invisible to the rest of the system even if part of its data
//! cleanup was interrupted.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{Error, password::PasswordHash, reward::{EntryReward, Tier}};

/// The coin balance granted to every freshly registered account.
pub const STARTING_COINS: i64 = 100;

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The user's unique email address.
    pub email: String,
    /// The user's display name.
    pub name: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// Cumulative reward coins. Non-decreasing except for explicit admin resets.
    pub coins: i64,
    /// Consecutive calendar days (reference timezone) with at least one transaction.
    pub streak: i64,
    /// The last calendar day on which the user recorded a transaction.
    pub last_entry_date: Option<Date>,
    /// Whether the user may use the admin console. Checked server-side only.
    pub is_admin: bool,
    /// When the account was created.
    pub created_at: OffsetDateTime,
}

impl User {
    /// The user's reward tier.
    ///
    /// The tier is always derived from the coin balance, never stored, so it
    /// can not drift out of sync with the coins.
    pub fn tier(&self) -> Tier {
        Tier::for_coins(self.coins)
    }

    /// The public view of the user, safe to serialize into API responses.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            coins: self.coins,
            streak: self.streak,
            last_entry_date: self.last_entry_date,
            tier: self.tier(),
            is_admin: self.is_admin,
            created_at: self.created_at,
        }
    }
}

/// The fields of a [User] that are exposed through the API.
///
/// The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The user's ID.
    pub id: UserID,
    /// The user's unique email address.
    pub email: String,
    /// The user's display name.
    pub name: String,
    /// Cumulative reward coins.
    pub coins: i64,
    /// The current consecutive-day streak.
    pub streak: i64,
    /// The last calendar day with a recorded transaction.
    pub last_entry_date: Option<Date>,
    /// The reward tier derived from the coin balance.
    pub tier: Tier,
    /// Whether the user may use the admin console.
    pub is_admin: bool,
    /// When the account was created.
    pub created_at: OffsetDateTime,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                password TEXT NOT NULL,
                coins INTEGER NOT NULL,
                streak INTEGER NOT NULL,
                last_entry_date TEXT,
                is_admin INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create the tombstone table recording purged accounts.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_purged_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS purged_user (
                user_id INTEGER PRIMARY KEY,
                email TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a User.
pub fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let id = UserID::new(row.get(0)?);
    let email = row.get(1)?;
    let name = row.get(2)?;
    let raw_password_hash: String = row.get(3)?;
    let coins = row.get(4)?;
    let streak = row.get(5)?;
    let last_entry_date = row.get(6)?;
    let is_admin = row.get(7)?;
    let created_at = row.get(8)?;

    Ok(User {
        id,
        email,
        name,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        coins,
        streak,
        last_entry_date,
        is_admin,
        created_at,
    })
}

const USER_COLUMNS: &str = "id, email, name, password, coins, streak, last_entry_date, is_admin, created_at";

/// Create and insert a new user into the database.
///
/// New users start with [STARTING_COINS] coins, no streak, and no entry date.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateEmail] if the email is already registered,
/// - or [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(
    email: &str,
    name: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO user (email, name, password, coins, streak, last_entry_date, is_admin, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, NULL, 0, ?5)",
        (
            email,
            name,
            password_hash.to_string(),
            STARTING_COINS,
            created_at,
        ),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email: email.to_owned(),
        name: name.to_owned(),
        password_hash,
        coins: STARTING_COINS,
        streak: 0,
        last_entry_date: None,
        is_admin: false,
        created_at,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// Purged users are treated as missing.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user
             WHERE id = :id AND id NOT IN (SELECT user_id FROM purged_user)"
        ))?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user from the database with an email equal to `email`.
///
/// Purged users are treated as missing.
///
/// # Errors
///
/// This function will return an error if:
/// - `email` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user
             WHERE email = :email AND id NOT IN (SELECT user_id FROM purged_user)"
        ))?
        .query_row(&[(":email", &email)], map_user_row)
        .map_err(|error| error.into())
}

/// List the users in the database, excluding purged accounts.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn list_users(connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user
             WHERE id NOT IN (SELECT user_id FROM purged_user)
             ORDER BY id"
        ))?
        .query_map([], map_user_row)?
        .map(|maybe_user| maybe_user.map_err(|error| error.into()))
        .collect()
}

/// List the users in the database ranked for the leaderboard: longest current
/// streak first, coin balance breaking ties.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn list_users_ranked(connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user
             WHERE id NOT IN (SELECT user_id FROM purged_user)
             ORDER BY streak DESC, coins DESC, id"
        ))?
        .query_map([], map_user_row)?
        .map(|maybe_user| maybe_user.map_err(|error| error.into()))
        .collect()
}

/// Overwrite the user's profile fields.
///
/// Pass `None` for `password_hash` to leave the stored password unchanged.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user,
/// - the new email is already registered to another account,
/// - or there was an error trying to access the store.
pub fn update_profile(
    user_id: UserID,
    name: &str,
    email: &str,
    password_hash: Option<PasswordHash>,
    connection: &Connection,
) -> Result<User, Error> {
    let rows_affected = match &password_hash {
        Some(password_hash) => connection.execute(
            "UPDATE user SET name = ?1, email = ?2, password = ?3 WHERE id = ?4",
            (name, email, password_hash.to_string(), user_id.as_i64()),
        )?,
        None => connection.execute(
            "UPDATE user SET name = ?1, email = ?2 WHERE id = ?3",
            (name, email, user_id.as_i64()),
        )?,
    };

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_user_by_id(user_id, connection)
}

/// Write back the coins, streak, and entry date computed by the reward engine.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn apply_entry_reward(
    user_id: UserID,
    reward: &EntryReward,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET coins = ?1, streak = ?2, last_entry_date = ?3 WHERE id = ?4",
        (
            reward.coins,
            reward.streak,
            reward.last_entry_date,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| {
            row.get::<_, i64>(0).map(|count| count as usize)
        })
        .map_err(|error| error.into())
}

/// Purge a user: make them invisible to every lookup, then remove their data.
///
/// The tombstone is written first and each cleanup statement runs on its own,
/// so an interruption part-way through still leaves the account invisible and
/// non-functional. Re-running the purge finishes the cleanup.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered, non-purged user,
/// - or there was an error trying to access the store.
pub fn purge_user(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let user = get_user_by_id(user_id, connection)?;

    connection.execute(
        "INSERT OR IGNORE INTO purged_user (user_id, email) VALUES (?1, ?2)",
        (user.id.as_i64(), user.email),
    )?;

    for table in ["\"transaction\"", "goal", "budget", "category", "channel"] {
        connection.execute(
            &format!("DELETE FROM {table} WHERE user_id = ?1"),
            (user_id.as_i64(),),
        )?;
    }

    connection.execute("DELETE FROM user WHERE id = ?1", (user_id.as_i64(),))?;

    Ok(())
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        password::PasswordHash,
        reward::{EntryReward, Tier},
        user::{
            STARTING_COINS, UserID, apply_entry_reward, count_users, create_user,
            get_user_by_email, get_user_by_id, list_users_ranked, purge_user, update_profile,
        },
    };

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        initialize(&conn).expect("Could not initialize database");

        conn
    }

    #[test]
    fn insert_user_starts_with_default_balances() {
        let conn = get_db_connection();

        let user = create_user(
            "foo@bar.baz",
            "Foo",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        assert!(user.id.as_i64() > 0);
        assert_eq!(user.coins, STARTING_COINS);
        assert_eq!(user.streak, 0);
        assert_eq!(user.last_entry_date, None);
        assert_eq!(user.tier(), Tier::Copper);
        assert!(!user.is_admin);
    }

    #[test]
    fn insert_user_fails_on_duplicate_email() {
        let conn = get_db_connection();
        create_user(
            "foo@bar.baz",
            "Foo",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        let duplicate = create_user(
            "foo@bar.baz",
            "Bar",
            PasswordHash::new_unchecked("hunter3"),
            &conn,
        );

        assert_eq!(duplicate, Err(Error::DuplicateEmail));
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let conn = get_db_connection();

        assert_eq!(get_user_by_id(UserID::new(42), &conn), Err(Error::NotFound));
    }

    #[test]
    fn get_user_by_email_round_trips() {
        let conn = get_db_connection();
        let inserted = create_user(
            "foo@bar.baz",
            "Foo",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        let retrieved = get_user_by_email("foo@bar.baz", &conn).unwrap();

        assert_eq!(retrieved, inserted);
    }

    #[test]
    fn apply_entry_reward_updates_balances() {
        let conn = get_db_connection();
        let user = create_user(
            "foo@bar.baz",
            "Foo",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        apply_entry_reward(
            user.id,
            &EntryReward {
                coins: 150,
                streak: 1,
                last_entry_date: date!(2024 - 01 - 01),
            },
            &conn,
        )
        .unwrap();

        let updated = get_user_by_id(user.id, &conn).unwrap();
        assert_eq!(updated.coins, 150);
        assert_eq!(updated.streak, 1);
        assert_eq!(updated.last_entry_date, Some(date!(2024 - 01 - 01)));
    }

    #[test]
    fn update_profile_without_password_keeps_hash() {
        let conn = get_db_connection();
        let user = create_user(
            "foo@bar.baz",
            "Foo",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        let updated = update_profile(user.id, "Foo Jr", "foo@baz.qux", None, &conn).unwrap();

        assert_eq!(updated.name, "Foo Jr");
        assert_eq!(updated.email, "foo@baz.qux");
        assert_eq!(updated.password_hash, user.password_hash);
    }

    #[test]
    fn ranked_users_sort_by_streak_then_coins() {
        let conn = get_db_connection();
        for (email, coins, streak) in [
            ("a@test.com", 200, 2),
            ("b@test.com", 900, 2),
            ("c@test.com", 100, 7),
        ] {
            let user =
                create_user(email, email, PasswordHash::new_unchecked("hunter2"), &conn).unwrap();
            apply_entry_reward(
                user.id,
                &EntryReward {
                    coins,
                    streak,
                    last_entry_date: date!(2024 - 01 - 01),
                },
                &conn,
            )
            .unwrap();
        }

        let ranked = list_users_ranked(&conn).unwrap();
        let emails: Vec<&str> = ranked.iter().map(|user| user.email.as_str()).collect();

        assert_eq!(emails, vec!["c@test.com", "b@test.com", "a@test.com"]);
    }

    #[test]
    fn purged_user_is_invisible_to_lookups() {
        let conn = get_db_connection();
        let user = create_user(
            "foo@bar.baz",
            "Foo",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        purge_user(user.id, &conn).unwrap();

        assert_eq!(get_user_by_id(user.id, &conn), Err(Error::NotFound));
        assert_eq!(get_user_by_email("foo@bar.baz", &conn), Err(Error::NotFound));
        assert_eq!(purge_user(user.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn purge_cascades_to_owned_records() {
        let conn = get_db_connection();
        let user = create_user(
            "foo@bar.baz",
            "Foo",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();
        crate::transaction::create_transaction(
            user.id,
            crate::transaction::Transaction::build(
                10.0,
                date!(2024 - 01 - 01),
                crate::transaction::TransactionKind::Expense,
                "Dining",
            ),
            &conn,
        )
        .unwrap();

        purge_user(user.id, &conn).unwrap();

        assert_eq!(crate::transaction::count_transactions(&conn), Ok(0));
    }

    #[test]
    fn tombstone_alone_hides_a_user_even_if_the_row_survives() {
        let conn = get_db_connection();
        let user = create_user(
            "foo@bar.baz",
            "Foo",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        // Simulate a purge that wrote the tombstone but failed before the row
        // deletion went through.
        conn.execute(
            "INSERT INTO purged_user (user_id, email) VALUES (?1, ?2)",
            (user.id.as_i64(), "foo@bar.baz"),
        )
        .unwrap();

        assert_eq!(get_user_by_id(user.id, &conn), Err(Error::NotFound));
        assert_eq!(get_user_by_email("foo@bar.baz", &conn), Err(Error::NotFound));
    }

    #[test]
    fn returns_correct_count() {
        let conn = get_db_connection();

        let count = count_users(&conn).expect("Could not get user count");
        assert_eq!(0, count, "Want zero users before insertion, got {count}");

        create_user(
            "foo@bar.baz",
            "Foo",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        let count = count_users(&conn).expect("Could not get user count");
        assert_eq!(1, count, "Want one user after insertion, got {count}");
    }
}
