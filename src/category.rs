//! User-scoped category labels.
//!
//! Categories are plain strings. Each transaction kind ships with a default
//! suggestion list, and users can add their own labels on top; the registry
//! exists purely to feed form suggestions and carries no business logic.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{AppState, Error, transaction::TransactionKind, user::UserID};

/// Alias for the integer type used for category IDs.
pub type CategoryId = i64;

/// A custom category label added by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the label.
    pub id: CategoryId,
    /// The user that owns the label.
    pub user_id: UserID,
    /// The label text.
    pub name: String,
    /// The transaction kind the label is suggested for.
    pub kind: TransactionKind,
}

/// The built-in suggestion list for a transaction kind.
pub fn default_categories(kind: TransactionKind) -> &'static [&'static str] {
    match kind {
        TransactionKind::Income => &[
            "Salary",
            "Freelance",
            "Dividends",
            "Gift",
            "Rental",
            "Bonus",
            "Tax Refund",
        ],
        TransactionKind::Expense => &[
            "Dining",
            "Rent",
            "Groceries",
            "Transport",
            "Utilities",
            "Healthcare",
            "Entertainment",
            "Shopping",
            "Travel",
            "Education",
            "Subscriptions",
        ],
        TransactionKind::Credit => &[
            "Personal Loan",
            "Business Credit",
            "Advance Payment",
            "Inter-account Transfer",
        ],
        TransactionKind::Debt => &[
            "Credit Card",
            "Personal Debt",
            "Mortgage",
            "Student Loan",
            "EMI",
        ],
        TransactionKind::Saving => &[
            "Emergency Fund",
            "Retirement",
            "Investment",
            "Vacation fund",
            "Property",
        ],
    }
}

/// Create the category table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        kind: row.get(3)?,
    })
}

/// Add a custom category label for `user_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn create_category(
    user_id: UserID,
    name: &str,
    kind: TransactionKind,
    connection: &Connection,
) -> Result<Category, Error> {
    let category = connection
        .prepare(
            "INSERT INTO category (user_id, name, kind) VALUES (?1, ?2, ?3)
             RETURNING id, user_id, name, kind",
        )?
        .query_row((user_id.as_i64(), name, kind), map_category_row)?;

    Ok(category)
}

/// Retrieve the custom labels of `user_id` for one kind.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn list_categories(
    user_id: UserID,
    kind: TransactionKind,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, kind FROM category
             WHERE user_id = ?1 AND kind = ?2 ORDER BY name",
        )?
        .query_map((user_id.as_i64(), kind), map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Retrieve a category label by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid label,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_category(id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, user_id, name, kind FROM category WHERE id = :id")?
        .query_row(&[(":id", &id)], map_category_row)
        .map_err(|error| error.into())
}

/// Delete the category label with `id`.
///
/// Transactions keep the label text they were recorded with; removing a label
/// only removes the suggestion.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid label,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_category(id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM category WHERE id = ?1", (id,))?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// The query parameters for listing category suggestions.
#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    /// The transaction kind to suggest labels for.
    pub kind: TransactionKind,
}

/// The suggestion lists for one transaction kind.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategorySuggestions {
    /// The kind the suggestions apply to.
    pub kind: TransactionKind,
    /// The built-in labels.
    pub defaults: Vec<String>,
    /// The user's custom labels.
    pub custom: Vec<Category>,
}

/// The data for adding a custom category label.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCategoryData {
    /// The label text.
    pub name: String,
    /// The transaction kind the label is suggested for.
    pub kind: TransactionKind,
}

/// Handler for listing the default and custom labels for a kind.
pub async fn get_categories(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<CategorySuggestions>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let custom = list_categories(user_id, query.kind, &connection)?;

    Ok(Json(CategorySuggestions {
        kind: query.kind,
        defaults: default_categories(query.kind)
            .iter()
            .map(|name| (*name).to_owned())
            .collect(),
        custom,
    }))
}

/// Handler for adding a custom category label.
///
/// # Errors
///
/// Returns a [Error::EmptyName] if the label is blank.
pub async fn create_category_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Json(category_data): Json<CreateCategoryData>,
) -> Result<(StatusCode, Json<Category>), Error> {
    if category_data.name.trim().is_empty() {
        return Err(Error::EmptyName);
    }

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let category = create_category(
        user_id,
        category_data.name.trim(),
        category_data.kind,
        &connection,
    )?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// Handler for removing a custom category label.
///
/// # Errors
///
/// Returns a [Error::NotFound] if the label does not exist or belongs to
/// another user.
pub async fn delete_category_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Path(category_id): Path<CategoryId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let category = get_category(category_id, &connection)?;
    if category.user_id != user_id {
        return Err(Error::NotFound);
    }

    delete_category(category_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod category_tests {
    use axum::{
        Extension, Json,
        extract::{Path, Query, State},
    };

    use crate::{Error, test_utils::state_with_user, transaction::TransactionKind};

    use super::{
        CategoryQuery, CreateCategoryData, create_category_endpoint, delete_category_endpoint,
        get_categories,
    };

    #[tokio::test]
    async fn suggestions_merge_defaults_and_custom() {
        let (state, user_id) = state_with_user();
        create_category_endpoint(
            State(state.clone()),
            Extension(user_id),
            Json(CreateCategoryData {
                name: "Pet Care".to_owned(),
                kind: TransactionKind::Expense,
            }),
        )
        .await
        .unwrap();

        let Json(suggestions) = get_categories(
            State(state),
            Extension(user_id),
            Query(CategoryQuery {
                kind: TransactionKind::Expense,
            }),
        )
        .await
        .unwrap();

        assert!(suggestions.defaults.contains(&"Dining".to_owned()));
        assert_eq!(suggestions.custom.len(), 1);
        assert_eq!(suggestions.custom[0].name, "Pet Care");
    }

    #[tokio::test]
    async fn custom_labels_are_scoped_by_kind() {
        let (state, user_id) = state_with_user();
        create_category_endpoint(
            State(state.clone()),
            Extension(user_id),
            Json(CreateCategoryData {
                name: "Side Gig".to_owned(),
                kind: TransactionKind::Income,
            }),
        )
        .await
        .unwrap();

        let Json(suggestions) = get_categories(
            State(state),
            Extension(user_id),
            Query(CategoryQuery {
                kind: TransactionKind::Expense,
            }),
        )
        .await
        .unwrap();

        assert!(suggestions.custom.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let (state, user_id) = state_with_user();

        let result = create_category_endpoint(
            State(state),
            Extension(user_id),
            Json(CreateCategoryData {
                name: " ".to_owned(),
                kind: TransactionKind::Expense,
            }),
        )
        .await;

        assert_eq!(result.err(), Some(Error::EmptyName));
    }

    #[tokio::test]
    async fn delete_hides_other_users_labels() {
        let (state, user_id) = state_with_user();
        let other_id = crate::test_utils::add_test_user(&state, "other@test.com");
        let (_, Json(category)) = create_category_endpoint(
            State(state.clone()),
            Extension(other_id),
            Json(CreateCategoryData {
                name: "Pet Care".to_owned(),
                kind: TransactionKind::Expense,
            }),
        )
        .await
        .unwrap();

        let result =
            delete_category_endpoint(State(state), Extension(user_id), Path(category.id)).await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }
}
