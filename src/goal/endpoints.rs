//! Handlers for the savings goal endpoints.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    goal::{
        Goal, GoalId, GoalProgress, create_goal, delete_goal, get_goal, goal_progress, list_goals,
        mark_celebrated,
    },
    transaction::list_transactions_for_user,
    user::UserID,
};

/// The data for creating a goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGoalData {
    /// The display name of the goal.
    pub name: String,
    /// The amount the user wants to save up.
    pub target_amount: f64,
}

/// Handler for creating a savings goal.
///
/// # Errors
///
/// Returns a [Error::EmptyName] if the name is blank or a
/// [Error::InvalidTarget] if the target amount is not a positive number.
pub async fn create_goal_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Json(goal_data): Json<CreateGoalData>,
) -> Result<(StatusCode, Json<Goal>), Error> {
    if goal_data.name.trim().is_empty() {
        return Err(Error::EmptyName);
    }

    if !goal_data.target_amount.is_finite() || goal_data.target_amount <= 0.0 {
        return Err(Error::InvalidTarget(goal_data.target_amount));
    }

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let goal = create_goal(user_id, &goal_data.name, goal_data.target_amount, &connection)?;

    Ok((StatusCode::CREATED, Json(goal)))
}

/// Handler for listing the caller's goals with derived progress.
///
/// A goal whose target was reached since the last read comes back with
/// `just_reached` set, exactly once: the celebration flag is flipped on the
/// goal row in the same request.
pub async fn get_goals(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<GoalProgress>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let goals = list_goals(user_id, &connection)?;
    let transactions = list_transactions_for_user(user_id, &connection)?;

    let mut reports = Vec::with_capacity(goals.len());
    for goal in goals {
        let mut report = goal_progress(&goal, &transactions);

        if report.is_reached && !goal.celebrated {
            mark_celebrated(goal.id, &connection)?;
            report.just_reached = true;
        }

        reports.push(report);
    }

    Ok(Json(reports))
}

/// Handler for deleting a goal.
///
/// # Errors
///
/// Returns a [Error::NotFound] if the goal does not exist or belongs to
/// another user.
pub async fn delete_goal_endpoint(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let goal = get_goal(goal_id, &connection)?;
    // Do not reveal whether the goal exists for someone else.
    if goal.user_id != user_id {
        return Err(Error::NotFound);
    }

    delete_goal(goal_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod goal_endpoint_tests {
    use axum::{Extension, Json, extract::{Path, State}, http::StatusCode};
    use time::macros::date;

    use crate::{
        Error,
        test_utils::state_with_user,
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    use super::{CreateGoalData, create_goal_endpoint, delete_goal_endpoint, get_goals};

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let (state, user_id) = state_with_user();

        let result = create_goal_endpoint(
            State(state),
            Extension(user_id),
            Json(CreateGoalData {
                name: "   ".to_owned(),
                target_amount: 100.0,
            }),
        )
        .await;

        assert_eq!(result.err(), Some(Error::EmptyName));
    }

    #[tokio::test]
    async fn create_rejects_non_positive_target() {
        let (state, user_id) = state_with_user();

        let result = create_goal_endpoint(
            State(state),
            Extension(user_id),
            Json(CreateGoalData {
                name: "Laptop".to_owned(),
                target_amount: 0.0,
            }),
        )
        .await;

        assert_eq!(result.err(), Some(Error::InvalidTarget(0.0)));
    }

    #[tokio::test]
    async fn list_reports_progress() {
        let (state, user_id) = state_with_user();
        create_goal_endpoint(
            State(state.clone()),
            Extension(user_id),
            Json(CreateGoalData {
                name: "Laptop".to_owned(),
                target_amount: 1000.0,
            }),
        )
        .await
        .unwrap();
        {
            let connection = state.db_connection.lock().unwrap();
            create_transaction(
                user_id,
                Transaction::build(
                    250.0,
                    date!(2024 - 01 - 01),
                    TransactionKind::Saving,
                    "laptop",
                ),
                &connection,
            )
            .unwrap();
        }

        let Json(reports) = get_goals(State(state), Extension(user_id)).await.unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].saved, 250.0);
        assert_eq!(reports[0].progress, 25.0);
        assert!(!reports[0].is_reached);
    }

    #[tokio::test]
    async fn celebration_fires_exactly_once() {
        let (state, user_id) = state_with_user();
        create_goal_endpoint(
            State(state.clone()),
            Extension(user_id),
            Json(CreateGoalData {
                name: "Laptop".to_owned(),
                target_amount: 1000.0,
            }),
        )
        .await
        .unwrap();
        {
            let connection = state.db_connection.lock().unwrap();
            create_transaction(
                user_id,
                Transaction::build(
                    1500.0,
                    date!(2024 - 01 - 01),
                    TransactionKind::Saving,
                    "Laptop",
                ),
                &connection,
            )
            .unwrap();
        }

        let Json(first) = get_goals(State(state.clone()), Extension(user_id))
            .await
            .unwrap();
        let Json(second) = get_goals(State(state), Extension(user_id)).await.unwrap();

        assert!(first[0].is_reached);
        assert!(first[0].just_reached);
        assert!(second[0].is_reached);
        assert!(!second[0].just_reached);
    }

    #[tokio::test]
    async fn delete_hides_other_users_goals() {
        let (state, user_id) = state_with_user();
        let other_id = crate::test_utils::add_test_user(&state, "other@test.com");
        let (_, Json(goal)) = create_goal_endpoint(
            State(state.clone()),
            Extension(other_id),
            Json(CreateGoalData {
                name: "Car".to_owned(),
                target_amount: 9000.0,
            }),
        )
        .await
        .unwrap();

        let result = delete_goal_endpoint(State(state), Extension(user_id), Path(goal.id)).await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[tokio::test]
    async fn delete_removes_own_goal() {
        let (state, user_id) = state_with_user();
        let (_, Json(goal)) = create_goal_endpoint(
            State(state.clone()),
            Extension(user_id),
            Json(CreateGoalData {
                name: "Car".to_owned(),
                target_amount: 9000.0,
            }),
        )
        .await
        .unwrap();

        let status = delete_goal_endpoint(State(state.clone()), Extension(user_id), Path(goal.id))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::NO_CONTENT);
        let Json(reports) = get_goals(State(state), Extension(user_id)).await.unwrap();
        assert!(reports.is_empty());
    }
}
