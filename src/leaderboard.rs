//! The leaderboard endpoint.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    reward::Tier,
    user::list_users_ranked,
};

/// The public standing of one user.
///
/// Only fields every member may see: no email, no entry dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// The user's display name.
    pub name: String,
    /// The user's current streak.
    pub streak: i64,
    /// The user's coin balance.
    pub coins: i64,
    /// The user's reward tier.
    pub tier: Tier,
}

/// Handler for the leaderboard: every user ranked by streak, coins breaking
/// ties.
pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardEntry>>, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let users = list_users_ranked(&connection)?;

    Ok(Json(
        users
            .into_iter()
            .map(|user| LeaderboardEntry {
                name: user.name.clone(),
                streak: user.streak,
                coins: user.coins,
                tier: user.tier(),
            })
            .collect(),
    ))
}

#[cfg(test)]
mod leaderboard_tests {
    use axum::{Json, extract::State};
    use time::macros::date;

    use crate::{
        reward::EntryReward,
        test_utils::{add_test_user, new_test_state},
        user::apply_entry_reward,
    };

    use super::get_leaderboard;

    #[tokio::test]
    async fn entries_are_ranked_and_redacted() {
        let state = new_test_state();
        let first = add_test_user(&state, "first@test.com");
        let second = add_test_user(&state, "second@test.com");
        {
            let connection = state.db_connection.lock().unwrap();
            apply_entry_reward(
                first,
                &EntryReward {
                    coins: 300,
                    streak: 2,
                    last_entry_date: date!(2024 - 01 - 01),
                },
                &connection,
            )
            .unwrap();
            apply_entry_reward(
                second,
                &EntryReward {
                    coins: 100,
                    streak: 9,
                    last_entry_date: date!(2024 - 01 - 01),
                },
                &connection,
            )
            .unwrap();
        }

        let Json(entries) = get_leaderboard(State(state)).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].streak, 9);
        assert_eq!(entries[1].streak, 2);
    }
}
