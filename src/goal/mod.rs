//! Savings goals.
//!
//! A goal is a named savings objective with a target amount. Progress is
//! never stored: it is derived from the SAVING transactions whose category
//! matches the goal. Reaching 100% fires a one-time celebration event that is
//! persisted on the goal row so repeated reads never replay it.

mod core;
mod endpoints;

pub use self::core::{
    Goal, GoalId, GoalProgress, create_goal, create_goal_table, delete_goal, get_goal,
    goal_progress, list_goals, mark_celebrated, slugify,
};
pub use endpoints::{create_goal_endpoint, delete_goal_endpoint, get_goals};
