//! The dashboard endpoint.
//!
//! Gathers every derived number the overview screen renders in one response:
//! net liquidity, per-channel balances, the current month's top spending,
//! the lend/borrow positions, the daily trend series, and the reward state.

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    AppState, Error,
    ledger::{
        CategorySpend, CreditSummary, DailyNet, DebtSummary, channel_balances, credit_summary,
        daily_net_series, debt_summary, net_liquidity, top_spending_categories,
    },
    reward::Tier,
    timezone::local_today,
    transaction::list_transactions_for_user,
    user::{UserID, get_user_by_id},
};

/// How many top spending categories the dashboard shows.
const TOP_SPENDING_COUNT: usize = 5;

/// Everything the overview screen needs, derived fresh from the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    /// The signed sum of all balance-affecting transactions.
    pub net_liquidity: f64,
    /// The liquidity split per payment channel. Sums to `net_liquidity`.
    pub channel_balances: BTreeMap<String, f64>,
    /// The current month's largest expense categories.
    pub top_spending: Vec<CategorySpend>,
    /// The lending position.
    pub credit: CreditSummary,
    /// The borrowing position.
    pub debt: DebtSummary,
    /// Net movement per calendar day, oldest first.
    pub daily_net: Vec<DailyNet>,
    /// The user's coin balance.
    pub coins: i64,
    /// The user's current streak.
    pub streak: i64,
    /// The user's reward tier.
    pub tier: Tier,
    /// Percent progress from the current tier to the next one.
    pub tier_progress: u8,
}

/// Handler for the dashboard endpoint.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<DashboardData>, Error> {
    let today = local_today(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = get_user_by_id(user_id, &connection)?;
    let transactions = list_transactions_for_user(user_id, &connection)?;

    Ok(Json(DashboardData {
        net_liquidity: net_liquidity(&transactions),
        channel_balances: channel_balances(&transactions),
        top_spending: top_spending_categories(
            &transactions,
            today.year(),
            today.month(),
            TOP_SPENDING_COUNT,
        ),
        credit: credit_summary(&transactions),
        debt: debt_summary(&transactions),
        daily_net: daily_net_series(&transactions),
        coins: user.coins,
        streak: user.streak,
        tier: user.tier(),
        tier_progress: Tier::progress(user.coins),
    }))
}

#[cfg(test)]
mod dashboard_tests {
    use axum::{Extension, Json, extract::State};
    use time::macros::date;

    use crate::{
        reward::Tier,
        test_utils::state_with_user,
        timezone::local_today,
        transaction::{Resolution, Transaction, TransactionKind, create_transaction, set_resolution},
    };

    use super::get_dashboard;

    #[tokio::test]
    async fn dashboard_reflects_the_ledger() {
        let (state, user_id) = state_with_user();
        let today = local_today("Etc/UTC").unwrap();
        {
            let connection = state.db_connection.lock().unwrap();
            create_transaction(
                user_id,
                Transaction::build(1000.0, date!(2024 - 01 - 01), TransactionKind::Income, "Salary")
                    .channel("BANK"),
                &connection,
            )
            .unwrap();
            create_transaction(
                user_id,
                Transaction::build(200.0, today, TransactionKind::Expense, "Dining")
                    .channel("CASH"),
                &connection,
            )
            .unwrap();
            let credit = create_transaction(
                user_id,
                Transaction::build(300.0, date!(2024 - 01 - 02), TransactionKind::Credit, "Ravi")
                    .channel("WALLET"),
                &connection,
            )
            .unwrap();
            set_resolution(credit.id, Resolution::Settled, &connection).unwrap();
        }

        let Json(dashboard) = get_dashboard(State(state), Extension(user_id)).await.unwrap();

        assert_eq!(dashboard.net_liquidity, 800.0);
        let channel_sum: f64 = dashboard.channel_balances.values().sum();
        assert_eq!(channel_sum, dashboard.net_liquidity);
        assert_eq!(dashboard.top_spending.len(), 1);
        assert_eq!(dashboard.top_spending[0].category, "Dining");
        assert_eq!(dashboard.credit.recovered, 300.0);
        assert_eq!(dashboard.credit.outstanding, 0.0);
        assert_eq!(dashboard.coins, 100);
        assert_eq!(dashboard.tier, Tier::Copper);
        assert_eq!(dashboard.tier_progress, 20);
    }

    #[tokio::test]
    async fn empty_history_dashboard_is_all_zeroes() {
        let (state, user_id) = state_with_user();

        let Json(dashboard) = get_dashboard(State(state), Extension(user_id)).await.unwrap();

        assert_eq!(dashboard.net_liquidity, 0.0);
        assert!(dashboard.channel_balances.is_empty());
        assert!(dashboard.top_spending.is_empty());
        assert!(dashboard.daily_net.is_empty());
        assert_eq!(dashboard.streak, 0);
    }
}
