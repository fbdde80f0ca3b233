//! The account ledger engine.
//!
//! Pure folds that reduce a user's transaction list into the numbers the rest
//! of the app displays and gates behavior on: net liquidity, per-channel
//! balances, monthly category spending, and the outstanding/closed split for
//! lending and borrowing.
//!
//! Everything in this module is a synchronous, idempotent function over an
//! immutable slice, so callers may recompute on every request with no
//! ordering hazard.

use std::{cmp::Ordering, collections::BTreeMap};

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::transaction::{Transaction, TransactionKind};

/// Treat malformed amounts as zero so a single bad row cannot poison an
/// aggregate. Upstream validation rejects these at the API boundary; data
/// imported by other means may still carry them.
fn sanitized(amount: f64) -> f64 {
    if amount.is_finite() { amount } else { 0.0 }
}

/// The signed contribution of one transaction to the owner's liquidity.
///
/// Income adds, expenses and saving contributions subtract. An open loan
/// subtracts (the cash left) and an open debt adds (the cash arrived); once
/// the record is settled or defaulted the movement has reversed or been
/// written off, and the contribution drops to zero. The outstanding amount
/// itself is tracked by [credit_summary] and [debt_summary], not here.
pub fn liquidity_delta(transaction: &Transaction) -> f64 {
    let amount = sanitized(transaction.amount);

    match transaction.kind {
        TransactionKind::Income => amount,
        TransactionKind::Expense => -amount,
        TransactionKind::Saving => -amount,
        TransactionKind::Credit => {
            if transaction.resolution.is_pending() {
                -amount
            } else {
                0.0
            }
        }
        TransactionKind::Debt => {
            if transaction.resolution.is_pending() {
                amount
            } else {
                0.0
            }
        }
    }
}

/// The signed sum of all balance-affecting transactions: the user's current
/// disposable funds.
pub fn net_liquidity(transactions: &[Transaction]) -> f64 {
    transactions.iter().map(liquidity_delta).sum()
}

/// The liquidity total partitioned by the channel each transaction moved
/// through.
///
/// Channels are open-ended labels, so every observed channel gets an entry and
/// the values always sum to [net_liquidity].
pub fn channel_balances(transactions: &[Transaction]) -> BTreeMap<String, f64> {
    let mut balances = BTreeMap::new();

    for transaction in transactions {
        *balances.entry(transaction.channel.clone()).or_insert(0.0) +=
            liquidity_delta(transaction);
    }

    balances
}

/// Total expense spend for one category within a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpend {
    /// The expense category label.
    pub category: String,
    /// The summed expense amounts.
    pub total: f64,
}

/// Expense totals per category for the given calendar month, largest first.
///
/// Ties are broken by category name so the ordering is deterministic.
pub fn monthly_category_spending(
    transactions: &[Transaction],
    year: i32,
    month: Month,
) -> Vec<CategorySpend> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();

    for transaction in transactions {
        if transaction.kind != TransactionKind::Expense {
            continue;
        }

        if transaction.date.year() != year || transaction.date.month() != month {
            continue;
        }

        *totals.entry(transaction.category.as_str()).or_insert(0.0) +=
            sanitized(transaction.amount);
    }

    let mut spending: Vec<CategorySpend> = totals
        .into_iter()
        .map(|(category, total)| CategorySpend {
            category: category.to_owned(),
            total,
        })
        .collect();

    spending.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });

    spending
}

/// The top `n` expense categories for the given calendar month.
pub fn top_spending_categories(
    transactions: &[Transaction],
    year: i32,
    month: Month,
    n: usize,
) -> Vec<CategorySpend> {
    let mut spending = monthly_category_spending(transactions, year, month);
    spending.truncate(n);
    spending
}

/// The receivables position across all CREDIT transactions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CreditSummary {
    /// Money lent out and not yet returned.
    pub outstanding: f64,
    /// Money lent out and settled by the counterparty.
    pub recovered: f64,
    /// Money lent out and written off.
    pub defaulted: f64,
}

/// The payables position across all DEBT transactions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DebtSummary {
    /// Money borrowed and not yet paid back.
    pub outstanding: f64,
    /// Money borrowed and paid back.
    pub settled: f64,
    /// Money borrowed that the lender wrote off.
    pub defaulted: f64,
}

/// Partition the CREDIT transactions by settlement state.
pub fn credit_summary(transactions: &[Transaction]) -> CreditSummary {
    use crate::transaction::Resolution;

    let mut summary = CreditSummary::default();

    for transaction in transactions {
        if transaction.kind != TransactionKind::Credit {
            continue;
        }

        let amount = sanitized(transaction.amount);
        match transaction.resolution {
            Resolution::Pending => summary.outstanding += amount,
            Resolution::Settled => summary.recovered += amount,
            Resolution::Defaulted => summary.defaulted += amount,
        }
    }

    summary
}

/// Partition the DEBT transactions by settlement state.
pub fn debt_summary(transactions: &[Transaction]) -> DebtSummary {
    use crate::transaction::Resolution;

    let mut summary = DebtSummary::default();

    for transaction in transactions {
        if transaction.kind != TransactionKind::Debt {
            continue;
        }

        let amount = sanitized(transaction.amount);
        match transaction.resolution {
            Resolution::Pending => summary.outstanding += amount,
            Resolution::Settled => summary.settled += amount,
            Resolution::Defaulted => summary.defaulted += amount,
        }
    }

    summary
}

/// The net liquidity movement of a single calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyNet {
    /// The calendar day.
    pub date: Date,
    /// The summed liquidity deltas of that day.
    pub net: f64,
}

/// Liquidity deltas summed per calendar day, oldest first.
///
/// Feeds the dashboard trend chart.
pub fn daily_net_series(transactions: &[Transaction]) -> Vec<DailyNet> {
    let mut totals: BTreeMap<Date, f64> = BTreeMap::new();

    for transaction in transactions {
        *totals.entry(transaction.date).or_insert(0.0) += liquidity_delta(transaction);
    }

    totals
        .into_iter()
        .map(|(date, net)| DailyNet { date, net })
        .collect()
}

#[cfg(test)]
mod tests {
    use time::{Month, macros::date};

    use crate::transaction::{Resolution, Transaction, TransactionKind};
    use crate::user::UserID;

    use super::{
        channel_balances, credit_summary, daily_net_series, debt_summary, liquidity_delta,
        monthly_category_spending, net_liquidity, top_spending_categories,
    };

    fn test_transaction(
        amount: f64,
        kind: TransactionKind,
        category: &str,
        channel: &str,
        date: time::Date,
    ) -> Transaction {
        Transaction {
            id: 0,
            user_id: UserID::new(1),
            amount,
            kind,
            category: category.to_owned(),
            channel: channel.to_owned(),
            note: String::new(),
            date,
            resolution: Resolution::Pending,
        }
    }

    fn mixed_history() -> Vec<Transaction> {
        let mut settled_credit = test_transaction(
            200.0,
            TransactionKind::Credit,
            "Asha",
            "WALLET",
            date!(2024 - 01 - 03),
        );
        settled_credit.resolution = Resolution::Settled;

        vec![
            test_transaction(
                1000.0,
                TransactionKind::Income,
                "Salary",
                "BANK",
                date!(2024 - 01 - 01),
            ),
            test_transaction(
                250.0,
                TransactionKind::Expense,
                "Rent",
                "BANK",
                date!(2024 - 01 - 02),
            ),
            test_transaction(
                100.0,
                TransactionKind::Saving,
                "Emergency Fund",
                "BANK",
                date!(2024 - 01 - 02),
            ),
            test_transaction(
                300.0,
                TransactionKind::Credit,
                "Ravi",
                "WALLET",
                date!(2024 - 01 - 03),
            ),
            settled_credit,
            test_transaction(
                150.0,
                TransactionKind::Debt,
                "Credit Card",
                "CASH",
                date!(2024 - 01 - 04),
            ),
        ]
    }

    #[test]
    fn income_adds_and_expense_subtracts() {
        let income = test_transaction(
            100.0,
            TransactionKind::Income,
            "Salary",
            "BANK",
            date!(2024 - 01 - 01),
        );
        let expense = test_transaction(
            40.0,
            TransactionKind::Expense,
            "Dining",
            "CASH",
            date!(2024 - 01 - 01),
        );

        assert_eq!(liquidity_delta(&income), 100.0);
        assert_eq!(liquidity_delta(&expense), -40.0);
    }

    #[test]
    fn saving_leaves_general_liquidity() {
        let saving = test_transaction(
            100.0,
            TransactionKind::Saving,
            "Emergency Fund",
            "BANK",
            date!(2024 - 01 - 01),
        );

        assert_eq!(liquidity_delta(&saving), -100.0);
    }

    #[test]
    fn resolving_a_credit_neutralizes_its_contribution() {
        let mut credit = test_transaction(
            300.0,
            TransactionKind::Credit,
            "Ravi",
            "WALLET",
            date!(2024 - 01 - 01),
        );
        assert_eq!(liquidity_delta(&credit), -300.0);

        credit.resolution = Resolution::Settled;
        assert_eq!(liquidity_delta(&credit), 0.0);

        credit.resolution = Resolution::Defaulted;
        assert_eq!(liquidity_delta(&credit), 0.0);
    }

    #[test]
    fn open_debt_adds_until_settled() {
        let mut debt = test_transaction(
            150.0,
            TransactionKind::Debt,
            "Credit Card",
            "CASH",
            date!(2024 - 01 - 01),
        );
        assert_eq!(liquidity_delta(&debt), 150.0);

        debt.resolution = Resolution::Settled;
        assert_eq!(liquidity_delta(&debt), 0.0);
    }

    #[test]
    fn net_liquidity_folds_the_whole_history() {
        // 1000 - 250 - 100 - 300 + 0 + 150
        assert_eq!(net_liquidity(&mixed_history()), 500.0);
    }

    #[test]
    fn net_liquidity_of_empty_history_is_zero() {
        assert_eq!(net_liquidity(&[]), 0.0);
    }

    #[test]
    fn net_liquidity_is_idempotent() {
        let transactions = mixed_history();

        let first = net_liquidity(&transactions);
        let second = net_liquidity(&transactions);

        assert_eq!(first, second);
    }

    #[test]
    fn channel_balances_sum_to_net_liquidity() {
        let transactions = mixed_history();

        let balances = channel_balances(&transactions);
        let sum: f64 = balances.values().sum();

        assert_eq!(sum, net_liquidity(&transactions));
    }

    #[test]
    fn channel_balances_accumulate_per_observed_label() {
        let transactions = mixed_history();

        let balances = channel_balances(&transactions);

        assert_eq!(balances["BANK"], 650.0);
        assert_eq!(balances["WALLET"], -300.0);
        assert_eq!(balances["CASH"], 150.0);
    }

    #[test]
    fn malformed_amount_counts_as_zero() {
        let bad = test_transaction(
            f64::NAN,
            TransactionKind::Expense,
            "Dining",
            "CASH",
            date!(2024 - 01 - 01),
        );

        assert_eq!(net_liquidity(&[bad]), 0.0);
    }

    #[test]
    fn monthly_spending_filters_kind_and_month() {
        let transactions = vec![
            test_transaction(
                100.0,
                TransactionKind::Expense,
                "Dining",
                "CASH",
                date!(2024 - 01 - 15),
            ),
            test_transaction(
                70.0,
                TransactionKind::Expense,
                "Dining",
                "CASH",
                date!(2024 - 01 - 20),
            ),
            test_transaction(
                40.0,
                TransactionKind::Expense,
                "Transport",
                "CASH",
                date!(2024 - 01 - 21),
            ),
            // Wrong month and wrong kind respectively.
            test_transaction(
                999.0,
                TransactionKind::Expense,
                "Dining",
                "CASH",
                date!(2024 - 02 - 01),
            ),
            test_transaction(
                999.0,
                TransactionKind::Income,
                "Salary",
                "BANK",
                date!(2024 - 01 - 10),
            ),
        ];

        let spending = monthly_category_spending(&transactions, 2024, Month::January);

        assert_eq!(spending.len(), 2);
        assert_eq!(spending[0].category, "Dining");
        assert_eq!(spending[0].total, 170.0);
        assert_eq!(spending[1].category, "Transport");
        assert_eq!(spending[1].total, 40.0);
    }

    #[test]
    fn top_spending_truncates() {
        let transactions = vec![
            test_transaction(
                10.0,
                TransactionKind::Expense,
                "A",
                "CASH",
                date!(2024 - 01 - 01),
            ),
            test_transaction(
                30.0,
                TransactionKind::Expense,
                "B",
                "CASH",
                date!(2024 - 01 - 01),
            ),
            test_transaction(
                20.0,
                TransactionKind::Expense,
                "C",
                "CASH",
                date!(2024 - 01 - 01),
            ),
        ];

        let top = top_spending_categories(&transactions, 2024, Month::January, 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].category, "B");
        assert_eq!(top[1].category, "C");
    }

    #[test]
    fn credit_summary_partitions_by_resolution() {
        let summary = credit_summary(&mixed_history());

        assert_eq!(summary.outstanding, 300.0);
        assert_eq!(summary.recovered, 200.0);
        assert_eq!(summary.defaulted, 0.0);
    }

    #[test]
    fn resolving_moves_amount_between_buckets_only() {
        let mut transactions = mixed_history();

        let before = credit_summary(&transactions);
        let before_debt = debt_summary(&transactions);

        // Settle Ravi's loan.
        transactions
            .iter_mut()
            .find(|transaction| transaction.category == "Ravi")
            .unwrap()
            .resolution = Resolution::Settled;

        let after = credit_summary(&transactions);

        assert_eq!(after.outstanding, before.outstanding - 300.0);
        assert_eq!(after.recovered, before.recovered + 300.0);
        assert_eq!(debt_summary(&transactions), before_debt);
    }

    #[test]
    fn debt_summary_partitions_by_resolution() {
        let summary = debt_summary(&mixed_history());

        assert_eq!(summary.outstanding, 150.0);
        assert_eq!(summary.settled, 0.0);
    }

    #[test]
    fn daily_series_is_sorted_and_summed() {
        let series = daily_net_series(&mixed_history());

        assert_eq!(series.len(), 4);
        assert_eq!(series[0].date, date!(2024 - 01 - 01));
        assert_eq!(series[0].net, 1000.0);
        // Rent and the saving contribution land on the same day.
        assert_eq!(series[1].net, -350.0);
        assert_eq!(series[2].net, -300.0);
        assert_eq!(series[3].net, 150.0);
    }
}
