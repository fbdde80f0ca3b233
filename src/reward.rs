//! The streak and reward engine.
//!
//! Every transaction a user records earns coins, and recording on consecutive
//! calendar days builds a streak. The user's tier is a step function of their
//! cumulative coins and is recomputed whenever coins change; it is never
//! stored or mutated independently.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    transaction::{Transaction, TransactionKind},
    user::User,
};

/// Coins awarded for recording a transaction.
pub const ENTRY_COINS: i64 = 50;

/// Coins awarded for recording a saving contribution.
///
/// Savings earn double as an incentive weighting. Both values are policy
/// constants, not structural requirements.
pub const SAVING_ENTRY_COINS: i64 = 100;

/// A cosmetic status rank derived purely from cumulative reward coins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    /// The starting rank.
    Copper,
    /// At least 500 coins.
    Silver,
    /// At least 1,000 coins.
    Gold,
    /// At least 2,500 coins.
    Platinum,
    /// At least 5,000 coins, the top rank.
    Diamond,
}

/// The tier ladder with inclusive lower coin bounds, in ascending order.
const TIER_LADDER: [(Tier, i64); 5] = [
    (Tier::Copper, 0),
    (Tier::Silver, 500),
    (Tier::Gold, 1_000),
    (Tier::Platinum, 2_500),
    (Tier::Diamond, 5_000),
];

impl Tier {
    /// The tier for a coin balance.
    pub fn for_coins(coins: i64) -> Self {
        TIER_LADDER
            .iter()
            .rev()
            .find(|(_, threshold)| coins >= *threshold)
            .map(|(tier, _)| *tier)
            .unwrap_or(Tier::Copper)
    }

    /// How far a coin balance has progressed from the current tier towards the
    /// next one, as a percentage clamped to 0..=100.
    ///
    /// At the top tier the progress is defined as 100.
    pub fn progress(coins: i64) -> u8 {
        let position = TIER_LADDER
            .iter()
            .rposition(|(_, threshold)| coins >= *threshold)
            .unwrap_or(0);

        let Some((_, next_threshold)) = TIER_LADDER.get(position + 1) else {
            return 100;
        };

        let (_, current_threshold) = TIER_LADDER[position];
        let fraction =
            (coins - current_threshold) * 100 / (next_threshold - current_threshold);

        fraction.clamp(0, 100) as u8
    }

    /// The tier name as stored and displayed, e.g. "GOLD".
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Copper => "COPPER",
            Tier::Silver => "SILVER",
            Tier::Gold => "GOLD",
            Tier::Platinum => "PLATINUM",
            Tier::Diamond => "DIAMOND",
        }
    }
}

/// The coins awarded for recording a transaction of `kind`.
pub fn coin_award(kind: TransactionKind) -> i64 {
    match kind {
        TransactionKind::Saving => SAVING_ENTRY_COINS,
        _ => ENTRY_COINS,
    }
}

/// The user state written back after recording a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryReward {
    /// The user's new coin balance.
    pub coins: i64,
    /// The user's new streak.
    pub streak: i64,
    /// The calendar day of the entry in the reference timezone.
    pub last_entry_date: Date,
}

/// Compute the coin, streak, and entry-date transition for a new transaction.
///
/// `today` must be the current calendar date in the reference timezone.
/// Multiple entries on the same day award coins but never inflate the streak;
/// an entry exactly one day after the last one extends the streak; a gap of
/// two or more days (or a first-ever entry) resets it to 1.
///
/// This function is applied exactly once per transaction creation, never on
/// edits or deletes.
pub fn register_entry(user: &User, kind: TransactionKind, today: Date) -> EntryReward {
    let streak = match user.last_entry_date {
        Some(last_entry) if last_entry == today => user.streak,
        Some(last_entry) if last_entry.next_day() == Some(today) => user.streak + 1,
        _ => 1,
    };

    EntryReward {
        coins: user.coins + coin_award(kind),
        streak,
        last_entry_date: today,
    }
}

/// The longest run of consecutive calendar days with at least one transaction.
///
/// Used for the profile "highest streak" statistic; the live streak on the
/// user record only tracks the current run.
pub fn longest_streak(transactions: &[Transaction]) -> i64 {
    let days: BTreeSet<Date> = transactions.iter().map(|transaction| transaction.date).collect();

    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<Date> = None;

    for day in days {
        current = match previous {
            Some(previous_day) if previous_day.next_day() == Some(day) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(day);
    }

    longest
}
