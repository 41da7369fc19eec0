//! Daily bonus scheduling: the reward menu, claim flow, and nightly sweep.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::{UserId, UserLedger};
use crate::storage::Storage;

/// The two mutually exclusive daily rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyReward {
    /// One-shot boost to the odds of the two rare tiers.
    RarityBoost,
    /// One cooldown-bypass credit.
    ExtraDraw,
}

/// A menu entry shown to the user when the daily bonus is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonusOption {
    pub reward: DailyReward,
    pub name: &'static str,
    pub desc: &'static str,
}

/// The static daily reward menu.
pub const BONUS_MENU: [BonusOption; 2] = [
    BonusOption {
        reward: DailyReward::RarityBoost,
        name: "Card Luck",
        desc: "Raises the odds of rare cards for your next draw today",
    },
    BonusOption {
        reward: DailyReward::ExtraDraw,
        name: "Extra Card",
        desc: "Lets you draw one extra card today, ignoring the cooldown",
    },
];

/// Outcome of a claim attempt. `AlreadyClaimed` is an expected,
/// user-facing result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed(DailyReward),
    AlreadyClaimed,
}

/// Snapshot of a user's active bonuses for status display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BonusStatus {
    pub rarity_bonus: f64,
    pub extra_draws: u32,
    pub daily_available: bool,
}

/// Daily bonus scheduler over the shared ledger.
#[derive(Debug)]
pub struct DailyBonus<S: Storage> {
    ledger: Arc<UserLedger<S>>,
}

impl<S: Storage> DailyBonus<S> {
    #[must_use]
    pub const fn new(ledger: Arc<UserLedger<S>>) -> Self {
        Self { ledger }
    }

    /// The reward options offered each day.
    #[must_use]
    pub const fn menu() -> &'static [BonusOption] {
        &BONUS_MENU
    }

    /// Whether `user` can still claim on `today`.
    ///
    /// # Errors
    ///
    /// Propagates storage failures unchanged.
    pub fn can_claim(&self, user: UserId, today: NaiveDate) -> Result<bool, S::Error> {
        self.ledger.can_claim_daily(user, today)
    }

    /// Claim the daily bonus, applying exactly one reward effect.
    ///
    /// # Errors
    ///
    /// Propagates storage failures unchanged.
    pub fn claim(
        &self,
        user: UserId,
        reward: DailyReward,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome, S::Error> {
        self.ledger.get_or_create(user, None, now)?;
        if self.ledger.claim_daily(user, today, reward)? {
            log::debug!("user {user} claimed daily reward {reward:?}");
            Ok(ClaimOutcome::Claimed(reward))
        } else {
            Ok(ClaimOutcome::AlreadyClaimed)
        }
    }

    /// Active bonus snapshot for the given user.
    ///
    /// # Errors
    ///
    /// Propagates storage failures unchanged.
    pub fn status(&self, user: UserId, today: NaiveDate) -> Result<BonusStatus, S::Error> {
        let record = self.ledger.snapshot(user)?;
        Ok(record.map_or(
            BonusStatus {
                rarity_bonus: 0.0,
                extra_draws: 0,
                daily_available: true,
            },
            |record| BonusStatus {
                rarity_bonus: record.rarity_bonus,
                extra_draws: record.extra_draws,
                daily_available: record.can_claim_daily(today),
            },
        ))
    }

    /// Clear expired bonuses for every user whose claim date is not
    /// `today`. Invoked by an external scheduler; idempotent, and
    /// indifferent to when or how often it runs.
    ///
    /// # Errors
    ///
    /// Propagates storage failures unchanged.
    pub fn nightly_sweep(&self, today: NaiveDate) -> Result<usize, S::Error> {
        let swept = self.ledger.reset_expired_bonuses(today)?;
        if swept > 0 {
            log::info!("nightly sweep reset bonuses for {swept} users");
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn scheduler() -> DailyBonus<MemoryStore> {
        DailyBonus::new(Arc::new(UserLedger::new(Arc::new(MemoryStore::new()))))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 9, 30, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    #[test]
    fn menu_offers_both_rewards_once() {
        let rewards: Vec<DailyReward> = DailyBonus::<MemoryStore>::menu()
            .iter()
            .map(|option| option.reward)
            .collect();
        assert_eq!(rewards, vec![DailyReward::RarityBoost, DailyReward::ExtraDraw]);
    }

    #[test]
    fn claim_registers_unseen_users() {
        let daily = scheduler();
        let outcome = daily
            .claim(UserId(1), DailyReward::RarityBoost, day(7), now())
            .unwrap();
        assert_eq!(outcome, ClaimOutcome::Claimed(DailyReward::RarityBoost));

        let status = daily.status(UserId(1), day(7)).unwrap();
        assert!((status.rarity_bonus - 10.0).abs() < f64::EPSILON);
        assert!(!status.daily_available);
    }

    #[test]
    fn second_claim_same_day_is_rejected() {
        let daily = scheduler();
        daily
            .claim(UserId(2), DailyReward::ExtraDraw, day(7), now())
            .unwrap();
        let outcome = daily
            .claim(UserId(2), DailyReward::RarityBoost, day(7), now())
            .unwrap();
        assert_eq!(outcome, ClaimOutcome::AlreadyClaimed);

        let status = daily.status(UserId(2), day(7)).unwrap();
        assert_eq!(status.extra_draws, 1);
        assert!((status.rarity_bonus - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unseen_user_status_defaults_to_available() {
        let daily = scheduler();
        let status = daily.status(UserId(3), day(7)).unwrap();
        assert!(status.daily_available);
        assert_eq!(status.extra_draws, 0);
    }

    #[test]
    fn sweep_is_idempotent() {
        let daily = scheduler();
        daily
            .claim(UserId(4), DailyReward::RarityBoost, day(6), now())
            .unwrap();
        assert_eq!(daily.nightly_sweep(day(7)).unwrap(), 1);
        assert_eq!(daily.nightly_sweep(day(7)).unwrap(), 0);
    }
}
