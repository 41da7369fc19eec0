//! Per-user mutable state: cooldown, active bonuses, daily-claim date.
//!
//! Every mutating operation runs inside a per-user critical section so two
//! concurrent sessions for the same user cannot interleave a read-modify-
//! write. Different users never contend.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{EXTRA_DRAW_CREDITS, RARITY_BOOST_MAGNITUDE, draw_cooldown};
use crate::daily::DailyReward;
use crate::storage::Storage;

/// Opaque user identifier supplied by the (already trusted) caller.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable per-user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub display_name: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub last_draw: Option<DateTime<Utc>>,
    pub daily_claimed: Option<NaiveDate>,
    pub rarity_bonus: f64,
    pub extra_draws: u32,
}

impl UserRecord {
    #[must_use]
    pub fn new(id: UserId, display_name: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            display_name,
            registered_at: now,
            last_draw: None,
            daily_claimed: None,
            rarity_bonus: 0.0,
            extra_draws: 0,
        }
    }

    /// Whether the ordinary-draw cooldown has elapsed.
    #[must_use]
    pub fn can_draw(&self, now: DateTime<Utc>) -> bool {
        match self.last_draw {
            None => true,
            Some(last) => now.signed_duration_since(last) >= draw_cooldown(),
        }
    }

    /// Time left until the next ordinary draw, if any.
    #[must_use]
    pub fn wait_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_draw?;
        let wait = last + draw_cooldown() - now;
        (wait > Duration::zero()).then_some(wait)
    }

    /// Whether the daily bonus can be claimed on `today`.
    #[must_use]
    pub fn can_claim_daily(&self, today: NaiveDate) -> bool {
        match self.daily_claimed {
            None => true,
            Some(claimed) => claimed < today,
        }
    }
}

/// Ledger of user records, serialized per user.
#[derive(Debug)]
pub struct UserLedger<S: Storage> {
    store: Arc<S>,
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl<S: Storage> UserLedger<S> {
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn row_lock(&self, id: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("ledger lock map poisoned");
        Arc::clone(locks.entry(id).or_default())
    }

    fn locked<T>(&self, id: UserId, op: impl FnOnce(&S) -> T) -> T {
        let cell = self.row_lock(id);
        let _held: MutexGuard<'_, ()> = cell.lock().expect("user row lock poisoned");
        op(self.store.as_ref())
    }

    /// Register the user if unseen; re-registration is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates storage failures unchanged.
    pub fn get_or_create(
        &self,
        id: UserId,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<UserRecord, S::Error> {
        self.locked(id, |store| {
            if let Some(existing) = store.get_user(id)? {
                return Ok(existing);
            }
            let record = UserRecord::new(id, display_name.map(str::to_string), now);
            store.upsert_user(&record)?;
            Ok(record)
        })
    }

    /// Whether the ordinary-draw cooldown has elapsed (true for unseen users).
    ///
    /// # Errors
    ///
    /// Propagates storage failures unchanged.
    pub fn can_draw(&self, id: UserId, now: DateTime<Utc>) -> Result<bool, S::Error> {
        Ok(self
            .store
            .get_user(id)?
            .is_none_or(|record| record.can_draw(now)))
    }

    /// Remaining cooldown for the user, when one applies.
    ///
    /// # Errors
    ///
    /// Propagates storage failures unchanged.
    pub fn wait_remaining(
        &self,
        id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Duration>, S::Error> {
        Ok(self
            .store
            .get_user(id)?
            .and_then(|record| record.wait_remaining(now)))
    }

    /// Record a completed draw. The stored timestamp never moves backwards,
    /// even if the caller's clock does.
    ///
    /// # Errors
    ///
    /// Propagates storage failures unchanged.
    pub fn record_draw(&self, id: UserId, now: DateTime<Utc>) -> Result<(), S::Error> {
        self.locked(id, |store| {
            let Some(mut record) = store.get_user(id)? else {
                return Ok(());
            };
            record.last_draw = Some(record.last_draw.map_or(now, |last| last.max(now)));
            store.upsert_user(&record)
        })
    }

    /// Atomically read and clear the active rarity bonus, returning the
    /// pre-reset magnitude.
    ///
    /// # Errors
    ///
    /// Propagates storage failures unchanged.
    pub fn consume_rarity_bonus(&self, id: UserId) -> Result<f64, S::Error> {
        self.locked(id, |store| {
            let Some(mut record) = store.get_user(id)? else {
                return Ok(0.0);
            };
            let taken = record.rarity_bonus;
            if taken != 0.0 {
                record.rarity_bonus = 0.0;
                store.upsert_user(&record)?;
            }
            Ok(taken)
        })
    }

    /// Spend one extra-draw credit. Returns false (and mutates nothing)
    /// when no credit is available.
    ///
    /// # Errors
    ///
    /// Propagates storage failures unchanged.
    pub fn consume_extra_draw(&self, id: UserId) -> Result<bool, S::Error> {
        self.locked(id, |store| {
            let Some(mut record) = store.get_user(id)? else {
                return Ok(false);
            };
            if record.extra_draws == 0 {
                return Ok(false);
            }
            record.extra_draws -= 1;
            store.upsert_user(&record)?;
            Ok(true)
        })
    }

    /// Whether the daily bonus is still available on `today`.
    ///
    /// # Errors
    ///
    /// Propagates storage failures unchanged.
    pub fn can_claim_daily(&self, id: UserId, today: NaiveDate) -> Result<bool, S::Error> {
        Ok(self
            .store
            .get_user(id)?
            .is_none_or(|record| record.can_claim_daily(today)))
    }

    /// Claim the daily bonus, applying exactly one reward. Returns false
    /// (and mutates nothing) when today's bonus was already claimed.
    ///
    /// # Errors
    ///
    /// Propagates storage failures unchanged.
    pub fn claim_daily(
        &self,
        id: UserId,
        today: NaiveDate,
        reward: DailyReward,
    ) -> Result<bool, S::Error> {
        self.locked(id, |store| {
            let Some(mut record) = store.get_user(id)? else {
                return Ok(false);
            };
            if !record.can_claim_daily(today) {
                return Ok(false);
            }
            record.daily_claimed = Some(today);
            match reward {
                DailyReward::RarityBoost => record.rarity_bonus = RARITY_BOOST_MAGNITUDE,
                DailyReward::ExtraDraw => record.extra_draws = EXTRA_DRAW_CREDITS,
            }
            store.upsert_user(&record)?;
            Ok(true)
        })
    }

    /// Nightly sweep: zero the bonus fields of every user whose claim date
    /// is not `today`. Running it again is a no-op. Returns how many users
    /// were actually reset.
    ///
    /// # Errors
    ///
    /// Propagates storage failures unchanged.
    pub fn reset_expired_bonuses(&self, today: NaiveDate) -> Result<usize, S::Error> {
        let mut swept = 0usize;
        for id in self.store.all_user_ids()? {
            let reset = self.locked(id, |store| {
                let Some(mut record) = store.get_user(id)? else {
                    return Ok(false);
                };
                if record.daily_claimed == Some(today) {
                    return Ok(false);
                }
                if record.rarity_bonus == 0.0 && record.extra_draws == 0 {
                    return Ok(false);
                }
                record.rarity_bonus = 0.0;
                record.extra_draws = 0;
                store.upsert_user(&record)?;
                Ok(true)
            })?;
            if reset {
                swept += 1;
            }
        }
        Ok(swept)
    }

    /// Current record snapshot, if registered.
    ///
    /// # Errors
    ///
    /// Propagates storage failures unchanged.
    pub fn snapshot(&self, id: UserId) -> Result<Option<UserRecord>, S::Error> {
        self.store.get_user(id)
    }
}
