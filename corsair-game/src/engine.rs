//! Drop engine: cooldown gating, tier resolution, card sampling, and the
//! commit sequence that keeps bonus consumption all-or-nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

use crate::GameError;
use crate::catalog::{Card, Catalog};
use crate::collection::Acquisition;
use crate::constants::{RNG_STREAM_CARD, RNG_STREAM_RARITY};
use crate::ledger::{UserId, UserLedger, UserRecord};
use crate::rarity;
use crate::storage::Storage;

/// Result of a draw attempt. `Denied` is an expected outcome carrying the
/// remaining cooldown, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    Drawn(Card),
    Denied { wait: Duration },
}

/// Split a wait duration into whole hours and leftover minutes for
/// user-facing messaging.
#[must_use]
pub fn wait_parts(wait: Duration) -> (i64, i64) {
    let minutes = wait.num_minutes().max(0);
    (minutes / 60, minutes % 60)
}

/// Deterministic bundle of RNG streams segregated by sampling domain.
#[derive(Debug)]
pub struct RngBundle {
    rarity: Mutex<ChaCha20Rng>,
    card: Mutex<ChaCha20Rng>,
}

impl RngBundle {
    /// Construct the bundle from a host-provided seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rarity: Mutex::new(ChaCha20Rng::seed_from_u64(derive_stream_seed(
                seed,
                RNG_STREAM_RARITY,
            ))),
            card: Mutex::new(ChaCha20Rng::seed_from_u64(derive_stream_seed(
                seed,
                RNG_STREAM_CARD,
            ))),
        }
    }

    fn rarity(&self) -> MutexGuard<'_, ChaCha20Rng> {
        self.rarity.lock().expect("rarity rng poisoned")
    }

    fn card(&self) -> MutexGuard<'_, ChaCha20Rng> {
        self.card.lock().expect("card rng poisoned")
    }
}

fn derive_stream_seed(seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}

/// How an allowed draw cleared the cooldown gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatePass {
    FirstDraw,
    CooldownElapsed,
    ExtraCredit,
}

/// Orchestrates a single draw against the catalog and ledger.
pub struct DropEngine<S: Storage> {
    store: Arc<S>,
    catalog: Catalog<S>,
    ledger: Arc<UserLedger<S>>,
    rng: RngBundle,
    /// Serializes whole draw sequences per user, so two sessions cannot
    /// both pass the gate on one entitlement. Distinct from the ledger's
    /// per-operation row locks.
    draw_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl<S: Storage> DropEngine<S> {
    #[must_use]
    pub fn new(
        store: Arc<S>,
        catalog: Catalog<S>,
        ledger: Arc<UserLedger<S>>,
        seed: u64,
    ) -> Self {
        Self {
            store,
            catalog,
            ledger,
            rng: RngBundle::from_seed(seed),
            draw_locks: Mutex::new(HashMap::new()),
        }
    }

    fn draw_lock(&self, user: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.draw_locks.lock().expect("draw lock map poisoned");
        Arc::clone(locks.entry(user).or_default())
    }

    /// Attempt to draw one card for `user` at instant `now`.
    ///
    /// The first-ever draw always succeeds. Afterwards a draw needs either
    /// an elapsed cooldown or an extra-draw credit. Irreversible
    /// consumption (cooldown advance, credit spend, bonus clear) happens
    /// only after a card is confirmed obtained; a failed sample leaves the
    /// user exactly as it found them.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EmptyTier`] when the sampled tier holds no
    /// cards, and propagates storage failures unchanged.
    pub fn draw(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<DrawOutcome, GameError<S::Error>> {
        let cell = self.draw_lock(user);
        let _session = cell.lock().expect("draw lock poisoned");

        let record = self
            .ledger
            .get_or_create(user, None, now)
            .map_err(GameError::Storage)?;

        let pass = match self.gate(&record, now)? {
            Ok(pass) => pass,
            Err(wait) => {
                let (hours, minutes) = wait_parts(wait);
                log::debug!("draw denied for user {user}: {hours}h {minutes}m remaining");
                return Ok(DrawOutcome::Denied { wait });
            }
        };

        // Read the bonus without clearing it; it is consumed only after
        // the draw commits.
        let bonus = record.rarity_bonus;
        let tier = rarity::resolve_tier(bonus, &mut *self.rng.rarity());
        let card = match self.catalog.sample_card(tier, &mut *self.rng.card()) {
            Ok(card) => card,
            Err(err) => {
                if let GameError::EmptyTier(tier) = &err {
                    log::error!("draw failed for user {user}: tier {tier} has no cards");
                }
                return Err(err);
            }
        };

        // Commit sequence: the card is confirmed, consumption may begin.
        self.store
            .insert_acquisition(&Acquisition {
                user,
                card: card.id.clone(),
                obtained_at: now,
            })
            .map_err(GameError::Storage)?;
        self.ledger
            .record_draw(user, now)
            .map_err(GameError::Storage)?;
        if pass == GatePass::ExtraCredit {
            // The credit was only peeked at gate time; spend it now.
            let _ = self
                .ledger
                .consume_extra_draw(user)
                .map_err(GameError::Storage)?;
        }
        if bonus > 0.0 {
            self.ledger
                .consume_rarity_bonus(user)
                .map_err(GameError::Storage)?;
        }

        log::debug!(
            "user {user} drew {} ({}, bonus {bonus}, via {pass:?})",
            card.id,
            tier.name()
        );
        Ok(DrawOutcome::Drawn(card))
    }

    /// Decide whether the draw may proceed, without consuming anything.
    #[allow(clippy::type_complexity)]
    fn gate(
        &self,
        record: &UserRecord,
        now: DateTime<Utc>,
    ) -> Result<Result<GatePass, Duration>, GameError<S::Error>> {
        let owned = self
            .store
            .acquisition_count(record.id)
            .map_err(GameError::Storage)?;
        if owned == 0 {
            return Ok(Ok(GatePass::FirstDraw));
        }
        if record.can_draw(now) {
            return Ok(Ok(GatePass::CooldownElapsed));
        }
        if record.extra_draws > 0 {
            return Ok(Ok(GatePass::ExtraCredit));
        }
        let wait = record.wait_remaining(now).unwrap_or_else(Duration::zero);
        Ok(Err(wait))
    }
}
