//! Corsair Game Engine
//!
//! Platform-agnostic core game logic for the Corsair collectible-card game.
//! This crate provides the drop engine, daily-bonus scheduling, and
//! collection bookkeeping without UI or platform-specific dependencies.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

pub mod catalog;
pub mod collection;
pub mod constants;
pub mod daily;
pub mod engine;
pub mod ledger;
pub mod numbers;
pub mod rarity;
pub mod storage;

// Re-export commonly used types
pub use catalog::{Card, Catalog, CatalogData, Rarity};
pub use collection::{
    Acquisition, CollectionEntry, CollectionStats, CollectionSummary, LeaderboardRow, Profile,
    collection_by_rarity, collection_summary, profile,
};
pub use daily::{BONUS_MENU, BonusOption, BonusStatus, ClaimOutcome, DailyBonus, DailyReward};
pub use engine::{DrawOutcome, DropEngine, RngBundle, wait_parts};
pub use ledger::{UserId, UserLedger, UserRecord};
pub use rarity::{effective_weights, resolve_tier};
pub use storage::{MemoryStore, Storage};

use crate::constants::LEADERBOARD_DEFAULT_LIMIT;

/// Errors surfaced by game operations.
///
/// Expected user-facing outcomes (`Denied`, `AlreadyClaimed`) are modeled
/// as `Ok` variants on the operations that produce them; only genuine
/// failures appear here.
#[derive(Debug, Error)]
pub enum GameError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// A rarity tier holds no cards: a data-seeding defect, fatal to the
    /// single draw and never retried.
    #[error("rarity tier {0} has no cards in the catalog")]
    EmptyTier(Rarity),
    /// Storage-layer failure, propagated unchanged. Retry policy belongs
    /// to the storage collaborator, not the core.
    #[error("storage failure")]
    Storage(#[source] E),
}

/// Main entry point wiring the drop engine, daily bonuses, and collection
/// views over one injected storage collaborator.
pub struct Game<S: Storage> {
    store: Arc<S>,
    catalog: Catalog<S>,
    ledger: Arc<UserLedger<S>>,
    engine: DropEngine<S>,
    daily: DailyBonus<S>,
}

impl<S: Storage> Game<S> {
    /// Wire the components over `store`. The seed drives the engine's
    /// deterministic RNG streams.
    #[must_use]
    pub fn new(store: Arc<S>, seed: u64) -> Self {
        let catalog = Catalog::new(Arc::clone(&store));
        let ledger = Arc::new(UserLedger::new(Arc::clone(&store)));
        let engine = DropEngine::new(
            Arc::clone(&store),
            catalog.clone(),
            Arc::clone(&ledger),
            seed,
        );
        let daily = DailyBonus::new(Arc::clone(&ledger));
        Self {
            store,
            catalog,
            ledger,
            engine,
            daily,
        }
    }

    /// Wire the components and seed the catalog in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be seeded.
    pub fn bootstrap(store: Arc<S>, data: &CatalogData, seed: u64) -> anyhow::Result<Self> {
        let game = Self::new(store, seed);
        game.catalog.ensure_seeded(data)?;
        Ok(game)
    }

    /// Access the card catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    /// Register `user` if unseen; re-registration is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn register(
        &self,
        user: UserId,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<UserRecord, GameError<S::Error>> {
        self.ledger
            .get_or_create(user, display_name, now)
            .map_err(GameError::Storage)
    }

    /// Attempt to draw one card. See [`DropEngine::draw`].
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EmptyTier`] on a catalog data defect and
    /// propagates storage failures.
    pub fn draw(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<DrawOutcome, GameError<S::Error>> {
        self.engine.draw(user, now)
    }

    /// The static daily reward menu.
    #[must_use]
    pub const fn bonus_menu() -> &'static [BonusOption] {
        DailyBonus::<S>::menu()
    }

    /// Whether the daily bonus is still available on `today`.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn can_claim_daily(
        &self,
        user: UserId,
        today: NaiveDate,
    ) -> Result<bool, GameError<S::Error>> {
        self.daily.can_claim(user, today).map_err(GameError::Storage)
    }

    /// Claim today's bonus, applying exactly one reward effect.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn claim_daily(
        &self,
        user: UserId,
        reward: DailyReward,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome, GameError<S::Error>> {
        self.daily
            .claim(user, reward, today, now)
            .map_err(GameError::Storage)
    }

    /// Active bonus snapshot for status display.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn bonus_status(
        &self,
        user: UserId,
        today: NaiveDate,
    ) -> Result<BonusStatus, GameError<S::Error>> {
        self.daily.status(user, today).map_err(GameError::Storage)
    }

    /// Totals plus per-tier counts for one user's collection.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn collection_summary(
        &self,
        user: UserId,
    ) -> Result<CollectionSummary, GameError<S::Error>> {
        collection::collection_summary(self.store.as_ref(), user).map_err(GameError::Storage)
    }

    /// The user's cards of one tier, copies folded together.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn collection_by_rarity(
        &self,
        user: UserId,
        rarity: Rarity,
    ) -> Result<Vec<CollectionEntry>, GameError<S::Error>> {
        collection::collection_by_rarity(self.store.as_ref(), user, rarity)
            .map_err(GameError::Storage)
    }

    /// Profile statistics, `None` for an unseen user.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn profile(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Profile>, GameError<S::Error>> {
        collection::profile(self.store.as_ref(), user, now).map_err(GameError::Storage)
    }

    /// Top collectors, ordered by (rare cards desc, total power desc).
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn leaderboard(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardRow>, GameError<S::Error>> {
        self.store
            .leaderboard(limit.unwrap_or(LEADERBOARD_DEFAULT_LIMIT))
            .map_err(GameError::Storage)
    }

    /// Nightly maintenance: clear bonuses whose claim date is stale.
    /// Idempotent; safe to invoke at any time, any number of times.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn nightly_sweep(&self, today: NaiveDate) -> Result<usize, GameError<S::Error>> {
        self.daily.nightly_sweep(today).map_err(GameError::Storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn game() -> Game<MemoryStore> {
        Game::bootstrap(
            Arc::new(MemoryStore::new()),
            &CatalogData::default_data(),
            0xC04511,
        )
        .expect("bootstrap with embedded data")
    }

    #[test]
    fn bootstrap_seeds_embedded_catalog() {
        let game = game();
        for rarity in Rarity::ALL {
            assert!(!game.catalog().cards_by_rarity(rarity).unwrap().is_empty());
        }
    }

    #[test]
    fn facade_draw_and_summary_roundtrip() {
        let game = game();
        let user = UserId(11);
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();

        let outcome = game.draw(user, now).unwrap();
        let DrawOutcome::Drawn(card) = outcome else {
            panic!("first draw must succeed");
        };

        let summary = game.collection_summary(user).unwrap();
        assert_eq!(summary.total_cards, 1);
        assert_eq!(summary.count_for(card.rarity), 1);
        assert_eq!(i64::from(card.total_power()), summary.total_power);
    }

    #[test]
    fn register_is_idempotent_via_facade() {
        let game = game();
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
        let first = game.register(UserId(12), Some("Sable"), now).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 8, 7, 13, 0, 0).unwrap();
        let second = game.register(UserId(12), None, later).unwrap();
        assert_eq!(first, second);
    }
}
