//! Storage collaborator seam.
//!
//! The core never talks to a database directly; every component receives a
//! [`Storage`] implementation at construction. [`MemoryStore`] is the
//! reference implementation used by tests and single-process hosts.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Mutex, MutexGuard};

use crate::catalog::{Card, Rarity};
use crate::collection::{Acquisition, CollectionStats, LeaderboardRow};
use crate::ledger::{UserId, UserRecord};

/// Trait for abstracting persistent game storage.
/// Platform-specific implementations should provide this.
pub trait Storage: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch one user record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, Self::Error>;

    /// Insert or replace one user record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn upsert_user(&self, record: &UserRecord) -> Result<(), Self::Error>;

    /// Every known user id. Used by the nightly sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn all_user_ids(&self) -> Result<Vec<UserId>, Self::Error>;

    /// Number of cards in the catalog table.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn card_count(&self) -> Result<usize, Self::Error>;

    /// Bulk-insert catalog cards (seeding).
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn insert_cards(&self, cards: &[Card]) -> Result<(), Self::Error>;

    /// All cards of one rarity tier.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn cards_by_rarity(&self, rarity: Rarity) -> Result<Vec<Card>, Self::Error>;

    /// Look up one card.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn card_by_id(&self, id: &str) -> Result<Option<Card>, Self::Error>;

    /// Append one acquisition record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn insert_acquisition(&self, acquisition: &Acquisition) -> Result<(), Self::Error>;

    /// All acquisitions for a user, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_acquisitions(&self, user: UserId) -> Result<Vec<Acquisition>, Self::Error>;

    /// Number of acquisitions for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn acquisition_count(&self, user: UserId) -> Result<usize, Self::Error>;

    /// Aggregate collection statistics for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn aggregate_stats(&self, user: UserId) -> Result<CollectionStats, Self::Error>;

    /// Top collectors ordered by (rare-card count desc, total power desc).
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardRow>, Self::Error>;
}

/// In-memory storage backed by mutex-guarded tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<UserId, UserRecord>>,
    cards: Mutex<Vec<Card>>,
    acquisitions: Mutex<Vec<Acquisition>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> MutexGuard<'_, HashMap<UserId, UserRecord>> {
        self.users.lock().expect("users table poisoned")
    }

    fn cards(&self) -> MutexGuard<'_, Vec<Card>> {
        self.cards.lock().expect("cards table poisoned")
    }

    fn acquisitions(&self) -> MutexGuard<'_, Vec<Acquisition>> {
        self.acquisitions.lock().expect("acquisitions table poisoned")
    }

    fn power_by_card(&self) -> HashMap<String, (Rarity, i64)> {
        self.cards()
            .iter()
            .map(|card| {
                (
                    card.id.clone(),
                    (card.rarity, i64::from(card.total_power())),
                )
            })
            .collect()
    }
}

impl Storage for MemoryStore {
    type Error = Infallible;

    fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, Self::Error> {
        Ok(self.users().get(&id).cloned())
    }

    fn upsert_user(&self, record: &UserRecord) -> Result<(), Self::Error> {
        self.users().insert(record.id, record.clone());
        Ok(())
    }

    fn all_user_ids(&self) -> Result<Vec<UserId>, Self::Error> {
        Ok(self.users().keys().copied().collect())
    }

    fn card_count(&self) -> Result<usize, Self::Error> {
        Ok(self.cards().len())
    }

    fn insert_cards(&self, cards: &[Card]) -> Result<(), Self::Error> {
        self.cards().extend_from_slice(cards);
        Ok(())
    }

    fn cards_by_rarity(&self, rarity: Rarity) -> Result<Vec<Card>, Self::Error> {
        Ok(self
            .cards()
            .iter()
            .filter(|card| card.rarity == rarity)
            .cloned()
            .collect())
    }

    fn card_by_id(&self, id: &str) -> Result<Option<Card>, Self::Error> {
        Ok(self.cards().iter().find(|card| card.id == id).cloned())
    }

    fn insert_acquisition(&self, acquisition: &Acquisition) -> Result<(), Self::Error> {
        self.acquisitions().push(acquisition.clone());
        Ok(())
    }

    fn list_acquisitions(&self, user: UserId) -> Result<Vec<Acquisition>, Self::Error> {
        Ok(self
            .acquisitions()
            .iter()
            .filter(|acquisition| acquisition.user == user)
            .cloned()
            .collect())
    }

    fn acquisition_count(&self, user: UserId) -> Result<usize, Self::Error> {
        Ok(self
            .acquisitions()
            .iter()
            .filter(|acquisition| acquisition.user == user)
            .count())
    }

    fn aggregate_stats(&self, user: UserId) -> Result<CollectionStats, Self::Error> {
        let powers = self.power_by_card();
        let mut stats = CollectionStats::default();
        for acquisition in self.acquisitions().iter() {
            if acquisition.user != user {
                continue;
            }
            let Some((rarity, power)) = powers.get(&acquisition.card) else {
                continue;
            };
            stats.count += 1;
            stats.total_power += power;
            match rarity {
                Rarity::Legendary => stats.tier4_count += 1,
                Rarity::Mythic => stats.tier5_count += 1,
                _ => {}
            }
        }
        Ok(stats)
    }

    fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardRow>, Self::Error> {
        let powers = self.power_by_card();
        let mut rows: HashMap<UserId, LeaderboardRow> = self
            .users()
            .iter()
            .map(|(id, record)| {
                (
                    *id,
                    LeaderboardRow {
                        user: *id,
                        display_name: record.display_name.clone(),
                        total_cards: 0,
                        total_power: 0,
                        rare_cards: 0,
                    },
                )
            })
            .collect();

        for acquisition in self.acquisitions().iter() {
            let Some(row) = rows.get_mut(&acquisition.user) else {
                continue;
            };
            let Some((rarity, power)) = powers.get(&acquisition.card) else {
                continue;
            };
            row.total_cards += 1;
            row.total_power += power;
            if rarity.tier() >= Rarity::Legendary.tier() {
                row.rare_cards += 1;
            }
        }

        let mut ordered: Vec<LeaderboardRow> = rows.into_values().collect();
        ordered.sort_by(|a, b| {
            b.rare_cards
                .cmp(&a.rare_cards)
                .then(b.total_power.cmp(&a.total_power))
                .then(a.user.cmp(&b.user))
        });
        ordered.truncate(limit);
        Ok(ordered)
    }
}
