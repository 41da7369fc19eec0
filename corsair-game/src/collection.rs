//! Derived collection views: summaries, profiles, and leaderboard rows.
//!
//! Everything here is computed from append-only acquisition records; none
//! of these functions mutate state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Card, Rarity};
use crate::ledger::UserId;
use crate::numbers::{i64_to_f64, round_f64_to_i32, u32_to_f64};
use crate::storage::Storage;

/// One obtained card. Append-only; never updated or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acquisition {
    pub user: UserId,
    pub card: String,
    pub obtained_at: DateTime<Utc>,
}

/// Aggregate statistics over a user's acquisitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    pub count: u32,
    pub total_power: i64,
    pub tier4_count: u32,
    pub tier5_count: u32,
}

/// One leaderboard row, ordered by (rare cards desc, total power desc).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub user: UserId,
    pub display_name: Option<String>,
    pub total_cards: u32,
    pub total_power: i64,
    pub rare_cards: u32,
}

/// Collection overview: totals plus a per-tier breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub total_cards: u32,
    pub total_power: i64,
    /// Cards held per tier, indexed by [`Rarity::index`].
    pub rarity_counts: [u32; 5],
}

impl CollectionSummary {
    #[must_use]
    pub const fn count_for(&self, rarity: Rarity) -> u32 {
        self.rarity_counts[rarity.index()]
    }

    /// Mean power per held card, rounded to the nearest integer.
    #[must_use]
    pub fn average_power(&self) -> i32 {
        if self.total_cards == 0 {
            return 0;
        }
        round_f64_to_i32(i64_to_f64(self.total_power) / u32_to_f64(self.total_cards))
    }
}

/// A card and how many copies of it the user holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub card: Card,
    pub copies: u32,
}

/// Per-user profile statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub registered_at: DateTime<Utc>,
    pub days_playing: i64,
    pub stats: CollectionStats,
    pub last_draw: Option<DateTime<Utc>>,
}

/// Totals plus per-tier counts for one user's collection.
///
/// # Errors
///
/// Propagates storage failures unchanged.
pub fn collection_summary<S: Storage>(
    store: &S,
    user: UserId,
) -> Result<CollectionSummary, S::Error> {
    let rarity_by_card = rarity_index(store)?;
    let stats = store.aggregate_stats(user)?;
    let mut rarity_counts = [0u32; 5];
    for acquisition in store.list_acquisitions(user)? {
        if let Some(rarity) = rarity_by_card.get(&acquisition.card) {
            rarity_counts[rarity.index()] += 1;
        }
    }
    Ok(CollectionSummary {
        total_cards: stats.count,
        total_power: stats.total_power,
        rarity_counts,
    })
}

/// The user's cards of one tier, copies folded together, strongest first.
///
/// # Errors
///
/// Propagates storage failures unchanged.
pub fn collection_by_rarity<S: Storage>(
    store: &S,
    user: UserId,
    rarity: Rarity,
) -> Result<Vec<CollectionEntry>, S::Error> {
    let tier_cards: HashMap<String, Card> = store
        .cards_by_rarity(rarity)?
        .into_iter()
        .map(|card| (card.id.clone(), card))
        .collect();

    let mut copies: HashMap<&str, u32> = HashMap::new();
    let acquisitions = store.list_acquisitions(user)?;
    for acquisition in &acquisitions {
        if let Some(card) = tier_cards.get(acquisition.card.as_str()) {
            *copies.entry(card.id.as_str()).or_insert(0) += 1;
        }
    }

    let mut entries: Vec<CollectionEntry> = copies
        .into_iter()
        .filter_map(|(id, copies)| {
            tier_cards.get(id).map(|card| CollectionEntry {
                card: card.clone(),
                copies,
            })
        })
        .collect();
    entries.sort_by(|a, b| {
        b.card
            .total_power()
            .cmp(&a.card.total_power())
            .then_with(|| a.card.name.cmp(&b.card.name))
    });
    Ok(entries)
}

/// Profile statistics for a registered user, `None` for an unseen id.
///
/// # Errors
///
/// Propagates storage failures unchanged.
pub fn profile<S: Storage>(
    store: &S,
    user: UserId,
    now: DateTime<Utc>,
) -> Result<Option<Profile>, S::Error> {
    let Some(record) = store.get_user(user)? else {
        return Ok(None);
    };
    let stats = store.aggregate_stats(user)?;
    Ok(Some(Profile {
        registered_at: record.registered_at,
        days_playing: now
            .signed_duration_since(record.registered_at)
            .num_days()
            .max(0),
        stats,
        last_draw: record.last_draw,
    }))
}

fn rarity_index<S: Storage>(store: &S) -> Result<HashMap<String, Rarity>, S::Error> {
    let mut index = HashMap::new();
    for rarity in Rarity::ALL {
        for card in store.cards_by_rarity(rarity)? {
            index.insert(card.id, rarity);
        }
    }
    Ok(index)
}
