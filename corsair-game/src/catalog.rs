//! Card catalog: rarity tiers, card definitions, and the seeded card pool.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::GameError;
use crate::storage::Storage;

/// Rarity tier of a card. Higher tiers are rarer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    /// All tiers, most common first.
    pub const ALL: [Self; 5] = [
        Self::Common,
        Self::Rare,
        Self::Epic,
        Self::Legendary,
        Self::Mythic,
    ];

    /// Numeric tier, 1 (most common) through 5 (rarest).
    #[must_use]
    pub const fn tier(self) -> u8 {
        match self {
            Self::Common => 1,
            Self::Rare => 2,
            Self::Epic => 3,
            Self::Legendary => 4,
            Self::Mythic => 5,
        }
    }

    /// Zero-based index into per-tier tables such as the weight vector.
    #[must_use]
    pub const fn index(self) -> usize {
        self.tier() as usize - 1
    }

    /// Star count shown next to a card of this tier.
    #[must_use]
    pub const fn stars(self) -> usize {
        self.tier() as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Legendary => "Legendary",
            Self::Mythic => "Mythic",
        }
    }

    /// Parse a numeric tier.
    #[must_use]
    pub const fn from_tier(tier: u8) -> Option<Self> {
        match tier {
            1 => Some(Self::Common),
            2 => Some(Self::Rare),
            3 => Some(Self::Epic),
            4 => Some(Self::Legendary),
            5 => Some(Self::Mythic),
            _ => None,
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<u8> for Rarity {
    type Error = String;

    fn try_from(tier: u8) -> Result<Self, Self::Error> {
        Self::from_tier(tier).ok_or_else(|| format!("rarity tier out of range: {tier}"))
    }
}

impl From<Rarity> for u8 {
    fn from(rarity: Rarity) -> Self {
        rarity.tier()
    }
}

/// A single immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub rarity: Rarity,
    #[serde(default)]
    pub desc: String,
    /// Relative image reference resolved by the presentation layer.
    #[serde(default)]
    pub image: String,
    pub health: u32,
    pub melee: u32,
    pub ranged: u32,
    pub special: u32,
}

impl Card {
    /// Sum of all four stat fields.
    #[must_use]
    pub const fn total_power(&self) -> u32 {
        self.health + self.melee + self.ranged + self.special
    }
}

/// Container for the full card dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CatalogData {
    pub cards: Vec<Card>,
}

impl CatalogData {
    /// Create empty catalog data (useful for tests).
    #[must_use]
    pub fn empty() -> Self {
        Self { cards: Vec::new() }
    }

    /// Load catalog data from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into valid card data.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Create catalog data from pre-built cards.
    #[must_use]
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// Get the embedded default dataset.
    #[must_use]
    pub fn default_data() -> Self {
        serde_json::from_str(include_str!("../assets/data/cards.json"))
            .unwrap_or_else(|_| Self::empty())
    }

    /// Cards belonging to one tier.
    #[must_use]
    pub fn tier_cards(&self, rarity: Rarity) -> Vec<&Card> {
        self.cards
            .iter()
            .filter(|card| card.rarity == rarity)
            .collect()
    }
}

/// Read-only card registry backed by the injected store.
///
/// Seeding is idempotent: a store that already holds cards is left alone,
/// so repeated startups never duplicate the pool.
#[derive(Debug)]
pub struct Catalog<S: Storage> {
    store: Arc<S>,
}

impl<S: Storage> Clone for Catalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Storage> Catalog<S> {
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Seed the store with `data` unless it already holds cards.
    /// Returns whether the seed was applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn ensure_seeded(&self, data: &CatalogData) -> Result<bool, S::Error> {
        if self.store.card_count()? > 0 {
            return Ok(false);
        }
        self.store.insert_cards(&data.cards)?;
        log::info!("seeded card catalog with {} cards", data.cards.len());
        Ok(true)
    }

    /// All cards of one rarity tier.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn cards_by_rarity(&self, rarity: Rarity) -> Result<Vec<Card>, S::Error> {
        self.store.cards_by_rarity(rarity)
    }

    /// Look up a single card.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn card_by_id(&self, id: &str) -> Result<Option<Card>, S::Error> {
        self.store.card_by_id(id)
    }

    /// Draw one card uniformly from a tier.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::EmptyTier`] when the tier holds no cards
    /// (a data-seeding defect, surfaced rather than retried) and
    /// propagates store failures unchanged.
    pub fn sample_card<R: Rng>(
        &self,
        rarity: Rarity,
        rng: &mut R,
    ) -> Result<Card, GameError<S::Error>> {
        let cards = self.store.cards_by_rarity(rarity).map_err(GameError::Storage)?;
        if cards.is_empty() {
            return Err(GameError::EmptyTier(rarity));
        }
        let idx = rng.gen_range(0..cards.len());
        Ok(cards[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn card(id: &str, rarity: Rarity) -> Card {
        Card {
            id: id.to_string(),
            name: id.to_string(),
            rarity,
            desc: String::new(),
            image: String::new(),
            health: 100,
            melee: 10,
            ranged: 10,
            special: 5,
        }
    }

    #[test]
    fn rarity_tier_roundtrips() {
        for rarity in Rarity::ALL {
            assert_eq!(Rarity::from_tier(rarity.tier()), Some(rarity));
        }
        assert_eq!(Rarity::from_tier(0), None);
        assert_eq!(Rarity::from_tier(6), None);
    }

    #[test]
    fn catalog_data_from_json() {
        let json = r#"{
            "cards": [
                {
                    "id": "mythic/sea-sovereign",
                    "name": "Sea Sovereign",
                    "rarity": 5,
                    "desc": "Ruler of the deep lanes",
                    "health": 210,
                    "melee": 110,
                    "ranged": 95,
                    "special": 120
                }
            ]
        }"#;

        let data = CatalogData::from_json(json).unwrap();
        assert_eq!(data.cards.len(), 1);
        assert_eq!(data.cards[0].rarity, Rarity::Mythic);
        assert_eq!(data.cards[0].total_power(), 535);
        assert!(data.cards[0].image.is_empty());
    }

    #[test]
    fn default_data_covers_every_tier() {
        let data = CatalogData::default_data();
        for rarity in Rarity::ALL {
            assert!(
                !data.tier_cards(rarity).is_empty(),
                "tier {rarity} missing from embedded dataset"
            );
        }
    }

    #[test]
    fn seeding_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let catalog = Catalog::new(Arc::clone(&store));
        let data = CatalogData::from_cards(vec![card("a", Rarity::Common)]);

        assert!(catalog.ensure_seeded(&data).unwrap());
        assert!(!catalog.ensure_seeded(&data).unwrap());
        assert_eq!(store.card_count().unwrap(), 1);
    }

    #[test]
    fn sample_card_fails_on_empty_tier() {
        let store = Arc::new(MemoryStore::new());
        let catalog = Catalog::new(store);
        let data = CatalogData::from_cards(vec![card("a", Rarity::Common)]);
        catalog.ensure_seeded(&data).unwrap();

        let mut rng = SmallRng::seed_from_u64(7);
        let drawn = catalog.sample_card(Rarity::Common, &mut rng).unwrap();
        assert_eq!(drawn.id, "a");

        let missing = catalog.sample_card(Rarity::Mythic, &mut rng);
        assert!(matches!(missing, Err(GameError::EmptyTier(Rarity::Mythic))));
    }
}
