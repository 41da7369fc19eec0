//! Centralized balance and tuning constants for Corsair game logic.
//!
//! These values define the deterministic math for the drop engine.
//! Keeping them together ensures that drop rates can only be adjusted via
//! code changes reviewed in version control, rather than through external
//! JSON assets.

use chrono::Duration;

// Rarity weights -----------------------------------------------------------
// Base percentage weight per tier, Common through Mythic. Sums to 100.
pub(crate) const RARITY_BASE_WEIGHTS: [f64; 5] = [60.0, 28.0, 9.0, 2.5, 0.5];

// Fraction of an active bonus magnitude granted to the two rare tiers.
pub(crate) const BONUS_SHARE_MYTHIC: f64 = 0.3;
pub(crate) const BONUS_SHARE_LEGENDARY: f64 = 0.7;

// Fraction of the bonus magnitude removed from the three common tiers.
pub(crate) const BONUS_DRAIN_COMMON: f64 = 0.6;
pub(crate) const BONUS_DRAIN_RARE: f64 = 0.3;
pub(crate) const BONUS_DRAIN_EPIC: f64 = 0.1;

// Weights below this are treated as zero probability mass.
pub(crate) const WEIGHT_FLOOR: f64 = 0.0;

// Drop cadence -------------------------------------------------------------
pub(crate) const DRAW_COOLDOWN_HOURS: i64 = 2;

#[must_use]
pub(crate) fn draw_cooldown() -> Duration {
    Duration::hours(DRAW_COOLDOWN_HOURS)
}

// Daily bonus tuning -------------------------------------------------------
// Magnitude written to a user's rarity bonus by the RarityBoost reward.
pub(crate) const RARITY_BOOST_MAGNITUDE: f64 = 10.0;
// Cooldown-bypass credits granted by the ExtraDraw reward.
pub(crate) const EXTRA_DRAW_CREDITS: u32 = 1;

// Leaderboard --------------------------------------------------------------
pub(crate) const LEADERBOARD_DEFAULT_LIMIT: usize = 10;

// RNG stream tags ----------------------------------------------------------
pub(crate) const RNG_STREAM_RARITY: &[u8] = b"rarity";
pub(crate) const RNG_STREAM_CARD: &[u8] = b"card";
