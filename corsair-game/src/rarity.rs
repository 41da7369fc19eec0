//! Rarity resolution: bonus-adjusted tier weights and weighted sampling.

use rand::Rng;

use crate::catalog::Rarity;
use crate::constants::{
    BONUS_DRAIN_COMMON, BONUS_DRAIN_EPIC, BONUS_DRAIN_RARE, BONUS_SHARE_LEGENDARY,
    BONUS_SHARE_MYTHIC, RARITY_BASE_WEIGHTS, WEIGHT_FLOOR,
};

/// Compute the effective per-tier weight vector for a bonus magnitude.
///
/// The bonus feeds the two rare tiers and drains the three common ones.
/// Every adjusted weight is clamped to zero before sampling: a large
/// magnitude must never contribute negative probability mass.
#[must_use]
pub fn effective_weights(bonus: f64) -> [f64; 5] {
    let bonus = sanitize_bonus(bonus);
    let mut weights = RARITY_BASE_WEIGHTS;
    weights[Rarity::Mythic.index()] += bonus * BONUS_SHARE_MYTHIC;
    weights[Rarity::Legendary.index()] += bonus * BONUS_SHARE_LEGENDARY;
    weights[Rarity::Common.index()] -= bonus * BONUS_DRAIN_COMMON;
    weights[Rarity::Rare.index()] -= bonus * BONUS_DRAIN_RARE;
    weights[Rarity::Epic.index()] -= bonus * BONUS_DRAIN_EPIC;

    for weight in &mut weights {
        *weight = weight.max(WEIGHT_FLOOR);
    }
    weights
}

/// Sample one rarity tier with probability proportional to its clamped
/// weight. Weight accumulation stays in f64 so fractional weights keep
/// their exact share of the roll.
pub fn resolve_tier<R: Rng>(bonus: f64, rng: &mut R) -> Rarity {
    let weights = effective_weights(bonus);
    let total: f64 = weights.iter().sum();
    if total <= f64::EPSILON {
        // Unreachable for the shipped constants; fall back to base odds
        // rather than sampling a degenerate vector.
        return sample_from(&RARITY_BASE_WEIGHTS, rng);
    }
    sample_from(&weights, rng)
}

fn sample_from<R: Rng>(weights: &[f64; 5], rng: &mut R) -> Rarity {
    let total: f64 = weights.iter().sum();
    let roll = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for rarity in Rarity::ALL {
        cumulative += weights[rarity.index()];
        if roll < cumulative {
            return rarity;
        }
    }
    // Floating-point accumulation can land the roll on the closed upper
    // bound; the last tier with mass owns that edge.
    last_tier_with_mass(weights)
}

fn last_tier_with_mass(weights: &[f64; 5]) -> Rarity {
    Rarity::ALL
        .into_iter()
        .rev()
        .find(|rarity| weights[rarity.index()] > 0.0)
        .unwrap_or(Rarity::Common)
}

fn sanitize_bonus(bonus: f64) -> f64 {
    if bonus.is_finite() { bonus.max(0.0) } else { 0.0 }
}
