//! Rarity tiers derived from an item's value relative to the case price.

use serde::{Deserialize, Serialize};

use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Legendary,
    Mythical,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Legendary => "legendary",
            Rarity::Mythical => "mythical",
        }
    }
}

/// Value-to-price ratios (in basis points) at which each tier begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub rare_from_bps: u64,
    pub legendary_from_bps: u64,
    pub mythical_from_bps: u64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            rare_from_bps: 10_000,
            legendary_from_bps: 50_000,
            mythical_from_bps: 250_000,
        }
    }
}

impl TierThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if self.rare_from_bps == 0 {
            return Err("rare_from_bps must be positive".to_string());
        }
        if self.rare_from_bps >= self.legendary_from_bps
            || self.legendary_from_bps >= self.mythical_from_bps
        {
            return Err(format!(
                "tier thresholds must be strictly increasing (rare {}, legendary {}, mythical {})",
                self.rare_from_bps, self.legendary_from_bps, self.mythical_from_bps
            ));
        }
        Ok(())
    }

    /// Ratio of value to price in basis points, truncated.
    pub fn ratio_bps(value: Money, price: Money) -> u64 {
        if !price.is_positive() || value.cents() <= 0 {
            return 0;
        }
        (value.cents() as u128 * 10_000 / price.cents() as u128).min(u64::MAX as u128) as u64
    }

    pub fn classify(&self, value: Money, price: Money) -> Rarity {
        let ratio = Self::ratio_bps(value, price);
        if ratio >= self.mythical_from_bps {
            Rarity::Mythical
        } else if ratio >= self.legendary_from_bps {
            Rarity::Legendary
        } else if ratio >= self.rare_from_bps {
            Rarity::Rare
        } else {
            Rarity::Common
        }
    }

    /// Ratio band `[low, high)` in basis points used when generating items of a tier.
    pub fn band_bps(&self, rarity: Rarity) -> (u64, u64) {
        match rarity {
            Rarity::Common => (self.rare_from_bps / 10, self.rare_from_bps),
            Rarity::Rare => (self.rare_from_bps, self.legendary_from_bps),
            Rarity::Legendary => (self.legendary_from_bps, self.mythical_from_bps),
            Rarity::Mythical => (self.mythical_from_bps, self.mythical_from_bps * 4),
        }
    }
}
