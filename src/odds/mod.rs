//! Odds tables: rarity tiers, expected-value weight solving and seeded item generation.

pub mod generator;
pub mod table;
pub mod tier;

pub use generator::generate_items;
pub use table::{OddsTable, PricedItem};
pub use tier::{Rarity, TierThresholds};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// Odds builder settings, read from the `[odds]` section of the server config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OddsConfig {
    /// RTP used for cases that do not set their own
    pub target_rtp_bps: u32,
    pub min_rtp_bps: u32,
    pub max_rtp_bps: u32,
    /// Maximum allowed distance between realized and target RTP
    pub tolerance_bps: u32,
    /// Sum of all integer weights in a table
    pub weight_scale: u64,
    pub tiers: TierThresholds,
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            target_rtp_bps: 9_000,
            min_rtp_bps: 8_500,
            max_rtp_bps: 9_500,
            tolerance_bps: 5,
            weight_scale: 100_000_000,
            tiers: TierThresholds::default(),
        }
    }
}

impl OddsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_rtp_bps == 0 || self.min_rtp_bps > self.max_rtp_bps {
            return Err(format!(
                "invalid RTP range {}..={}",
                self.min_rtp_bps, self.max_rtp_bps
            ));
        }
        if !(self.min_rtp_bps..=self.max_rtp_bps).contains(&self.target_rtp_bps) {
            return Err(format!(
                "default target RTP {} outside {}..={}",
                self.target_rtp_bps, self.min_rtp_bps, self.max_rtp_bps
            ));
        }
        if self.weight_scale < 1_000 {
            return Err(format!("weight_scale {} is too small", self.weight_scale));
        }
        self.tiers.validate()
    }
}

#[derive(Debug, Error)]
pub enum OddsError {
    #[error("a case needs at least one item")]
    EmptyItems,
    #[error("case price must be positive, got {0}")]
    InvalidPrice(Money),
    #[error("item '{item_id}' has non-positive value {value}")]
    InvalidItemValue { item_id: String, value: Money },
    #[error("duplicate item id '{0}'")]
    DuplicateItem(String),
    #[error("target RTP {target_bps} bps outside allowed range {min_bps}..={max_bps}")]
    TargetOutOfRange { target_bps: u32, min_bps: u32, max_bps: u32 },
    #[error("expected value {target} is not reachable with item values {min}..{max}")]
    UnreachableTarget { target: Money, min: Money, max: Money },
    #[error("realized RTP {realized_bps:.3} bps misses target {target_bps} bps")]
    ToleranceExceeded { realized_bps: f64, target_bps: u32 },
    #[error("item count {0} outside 2..=64")]
    InvalidItemCount(usize),
    #[error("{count} items cannot share a weight scale of {scale}")]
    TooManyItems { count: usize, scale: u64 },
}
