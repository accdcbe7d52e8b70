use serde::Deserialize;

use crate::money::Money;
use crate::odds::{generate_items, OddsConfig, OddsTable, PricedItem};

// ============================================================================
// Raw Case Definition (direct from TOML)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RawCaseItem {
    pub id: String,
    pub display_name: Option<String>,
    /// Value in cents
    pub value: Money,
    pub image: Option<String>,
}

/// Items produced by the seeded generator instead of being listed
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GenerateSpec {
    pub count: usize,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCaseDefinition {
    pub display_name: Option<String>,
    pub game: Option<String>,
    /// Price in cents
    pub price: Money,
    pub target_rtp_bps: Option<u32>,
    pub image: Option<String>,
    #[serde(default)]
    pub items: Vec<RawCaseItem>,
    pub generate: Option<GenerateSpec>,
}

// ============================================================================
// Resolved Case Definition
// ============================================================================

#[derive(Debug, Clone)]
pub struct CaseDefinition {
    pub id: String,
    pub display_name: String,
    pub game: String,
    pub price: Money,
    pub image: Option<String>,
    pub odds: OddsTable,
}

impl CaseDefinition {
    pub fn from_raw(id: &str, raw: &RawCaseDefinition, config: &OddsConfig) -> Result<Self, String> {
        let items: Vec<PricedItem> = match (&raw.generate, raw.items.is_empty()) {
            (Some(_), false) => {
                return Err(format!("case '{}' lists items and a generate block", id));
            }
            (Some(spec), true) => generate_items(id, raw.price, spec.count, spec.seed, &config.tiers)
                .map_err(|e| format!("case '{}': {}", id, e))?,
            (None, _) => raw
                .items
                .iter()
                .map(|item| PricedItem {
                    id: item.id.clone(),
                    display_name: item.display_name.clone().unwrap_or_else(|| item.id.clone()),
                    value: item.value,
                    image: item.image.clone(),
                })
                .collect(),
        };

        let target = raw.target_rtp_bps.unwrap_or(config.target_rtp_bps);
        let odds = OddsTable::build(raw.price, items, target, config)
            .map_err(|e| format!("case '{}': {}", id, e))?;

        Ok(Self {
            id: id.to_string(),
            display_name: raw.display_name.clone().unwrap_or_else(|| id.to_string()),
            game: raw.game.clone().unwrap_or_else(|| "cs2".to_string()),
            price: raw.price,
            image: raw.image.clone(),
            odds,
        })
    }
}
