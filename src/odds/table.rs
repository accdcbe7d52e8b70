//! Odds Table Builder
//!
//! Assigns integer weights to a case's items so that the probability-weighted
//! item value equals a target share of the case price.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;

use super::tier::Rarity;
use super::{OddsConfig, OddsError};
use crate::money::Money;

const BISECTION_STEPS: usize = 200;
const MAX_TILT: f64 = 1.0e6;

/// An item with a fixed monetary value, before odds are assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedItem {
    pub id: String,
    pub display_name: String,
    pub value: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OddsEntry {
    pub item: PricedItem,
    pub rarity: Rarity,
    pub weight: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OddsTable {
    case_price: Money,
    target_rtp_bps: u32,
    realized_rtp_bps: f64,
    total_weight: u64,
    entries: Vec<OddsEntry>,
    fingerprint: String,
}

impl OddsTable {
    /// Build a table for `items` sold at `price`, aiming at `target_rtp_bps`.
    pub fn build(
        price: Money,
        mut items: Vec<PricedItem>,
        target_rtp_bps: u32,
        config: &OddsConfig,
    ) -> Result<Self, OddsError> {
        if !price.is_positive() {
            return Err(OddsError::InvalidPrice(price));
        }
        if items.is_empty() {
            return Err(OddsError::EmptyItems);
        }
        if !(config.min_rtp_bps..=config.max_rtp_bps).contains(&target_rtp_bps) {
            return Err(OddsError::TargetOutOfRange {
                target_bps: target_rtp_bps,
                min_bps: config.min_rtp_bps,
                max_bps: config.max_rtp_bps,
            });
        }
        if items.len() as u64 > config.weight_scale {
            return Err(OddsError::TooManyItems {
                count: items.len(),
                scale: config.weight_scale,
            });
        }

        let mut seen = HashSet::new();
        for item in &items {
            if !item.value.is_positive() {
                return Err(OddsError::InvalidItemValue {
                    item_id: item.id.clone(),
                    value: item.value,
                });
            }
            if !seen.insert(item.id.as_str()) {
                return Err(OddsError::DuplicateItem(item.id.clone()));
            }
        }

        items.sort_by(|a, b| a.value.cmp(&b.value).then_with(|| a.id.cmp(&b.id)));

        let min = items[0].value;
        let max = items[items.len() - 1].value;
        let target = price.cents() as f64 * target_rtp_bps as f64 / 10_000.0;

        let weights = if min == max {
            equal_weights(items.len(), config.weight_scale)
        } else {
            if target <= min.cents() as f64 || target >= max.cents() as f64 {
                return Err(OddsError::UnreachableTarget {
                    target: price.scale_bps(target_rtp_bps),
                    min,
                    max,
                });
            }
            let values: Vec<f64> = items.iter().map(|i| i.value.cents() as f64).collect();
            let probs = tilt_probabilities(&values, target).ok_or(OddsError::UnreachableTarget {
                target: price.scale_bps(target_rtp_bps),
                min,
                max,
            })?;
            let mut weights = quantize(&probs, config.weight_scale);
            correct_rounding(&mut weights, &items, price, target_rtp_bps, config.weight_scale);
            weights
        };

        let total_weight: u64 = weights.iter().sum();
        let realized_rtp_bps = realized_rtp(&items, &weights, total_weight, price);
        if (realized_rtp_bps - target_rtp_bps as f64).abs() > config.tolerance_bps as f64 {
            return Err(OddsError::ToleranceExceeded {
                realized_bps: realized_rtp_bps,
                target_bps: target_rtp_bps,
            });
        }

        let entries: Vec<OddsEntry> = items
            .into_iter()
            .zip(weights)
            .map(|(item, weight)| OddsEntry {
                rarity: config.tiers.classify(item.value, price),
                item,
                weight,
            })
            .collect();

        let fingerprint = fingerprint(price, &entries);
        debug!(
            "Built odds table: {} items, target {} bps, realized {:.4} bps",
            entries.len(),
            target_rtp_bps,
            realized_rtp_bps
        );

        Ok(Self {
            case_price: price,
            target_rtp_bps,
            realized_rtp_bps,
            total_weight,
            entries,
            fingerprint,
        })
    }

    pub fn case_price(&self) -> Money {
        self.case_price
    }

    pub fn target_rtp_bps(&self) -> u32 {
        self.target_rtp_bps
    }

    pub fn realized_rtp_bps(&self) -> f64 {
        self.realized_rtp_bps
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn entries(&self) -> &[OddsEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&OddsEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hex SHA-256 over the price and every (id, value, weight) triple
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn probability(&self, index: usize) -> f64 {
        self.entries
            .get(index)
            .map(|e| e.weight as f64 / self.total_weight as f64)
            .unwrap_or(0.0)
    }

    /// Expected item value in cents
    pub fn expected_value(&self) -> f64 {
        let numer: u128 = self
            .entries
            .iter()
            .map(|e| e.weight as u128 * e.item.value.cents() as u128)
            .sum();
        numer as f64 / self.total_weight as f64
    }

    /// Map a roll in `[0, total_weight)` to the entry it lands on.
    pub fn pick(&self, roll: u64) -> Option<usize> {
        let mut cumulative = 0u64;
        for (index, entry) in self.entries.iter().enumerate() {
            cumulative += entry.weight;
            if roll < cumulative {
                return Some(index);
            }
        }
        None
    }
}

fn equal_weights(count: usize, scale: u64) -> Vec<u64> {
    let base = scale / count as u64;
    let extra = (scale % count as u64) as usize;
    (0..count)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

/// Mean of `values` under weights `v^-alpha`, plus the normalized weights.
fn tilted_mean(log_values: &[f64], values: &[f64], alpha: f64) -> (f64, Vec<f64>) {
    let exponents: Vec<f64> = log_values.iter().map(|lv| -alpha * lv).collect();
    let peak = exponents.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let raw: Vec<f64> = exponents.iter().map(|e| (e - peak).exp()).collect();
    let sum: f64 = raw.iter().sum();
    let probs: Vec<f64> = raw.iter().map(|r| r / sum).collect();
    let mean = probs.iter().zip(values).map(|(p, v)| p * v).sum();
    (mean, probs)
}

/// Find `alpha` with tilted mean equal to `target`. The mean is monotone
/// decreasing in `alpha`, so a bracket plus bisection converges.
fn tilt_probabilities(values: &[f64], target: f64) -> Option<Vec<f64>> {
    let log_values: Vec<f64> = values.iter().map(|v| v.ln()).collect();

    let mut bound = 1.0;
    loop {
        let (high_mean, _) = tilted_mean(&log_values, values, -bound);
        let (low_mean, _) = tilted_mean(&log_values, values, bound);
        if high_mean >= target && low_mean <= target {
            break;
        }
        bound *= 2.0;
        if bound > MAX_TILT {
            return None;
        }
    }

    let (mut lo, mut hi) = (-bound, bound);
    let mut probs = Vec::new();
    for _ in 0..BISECTION_STEPS {
        let mid = (lo + hi) / 2.0;
        let (mean, p) = tilted_mean(&log_values, values, mid);
        probs = p;
        if (mean - target).abs() <= target * 1e-12 {
            break;
        }
        if mean > target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some(probs)
}

/// Largest-remainder quantization to integers summing to `scale`, each at least 1.
fn quantize(probs: &[f64], scale: u64) -> Vec<u64> {
    let raw: Vec<f64> = probs.iter().map(|p| p * scale as f64).collect();
    let mut weights: Vec<u64> = raw.iter().map(|r| (r.floor() as u64).max(1)).collect();
    let mut sum: u64 = weights.iter().sum();

    if sum < scale {
        let mut order: Vec<usize> = (0..raw.len()).collect();
        order.sort_by(|&a, &b| {
            let fa = raw[a] - raw[a].floor();
            let fb = raw[b] - raw[b].floor();
            fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut i = 0;
        while sum < scale {
            weights[order[i % order.len()]] += 1;
            sum += 1;
            i += 1;
        }
    }

    while sum > scale {
        let Some(largest) = (0..weights.len())
            .filter(|&i| weights[i] > 1)
            .max_by_key(|&i| weights[i])
        else {
            break;
        };
        weights[largest] -= 1;
        sum -= 1;
    }

    weights
}

/// Shift weight units between the cheapest and the most valuable item to
/// cancel the expected-value drift introduced by rounding.
fn correct_rounding(weights: &mut [u64], items: &[PricedItem], price: Money, target_bps: u32, scale: u64) {
    let last = items.len() - 1;
    let spread = (items[last].value.cents() - items[0].value.cents()) as i128;
    if spread <= 0 {
        return;
    }

    // Scaled by 10_000 to keep the target numerator integral
    let target_numer = price.cents() as i128 * target_bps as i128 * scale as i128;
    let realized_numer: i128 = weights
        .iter()
        .zip(items)
        .map(|(w, item)| *w as i128 * item.value.cents() as i128)
        .sum::<i128>()
        * 10_000;

    let diff = realized_numer - target_numer;
    let step = spread * 10_000;
    let units = (diff + diff.signum() * step / 2) / step;

    if units > 0 {
        // Too generous: move weight from the top item to the bottom one
        let movable = (weights[last] - 1) as i128;
        let moved = units.min(movable) as u64;
        weights[last] -= moved;
        weights[0] += moved;
    } else if units < 0 {
        let movable = (weights[0] - 1) as i128;
        let moved = (-units).min(movable) as u64;
        weights[0] -= moved;
        weights[last] += moved;
    }
}

fn realized_rtp(items: &[PricedItem], weights: &[u64], total: u64, price: Money) -> f64 {
    let numer: u128 = weights
        .iter()
        .zip(items)
        .map(|(w, item)| *w as u128 * item.value.cents() as u128)
        .sum();
    numer as f64 * 10_000.0 / (total as f64 * price.cents() as f64)
}

fn fingerprint(price: Money, entries: &[OddsEntry]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(price.cents().to_string().as_bytes());
    for entry in entries {
        hasher.update(
            format!("|{}:{}:{}", entry.item.id, entry.item.value.cents(), entry.weight).as_bytes(),
        );
    }
    hex::encode(hasher.finalize())
}
