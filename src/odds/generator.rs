//! Seeded item generation for cases defined by a count instead of an item list.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::table::PricedItem;
use super::tier::{Rarity, TierThresholds};
use super::OddsError;
use crate::money::Money;

pub const MIN_GENERATED_ITEMS: usize = 2;
pub const MAX_GENERATED_ITEMS: usize = 64;

/// Tier of slot `index` out of `count`: 50% common, 30% rare, 15% legendary, 5% mythical.
fn slot_rarity(index: usize, count: usize) -> Rarity {
    let percentile = index * 100 / count;
    match percentile {
        0..=49 => Rarity::Common,
        50..=79 => Rarity::Rare,
        80..=94 => Rarity::Legendary,
        _ => Rarity::Mythical,
    }
}

/// Generate `count` priced items for a case. The same arguments always
/// produce the same items.
pub fn generate_items(
    case_id: &str,
    price: Money,
    count: usize,
    seed: u64,
    thresholds: &TierThresholds,
) -> Result<Vec<PricedItem>, OddsError> {
    if !(MIN_GENERATED_ITEMS..=MAX_GENERATED_ITEMS).contains(&count) {
        return Err(OddsError::InvalidItemCount(count));
    }
    if !price.is_positive() {
        return Err(OddsError::InvalidPrice(price));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut items = Vec::with_capacity(count);

    for index in 0..count {
        let slot = slot_rarity(index, count);
        let (low, mut high) = thresholds.band_bps(slot);
        if index == 0 {
            // Floor item keeps any sub-price target reachable
            high = thresholds.rare_from_bps / 2;
        }
        let ratio_bps = rng.gen_range(low..high.max(low + 1));
        let cents = (price.cents() as u128 * ratio_bps as u128 + 5_000) / 10_000;
        let value = Money((cents as i64).max(1));
        let rarity = thresholds.classify(value, price);

        items.push(PricedItem {
            id: format!("{}_{:02}", case_id, index),
            display_name: format!("{} {} #{}", case_id, rarity.as_str(), index + 1),
            value,
            image: None,
        });
    }

    Ok(items)
}
