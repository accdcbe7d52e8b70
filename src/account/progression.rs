//! Account levels earned by spending on cases.
//!
//! XP: 10 per 1.00 spent. Level curve: level 1 = 0 XP, level 2 = 83 XP,
//! growing roughly 10% per level.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Maximum account level
pub const MAX_LEVEL: i32 = 100;

/// XP awarded per 1.00 spent
pub const XP_PER_UNIT_SPENT: i64 = 10;

/// Calculate total XP required to reach a level.
pub fn total_xp_for_level(level: i32) -> i64 {
    if level <= 1 {
        return 0;
    }
    let mut total = 0.0;
    for l in 1..level {
        total += (l as f64 + 300.0 * 2.0_f64.powf(l as f64 / 7.0)) / 4.0;
    }
    total.floor() as i64
}

/// Calculate level from total XP (inverse of total_xp_for_level)
pub fn level_for_xp(xp: i64) -> i32 {
    let mut low = 1;
    let mut high = MAX_LEVEL;

    while low < high {
        let mid = (low + high + 1) / 2;
        if total_xp_for_level(mid) <= xp {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    low
}

pub fn xp_for_spend(spent: Money) -> i64 {
    spent.cents().max(0) * XP_PER_UNIT_SPENT / 100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub level: i32,
    pub xp: i64,
}

impl Progress {
    pub fn from_xp(xp: i64) -> Self {
        Self {
            level: level_for_xp(xp),
            xp,
        }
    }

    /// Add XP, returning true if the level went up
    pub fn add_xp(&mut self, amount: i64) -> bool {
        self.xp = self.xp.saturating_add(amount.max(0));
        let new_level = level_for_xp(self.xp);
        if new_level > self.level {
            self.level = new_level;
            true
        } else {
            false
        }
    }

    /// Take back XP for spending that was undone. The level may drop.
    pub fn remove_xp(&mut self, amount: i64) {
        self.xp = self.xp.saturating_sub(amount.max(0)).max(0);
        self.level = level_for_xp(self.xp);
    }

    pub fn xp_to_next_level(&self) -> i64 {
        if self.level >= MAX_LEVEL {
            return 0;
        }
        total_xp_for_level(self.level + 1) - self.xp
    }

    /// XP progress within current level (0.0 to 1.0)
    pub fn level_progress(&self) -> f32 {
        if self.level >= MAX_LEVEL {
            return 1.0;
        }
        let current_level_xp = total_xp_for_level(self.level);
        let next_level_xp = total_xp_for_level(self.level + 1);
        let xp_in_level = self.xp - current_level_xp;
        let xp_needed = next_level_xp - current_level_xp;
        (xp_in_level as f32 / xp_needed as f32).clamp(0.0, 1.0)
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::from_xp(0)
    }
}
