//! Account wallets and inventories.
//!
//! Every mutation checks its preconditions before touching any field, so a
//! failed operation leaves the account unchanged.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::progression::{xp_for_spend, Progress};
use super::AccountError;
use crate::money::Money;
use crate::odds::Rarity;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 20;

/// Smallest accepted deposit (1.00)
pub const MIN_DEPOSIT: Money = Money(100);
/// Largest accepted deposit (100 000.00)
pub const MAX_DEPOSIT: Money = Money(10_000_000);

/// Preset deposit amounts and their bonus, both in cents
const DEPOSIT_BONUSES: [(i64, i64); 5] = [
    (500_00, 25_00),
    (1_000_00, 75_00),
    (2_500_00, 250_00),
    (5_000_00, 750_00),
    (10_000_00, 2_000_00),
];

/// Bonus credited on top of a deposit. Only the preset amounts carry one;
/// any other amount gets nothing.
pub fn deposit_bonus(amount: Money) -> Money {
    DEPOSIT_BONUSES
        .iter()
        .find(|(preset, _)| amount.cents() == *preset)
        .map(|(_, bonus)| Money(*bonus))
        .unwrap_or(Money::ZERO)
}

pub fn validate_username(username: &str) -> Result<(), AccountError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(AccountError::InvalidUsername(format!(
            "Username must be {}-{} characters",
            MIN_USERNAME_LEN, MAX_USERNAME_LEN
        )));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AccountError::InvalidUsername(
            "Username may only contain letters, digits and '_'".to_string(),
        ));
    }
    Ok(())
}

/// An item sitting in an account's inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedItem {
    pub uid: Uuid,
    pub item_id: String,
    pub display_name: String,
    pub rarity: Rarity,
    pub value: Money,
    /// Case the item was drawn from
    pub case_id: String,
    pub acquired_at: i64,
}

impl OwnedItem {
    pub fn new(item_id: &str, display_name: &str, rarity: Rarity, value: Money, case_id: &str) -> Self {
        Self {
            uid: Uuid::new_v4(),
            item_id: item_id.to_string(),
            display_name: display_name.to_string(),
            rarity,
            value,
            case_id: case_id.to_string(),
            acquired_at: Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DepositOutcome {
    pub amount: Money,
    pub bonus: Money,
    pub balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub balance: Money,
    pub progress: Progress,
    pub total_deposited: Money,
    pub total_spent: Money,
    pub total_won: Money,
    pub cases_opened: u64,
    pub battles_won: u32,
    pub battles_lost: u32,
    pub inventory: Vec<OwnedItem>,
    pub created_at: i64,
}

impl Account {
    pub fn new(username: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            balance: Money::ZERO,
            progress: Progress::default(),
            total_deposited: Money::ZERO,
            total_spent: Money::ZERO,
            total_won: Money::ZERO,
            cases_opened: 0,
            battles_won: 0,
            battles_lost: 0,
            inventory: Vec::new(),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn deposit(&mut self, amount: Money) -> Result<DepositOutcome, AccountError> {
        if amount < MIN_DEPOSIT || amount > MAX_DEPOSIT {
            return Err(AccountError::InvalidAmount(amount));
        }
        let bonus = deposit_bonus(amount);
        let credited = amount.checked_add(bonus).ok_or(AccountError::Overflow)?;
        let balance = self.balance.checked_add(credited).ok_or(AccountError::Overflow)?;
        let total_deposited = self.total_deposited.checked_add(credited).ok_or(AccountError::Overflow)?;

        self.balance = balance;
        self.total_deposited = total_deposited;
        Ok(DepositOutcome { amount, bonus, balance })
    }

    pub fn can_afford(&self, amount: Money) -> bool {
        self.balance >= amount
    }

    /// Take `amount` for a case or battle entry. Spending earns XP.
    pub fn debit(&mut self, amount: Money) -> Result<(), AccountError> {
        if !amount.is_positive() {
            return Err(AccountError::InvalidAmount(amount));
        }
        if !self.can_afford(amount) {
            return Err(AccountError::InsufficientBalance {
                needed: amount,
                available: self.balance,
            });
        }
        let balance = self.balance.checked_sub(amount).ok_or(AccountError::Overflow)?;
        let total_spent = self.total_spent.checked_add(amount).ok_or(AccountError::Overflow)?;

        self.balance = balance;
        self.total_spent = total_spent;
        self.progress.add_xp(xp_for_spend(amount));
        Ok(())
    }

    /// Undo a `debit`, e.g. for a cancelled battle. The XP it earned goes too.
    pub fn refund(&mut self, amount: Money) -> Result<(), AccountError> {
        if !amount.is_positive() {
            return Err(AccountError::InvalidAmount(amount));
        }
        let balance = self.balance.checked_add(amount).ok_or(AccountError::Overflow)?;
        let total_spent = self.total_spent.checked_sub(amount).ok_or(AccountError::Overflow)?;

        self.balance = balance;
        self.total_spent = total_spent;
        self.progress.remove_xp(xp_for_spend(amount));
        Ok(())
    }

    pub fn award_item(&mut self, item: OwnedItem) -> Result<(), AccountError> {
        self.total_won = self.total_won.checked_add(item.value).ok_or(AccountError::Overflow)?;
        self.inventory.push(item);
        Ok(())
    }

    /// Remove an item from the inventory and credit its value.
    pub fn sell_item(&mut self, uid: Uuid) -> Result<OwnedItem, AccountError> {
        let index = self
            .inventory
            .iter()
            .position(|i| i.uid == uid)
            .ok_or(AccountError::ItemNotFound(uid))?;
        let balance = self
            .balance
            .checked_add(self.inventory[index].value)
            .ok_or(AccountError::Overflow)?;

        self.balance = balance;
        Ok(self.inventory.remove(index))
    }

    /// Sell several items at once. Either every uid is sold or nothing changes.
    pub fn sell_items(&mut self, uids: &[Uuid]) -> Result<(Vec<OwnedItem>, Money), AccountError> {
        if uids.is_empty() {
            return Err(AccountError::NothingToSell);
        }
        let mut selected = HashSet::with_capacity(uids.len());
        let mut total = Money::ZERO;
        for &uid in uids {
            if !selected.insert(uid) {
                return Err(AccountError::DuplicateItem(uid));
            }
            let item = self
                .inventory
                .iter()
                .find(|i| i.uid == uid)
                .ok_or(AccountError::ItemNotFound(uid))?;
            total = total.checked_add(item.value).ok_or(AccountError::Overflow)?;
        }
        let balance = self.balance.checked_add(total).ok_or(AccountError::Overflow)?;

        let (sold, kept) = std::mem::take(&mut self.inventory)
            .into_iter()
            .partition(|i| selected.contains(&i.uid));
        self.inventory = kept;
        self.balance = balance;
        Ok((sold, total))
    }

    pub fn inventory_value(&self) -> Money {
        Money(self.inventory.iter().map(|i| i.value.cents()).sum())
    }
}
