//! Concurrent account storage and the leaderboard.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::wallet::{validate_username, Account};
use super::AccountError;
use crate::money::Money;

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub level: i32,
    pub total_won: Money,
    pub battles_won: u32,
    pub cases_opened: u64,
}

pub struct AccountStore {
    accounts: DashMap<Uuid, Account>,
    // Lowercased username -> account id
    usernames: DashMap<String, Uuid>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            usernames: DashMap::new(),
        }
    }

    pub fn create(&self, username: &str) -> Result<Account, AccountError> {
        let username = username.trim();
        validate_username(username)?;

        let account = Account::new(username);
        match self.usernames.entry(username.to_lowercase()) {
            Entry::Occupied(_) => return Err(AccountError::UsernameTaken(username.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(account.id);
            }
        }
        self.accounts.insert(account.id, account.clone());

        info!("Created account: {} (id: {})", account.username, account.id);
        Ok(account)
    }

    /// Insert an account loaded from storage
    pub fn restore(&self, account: Account) {
        self.usernames.insert(account.username.to_lowercase(), account.id);
        self.accounts.insert(account.id, account);
    }

    pub fn get(&self, id: Uuid) -> Option<Account> {
        self.accounts.get(&id).map(|a| a.value().clone())
    }

    /// Run `f` with exclusive access to the account. Other operations on the
    /// same account wait until `f` returns.
    pub fn with_account<T, E>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Account) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<AccountError>,
    {
        let mut account = self
            .accounts
            .get_mut(&id)
            .ok_or(AccountError::NotFound(id))?;
        f(account.value_mut())
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.accounts.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Ranked by total won, then battles won, then username
    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let mut rows: Vec<LeaderboardEntry> = self
            .accounts
            .iter()
            .map(|a| LeaderboardEntry {
                rank: 0,
                username: a.username.clone(),
                level: a.progress.level,
                total_won: a.total_won,
                battles_won: a.battles_won,
                cases_opened: a.cases_opened,
            })
            .collect();

        rows.sort_by(|a, b| {
            b.total_won
                .cmp(&a.total_won)
                .then_with(|| b.battles_won.cmp(&a.battles_won))
                .then_with(|| a.username.cmp(&b.username))
        });
        rows.truncate(limit);
        for (i, row) in rows.iter_mut().enumerate() {
            row.rank = i + 1;
        }
        rows
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}
