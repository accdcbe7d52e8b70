pub mod progression;
pub mod store;
pub mod wallet;

pub use progression::Progress;
pub use store::{AccountStore, LeaderboardEntry};
pub use wallet::{Account, DepositOutcome, OwnedItem};

use thiserror::Error;
use uuid::Uuid;

use crate::money::Money;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account {0} not found")]
    NotFound(Uuid),
    #[error("{0}")]
    InvalidUsername(String),
    #[error("username '{0}' is already taken")]
    UsernameTaken(String),
    #[error("invalid amount {0}")]
    InvalidAmount(Money),
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Money, available: Money },
    #[error("item {0} not in inventory")]
    ItemNotFound(Uuid),
    #[error("item {0} selected more than once")]
    DuplicateItem(Uuid),
    #[error("no items selected")]
    NothingToSell,
    #[error("balance arithmetic overflow")]
    Overflow,
}
