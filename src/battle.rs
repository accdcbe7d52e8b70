//! Case battles.
//!
//! Players pay `price * rounds` to take a seat. When the last seat fills, every
//! seat opens the case once per round from the battle's own seed pair and the
//! highest total takes every drop.

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::data::CaseDefinition;
use crate::fair::roll::roll;
use crate::fair::{draw_at, DrawError, DrawProof, SeedPair};
use crate::money::Money;
use crate::odds::{OddsTable, Rarity};

pub const MIN_ROUNDS: u32 = 1;
pub const MAX_ROUNDS: u32 = 5;
pub const MIN_PLAYERS: u32 = 2;
pub const MAX_PLAYERS: u32 = 4;

#[derive(Debug, Error)]
pub enum BattleError {
    #[error("battle {0} not found")]
    NotFound(Uuid),
    #[error("rounds must be 1..=5, got {0}")]
    InvalidRounds(u32),
    #[error("players must be 2..=4, got {0}")]
    InvalidPlayers(u32),
    #[error("battle is full")]
    Full,
    #[error("account already holds a seat in this battle")]
    AlreadyJoined,
    #[error("battle is no longer waiting for players")]
    NotWaiting,
    #[error("only the creator can cancel a battle")]
    NotCreator,
    #[error("price overflow")]
    Overflow,
    #[error(transparent)]
    Draw(#[from] DrawError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    Waiting,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct BattleDrop {
    pub round: u32,
    pub item_id: String,
    pub display_name: String,
    pub rarity: Rarity,
    pub value: Money,
    pub proof: DrawProof,
}

#[derive(Debug, Clone, Serialize)]
pub struct BattleSeat {
    pub account_id: Uuid,
    pub username: String,
    pub drops: Vec<BattleDrop>,
    pub total: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct Battle {
    pub id: Uuid,
    pub case_id: String,
    pub case_name: String,
    pub price: Money,
    pub rounds: u32,
    pub max_players: u32,
    pub creator: Uuid,
    pub status: BattleStatus,
    pub seats: Vec<BattleSeat>,
    pub server_seed_hash: String,
    /// Published once the battle completes
    pub revealed_server_seed: Option<String>,
    pub winner: Option<Uuid>,
    pub created_at: i64,
    /// Set when the battle completes or is cancelled
    pub finished_at: Option<i64>,
    #[serde(skip)]
    seed: SeedPair,
}

impl Battle {
    pub fn new(
        creator: Uuid,
        creator_name: &str,
        case: &CaseDefinition,
        rounds: u32,
        max_players: u32,
    ) -> Result<Self, BattleError> {
        if !(MIN_ROUNDS..=MAX_ROUNDS).contains(&rounds) {
            return Err(BattleError::InvalidRounds(rounds));
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&max_players) {
            return Err(BattleError::InvalidPlayers(max_players));
        }

        let id = Uuid::new_v4();
        // Client seed is the battle id, fixed before anyone joins
        let seed = SeedPair::new(id.to_string());

        Ok(Self {
            id,
            case_id: case.id.clone(),
            case_name: case.display_name.clone(),
            price: case.price,
            rounds,
            max_players,
            creator,
            status: BattleStatus::Waiting,
            seats: vec![BattleSeat::new(creator, creator_name)],
            server_seed_hash: seed.commitment(),
            revealed_server_seed: None,
            winner: None,
            created_at: Utc::now().timestamp_millis(),
            finished_at: None,
            seed,
        })
    }

    pub fn entry_fee(&self) -> Result<Money, BattleError> {
        self.price
            .checked_mul(self.rounds as i64)
            .ok_or(BattleError::Overflow)
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() as u32 >= self.max_players
    }

    pub fn has_seat(&self, account_id: Uuid) -> bool {
        self.seats.iter().any(|s| s.account_id == account_id)
    }

    /// Check that `account_id` could take a seat right now
    pub fn check_joinable(&self, account_id: Uuid) -> Result<(), BattleError> {
        if self.status != BattleStatus::Waiting {
            return Err(BattleError::NotWaiting);
        }
        if self.is_full() {
            return Err(BattleError::Full);
        }
        if self.has_seat(account_id) {
            return Err(BattleError::AlreadyJoined);
        }
        Ok(())
    }

    pub fn add_seat(&mut self, account_id: Uuid, username: &str) -> Result<(), BattleError> {
        self.check_joinable(account_id)?;
        self.seats.push(BattleSeat::new(account_id, username));
        Ok(())
    }

    /// Draw every round for every seat and pick the winner.
    pub fn resolve(&mut self, table: &OddsTable) -> Result<Uuid, BattleError> {
        if self.status != BattleStatus::Waiting {
            return Err(BattleError::NotWaiting);
        }
        let seats = self.seats.len() as u64;

        for round in 0..self.rounds {
            for (index, seat) in self.seats.iter_mut().enumerate() {
                let nonce = round as u64 * seats + index as u64;
                let proof = draw_at(&self.seed, nonce, table)?;
                let entry = table.get(proof.index).ok_or(DrawError::EmptyTable)?;
                seat.total = seat.total.checked_add(entry.item.value).ok_or(BattleError::Overflow)?;
                seat.drops.push(BattleDrop {
                    round,
                    item_id: entry.item.id.clone(),
                    display_name: entry.item.display_name.clone(),
                    rarity: entry.rarity,
                    value: entry.item.value,
                    proof,
                });
            }
        }

        let best = self.seats.iter().map(|s| s.total).max().unwrap_or_default();
        let tied: Vec<usize> = (0..self.seats.len())
            .filter(|&i| self.seats[i].total == best)
            .collect();
        let winner_index = if tied.len() == 1 {
            tied[0]
        } else {
            let tiebreak_nonce = self.rounds as u64 * seats;
            let pick = roll(&self.seed.server_seed, &self.seed.client_seed, tiebreak_nonce, tied.len() as u64)
                .ok_or(DrawError::RollExhausted)?;
            tied[pick as usize]
        };

        let winner = self.seats[winner_index].account_id;
        self.winner = Some(winner);
        self.status = BattleStatus::Completed;
        self.finished_at = Some(Utc::now().timestamp_millis());
        self.revealed_server_seed = Some(self.seed.server_seed.to_hex());
        self.seed.nonce = self.rounds as u64 * seats + 1;

        info!(
            "Battle {} resolved: winner {} with {} over {} rounds",
            self.id, winner, best, self.rounds
        );
        Ok(winner)
    }

    /// Cancel a waiting battle. Returns the seated accounts to refund.
    pub fn cancel(&mut self, by: Uuid) -> Result<Vec<Uuid>, BattleError> {
        if by != self.creator {
            return Err(BattleError::NotCreator);
        }
        if self.status != BattleStatus::Waiting {
            return Err(BattleError::NotWaiting);
        }
        self.status = BattleStatus::Cancelled;
        self.finished_at = Some(Utc::now().timestamp_millis());
        Ok(self.seats.iter().map(|s| s.account_id).collect())
    }
}

impl BattleSeat {
    fn new(account_id: Uuid, username: &str) -> Self {
        Self {
            account_id,
            username: username.to_string(),
            drops: Vec::new(),
            total: Money::ZERO,
        }
    }
}

pub struct BattleManager {
    battles: DashMap<Uuid, Battle>,
}

impl BattleManager {
    pub fn new() -> Self {
        Self {
            battles: DashMap::new(),
        }
    }

    pub fn insert(&self, battle: Battle) {
        self.battles.insert(battle.id, battle);
    }

    pub fn get(&self, id: Uuid) -> Option<Battle> {
        self.battles.get(&id).map(|b| b.value().clone())
    }

    /// Battles with the given status, newest first
    pub fn list(&self, status: Option<BattleStatus>) -> Vec<Battle> {
        let mut battles: Vec<Battle> = self
            .battles
            .iter()
            .filter(|b| status.map_or(true, |s| b.status == s))
            .map(|b| b.value().clone())
            .collect();
        battles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        battles
    }

    /// Run `f` with exclusive access to the battle
    pub fn with_battle<T, E>(&self, id: Uuid, f: impl FnOnce(&mut Battle) -> Result<T, E>) -> Result<T, E>
    where
        E: From<BattleError>,
    {
        let mut battle = self.battles.get_mut(&id).ok_or(BattleError::NotFound(id))?;
        f(battle.value_mut())
    }

    /// Drop battles that finished before `cutoff` (unix millis). Waiting
    /// battles are always kept. Returns how many were removed.
    pub fn prune_finished(&self, cutoff: i64) -> usize {
        let before = self.battles.len();
        self.battles
            .retain(|_, battle| battle.finished_at.map_or(true, |finished| finished >= cutoff));
        before.saturating_sub(self.battles.len())
    }

    pub fn len(&self) -> usize {
        self.battles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.battles.is_empty()
    }
}

impl Default for BattleManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fair::{verify_draw, ServerSeed};
    use crate::odds::{OddsConfig, PricedItem};

    fn case() -> CaseDefinition {
        let items = vec![
            PricedItem { id: "sticker".into(), display_name: "Sticker".into(), value: Money(40), image: None },
            PricedItem { id: "knife".into(), display_name: "Knife".into(), value: Money(2_000), image: None },
            PricedItem { id: "gloves".into(), display_name: "Gloves".into(), value: Money(700), image: None },
        ];
        CaseDefinition {
            id: "mirage".into(),
            display_name: "Mirage Collection".into(),
            game: "cs2".into(),
            price: Money(500),
            image: None,
            odds: OddsTable::build(Money(500), items, 9_000, &OddsConfig::default()).unwrap(),
        }
    }

    /// Every item is worth the same, so every seat ends on the same total
    fn flat_case() -> CaseDefinition {
        let items = vec![
            PricedItem { id: "blue".into(), display_name: "Blue".into(), value: Money(450), image: None },
            PricedItem { id: "green".into(), display_name: "Green".into(), value: Money(450), image: None },
        ];
        CaseDefinition {
            id: "flat".into(),
            display_name: "Flat".into(),
            game: "cs2".into(),
            price: Money(500),
            image: None,
            odds: OddsTable::build(Money(500), items, 9_000, &OddsConfig::default()).unwrap(),
        }
    }

    #[test]
    fn test_new_validates() {
        let case = case();
        assert!(matches!(
            Battle::new(Uuid::new_v4(), "a", &case, 0, 2),
            Err(BattleError::InvalidRounds(0))
        ));
        assert!(matches!(
            Battle::new(Uuid::new_v4(), "a", &case, 3, 5),
            Err(BattleError::InvalidPlayers(5))
        ));
        let battle = Battle::new(Uuid::new_v4(), "a", &case, 3, 2).unwrap();
        assert_eq!(battle.entry_fee().unwrap(), Money(1_500));
        assert_eq!(battle.seats.len(), 1);
        assert_eq!(battle.server_seed_hash.len(), 64);
    }

    #[test]
    fn test_join_rules() {
        let creator = Uuid::new_v4();
        let mut battle = Battle::new(creator, "creator", &case(), 1, 2).unwrap();

        assert!(matches!(battle.add_seat(creator, "creator"), Err(BattleError::AlreadyJoined)));
        battle.add_seat(Uuid::new_v4(), "second").unwrap();
        assert!(battle.is_full());
        assert!(matches!(battle.add_seat(Uuid::new_v4(), "third"), Err(BattleError::Full)));
    }

    #[test]
    fn test_resolve_draws_every_round() {
        let case = case();
        let mut battle = Battle::new(Uuid::new_v4(), "one", &case, 3, 3).unwrap();
        battle.add_seat(Uuid::new_v4(), "two").unwrap();
        battle.add_seat(Uuid::new_v4(), "three").unwrap();

        let winner = battle.resolve(&case.odds).unwrap();
        assert_eq!(battle.status, BattleStatus::Completed);
        assert_eq!(battle.winner, Some(winner));

        let best = battle.seats.iter().map(|s| s.total).max().unwrap();
        let winning_seat = battle.seats.iter().find(|s| s.account_id == winner).unwrap();
        assert_eq!(winning_seat.total, best);

        for seat in &battle.seats {
            assert_eq!(seat.drops.len(), 3);
            let sum: i64 = seat.drops.iter().map(|d| d.value.cents()).sum();
            assert_eq!(seat.total, Money(sum));
        }

        assert!(matches!(battle.resolve(&case.odds), Err(BattleError::NotWaiting)));
    }

    #[test]
    fn test_resolved_battle_is_verifiable() {
        let case = case();
        let mut battle = Battle::new(Uuid::new_v4(), "one", &case, 2, 2).unwrap();
        battle.add_seat(Uuid::new_v4(), "two").unwrap();
        battle.resolve(&case.odds).unwrap();

        let seed = battle.revealed_server_seed.clone().unwrap();
        let mut nonces = Vec::new();
        for seat in &battle.seats {
            for drop in &seat.drops {
                assert_eq!(drop.proof.client_seed, battle.id.to_string());
                assert_eq!(drop.proof.server_seed_hash, battle.server_seed_hash);
                verify_draw(&seed, &drop.proof, &case.odds).unwrap();
                nonces.push(drop.proof.nonce);
            }
        }
        nonces.sort();
        assert_eq!(nonces, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_tie_broken_by_extra_roll() {
        let case = flat_case();
        let mut battle = Battle::new(Uuid::new_v4(), "one", &case, 2, 3).unwrap();
        battle.add_seat(Uuid::new_v4(), "two").unwrap();
        battle.add_seat(Uuid::new_v4(), "three").unwrap();

        let winner = battle.resolve(&case.odds).unwrap();
        assert!(battle.seats.iter().all(|s| s.total == Money(900)));

        // Recomputed from the revealed seed at the nonce after the last draw
        let seed = ServerSeed::from_hex(battle.revealed_server_seed.as_deref().unwrap()).unwrap();
        let pick = roll(&seed, &battle.id.to_string(), 2 * 3, 3).unwrap();
        assert_eq!(winner, battle.seats[pick as usize].account_id);
        assert_eq!(battle.winner, Some(winner));

        let max_nonce = battle.seats.iter().flat_map(|s| &s.drops).map(|d| d.proof.nonce).max();
        assert_eq!(max_nonce, Some(5));
    }

    #[test]
    fn test_cancel() {
        let creator = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut battle = Battle::new(creator, "creator", &case(), 1, 3).unwrap();
        battle.add_seat(other, "other").unwrap();

        assert!(matches!(battle.cancel(other), Err(BattleError::NotCreator)));
        let refunds = battle.cancel(creator).unwrap();
        assert_eq!(refunds, vec![creator, other]);
        assert_eq!(battle.status, BattleStatus::Cancelled);
        assert!(matches!(battle.add_seat(Uuid::new_v4(), "late"), Err(BattleError::NotWaiting)));
    }

    #[test]
    fn test_manager_list() {
        let manager = BattleManager::new();
        let case = case();
        let a = Battle::new(Uuid::new_v4(), "a", &case, 1, 2).unwrap();
        let mut b = Battle::new(Uuid::new_v4(), "b", &case, 1, 2).unwrap();
        let b_creator = b.creator;
        b.cancel(b_creator).unwrap();
        manager.insert(a);
        manager.insert(b);

        assert_eq!(manager.len(), 2);
        assert_eq!(manager.list(Some(BattleStatus::Waiting)).len(), 1);
        assert_eq!(manager.list(None).len(), 2);
    }

    #[test]
    fn test_prune_finished() {
        let manager = BattleManager::new();
        let case = case();
        let waiting = Battle::new(Uuid::new_v4(), "a", &case, 1, 2).unwrap();
        let mut old = Battle::new(Uuid::new_v4(), "b", &case, 1, 2).unwrap();
        old.cancel(old.creator).unwrap();
        old.finished_at = Some(1_000);
        let mut recent = Battle::new(Uuid::new_v4(), "c", &case, 1, 2).unwrap();
        recent.cancel(recent.creator).unwrap();
        let (old_id, recent_id, waiting_id) = (old.id, recent.id, waiting.id);
        manager.insert(waiting);
        manager.insert(old);
        manager.insert(recent);

        assert_eq!(manager.prune_finished(5_000), 1);
        assert!(manager.get(old_id).is_none());
        assert!(manager.get(recent_id).is_some());
        assert!(manager.get(waiting_id).is_some());

        // Waiting battles survive any cutoff
        manager.prune_finished(i64::MAX);
        assert_eq!(manager.len(), 1);
        assert!(manager.get(waiting_id).is_some());
    }
}
