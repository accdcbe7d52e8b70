//! Ties cases, accounts, the draw engine and battles together.
//!
//! Lock order is battle before account. The draw engine's map is only ever
//! touched while an account or battle entry is held, never the other way round.

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::account::{Account, AccountError, AccountStore, DepositOutcome, LeaderboardEntry, OwnedItem};
use crate::battle::{Battle, BattleError, BattleManager, BattleStatus};
use crate::data::{CaseDefinition, CaseRegistry, GameSummary};
use crate::fair::{
    verify_draw, DrawError, DrawProof, DrawReceipt, FairDrawEngine, ReceiptSigner, RevealedSeed, SeedCommitment,
    SeedPair, SignedReceipt, VerifyError,
};
use crate::money::Money;
use crate::odds::Rarity;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Error)]
pub enum HouseError {
    #[error("case '{0}' not found")]
    CaseNotFound(String),
    #[error("receipt signature is invalid")]
    BadSignature,
    #[error("server seed {0} has not been revealed yet")]
    SeedNotRevealed(String),
    #[error("receipt names item '{claimed}' but the draw lands on '{actual}'")]
    ReceiptMismatch { claimed: String, actual: String },
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Battle(#[from] BattleError),
    #[error(transparent)]
    Draw(#[from] DrawError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
}

/// Result of opening one case
#[derive(Debug, Clone)]
pub struct OpenOutcome {
    pub receipt: SignedReceipt,
    pub item: OwnedItem,
    pub level_up: bool,
    /// Account state after the opening
    pub account: Account,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifiedDraw {
    pub index: usize,
    pub item_id: String,
    pub display_name: String,
    pub rarity: Rarity,
    pub value: Money,
}

pub struct House {
    cases: Arc<CaseRegistry>,
    accounts: AccountStore,
    engine: FairDrawEngine,
    battles: BattleManager,
    signer: ReceiptSigner,
}

impl House {
    pub fn new(cases: Arc<CaseRegistry>, signer: ReceiptSigner) -> Self {
        Self {
            cases,
            accounts: AccountStore::new(),
            engine: FairDrawEngine::new(),
            battles: BattleManager::new(),
            signer,
        }
    }

    /// Reload persisted accounts and their active seed pairs
    pub fn restore(&self, accounts: Vec<Account>, seeds: Vec<(Uuid, SeedPair)>) {
        let account_count = accounts.len();
        for account in accounts {
            self.accounts.restore(account);
        }
        let seed_count = seeds.len();
        for (account_id, pair) in seeds {
            self.engine.restore(account_id, pair);
        }
        info!("Restored {} accounts and {} seed pairs", account_count, seed_count);
    }

    // ========================================================================
    // Cases
    // ========================================================================

    pub fn case(&self, case_id: &str) -> Result<Arc<CaseDefinition>, HouseError> {
        self.cases
            .get(case_id)
            .ok_or_else(|| HouseError::CaseNotFound(case_id.to_string()))
    }

    pub fn cases(&self, game: Option<&str>) -> Vec<Arc<CaseDefinition>> {
        match game {
            Some(game) => self.cases.by_game(game),
            None => self.cases.all(),
        }
    }

    pub fn games(&self) -> Vec<GameSummary> {
        self.cases.games()
    }

    /// Debit the case price, draw, and put the item in the inventory.
    ///
    /// The account entry stays locked from the balance check until the item is
    /// awarded, so two concurrent openings cannot both spend the same balance.
    pub fn open_case(&self, account_id: Uuid, case_id: &str) -> Result<OpenOutcome, HouseError> {
        let case = self.case(case_id)?;

        self.accounts.with_account(account_id, |account| {
            let level_before = account.progress.level;
            account.debit(case.price)?;

            let (proof, item) = match self.draw_and_award(account, &case) {
                Ok(drawn) => drawn,
                Err(e) => {
                    account.refund(case.price)?;
                    return Err(e);
                }
            };
            account.cases_opened += 1;

            let receipt = self.signer.sign(DrawReceipt {
                draw_id: Uuid::new_v4(),
                account_id,
                case_id: case.id.clone(),
                item_id: item.item_id.clone(),
                value: item.value,
                proof,
                issued_at: Utc::now().timestamp_millis(),
            });

            info!(
                "{} opened {} ({}) and won {} worth {} [{}]",
                account.username,
                case.id,
                case.price,
                item.display_name,
                item.value,
                item.rarity.as_str()
            );

            Ok(OpenOutcome {
                receipt,
                item,
                level_up: account.progress.level > level_before,
                account: account.clone(),
            })
        })
    }

    /// Draw from the case and put the item in the inventory. The balance is
    /// left to the caller.
    fn draw_and_award(
        &self,
        account: &mut Account,
        case: &CaseDefinition,
    ) -> Result<(DrawProof, OwnedItem), HouseError> {
        let proof = self.engine.draw(account.id, &case.odds)?;
        let entry = case.odds.get(proof.index).ok_or(DrawError::EmptyTable)?;
        let item = OwnedItem::new(
            &entry.item.id,
            &entry.item.display_name,
            entry.rarity,
            entry.item.value,
            &case.id,
        );
        account.award_item(item.clone())?;
        Ok((proof, item))
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    pub fn create_account(&self, username: &str) -> Result<Account, HouseError> {
        Ok(self.accounts.create(username)?)
    }

    pub fn account(&self, account_id: Uuid) -> Result<Account, HouseError> {
        self.accounts
            .get(account_id)
            .ok_or(HouseError::Account(AccountError::NotFound(account_id)))
    }

    pub fn deposit(&self, account_id: Uuid, amount: Money) -> Result<(DepositOutcome, Account), HouseError> {
        self.accounts.with_account(account_id, |account| {
            let outcome = account.deposit(amount)?;
            info!(
                "{} deposited {} (+{} bonus), balance {}",
                account.username, outcome.amount, outcome.bonus, outcome.balance
            );
            Ok((outcome, account.clone()))
        })
    }

    pub fn sell_item(&self, account_id: Uuid, uid: Uuid) -> Result<(OwnedItem, Account), HouseError> {
        self.accounts.with_account(account_id, |account| {
            let item = account.sell_item(uid)?;
            info!("{} sold {} for {}", account.username, item.display_name, item.value);
            Ok((item, account.clone()))
        })
    }

    /// Sell every listed item, or none of them
    pub fn sell_items(
        &self,
        account_id: Uuid,
        uids: &[Uuid],
    ) -> Result<(Vec<OwnedItem>, Money, Account), HouseError> {
        self.accounts.with_account(account_id, |account| {
            let (sold, total) = account.sell_items(uids)?;
            info!("{} sold {} items for {}", account.username, sold.len(), total);
            Ok((sold, total, account.clone()))
        })
    }

    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        self.accounts.leaderboard(limit)
    }

    // ========================================================================
    // Seeds and verification
    // ========================================================================

    fn require_account(&self, account_id: Uuid) -> Result<(), HouseError> {
        if self.accounts.contains(account_id) {
            Ok(())
        } else {
            Err(AccountError::NotFound(account_id).into())
        }
    }

    pub fn seed_commitment(&self, account_id: Uuid) -> Result<SeedCommitment, HouseError> {
        self.require_account(account_id)?;
        Ok(self.engine.commitment(account_id))
    }

    pub fn set_client_seed(
        &self,
        account_id: Uuid,
        client_seed: &str,
    ) -> Result<(Option<RevealedSeed>, SeedCommitment), HouseError> {
        self.require_account(account_id)?;
        Ok(self.engine.set_client_seed(account_id, client_seed)?)
    }

    pub fn rotate_seed(&self, account_id: Uuid) -> Result<(Option<RevealedSeed>, SeedCommitment), HouseError> {
        self.require_account(account_id)?;
        Ok(self.engine.rotate(account_id))
    }

    /// Copy of the active pair, for persistence
    pub fn seed_pair(&self, account_id: Uuid) -> Option<SeedPair> {
        self.engine.snapshot(account_id)
    }

    /// Check a receipt's signature, then recompute its draw from the revealed seed.
    pub fn verify_receipt(&self, signed: &SignedReceipt, server_seed: &str) -> Result<VerifiedDraw, HouseError> {
        if !self.signer.verify(signed) {
            return Err(HouseError::BadSignature);
        }
        let receipt = &signed.receipt;
        let case = self.case(&receipt.case_id)?;
        let index = verify_draw(server_seed, &receipt.proof, &case.odds)?;
        let entry = case.odds.get(index).ok_or(DrawError::EmptyTable)?;

        if entry.item.id != receipt.item_id {
            warn!("Receipt {} names {} but draw lands on {}", receipt.draw_id, receipt.item_id, entry.item.id);
            return Err(HouseError::ReceiptMismatch {
                claimed: receipt.item_id.clone(),
                actual: entry.item.id.clone(),
            });
        }

        Ok(VerifiedDraw {
            index,
            item_id: entry.item.id.clone(),
            display_name: entry.item.display_name.clone(),
            rarity: entry.rarity,
            value: entry.item.value,
        })
    }

    // ========================================================================
    // Battles
    // ========================================================================

    pub fn battle(&self, battle_id: Uuid) -> Result<Battle, HouseError> {
        self.battles
            .get(battle_id)
            .ok_or(HouseError::Battle(BattleError::NotFound(battle_id)))
    }

    pub fn battles(&self, status: Option<BattleStatus>) -> Vec<Battle> {
        self.battles.list(status)
    }

    /// Open a battle and escrow the creator's entry fee
    pub fn create_battle(
        &self,
        account_id: Uuid,
        case_id: &str,
        rounds: u32,
        max_players: u32,
    ) -> Result<Battle, HouseError> {
        let case = self.case(case_id)?;
        let battle = self.accounts.with_account(account_id, |account| {
            let battle = Battle::new(account_id, &account.username, &case, rounds, max_players)?;
            account.debit(battle.entry_fee()?)?;
            Ok::<_, HouseError>(battle)
        })?;

        info!(
            "Battle {} created by {} on {} ({} rounds, {} players)",
            battle.id, account_id, case.id, rounds, max_players
        );
        self.battles.insert(battle.clone());
        Ok(battle)
    }

    /// Take a seat. Filling the last seat resolves the battle and pays the winner.
    pub fn join_battle(&self, battle_id: Uuid, account_id: Uuid) -> Result<Battle, HouseError> {
        self.battles.with_battle(battle_id, |battle| {
            battle.check_joinable(account_id)?;
            let fee = battle.entry_fee()?;
            let username = self.accounts.with_account(account_id, |account| {
                account.debit(fee)?;
                Ok::<_, HouseError>(account.username.clone())
            })?;
            battle.add_seat(account_id, &username)?;
            info!("{} joined battle {} ({}/{})", username, battle.id, battle.seats.len(), battle.max_players);

            if battle.is_full() {
                let case = self.case(&battle.case_id)?;
                let winner = battle.resolve(&case.odds)?;
                self.settle(battle, winner)?;
            }
            Ok(battle.clone())
        })
    }

    /// Hand every drop to the winner and update each seat's record
    fn settle(&self, battle: &Battle, winner: Uuid) -> Result<(), HouseError> {
        let prize: Vec<OwnedItem> = battle
            .seats
            .iter()
            .flat_map(|seat| seat.drops.iter())
            .map(|drop| OwnedItem::new(&drop.item_id, &drop.display_name, drop.rarity, drop.value, &battle.case_id))
            .collect();

        for seat in &battle.seats {
            self.accounts.with_account(seat.account_id, |account| {
                account.cases_opened += battle.rounds as u64;
                if seat.account_id != winner {
                    account.battles_lost += 1;
                }
                Ok::<_, HouseError>(())
            })?;
        }

        self.accounts.with_account(winner, |account| {
            account.battles_won += 1;
            for item in prize {
                account.award_item(item)?;
            }
            Ok::<_, HouseError>(())
        })
    }

    /// Forget completed and cancelled battles that finished more than
    /// `retention` ago
    pub fn prune_battles(&self, retention: Duration) -> usize {
        let cutoff = chrono::Duration::from_std(retention)
            .ok()
            .and_then(|retention| Utc::now().checked_sub_signed(retention));
        match cutoff {
            Some(cutoff) => self.battles.prune_finished(cutoff.timestamp_millis()),
            None => 0,
        }
    }

    /// Cancel a waiting battle and refund every seat
    pub fn cancel_battle(&self, battle_id: Uuid, account_id: Uuid) -> Result<Battle, HouseError> {
        self.battles.with_battle(battle_id, |battle| {
            let fee = battle.entry_fee()?;
            let refunds = battle.cancel(account_id)?;
            for seated in refunds {
                self.accounts.with_account(seated, |account| {
                    account.refund(fee)?;
                    Ok::<_, HouseError>(())
                })?;
            }
            info!("Battle {} cancelled by {}", battle.id, account_id);
            Ok(battle.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fair::ServerSeed;
    use crate::odds::{OddsConfig, OddsTable, PricedItem};

    fn item(id: &str, cents: i64) -> PricedItem {
        PricedItem {
            id: id.to_string(),
            display_name: id.to_uppercase(),
            value: Money(cents),
            image: None,
        }
    }

    fn house() -> House {
        let items = vec![
            item("sticker", 40),
            item("pistol", 150),
            item("rifle", 700),
            item("knife", 5_000),
        ];
        let odds = OddsTable::build(Money(250), items, 9_000, &OddsConfig::default()).unwrap();
        let mut cases = CaseRegistry::new();
        cases.insert(CaseDefinition {
            id: "dust2".to_string(),
            display_name: "Dust II".to_string(),
            game: "cs2".to_string(),
            price: Money(250),
            image: None,
            odds,
        });
        // Every item worth the same: battles on it always tie
        let flat = OddsTable::build(Money(500), vec![item("blue", 450), item("green", 450)], 9_000, &OddsConfig::default())
            .unwrap();
        cases.insert(CaseDefinition {
            id: "flat".to_string(),
            display_name: "Flat".to_string(),
            game: "cs2".to_string(),
            price: Money(500),
            image: None,
            odds: flat,
        });
        House::new(Arc::new(cases), ReceiptSigner::random())
    }

    fn funded(house: &House, name: &str, units: i64) -> Uuid {
        let id = house.create_account(name).unwrap().id;
        house.deposit(id, Money::from_units(units)).unwrap();
        id
    }

    #[test]
    fn test_open_case() {
        let house = house();
        let id = funded(&house, "opener", 10);

        let outcome = house.open_case(id, "dust2").unwrap();
        let account = house.account(id).unwrap();
        assert_eq!(account.balance, Money(750));
        assert_eq!(account.cases_opened, 1);
        assert_eq!(account.inventory, vec![outcome.item.clone()]);
        assert_eq!(account.total_won, outcome.item.value);
        assert_eq!(outcome.receipt.receipt.item_id, outcome.item.item_id);
        assert_eq!(outcome.receipt.receipt.proof.nonce, 0);

        let second = house.open_case(id, "dust2").unwrap();
        assert_eq!(second.receipt.receipt.proof.nonce, 1);
    }

    #[test]
    fn test_open_case_errors_leave_balance() {
        let house = house();
        let id = funded(&house, "broke", 2);

        assert!(matches!(house.open_case(id, "nope"), Err(HouseError::CaseNotFound(_))));
        assert!(matches!(
            house.open_case(Uuid::new_v4(), "dust2"),
            Err(HouseError::Account(AccountError::NotFound(_)))
        ));
        assert!(matches!(
            house.open_case(id, "dust2"),
            Err(HouseError::Account(AccountError::InsufficientBalance { .. }))
        ));
        assert_eq!(house.account(id).unwrap().balance, Money(200));
        assert_eq!(house.seed_commitment(id).unwrap().nonce, 0);
    }

    #[test]
    fn test_failed_award_refunds_the_debit() {
        let house = house();
        let id = funded(&house, "hoarder", 10);
        house
            .accounts
            .with_account(id, |account| {
                account.total_won = Money(i64::MAX);
                Ok::<_, AccountError>(())
            })
            .unwrap();

        assert!(matches!(
            house.open_case(id, "dust2"),
            Err(HouseError::Account(AccountError::Overflow))
        ));
        let account = house.account(id).unwrap();
        assert_eq!(account.balance, Money::from_units(10));
        assert_eq!(account.total_spent, Money::ZERO);
        assert_eq!(account.progress.xp, 0);
        assert_eq!(account.cases_opened, 0);
        assert!(account.inventory.is_empty());
    }

    #[test]
    fn test_concurrent_opens_never_overdraw() {
        let house = Arc::new(house());
        let id = funded(&house, "racer", 5);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let house = house.clone();
                std::thread::spawn(move || (0..5).filter(|_| house.open_case(id, "dust2").is_ok()).count())
            })
            .collect();
        let opened: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(opened, 2);
        let account = house.account(id).unwrap();
        assert_eq!(account.balance, Money::ZERO);
        assert_eq!(account.inventory.len(), 2);
        assert_eq!(house.seed_commitment(id).unwrap().nonce, 2);
    }

    #[test]
    fn test_receipt_verifies_after_rotation() {
        let house = house();
        let id = funded(&house, "auditor", 10);
        let outcome = house.open_case(id, "dust2").unwrap();

        // Not revealed yet: a made-up seed cannot match the commitment
        let guess = ServerSeed::from_bytes([7u8; 32]).to_hex();
        assert!(matches!(
            house.verify_receipt(&outcome.receipt, &guess),
            Err(HouseError::Verify(VerifyError::CommitmentMismatch { .. }))
        ));

        let (revealed, fresh) = house.rotate_seed(id).unwrap();
        let revealed = revealed.unwrap();
        assert_eq!(revealed.draws, 1);
        assert_ne!(fresh.server_seed_hash, revealed.server_seed_hash);

        let verified = house.verify_receipt(&outcome.receipt, &revealed.server_seed).unwrap();
        assert_eq!(verified.item_id, outcome.item.item_id);

        let mut forged = outcome.receipt.clone();
        forged.receipt.value = Money(999_999);
        assert!(matches!(
            house.verify_receipt(&forged, &revealed.server_seed),
            Err(HouseError::BadSignature)
        ));
    }

    #[test]
    fn test_sell_item() {
        let house = house();
        let id = funded(&house, "seller", 10);
        let won = house.open_case(id, "dust2").unwrap().item;

        let (sold, account) = house.sell_item(id, won.uid).unwrap();
        assert_eq!(sold.uid, won.uid);
        assert_eq!(account.balance, Money(750 + won.value.cents()));
        assert!(account.inventory.is_empty());
    }

    #[test]
    fn test_sell_items() {
        let house = house();
        let id = funded(&house, "bulk", 10);
        let first = house.open_case(id, "dust2").unwrap().item;
        let second = house.open_case(id, "dust2").unwrap().item;

        assert!(house.sell_items(id, &[first.uid, Uuid::new_v4()]).is_err());
        assert_eq!(house.account(id).unwrap().inventory.len(), 2);

        let (sold, total, account) = house.sell_items(id, &[first.uid, second.uid]).unwrap();
        assert_eq!(sold.len(), 2);
        assert_eq!(total, Money(first.value.cents() + second.value.cents()));
        assert_eq!(account.balance, Money(500 + total.cents()));
        assert!(account.inventory.is_empty());
    }

    #[test]
    fn test_cancelled_battles_earn_no_xp() {
        let house = house();
        let id = funded(&house, "farmer", 20);
        let before = house.account(id).unwrap();

        for _ in 0..20 {
            let battle = house.create_battle(id, "dust2", 5, 2).unwrap();
            house.cancel_battle(battle.id, id).unwrap();
        }

        let after = house.account(id).unwrap();
        assert_eq!(after.balance, before.balance);
        assert_eq!(after.total_spent, Money::ZERO);
        assert_eq!(after.progress, before.progress);
    }

    #[test]
    fn test_tied_battle_pays_one_winner() {
        let house = house();
        let a = funded(&house, "alice", 10);
        let b = funded(&house, "bob", 10);

        let battle = house.create_battle(a, "flat", 1, 2).unwrap();
        let done = house.join_battle(battle.id, b).unwrap();
        assert!(done.seats.iter().all(|s| s.total == Money(450)));

        let seed = ServerSeed::from_hex(done.revealed_server_seed.as_deref().unwrap()).unwrap();
        let pick = crate::fair::roll::roll(&seed, &done.id.to_string(), 2, 2).unwrap();
        let winner = done.seats[pick as usize].account_id;
        assert_eq!(done.winner, Some(winner));

        let loser = if winner == a { b } else { a };
        let winner_account = house.account(winner).unwrap();
        assert_eq!(winner_account.inventory.len(), 2);
        assert_eq!(winner_account.total_won, Money(900));
        assert_eq!(winner_account.battles_won, 1);
        assert!(house.account(loser).unwrap().inventory.is_empty());
    }

    #[test]
    fn test_prune_battles() {
        let house = house();
        let a = funded(&house, "alice", 10);
        let waiting = house.create_battle(a, "dust2", 1, 2).unwrap();
        let cancelled = house.create_battle(a, "dust2", 1, 2).unwrap();
        house.cancel_battle(cancelled.id, a).unwrap();

        assert_eq!(house.prune_battles(Duration::from_secs(3_600)), 0);
        house
            .battles
            .with_battle(cancelled.id, |battle| {
                battle.finished_at = Some(Utc::now().timestamp_millis() - 7_200_000);
                Ok::<_, BattleError>(())
            })
            .unwrap();
        assert_eq!(house.prune_battles(Duration::from_secs(3_600)), 1);
        assert_eq!(house.prune_battles(Duration::MAX), 0);
        assert!(house.battle(waiting.id).is_ok());
        assert!(house.battle(cancelled.id).is_err());
    }

    #[test]
    fn test_battle_flow() {
        let house = house();
        let a = funded(&house, "alice", 10);
        let b = funded(&house, "bob", 10);

        let battle = house.create_battle(a, "dust2", 2, 2).unwrap();
        assert_eq!(house.account(a).unwrap().balance, Money(500));
        assert!(matches!(
            house.join_battle(battle.id, a),
            Err(HouseError::Battle(BattleError::AlreadyJoined))
        ));

        let done = house.join_battle(battle.id, b).unwrap();
        assert_eq!(done.status, BattleStatus::Completed);
        assert!(done.revealed_server_seed.is_some());
        let winner = done.winner.unwrap();
        let loser = if winner == a { b } else { a };

        let winner_account = house.account(winner).unwrap();
        let loser_account = house.account(loser).unwrap();
        assert_eq!(winner_account.inventory.len(), 4);
        assert!(loser_account.inventory.is_empty());
        assert_eq!(winner_account.battles_won, 1);
        assert_eq!(loser_account.battles_lost, 1);
        assert_eq!(loser_account.cases_opened, 2);
        assert_eq!(loser_account.balance, Money(500));

        let pot: i64 = done.seats.iter().map(|s| s.total.cents()).sum();
        assert_eq!(winner_account.total_won, Money(pot));
    }

    #[test]
    fn test_battle_join_requires_balance() {
        let house = house();
        let a = funded(&house, "alice", 10);
        let poor = funded(&house, "pauper", 1);

        let battle = house.create_battle(a, "dust2", 1, 2).unwrap();
        assert!(matches!(
            house.join_battle(battle.id, poor),
            Err(HouseError::Account(AccountError::InsufficientBalance { .. }))
        ));
        let battle = house.battle(battle.id).unwrap();
        assert_eq!(battle.seats.len(), 1);
        assert_eq!(battle.status, BattleStatus::Waiting);
    }

    #[test]
    fn test_cancel_battle_refunds() {
        let house = house();
        let a = funded(&house, "alice", 10);
        let b = funded(&house, "bob", 10);

        let battle = house.create_battle(a, "dust2", 3, 3).unwrap();
        house.join_battle(battle.id, b).unwrap();
        assert!(matches!(
            house.cancel_battle(battle.id, b),
            Err(HouseError::Battle(BattleError::NotCreator))
        ));

        let cancelled = house.cancel_battle(battle.id, a).unwrap();
        assert_eq!(cancelled.status, BattleStatus::Cancelled);
        assert_eq!(house.account(a).unwrap().balance, Money::from_units(10));
        assert_eq!(house.account(b).unwrap().balance, Money::from_units(10));
        assert_eq!(house.battles(Some(BattleStatus::Waiting)).len(), 0);
    }
}
