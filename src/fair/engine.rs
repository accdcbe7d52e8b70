//! Fair Draw Engine
//!
//! One active seed pair per account. Each draw consumes the current nonce;
//! retiring a pair reveals its server seed.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::roll::roll;
use super::seed::{random_client_seed, validate_client_seed, RevealedSeed, SeedCommitment, SeedPair};
use super::DrawError;
use crate::odds::OddsTable;

/// Everything needed to recompute a draw once the server seed is revealed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawProof {
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: u64,
    pub roll: u64,
    pub total_weight: u64,
    pub index: usize,
    pub odds_fingerprint: String,
}

/// Draw from `table` with the pair's current nonce, then advance the nonce.
pub fn draw_with(pair: &mut SeedPair, table: &OddsTable) -> Result<DrawProof, DrawError> {
    let proof = draw_at(pair, pair.nonce, table)?;
    pair.nonce += 1;
    Ok(proof)
}

/// Draw at an explicit nonce without touching the pair.
pub fn draw_at(pair: &SeedPair, nonce: u64, table: &OddsTable) -> Result<DrawProof, DrawError> {
    if table.is_empty() {
        return Err(DrawError::EmptyTable);
    }
    let total_weight = table.total_weight();
    let value = roll(&pair.server_seed, &pair.client_seed, nonce, total_weight)
        .ok_or(DrawError::RollExhausted)?;
    let index = table.pick(value).ok_or(DrawError::EmptyTable)?;

    Ok(DrawProof {
        server_seed_hash: pair.commitment(),
        client_seed: pair.client_seed.clone(),
        nonce,
        roll: value,
        total_weight,
        index,
        odds_fingerprint: table.fingerprint().to_string(),
    })
}

pub struct FairDrawEngine {
    pairs: DashMap<Uuid, SeedPair>,
}

impl FairDrawEngine {
    pub fn new() -> Self {
        Self {
            pairs: DashMap::new(),
        }
    }

    /// Public view of the account's active pair, creating one on first use.
    pub fn commitment(&self, account_id: Uuid) -> SeedCommitment {
        self.pairs
            .entry(account_id)
            .or_insert_with(|| SeedPair::new(random_client_seed()))
            .public()
    }

    /// Replace the client seed. The active server seed is revealed and a new
    /// one committed, so a player cannot pick a client seed after seeing a hash
    /// they have already drawn against.
    pub fn set_client_seed(
        &self,
        account_id: Uuid,
        client_seed: &str,
    ) -> Result<(Option<RevealedSeed>, SeedCommitment), DrawError> {
        validate_client_seed(client_seed).map_err(DrawError::InvalidClientSeed)?;
        let fresh = SeedPair::new(client_seed.to_string());
        let public = fresh.public();
        let revealed = self.pairs.insert(account_id, fresh).map(|old| old.reveal());
        info!("Client seed changed for account {}", account_id);
        Ok((revealed, public))
    }

    /// Reveal the active server seed and commit a new one, keeping the client seed.
    pub fn rotate(&self, account_id: Uuid) -> (Option<RevealedSeed>, SeedCommitment) {
        let client_seed = self
            .pairs
            .get(&account_id)
            .map(|p| p.client_seed.clone())
            .unwrap_or_else(random_client_seed);
        let fresh = SeedPair::new(client_seed);
        let public = fresh.public();
        let revealed = self.pairs.insert(account_id, fresh).map(|old| old.reveal());
        info!("Server seed rotated for account {}", account_id);
        (revealed, public)
    }

    pub fn draw(&self, account_id: Uuid, table: &OddsTable) -> Result<DrawProof, DrawError> {
        let mut pair = self
            .pairs
            .entry(account_id)
            .or_insert_with(|| SeedPair::new(random_client_seed()));
        let proof = draw_with(pair.value_mut(), table)?;
        debug!(
            "Draw for {}: nonce {} roll {} -> index {}",
            account_id, proof.nonce, proof.roll, proof.index
        );
        Ok(proof)
    }

    /// Copy of the active pair, for persistence
    pub fn snapshot(&self, account_id: Uuid) -> Option<SeedPair> {
        self.pairs.get(&account_id).map(|p| p.value().clone())
    }

    pub fn restore(&self, account_id: Uuid, pair: SeedPair) {
        self.pairs.insert(account_id, pair);
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Default for FairDrawEngine {
    fn default() -> Self {
        Self::new()
    }
}
