//! Server seeds, commitments and client seeds.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};

pub const SERVER_SEED_LEN: usize = 32;
pub const MAX_CLIENT_SEED_LEN: usize = 64;

/// Secret server seed. Only its hash is published until it is revealed.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerSeed([u8; SERVER_SEED_LEN]);

impl ServerSeed {
    pub fn generate() -> Self {
        let mut bytes = [0u8; SERVER_SEED_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SERVER_SEED_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(hex_str: &str) -> Option<Self> {
        let bytes = hex::decode(hex_str.trim()).ok()?;
        let array: [u8; SERVER_SEED_LEN] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Hex SHA-256 of the raw seed bytes
    pub fn commitment(&self) -> String {
        hex::encode(Sha256::digest(self.0))
    }
}

// Never print the secret
impl std::fmt::Debug for ServerSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ServerSeed({})", self.commitment())
    }
}

pub fn random_client_seed() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn validate_client_seed(seed: &str) -> Result<(), String> {
    if seed.is_empty() || seed.len() > MAX_CLIENT_SEED_LEN {
        return Err(format!(
            "client seed must be 1..={} characters",
            MAX_CLIENT_SEED_LEN
        ));
    }
    if !seed.chars().all(|c| c.is_ascii_graphic()) {
        return Err("client seed must be printable ASCII without spaces".to_string());
    }
    Ok(())
}

/// Active seed pair for one account or battle
#[derive(Debug, Clone)]
pub struct SeedPair {
    pub server_seed: ServerSeed,
    pub client_seed: String,
    pub nonce: u64,
}

impl SeedPair {
    pub fn new(client_seed: String) -> Self {
        Self {
            server_seed: ServerSeed::generate(),
            client_seed,
            nonce: 0,
        }
    }

    pub fn commitment(&self) -> String {
        self.server_seed.commitment()
    }

    pub fn public(&self) -> SeedCommitment {
        SeedCommitment {
            server_seed_hash: self.commitment(),
            client_seed: self.client_seed.clone(),
            nonce: self.nonce,
        }
    }

    pub fn reveal(&self) -> RevealedSeed {
        RevealedSeed {
            server_seed: self.server_seed.to_hex(),
            server_seed_hash: self.commitment(),
            client_seed: self.client_seed.clone(),
            draws: self.nonce,
        }
    }
}

/// What a player may see about an active pair
#[derive(Debug, Clone, Serialize)]
pub struct SeedCommitment {
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: u64,
}

/// A retired pair, published so past draws can be verified
#[derive(Debug, Clone, Serialize)]
pub struct RevealedSeed {
    pub server_seed: String,
    pub server_seed_hash: String,
    pub client_seed: String,
    pub draws: u64,
}
