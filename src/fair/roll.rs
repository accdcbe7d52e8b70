//! Deterministic rolls from a seed pair.
//!
//! Block `r` of the stream is `HMAC-SHA256(server_seed, "{client_seed}:{nonce}:{r}")`.
//! Each block yields four big-endian `u64` words.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::seed::ServerSeed;

type HmacSha256 = Hmac<Sha256>;

/// Upper bound on rejected words; unreachable in practice.
const MAX_WORDS: usize = 1024;

pub struct RollStream<'a> {
    server_seed: &'a ServerSeed,
    client_seed: &'a str,
    nonce: u64,
    round: u64,
    block: [u8; 32],
    offset: usize,
}

impl<'a> RollStream<'a> {
    pub fn new(server_seed: &'a ServerSeed, client_seed: &'a str, nonce: u64) -> Self {
        Self {
            server_seed,
            client_seed,
            nonce,
            round: 0,
            block: [0u8; 32],
            offset: 32,
        }
    }

    fn refill(&mut self) {
        let mut mac = HmacSha256::new_from_slice(self.server_seed.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(format!("{}:{}:{}", self.client_seed, self.nonce, self.round).as_bytes());
        self.block.copy_from_slice(&mac.finalize().into_bytes());
        self.round += 1;
        self.offset = 0;
    }

    pub fn next_word(&mut self) -> u64 {
        if self.offset >= self.block.len() {
            self.refill();
        }
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.block[self.offset..self.offset + 8]);
        self.offset += 8;
        u64::from_be_bytes(word)
    }

    /// Uniform value in `[0, bound)`. Words in the incomplete top zone are
    /// rejected so no outcome is favored by the modulo.
    pub fn roll(&mut self, bound: u64) -> Option<u64> {
        if bound == 0 {
            return None;
        }
        let zone = u64::MAX - (u64::MAX % bound);
        for _ in 0..MAX_WORDS {
            let word = self.next_word();
            if word < zone {
                return Some(word % bound);
            }
        }
        None
    }
}

/// Single roll in `[0, bound)` for a seed pair and nonce.
pub fn roll(server_seed: &ServerSeed, client_seed: &str, nonce: u64, bound: u64) -> Option<u64> {
    RollStream::new(server_seed, client_seed, nonce).roll(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fair::seed::SERVER_SEED_LEN;

    fn fixed_seed() -> ServerSeed {
        ServerSeed::from_bytes([7u8; SERVER_SEED_LEN])
    }

    #[test]
    fn test_roll_is_deterministic() {
        let seed = fixed_seed();
        assert_eq!(roll(&seed, "client", 0, 1_000), roll(&seed, "client", 0, 1_000));
    }

    #[test]
    fn test_inputs_change_roll() {
        let seed = fixed_seed();
        let base: Vec<u64> = (0..8).map(|n| roll(&seed, "client", n, u64::MAX).unwrap()).collect();
        let other_client: Vec<u64> = (0..8).map(|n| roll(&seed, "other", n, u64::MAX).unwrap()).collect();
        let other_server: Vec<u64> = (0..8)
            .map(|n| roll(&ServerSeed::from_bytes([8u8; SERVER_SEED_LEN]), "client", n, u64::MAX).unwrap())
            .collect();

        assert_ne!(base, other_client);
        assert_ne!(base, other_server);
        // Different nonces give different words
        assert_ne!(base[0], base[1]);
    }

    #[test]
    fn test_roll_in_bounds() {
        let seed = fixed_seed();
        for nonce in 0..1_000 {
            let value = roll(&seed, "bounds", nonce, 37).unwrap();
            assert!(value < 37);
        }
        assert_eq!(roll(&seed, "bounds", 0, 1), Some(0));
        assert_eq!(roll(&seed, "bounds", 0, 0), None);
    }

    #[test]
    fn test_stream_crosses_blocks() {
        let seed = fixed_seed();
        let mut stream = RollStream::new(&seed, "blocks", 3);
        let words: Vec<u64> = (0..9).map(|_| stream.next_word()).collect();
        // Nine words need three HMAC blocks
        assert_eq!(stream.round, 3);
        assert_eq!(words.len(), 9);
    }

    #[test]
    fn test_roll_is_roughly_uniform() {
        let seed = fixed_seed();
        let mut buckets = [0u32; 6];
        for nonce in 0..60_000 {
            buckets[roll(&seed, "uniform", nonce, 6).unwrap() as usize] += 1;
        }
        for count in buckets {
            assert!((9_500..=10_500).contains(&count), "bucket count {}", count);
        }
    }
}
