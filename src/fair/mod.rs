//! Provably-fair draws: server-seed commitments, HMAC rolls, verification and signed receipts.

pub mod engine;
pub mod receipt;
pub mod roll;
pub mod seed;
pub mod verify;

pub use engine::{draw_at, DrawProof, FairDrawEngine};
pub use receipt::{DrawReceipt, ReceiptSigner, SignedReceipt};
pub use seed::{RevealedSeed, SeedCommitment, SeedPair, ServerSeed};
pub use verify::verify_draw;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DrawError {
    #[error("odds table is empty")]
    EmptyTable,
    #[error("roll stream exhausted")]
    RollExhausted,
    #[error("invalid client seed: {0}")]
    InvalidClientSeed(String),
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("server seed is not 32 bytes of hex")]
    MalformedSeed,
    #[error("seed hash {actual} does not match commitment {expected}")]
    CommitmentMismatch { expected: String, actual: String },
    #[error("odds table does not match the one used for the draw")]
    OddsMismatch,
    #[error("roll mismatch: proof says {expected}, recomputed {actual:?}")]
    RollMismatch { expected: u64, actual: Option<u64> },
    #[error("index mismatch: proof says {expected}, recomputed {actual}")]
    IndexMismatch { expected: usize, actual: usize },
}
