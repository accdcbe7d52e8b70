//! Signed draw receipts.
//!
//! A receipt binds the drawn item to its proof under an HMAC only the server
//! can produce, so a player holding a receipt can later show exactly what the
//! server claimed at draw time.

use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::warn;
use uuid::Uuid;

use super::engine::DrawProof;
use crate::money::Money;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawReceipt {
    pub draw_id: Uuid,
    pub account_id: Uuid,
    pub case_id: String,
    pub item_id: String,
    pub value: Money,
    pub proof: DrawProof,
    /// Unix milliseconds
    pub issued_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedReceipt {
    pub receipt: DrawReceipt,
    pub signature: String,
}

/// Receipt signer/validator
#[derive(Clone)]
pub struct ReceiptSigner {
    /// Secret key for HMAC signing
    secret: Vec<u8>,
}

impl ReceiptSigner {
    /// Signer with a random 32-byte key, valid for this process only
    pub fn random() -> Self {
        use rand::RngCore;
        let mut secret = vec![0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut secret);
        Self { secret }
    }

    pub fn from_hex(key: &str) -> Result<Self, String> {
        let secret = hex::decode(key.trim()).map_err(|e| format!("Invalid receipt key: {}", e))?;
        if secret.len() < 16 {
            return Err("Receipt key must be at least 16 bytes".to_string());
        }
        Ok(Self { secret })
    }

    fn mac(&self, receipt: &DrawReceipt) -> HmacSha256 {
        // Field order is fixed by the struct, so the JSON is canonical
        let payload = serde_json::to_vec(receipt).unwrap_or_default();
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(&payload);
        mac
    }

    pub fn sign(&self, receipt: DrawReceipt) -> SignedReceipt {
        let signature = self.mac(&receipt).finalize().into_bytes();
        SignedReceipt {
            receipt,
            signature: base64::engine::general_purpose::STANDARD.encode(signature),
        }
    }

    /// Returns true if the signature was produced by this signer for this receipt
    pub fn verify(&self, signed: &SignedReceipt) -> bool {
        let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(&signed.signature) else {
            warn!("Receipt signature is not valid base64");
            return false;
        };
        if self.mac(&signed.receipt).verify_slice(&expected).is_err() {
            warn!("Receipt signature invalid for draw {}", signed.receipt.draw_id);
            return false;
        }
        true
    }
}
