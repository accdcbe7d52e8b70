//! Recompute a draw from a revealed server seed.

use super::engine::DrawProof;
use super::roll::roll;
use super::seed::ServerSeed;
use super::VerifyError;
use crate::odds::OddsTable;

/// Check `proof` against the revealed seed and the published odds table.
/// Returns the index of the drawn entry when everything matches.
pub fn verify_draw(
    revealed_server_seed: &str,
    proof: &DrawProof,
    table: &OddsTable,
) -> Result<usize, VerifyError> {
    let seed = ServerSeed::from_hex(revealed_server_seed).ok_or(VerifyError::MalformedSeed)?;

    let commitment = seed.commitment();
    if commitment != proof.server_seed_hash {
        return Err(VerifyError::CommitmentMismatch {
            expected: proof.server_seed_hash.clone(),
            actual: commitment,
        });
    }

    if table.fingerprint() != proof.odds_fingerprint {
        return Err(VerifyError::OddsMismatch);
    }

    if table.total_weight() != proof.total_weight {
        return Err(VerifyError::OddsMismatch);
    }

    let recomputed = roll(&seed, &proof.client_seed, proof.nonce, proof.total_weight)
        .ok_or(VerifyError::RollMismatch { expected: proof.roll, actual: None })?;
    if recomputed != proof.roll {
        return Err(VerifyError::RollMismatch {
            expected: proof.roll,
            actual: Some(recomputed),
        });
    }

    let index = table.pick(recomputed).ok_or(VerifyError::OddsMismatch)?;
    if index != proof.index {
        return Err(VerifyError::IndexMismatch {
            expected: proof.index,
            actual: index,
        });
    }

    Ok(index)
}
