use anyhow::{ensure, Result};
use da_rpc_client::Cell;

/// Size of one column commitment (a compressed BLS12-381 G1 point).
pub const COMMITMENT_SIZE: usize = 48;
/// Size of the scalar evaluation carried after the witness point.
pub const EVALUATION_SIZE: usize = 32;
/// Size of a single-cell proof: witness point followed by the evaluated cell.
pub const PROOF_SIZE: usize = COMMITMENT_SIZE + EVALUATION_SIZE;

const COMPRESSION_FLAG: u8 = 0x80;
const INFINITY_FLAG: u8 = 0x40;
const SORT_FLAG: u8 = 0x20;

/// Checks one sampled cell against its column commitment.
///
/// `Ok(false)` means the proof was evaluated and rejected. An `Err` means the
/// proof could not be evaluated at all and must not be read as evidence that
/// the data is unavailable.
pub trait CellProofVerifier: Send + Sync + 'static {
    fn verify(&self, cell: Cell, commitment: &[u8], proof: &[u8]) -> Result<bool>;
}

/// Rejects proofs whose points are not canonical compressed G1 encodings.
///
/// This is the default backend. It validates sizes and point encodings of the
/// commitment and witness; a pairing backend plugs in through
/// [`CellProofVerifier`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StructuralVerifier;

impl CellProofVerifier for StructuralVerifier {
    fn verify(&self, _cell: Cell, commitment: &[u8], proof: &[u8]) -> Result<bool> {
        ensure!(
            commitment.len() == COMMITMENT_SIZE,
            "commitment is {} bytes, expected {COMMITMENT_SIZE}",
            commitment.len()
        );
        ensure!(
            proof.len() == PROOF_SIZE,
            "proof is {} bytes, expected {PROOF_SIZE}",
            proof.len()
        );

        let (witness, _evaluation) = proof.split_at(COMMITMENT_SIZE);
        Ok(is_compressed_g1(commitment) && is_compressed_g1(witness))
    }
}

fn is_compressed_g1(point: &[u8]) -> bool {
    let Some((&head, tail)) = point.split_first() else {
        return false;
    };

    if head & COMPRESSION_FLAG == 0 {
        return false;
    }

    if head & INFINITY_FLAG != 0 {
        // Point at infinity: no sort flag, all coordinate bits zero.
        return head & SORT_FLAG == 0 && head & 0x1f == 0 && tail.iter().all(|b| *b == 0);
    }

    true
}
