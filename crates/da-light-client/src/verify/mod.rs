use std::fmt::{self, Display};
use std::sync::Arc;

use da_rpc_client::{Cell, ChainClient, SignedBlock};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub mod cell;
pub mod pool;
pub mod sampler;

pub use cell::{CellProofVerifier, StructuralVerifier, COMMITMENT_SIZE, PROOF_SIZE};
pub use pool::VerifierPool;
pub use sampler::{MatrixDimensions, SamplingStrategy};

/// Why a sample produced no verdict.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SampleFailure {
    #[error("node returned no proof")]
    ProofUnavailable,
    #[error("proof could not be evaluated: {0}")]
    Unevaluable(String),
    #[error("verifier crashed: {0}")]
    Crashed(String),
    #[error("verification timed out")]
    TimedOut,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SampleOutcome {
    Valid,
    Invalid,
    Failed(SampleFailure),
}

/// Per-block counts of sample outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleTally {
    pub valid: usize,
    pub invalid: usize,
    pub failed: usize,
}

impl SampleTally {
    pub fn record(&mut self, outcome: &SampleOutcome) {
        match outcome {
            SampleOutcome::Valid => self.valid += 1,
            SampleOutcome::Invalid => self.invalid += 1,
            SampleOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.valid + self.invalid + self.failed
    }
}

impl Display for SampleTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{valid: {}, invalid: {}, failed: {}}}",
            self.valid, self.invalid, self.failed
        )
    }
}

/// The header's commitment root does not cover the configured matrix width.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("commitment root is {actual} bytes, expected {expected} for {cols} columns")]
pub struct MalformedHeader {
    pub expected: usize,
    pub actual: usize,
    pub cols: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    Sampled(SampleTally),
    Malformed(MalformedHeader),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockReport {
    pub number: u64,
    pub outcome: BlockOutcome,
}

impl BlockReport {
    pub fn tally(&self) -> Option<SampleTally> {
        match &self.outcome {
            BlockOutcome::Sampled(tally) => Some(*tally),
            BlockOutcome::Malformed(_) => None,
        }
    }

    /// Fraction of samples that verified valid; zero for a malformed block.
    pub fn confidence(&self) -> f64 {
        match self.tally() {
            Some(tally) if tally.total() > 0 => tally.valid as f64 / tally.total() as f64,
            _ => 0.0,
        }
    }
}

impl Display for BlockReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            BlockOutcome::Sampled(tally) => write!(f, "block {} verified with {}", self.number, tally),
            BlockOutcome::Malformed(e) => write!(f, "block {} has a malformed header: {}", self.number, e),
        }
    }
}

/// Checks that `root` holds exactly one commitment per column.
pub fn check_commitment_root(root: &[u8], cols: u32) -> Result<(), MalformedHeader> {
    let expected = COMMITMENT_SIZE * cols as usize;
    if root.len() != expected {
        return Err(MalformedHeader {
            expected,
            actual: root.len(),
            cols,
        });
    }
    Ok(())
}

/// Returns the commitment of column `col`: bytes `[48 * col, 48 * col + 48)` of `root`.
pub fn commitment_fragment(root: &[u8], col: u32, cols: u32) -> Result<&[u8], MalformedHeader> {
    check_commitment_root(root, cols)?;

    let start = COMMITMENT_SIZE * col as usize;
    root.get(start..start + COMMITMENT_SIZE).ok_or(MalformedHeader {
        expected: COMMITMENT_SIZE * (col as usize + 1),
        actual: root.len(),
        cols,
    })
}

/// Samples one block and aggregates the verdicts of its cells.
pub struct BlockVerifier {
    client: Arc<dyn ChainClient>,
    pool: Arc<VerifierPool>,
    sampler: SamplingStrategy,
    sample_count: usize,
}

impl BlockVerifier {
    pub fn new(
        client: Arc<dyn ChainClient>,
        pool: Arc<VerifierPool>,
        sampler: SamplingStrategy,
        sample_count: usize,
    ) -> Self {
        Self {
            client,
            pool,
            sampler,
            sample_count,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Challenges `sample_count` random cells of `block` and waits for every one
    /// of them to settle before reporting.
    pub async fn verify_block(&self, block: &SignedBlock) -> BlockReport {
        let cells = self.sampler.choose_samples(self.sample_count);
        self.verify_cells(block, cells).await
    }

    /// Verifies `block` against a caller-chosen set of cells.
    pub async fn verify_cells(&self, block: &SignedBlock, cells: Vec<Cell>) -> BlockReport {
        let number = block.number();
        let root = block.header().commitment_root();
        let cols = self.sampler.dimensions().cols;

        if let Err(e) = check_commitment_root(root, cols) {
            warn!("block {number}: {e}");
            return BlockReport {
                number,
                outcome: BlockOutcome::Malformed(e),
            };
        }

        let mut tasks = JoinSet::new();
        for cell in cells {
            let fragment = match commitment_fragment(root, cell.col, cols) {
                Ok(fragment) => fragment.to_vec(),
                Err(e) => {
                    warn!("block {number}: cell {cell} outside the commitment root: {e}");
                    return BlockReport {
                        number,
                        outcome: BlockOutcome::Malformed(e),
                    };
                }
            };

            let client = Arc::clone(&self.client);
            let pool = Arc::clone(&self.pool);
            tasks.spawn(sample_cell(client, pool, number, cell, fragment));
        }

        let mut tally = SampleTally::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => tally.record(&outcome),
                Err(e) => {
                    warn!("block {number}: sample task aborted: {e}");
                    tally.record(&SampleOutcome::Failed(SampleFailure::Crashed(e.to_string())));
                }
            }
        }

        BlockReport {
            number,
            outcome: BlockOutcome::Sampled(tally),
        }
    }
}

async fn sample_cell(
    client: Arc<dyn ChainClient>,
    pool: Arc<VerifierPool>,
    number: u64,
    cell: Cell,
    fragment: Vec<u8>,
) -> SampleOutcome {
    let Some(proof) = client.proof_for_cell(number, cell).await else {
        warn!("block {number}: no proof for cell {cell}");
        return SampleOutcome::Failed(SampleFailure::ProofUnavailable);
    };

    debug!("block {number}: got {} byte proof for cell {cell}", proof.len());
    let outcome = pool.submit(cell, fragment, proof).await;
    if let SampleOutcome::Failed(failure) = &outcome {
        warn!("block {number}: cell {cell} failed: {failure}");
    }
    outcome
}
