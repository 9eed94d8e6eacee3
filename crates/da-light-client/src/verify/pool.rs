use std::sync::Arc;
use std::time::Duration;

use da_rpc_client::Cell;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::verify::cell::CellProofVerifier;
use crate::verify::{SampleFailure, SampleOutcome};

/// Runs cell checks on tokio's blocking thread pool, at most `workers` at a time.
///
/// Checks never execute on the async scheduler, so a CPU-heavy or stuck
/// verification cannot hold up sibling samples or the polling loop. Each
/// submission is bounded by `timeout`, covering both the wait for a free
/// worker and the check itself.
pub struct VerifierPool {
    verifier: Arc<dyn CellProofVerifier>,
    permits: Arc<Semaphore>,
    workers: usize,
    timeout: Duration,
}

impl VerifierPool {
    pub fn new(verifier: Arc<dyn CellProofVerifier>, workers: usize, timeout: Duration) -> Self {
        let workers = workers.max(1);
        Self {
            verifier,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            timeout,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Verifies `proof` for `cell` against its column `commitment`.
    pub async fn submit(&self, cell: Cell, commitment: Vec<u8>, proof: Vec<u8>) -> SampleOutcome {
        let verifier = Arc::clone(&self.verifier);
        let permits = Arc::clone(&self.permits);

        let job = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|_| SampleFailure::Crashed("verifier pool closed".into()))?;

            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit; // held until the check returns, even past a timeout
                verifier.verify(cell, &commitment, &proof)
            });

            match handle.await {
                Ok(Ok(valid)) => Ok(valid),
                Ok(Err(e)) => Err(SampleFailure::Unevaluable(format!("{e:#}"))),
                Err(e) => Err(SampleFailure::Crashed(e.to_string())),
            }
        };

        let outcome = match tokio::time::timeout(self.timeout, job).await {
            Ok(Ok(true)) => SampleOutcome::Valid,
            Ok(Ok(false)) => SampleOutcome::Invalid,
            Ok(Err(failure)) => SampleOutcome::Failed(failure),
            Err(_) => SampleOutcome::Failed(SampleFailure::TimedOut),
        };

        debug!("cell {cell} verified: {outcome:?}");
        outcome
    }
}
