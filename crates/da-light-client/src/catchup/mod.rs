use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use da_rpc_client::{ChainClient, Header};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::verify::{BlockReport, BlockVerifier};

/// What to do when a block inside a catch-up range cannot be fetched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchFailurePolicy {
    /// Leave the block unverified and keep walking; the watermark still moves
    /// to the top of the range.
    #[default]
    Skip,
    /// Stop at the block, keep the watermark just below it and retry it on the
    /// next poll.
    Halt,
}

#[derive(Clone, Copy, Debug)]
pub struct PollSettings {
    /// Pause after the node returned no header.
    pub no_header_backoff: Duration,
    /// Pause after the node reported no block beyond the watermark.
    pub idle_backoff: Duration,
    pub fetch_failure: FetchFailurePolicy,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            no_header_backoff: Duration::from_millis(3000),
            idle_backoff: Duration::from_millis(6000),
            fetch_failure: FetchFailurePolicy::Skip,
        }
    }
}

/// Result of walking one catch-up range.
#[derive(Clone, Debug, Default)]
pub struct RangeSummary {
    pub from: u64,
    pub to: u64,
    pub reports: Vec<BlockReport>,
    /// Blocks that could not be fetched and were left unverified.
    pub skipped: Vec<u64>,
    /// Block at which a `Halt` policy stopped the walk.
    pub halted_at: Option<u64>,
}

/// Outcome of a single [`CatchUpLoop::tick`].
#[derive(Clone, Debug)]
pub enum Tick {
    /// No header from the node; backed off.
    NoHeader,
    /// Head is not beyond the watermark; backed off.
    Idle { head: u64 },
    /// A range was walked.
    CaughtUp(RangeSummary),
}

/// Blocks still to verify when the watermark is `watermark` and the node's head is `head`.
pub fn catch_up_range(watermark: u64, head: u64) -> Option<RangeInclusive<u64>> {
    (head > watermark).then(|| watermark + 1..=head)
}

/// Trails the node's finalized head and verifies every block it has not yet seen.
///
/// The watermark starts at zero, lives only in memory, and never decreases.
pub struct CatchUpLoop {
    client: Arc<dyn ChainClient>,
    verifier: BlockVerifier,
    settings: PollSettings,
    watermark: u64,
}

impl CatchUpLoop {
    pub fn new(client: Arc<dyn ChainClient>, verifier: BlockVerifier, settings: PollSettings) -> Self {
        Self {
            client,
            verifier,
            settings,
            watermark: 0,
        }
    }

    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    /// Probes the node until it answers with a header, giving up after `max_attempts`.
    pub async fn connect(&self, max_attempts: u32) -> Result<Header> {
        for attempt in 1..=max_attempts {
            if let Some(header) = self.client.latest_header().await {
                info!("connected to node, finalized head is #{}", header.number);
                return Ok(header);
            }

            warn!("node unreachable (attempt {attempt}/{max_attempts})");
            if attempt < max_attempts {
                sleep(self.settings.no_header_backoff).await;
            }
        }

        bail!("node did not return a header after {max_attempts} attempts")
    }

    /// Runs the loop forever.
    pub async fn run(mut self) -> Result<()> {
        loop {
            self.tick().await;
        }
    }

    /// Polls the node once and, if it is ahead of the watermark, walks the new range.
    pub async fn tick(&mut self) -> Tick {
        let Some(header) = self.client.latest_header().await else {
            debug!("no header, retrying in {:?}", self.settings.no_header_backoff);
            sleep(self.settings.no_header_backoff).await;
            return Tick::NoHeader;
        };

        let head = header.number;
        let Some(range) = catch_up_range(self.watermark, head) else {
            debug!("no block beyond #{}, retrying in {:?}", self.watermark, self.settings.idle_backoff);
            sleep(self.settings.idle_backoff).await;
            return Tick::Idle { head };
        };

        let summary = self.walk(range).await;

        self.watermark = match summary.halted_at {
            Some(block) => {
                debug!("catch-up halted at #{block}, retrying in {:?}", self.settings.no_header_backoff);
                sleep(self.settings.no_header_backoff).await;
                block - 1
            }
            None => head,
        };

        Tick::CaughtUp(summary)
    }

    async fn walk(&self, range: RangeInclusive<u64>) -> RangeSummary {
        let mut summary = RangeSummary {
            from: *range.start(),
            to: *range.end(),
            ..Default::default()
        };

        for number in range {
            info!("processing block #{number}");

            let Some(block) = self.client.block_by_number(number).await else {
                match self.settings.fetch_failure {
                    FetchFailurePolicy::Skip => {
                        warn!("block #{number} could not be fetched, leaving it unverified");
                        summary.skipped.push(number);
                        continue;
                    }
                    FetchFailurePolicy::Halt => {
                        warn!("block #{number} could not be fetched, halting catch-up");
                        summary.halted_at = Some(number);
                        break;
                    }
                }
            };

            let report = self.verifier.verify_block(&block).await;
            info!("{report}");
            summary.reports.push(report);
        }

        summary
    }
}
