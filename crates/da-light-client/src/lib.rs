//! Data availability light client.
//!
//! Trails a chain's finalized headers and, for every new block, challenges a
//! few random cells of the block's data matrix. Each challenge asks the node
//! for a cell proof and checks it against the column commitment recorded in
//! the header; the verdicts are aggregated into a per-block report.

pub mod catchup;
pub mod command;
pub mod config;
pub mod verify;

pub use catchup::{catch_up_range, CatchUpLoop, FetchFailurePolicy, PollSettings, Tick};
pub use verify::{BlockOutcome, BlockReport, BlockVerifier, SampleOutcome, SampleTally};
