//! JSON-RPC client for a data availability chain node.
//!
//! This crate wraps the handful of node queries a DA light client needs:
//! the latest finalized header, block hash resolution, block retrieval and
//! single-cell Kate proof queries. Every query on the [`ChainClient`] trait
//! reports failure as `None` so callers can treat a missing answer as
//! "retry later" rather than as a fatal condition.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ChainClient, RpcChainClient};
pub use error::{Result, RpcClientError};
pub use types::{parse_block_number, Block, BlockHash, Cell, ClientConfig, ExtrinsicsRoot, Header, RawBytes, SignedBlock};
