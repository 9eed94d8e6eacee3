use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{Result, RpcClientError};
use crate::types::{BlockHash, Cell, ClientConfig, Header, RawBytes, RpcRequest, RpcResponse, SignedBlock};

/// Read-only view of the chain used by the light client.
///
/// Implementations never raise: a transport error, an error object from the node or a
/// response without a usable `result` all come back as `None`, which callers treat as
/// "no data yet, try again later".
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Returns the node's current best finalized header.
    async fn latest_header(&self) -> Option<Header>;

    /// Resolves the canonical hash of block `number`.
    async fn block_hash_by_number(&self, number: u64) -> Option<BlockHash>;

    /// Fetches the full block for a known hash.
    async fn block_by_hash(&self, hash: &BlockHash) -> Option<SignedBlock>;

    /// Requests the inclusion proof for a single matrix cell of block `number`.
    async fn proof_for_cell(&self, number: u64, cell: Cell) -> Option<Vec<u8>>;

    /// Resolves the hash of block `number` and fetches it.
    /// Yields `None` as soon as either step does.
    async fn block_by_number(&self, number: u64) -> Option<SignedBlock> {
        let hash = self.block_hash_by_number(number).await?;
        self.block_by_hash(&hash).await
    }
}

/// JSON-RPC over HTTP implementation of [`ChainClient`].
#[derive(Clone)]
pub struct RpcChainClient {
    config: ClientConfig,
    http: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

impl RpcChainClient {
    /// Create a new client for the configured endpoint.
    pub fn new(config: ClientConfig) -> Result<Self> {
        debug!("Creating chain RPC client with endpoint: {}", config.url);

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        info!("Chain RPC client ready for {}", config.url);

        Ok(Self {
            config,
            http,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the configured endpoint
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Sends one JSON-RPC request and decodes its `result`.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Option<Value>) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, params);
        debug!("-> {} id={}", method, id);

        let response: RpcResponse = self
            .http
            .post(&self.config.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(RpcClientError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        let result = response
            .result
            .ok_or_else(|| RpcClientError::EmptyResult(method.to_string()))?;

        Ok(serde_json::from_value(result)?)
    }

    async fn query<T: DeserializeOwned>(&self, method: &str, params: Option<Value>) -> Option<T> {
        match self.call(method, params).await {
            Ok(value) => Some(value),
            Err(RpcClientError::EmptyResult(method)) => {
                debug!("{method} returned no result");
                None
            }
            Err(e) => {
                warn!("{method} failed: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn latest_header(&self) -> Option<Header> {
        self.query("chain_getHeader", None).await
    }

    async fn block_hash_by_number(&self, number: u64) -> Option<BlockHash> {
        self.query("chain_getBlockHash", Some(json!([number]))).await
    }

    async fn block_by_hash(&self, hash: &BlockHash) -> Option<SignedBlock> {
        self.query("chain_getBlock", Some(json!([hash]))).await
    }

    async fn proof_for_cell(&self, number: u64, cell: Cell) -> Option<Vec<u8>> {
        self.query::<RawBytes>("kate_queryProof", Some(json!([number, [cell]])))
            .await
            .map(RawBytes::into_inner)
    }
}
