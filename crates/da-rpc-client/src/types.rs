use std::fmt::{self, Display};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Result, RpcClientError};

/// JSON-RPC protocol version tag sent with every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// Connection settings for [`crate::RpcChainClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// HTTP endpoint of the node, e.g. `http://localhost:9933`.
    pub url: String,
    /// Upper bound for a single request/response round-trip.
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            request_timeout,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub id: u64,
    pub jsonrpc: &'static str,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Option<Value>) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Parses a block number as the node encodes it: `0x`-prefixed hex or plain decimal.
pub fn parse_block_number(raw: &str) -> Result<u64> {
    let trimmed = raw.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex_digits) => u64::from_str_radix(hex_digits, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| RpcClientError::InvalidBlockNumber(raw.to_string()))
}

fn deserialize_block_number<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberRepr {
        Int(u64),
        Text(String),
    }

    match NumberRepr::deserialize(deserializer)? {
        NumberRepr::Int(n) => Ok(n),
        NumberRepr::Text(s) => parse_block_number(&s).map_err(serde::de::Error::custom),
    }
}

/// Byte payload that the node may encode either as a JSON array of byte values
/// or as a hex string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawBytes(pub Vec<u8>);

impl RawBytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl<'de> Deserialize<'de> for RawBytes {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum BytesRepr {
            Seq(Vec<u8>),
            Hex(String),
        }

        match BytesRepr::deserialize(deserializer)? {
            BytesRepr::Seq(bytes) => Ok(RawBytes(bytes)),
            BytesRepr::Hex(s) => {
                let digits = s.strip_prefix("0x").unwrap_or(&s);
                hex::decode(digits).map(RawBytes).map_err(serde::de::Error::custom)
            }
        }
    }
}

/// Canonical block hash as returned by `chain_getBlockHash`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(pub String);

impl Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExtrinsicsRoot {
    /// Concatenated per-column commitments.
    #[serde(default)]
    pub commitment: RawBytes,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    #[serde(deserialize_with = "deserialize_block_number")]
    pub number: u64,
    #[serde(default)]
    pub extrinsics_root: ExtrinsicsRoot,
}

impl Header {
    /// Returns the commitment root recorded in the header.
    pub fn commitment_root(&self) -> &[u8] {
        self.extrinsics_root.commitment.as_slice()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Block {
    pub header: Header,
    #[serde(default)]
    pub extrinsics: Vec<Value>,
}

/// Result of `chain_getBlock`.
#[derive(Clone, Debug, Deserialize)]
pub struct SignedBlock {
    pub block: Block,
}

impl SignedBlock {
    pub fn header(&self) -> &Header {
        &self.block.header
    }

    pub fn number(&self) -> u64 {
        self.block.header.number
    }
}

/// A single cell of the block's data matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
}

impl Cell {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
