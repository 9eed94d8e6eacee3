use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("node returned error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("response to {0} carried no result")]
    EmptyResult(String),
    #[error("invalid block number {0:?}")]
    InvalidBlockNumber(String),
}

pub type Result<T> = std::result::Result<T, RpcClientError>;
