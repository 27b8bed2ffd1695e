//! Error taxonomy for miner polling and metric resolution

use thiserror::Error;

/// Failure while fetching or decoding the miner's status document
#[derive(Debug, Error)]
pub enum MinerError {
    /// Connection refused, DNS failure, timeout...
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Http(reqwest::StatusCode),

    #[error("digest authentication failed: {0}")]
    Auth(String),

    #[error("invalid JSON body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure while mapping an item path onto a status document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("empty item path")]
    EmptyPath,

    #[error("unknown root segment '{0}'")]
    UnknownRoot(String),

    #[error("path '{path}' is missing segment {position}")]
    MissingSegment { path: String, position: usize },

    #[error("'{0}' is not a valid index")]
    InvalidIndex(String),

    #[error("unexpected segments after a complete item in '{0}'")]
    TrailingSegments(String),

    #[error("unknown chain metric '{0}'")]
    UnknownChainMetric(String),

    #[error("chain index {index} out of range ({len} chains)")]
    ChainOutOfRange { index: usize, len: usize },

    #[error("fan index {index} out of range ({len} fans)")]
    FanOutOfRange { index: usize, len: usize },

    #[error("sensor index {index} out of range ({len} sensors)")]
    SensorOutOfRange { index: usize, len: usize },

    #[error("counter '{key}' = {value} exceeds {max}")]
    CounterOutOfRange { key: String, value: u64, max: u64 },

    #[error("key '{0}' not found")]
    MissingKey(String),

    #[error("malformed status document: {0}")]
    MalformedDocument(&'static str),
}

pub type MinerResult<T> = std::result::Result<T, MinerError>;
