// src/error.rs
use thiserror::Error;

/// Failures that can occur while collecting candidate keywords.
///
/// None of these ever escape [`crate::ingest::Aggregator::aggregate`]; they are
/// caught per source (or per cache read) and logged.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Transport failure or non-success HTTP status.
    #[error("network error fetching {url}: {reason}")]
    Network {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    /// Malformed or unexpected document structure.
    #[error("parse error ({kind}): {reason}")]
    Parse { kind: String, reason: String },

    /// Persisted product list exists but could not be read or decoded.
    #[error("cache read error at {path}: {reason}")]
    CacheRead { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AggregateError {
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            status: None,
            reason: reason.to_string(),
        }
    }

    pub fn parse(kind: impl ToString, reason: impl ToString) -> Self {
        Self::Parse {
            kind: kind.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Default retry predicate: only network-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

pub type Result<T, E = AggregateError> = std::result::Result<T, E>;
