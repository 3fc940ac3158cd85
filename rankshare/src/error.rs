use crate::types::Rank;

pub type Result<T> = std::result::Result<T, RankshareError>;

#[derive(Debug, thiserror::Error)]
pub enum RankshareError {
    #[error("invalid rank {rank}: communicator size is {size}")]
    InvalidRank { rank: Rank, size: u32 },

    #[error("{operation} failed at rank {rank}: {reason}")]
    CollectiveFailed {
        operation: &'static str,
        rank: Rank,
        reason: String,
    },

    #[error("peer {rank} disconnected unexpectedly")]
    PeerDisconnected { rank: Rank },

    #[error("message decode failed: {0}")]
    DecodeFailed(String),

    #[error("internal lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("invalid random state: expected {expected} bytes, got {actual}")]
    InvalidRandomState { expected: usize, actual: usize },

    #[error("backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RankshareError {
    /// Create a `Backend` error with just a message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a `Backend` error with a message and a source error.
    pub fn backend_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }
}
