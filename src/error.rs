//! Error taxonomy shared by readers, sinks, the ledger and the relay.

use std::path::PathBuf;

use thiserror::Error;

/// A source page could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("source request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("source {url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
}

/// A message could not be handed to a sink.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// `endpoint` is already redacted.
    #[error("webhook {endpoint} answered with HTTP {status}")]
    Status { endpoint: String, status: u16 },
}

/// One post element on a source page that could not be turned into a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedPost {
    #[error("post has no text container")]
    MissingText,

    #[error("post has no time element")]
    MissingTime,

    #[error("unparseable post datetime {0:?}")]
    BadTimestamp(String),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger io on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger {path} is not a valid record list: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("ledger record #{index} rejected: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("ledger serialization failed: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// Reasons a relay cycle was abandoned.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("fetching source {source_id} failed: {source}")]
    Fetch {
        source_id: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
