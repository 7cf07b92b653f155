//! Error types for the sync and report jobs

use std::path::PathBuf;

use thiserror::Error;

pub type PublishResult<T> = Result<T, PublishError>;
pub type SyncResult<T> = Result<T, SyncError>;

/// Failure talking to one threat-intel destination.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Destination could not be reached at all
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Destination answered with a failure status (after any retry)
    #[error("server error {status}: {body}")]
    Server { status: u16, body: String },

    /// Response body did not have the expected shape
    #[error("parse error: {0}")]
    Parse(String),
}

impl PublishError {
    pub fn status(&self) -> Option<u16> {
        match self {
            PublishError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure that stops one destination's run before its watermark moves.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("store error: {0}")]
    Store(#[from] honey_store::StoreError),

    #[error("{step} failed: {source}")]
    Publish {
        step: &'static str,
        #[source]
        source: PublishError,
    },

    #[error("state file {path}: {source}")]
    State {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shutdown requested")]
    Interrupted,
}

impl SyncError {
    pub(crate) fn publish(step: &'static str) -> impl FnOnce(PublishError) -> SyncError {
        move |source| SyncError::Publish { step, source }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("duplicate destination {0}")]
    Duplicate(String),

    #[error("destination name {0:?} has no letters or digits")]
    UnusableName(String),
}
