// src/core/errors.rs

//! Defines the primary error type for the entire application.

use thiserror::Error;

/// The main error enum, representing all possible failures within the reconciler.
/// Using `thiserror` allows for clean error definitions and automatic `From` trait implementations.
#[derive(Error, Debug)]
pub enum SlotwardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Incomplete data in stream")]
    IncompleteData,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Timed out during {0}")]
    Timeout(String),

    #[error("{command} failed on {addr}: {message}")]
    CommandFailed {
        command: String,
        addr: String,
        message: String,
    },

    #[error("Unexpected reply to {command} from {addr}: {reply}")]
    UnexpectedReply {
        command: String,
        addr: String,
        reply: String,
    },

    #[error("Malformed CLUSTER NODES line: {0:?}")]
    MalformedNodeLine(String),

    #[error("No line flagged 'myself' in CLUSTER NODES reply from {0}")]
    MissingMyself(String),

    #[error("Endpoint name {0:?} does not end in a numeric ordinal")]
    InvalidEndpointName(String),

    #[error("Invalid cluster manifest: {0}")]
    InvalidManifest(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SlotwardError {
    /// True for errors that mean the declared manifest itself is broken.
    /// Re-running the pass against the same manifest cannot succeed, so the
    /// worker parks the cluster until the manifest content changes.
    pub fn is_manifest_violation(&self) -> bool {
        matches!(
            self,
            SlotwardError::InvalidEndpointName(_) | SlotwardError::InvalidManifest(_)
        )
    }
}
