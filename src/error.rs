//! Error types for the cache server and client
//!
//! Provides unified error handling using thiserror. The cache engines never
//! fail with an error; they report plain `bool` outcomes.

use std::io;
use std::time::Duration;

use thiserror::Error;

// == Server Error Enum ==
/// Errors raised while bringing the UDP server up.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listening socket could not be bound
    #[error("Failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Any other socket failure
    #[error("Socket error: {0}")]
    Io(#[from] io::Error),
}

// == Client Error Enum ==
/// Errors surfaced by [`crate::client::CacheClient`].
#[derive(Error, Debug)]
pub enum ClientError {
    /// Socket setup or send failed
    #[error("Client I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server address did not resolve to anything
    #[error("Could not resolve server address: {0}")]
    Resolve(String),

    /// No reply arrived in time
    #[error("Timed out after {0:?} waiting for a reply")]
    Timeout(Duration),

    /// The reply listener went away before a reply arrived
    #[error("Reply channel closed")]
    Closed,
}

// == Result Type Alias ==
/// Convenience Result type for the server.
pub type Result<T> = std::result::Result<T, ServerError>;
