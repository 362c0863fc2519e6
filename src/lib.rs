//! Admission Cache - a UDP in-memory admission cache
//!
//! Clients ask whether a `(prefix, suffix)` key may be admitted under a
//! per-prefix cap on distinct suffixes. Admitted keys expire after a TTL unless
//! refreshed.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tasks;

pub use cache::{CacheEngine, EngineKind, EngineStats};
pub use client::CacheClient;
pub use config::Config;
pub use error::{ClientError, ServerError};
pub use server::{PipelineSettings, ServerHandle, UdpServer};
