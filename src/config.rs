//! Configuration Module
//!
//! Handles loading server configuration from command-line arguments and
//! environment variables.

use std::time::Duration;

use clap::Parser;

use crate::cache::EngineKind;
use crate::protocol::{parse_ttl_secs, DEFAULT_TTL_SECS};
use crate::server::PipelineSettings;

/// Default UDP listen address
pub const DEFAULT_LISTEN: &str = "0.0.0.0:7070";

/// Default bounded queue capacity between receiver and workers
pub const DEFAULT_QUEUE_CAPACITY: usize = 2500;

/// Default size of each pooled datagram buffer in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Server configuration parameters.
///
/// Both positional arguments may instead come from the environment, which
/// keeps `admission_cache <socket> <ttl>` and env-only deployments working.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// UDP address to listen on
    #[arg(env = "serversocket", default_value = DEFAULT_LISTEN)]
    pub listen: String,

    /// Default entry TTL in seconds, kept within [300, 900] (300 otherwise)
    #[arg(env = "defaultduration", default_value = "300")]
    pub default_ttl: String,

    /// Cache engine implementation
    #[arg(long, env = "CACHE_ENGINE", value_enum, default_value_t = EngineKind::Map)]
    pub engine: EngineKind,

    /// Number of worker tasks draining the packet queue
    #[arg(long, env = "WORKER_COUNT", default_value_t = num_cpus::get())]
    pub workers: usize,

    /// Capacity of the packet queue
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Size of each receive buffer in bytes
    #[arg(long, env = "BUFFER_SIZE", default_value_t = DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,
}

impl Config {
    /// Default TTL after range checking.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(parse_ttl_secs(&self.default_ttl))
    }

    /// Sizing for the ingestion pipeline. Zero values are raised to one.
    pub fn pipeline(&self) -> PipelineSettings {
        PipelineSettings {
            workers: self.workers.max(1),
            queue_capacity: self.queue_capacity.max(1),
            buffer_size: self.buffer_size.max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            default_ttl: DEFAULT_TTL_SECS.to_string(),
            engine: EngineKind::Map,
            workers: num_cpus::get(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}
