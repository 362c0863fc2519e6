//! Background Tasks Module
//!
//! Long-running tasks of the ingestion pipeline.
//!
//! # Tasks
//! - Receiver: reads datagrams into pooled buffers and queues them
//! - Worker: decodes queued packets, applies them, replies
//! - Supervisor: relaunches a task that panicked

mod receiver;
mod supervisor;
mod worker;

pub use receiver::{run_receiver, Packet, ReceiverContext};
pub use supervisor::supervise;
pub use worker::{handle_pdu, run_worker, SharedQueue};
