//! Outbound side of ebworker: messages are pushed into a per-queue buffer and
//! flushed to the provider in batches of at most ten entries.
//!
//! ```rust,ignore
//! let registry = Arc::new(QueueRegistry::from_config(&config, transport));
//! let publisher = Publisher::new(registry);
//! publisher.push("default", Message::new("user.created", payload)).await?;
//! publisher.flush().await?;
//! ```

pub mod encode;
pub mod engine;
pub mod error;
pub mod message;
pub mod publisher;
pub mod registry;
pub mod transport;
pub mod transport_memory;

pub use {
    encode::{BatchEntry, MAX_BATCH_SIZE, is_fifo},
    engine::{ChunkFailure, FailureCause, FlushHandle, FlushSummary, MessageQueue},
    error::{Error, Result},
    message::{Delay, MAX_DELAY_SECONDS, Message, PushOptions},
    publisher::Publisher,
    registry::{QueueRegistry, SharedQueue},
    transport::{BatchAck, FailedEntry, QueueTransport, TransportError},
    transport_memory::{InMemoryTransport, RecordedBatch},
};
