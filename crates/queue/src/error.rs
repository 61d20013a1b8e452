use thiserror::Error;

use crate::engine::ChunkFailure;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("delay of {seconds}s is outside 0..={}s", crate::MAX_DELAY_SECONDS)]
    InvalidDelay { seconds: u64 },

    #[error("payload must serialize to a JSON object")]
    PayloadNotObject,

    #[error("queue \"{queue}\" is not configured")]
    UnknownQueue { queue: String },

    #[error("queue \"{queue}\" has no destination address")]
    UnboundQueue { queue: String },

    #[error(
        "flush of queue \"{queue}\" left {unsent} message(s) buffered across {} chunk(s)",
        .failures.len()
    )]
    PartialFlush {
        queue: String,
        sent: usize,
        unsent: usize,
        failures: Vec<ChunkFailure>,
    },

    #[error("detached flush of queue \"{queue}\" did not complete: {message}")]
    Detached { queue: String, message: String },

    #[error("{} queue(s) failed to flush: {}", .failures.len(), queue_names(.failures))]
    Publish { failures: Vec<(String, Error)> },
}

fn queue_names(failures: &[(String, Error)]) -> String {
    failures
        .iter()
        .map(|(queue, _)| queue.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    #[must_use]
    pub fn unknown_queue(queue: impl Into<String>) -> Self {
        Self::UnknownQueue {
            queue: queue.into(),
        }
    }

    #[must_use]
    pub fn unbound_queue(queue: impl Into<String>) -> Self {
        Self::UnboundQueue {
            queue: queue.into(),
        }
    }

    /// Chunk failures carried by a partial flush; empty for other variants.
    #[must_use]
    pub fn chunk_failures(&self) -> &[ChunkFailure] {
        match self {
            Self::PartialFlush { failures, .. } => failures,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
