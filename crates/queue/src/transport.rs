//! Contract for the provider batch-send call.

use {async_trait::async_trait, thiserror::Error};

use crate::BatchEntry;

/// Sends one batch of at most [`crate::MAX_BATCH_SIZE`] entries to a queue.
///
/// An `Ok` acknowledgement may still list entries the provider rejected;
/// those are kept for the next flush by the engine.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    async fn send_batch(
        &self,
        queue_url: &str,
        entries: Vec<BatchEntry>,
    ) -> Result<BatchAck, TransportError>;
}

/// Provider acknowledgement of one batch call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchAck {
    /// Entries the provider did not accept.
    pub failed: Vec<FailedEntry>,
}

impl BatchAck {
    /// Every entry was accepted.
    #[must_use]
    pub fn ok() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// An entry the provider refused, keyed by its in-batch id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEntry {
    pub id: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("queue not found: {queue_url}")]
    QueueNotFound { queue_url: String },

    #[error("batch rejected: {message}")]
    Rejected { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl TransportError {
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
