//! In-memory transport for tests and local development.

use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;

use crate::{
    BatchEntry,
    transport::{BatchAck, FailedEntry, QueueTransport, TransportError},
};

/// A batch call as the transport received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBatch {
    pub queue_url: String,
    pub entries: Vec<BatchEntry>,
}

#[derive(Debug)]
enum Scripted {
    FailCall(String),
    FailEntries(Vec<String>),
}

/// Records every call and acknowledges it, unless a failure was scripted for
/// the next call. Scripted outcomes are consumed in order, one per call.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    calls: Mutex<Vec<RecordedBatch>>,
    script: Mutex<VecDeque<Option<Scripted>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unscripted call succeeds. Lets a test fail a later call.
    pub fn succeed_next_call(&self) {
        self.push_script(None);
    }

    /// Fail the next call outright.
    pub fn fail_next_call(&self, message: impl Into<String>) {
        self.push_script(Some(Scripted::FailCall(message.into())));
    }

    /// Acknowledge the next call but report the given entry ids as failed.
    pub fn fail_next_entries<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids = ids.into_iter().map(Into::into).collect();
        self.push_script(Some(Scripted::FailEntries(ids)));
    }

    pub fn calls(&self) -> Vec<RecordedBatch> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Every entry sent so far, in call order.
    pub fn entries(&self) -> Vec<BatchEntry> {
        self.calls()
            .into_iter()
            .flat_map(|call| call.entries)
            .collect()
    }

    fn push_script(&self, outcome: Option<Scripted>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
    }
}

#[async_trait]
impl QueueTransport for InMemoryTransport {
    async fn send_batch(
        &self,
        queue_url: &str,
        entries: Vec<BatchEntry>,
    ) -> Result<BatchAck, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedBatch {
                queue_url: queue_url.to_string(),
                entries,
            });

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .flatten();

        match scripted {
            None => Ok(BatchAck::ok()),
            Some(Scripted::FailCall(message)) => Err(TransportError::rejected(message)),
            Some(Scripted::FailEntries(ids)) => Ok(BatchAck {
                failed: ids
                    .into_iter()
                    .map(|id| FailedEntry {
                        id,
                        code: "InternalError".into(),
                        message: "scripted entry failure".into(),
                    })
                    .collect(),
            }),
        }
    }
}
