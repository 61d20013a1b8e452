//! Producer-facing facade over a [`QueueRegistry`].

use std::sync::Arc;

use tracing::warn;

use crate::{Error, FlushSummary, Message, PushOptions, QueueRegistry, Result};

/// Pushes to configured queues only and flushes all of them at once.
#[derive(Clone)]
pub struct Publisher {
    registry: Arc<QueueRegistry>,
}

impl Publisher {
    pub fn new(registry: Arc<QueueRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<QueueRegistry> {
        &self.registry
    }

    /// Fails with [`Error::UnknownQueue`] when `queue` is not configured.
    pub async fn push(&self, queue: &str, message: Message) -> Result<()> {
        self.push_with(queue, message, PushOptions::default()).await
    }

    pub async fn push_with(&self, queue: &str, message: Message, options: PushOptions) -> Result<()> {
        if !self.registry.is_configured(queue) {
            return Err(Error::unknown_queue(queue));
        }
        self.registry
            .get_queue(queue)
            .lock()
            .await
            .push_with(message, options);
        Ok(())
    }

    /// Flush every configured queue holding messages.
    ///
    /// Every queue is attempted; failures are collected into
    /// [`Error::Publish`].
    pub async fn flush(&self) -> Result<Vec<FlushSummary>> {
        let mut summaries = Vec::new();
        let mut failures = Vec::new();

        for shared in self.registry.instantiated() {
            let mut queue = shared.lock().await;
            if queue.is_empty() || !self.registry.is_configured(queue.name()) {
                continue;
            }
            match queue.flush().await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    warn!(queue = %queue.name(), error = %e, "queue flush failed");
                    failures.push((queue.name().to_string(), e));
                },
            }
        }

        if failures.is_empty() {
            Ok(summaries)
        } else {
            Err(Error::Publish { failures })
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::InMemoryTransport,
        std::collections::BTreeMap,
    };

    fn publisher() -> (Publisher, Arc<InMemoryTransport>) {
        let transport = Arc::new(InMemoryTransport::new());
        let addresses = BTreeMap::from([
            ("default".to_string(), "https://sqs.local/1/default".to_string()),
            ("mail".to_string(), "https://sqs.local/1/mail".to_string()),
        ]);
        let registry = Arc::new(QueueRegistry::new(addresses, transport.clone()));
        (Publisher::new(registry), transport)
    }

    #[tokio::test]
    async fn rejects_unknown_queue() {
        let (publisher, _) = publisher();
        let err = publisher
            .push("nowhere", Message::named("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownQueue { ref queue } if queue == "nowhere"));
        assert!(publisher.registry().instantiated().is_empty());
    }

    #[tokio::test]
    async fn flushes_every_queue_with_pending_messages() {
        let (publisher, transport) = publisher();
        publisher.push("default", Message::named("a")).await.unwrap();
        publisher.push("mail", Message::named("b")).await.unwrap();
        publisher.push("mail", Message::named("c")).await.unwrap();

        let summaries = publisher.flush().await.unwrap();
        let sent: Vec<_> = summaries.iter().map(|s| (s.queue.as_str(), s.sent)).collect();
        assert_eq!(sent, [("default", 1), ("mail", 2)]);
        assert_eq!(transport.call_count(), 2);

        assert!(publisher.flush().await.unwrap().is_empty());
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn reports_failed_queues_and_keeps_going() {
        let (publisher, transport) = publisher();
        publisher.push("default", Message::named("a")).await.unwrap();
        publisher.push("mail", Message::named("b")).await.unwrap();
        transport.fail_next_call("unavailable");

        let err = publisher.flush().await.unwrap_err();
        let Error::Publish { ref failures } = err else {
            panic!("expected publish error, got {err}");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "default");
        assert_eq!(transport.call_count(), 2);

        let queue = publisher.registry().get_queue("default");
        assert_eq!(queue.lock().await.len(), 1);
    }
}
