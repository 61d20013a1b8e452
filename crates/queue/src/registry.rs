//! One cached [`MessageQueue`] per logical queue name.

use std::{collections::BTreeMap, sync::Arc};

use {dashmap::DashMap, ebworker_config::EbWorkerConfig, tokio::sync::Mutex, tracing::debug};

use crate::{MessageQueue, QueueTransport};

/// A queue shared between producers.
pub type SharedQueue = Arc<Mutex<MessageQueue>>;

/// Resolves logical queue names to destination addresses and hands out one
/// engine per name for the registry's lifetime.
pub struct QueueRegistry {
    addresses: BTreeMap<String, String>,
    queues: DashMap<String, SharedQueue>,
    transport: Arc<dyn QueueTransport>,
}

impl QueueRegistry {
    pub fn new(addresses: BTreeMap<String, String>, transport: Arc<dyn QueueTransport>) -> Self {
        Self {
            addresses,
            queues: DashMap::new(),
            transport,
        }
    }

    pub fn from_config(config: &EbWorkerConfig, transport: Arc<dyn QueueTransport>) -> Self {
        Self::new(config.queues.clone(), transport)
    }

    /// Cached queue for `name`, created on first access. Names without a
    /// configured address get an unbound queue.
    pub fn get_queue(&self, name: &str) -> SharedQueue {
        if let Some(queue) = self.queues.get(name) {
            return Arc::clone(queue.value());
        }

        let entry = self.queues.entry(name.to_string()).or_insert_with(|| {
            let url = self.address(name).unwrap_or_default();
            debug!(queue = %name, url = %url, "created queue");
            Arc::new(Mutex::new(MessageQueue::new(
                name,
                url,
                Arc::clone(&self.transport),
            )))
        });
        Arc::clone(entry.value())
    }

    /// Configured destination address for `name`.
    pub fn address(&self, name: &str) -> Option<&str> {
        self.addresses.get(name).map(String::as_str)
    }

    pub fn is_configured(&self, name: &str) -> bool {
        self.addresses.contains_key(name)
    }

    /// Configured queue names in sorted order.
    pub fn configured(&self) -> impl Iterator<Item = &str> {
        self.addresses.keys().map(String::as_str)
    }

    /// Queues created so far, sorted by name.
    pub fn instantiated(&self) -> Vec<SharedQueue> {
        let mut queues: Vec<(String, SharedQueue)> = self
            .queues
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        queues.sort_by(|a, b| a.0.cmp(&b.0));
        queues.into_iter().map(|(_, queue)| queue).collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::InMemoryTransport};

    fn registry() -> QueueRegistry {
        let addresses = BTreeMap::from([
            ("default".to_string(), "https://sqs.local/1/default".to_string()),
            ("reports".to_string(), "https://sqs.local/1/reports.fifo".to_string()),
        ]);
        QueueRegistry::new(addresses, Arc::new(InMemoryTransport::new()))
    }

    #[tokio::test]
    async fn same_instance_per_name() {
        let registry = registry();
        let a = registry.get_queue("default");
        let b = registry.get_queue("default");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &registry.get_queue("reports")));
        assert_eq!(a.lock().await.url(), "https://sqs.local/1/default");
    }

    #[tokio::test]
    async fn unconfigured_name_is_unbound() {
        let registry = registry();
        let queue = registry.get_queue("nowhere");
        assert!(!queue.lock().await.is_bound());
        assert!(!registry.is_configured("nowhere"));
    }

    #[tokio::test]
    async fn concurrent_first_access_yields_one_instance() {
        let registry = Arc::new(registry());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.get_queue("reports") })
            })
            .collect();

        let mut queues = Vec::new();
        for handle in handles {
            queues.push(handle.await.unwrap());
        }
        assert!(queues.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.instantiated().len(), 1);
    }

    #[test]
    fn from_config_uses_queue_map() {
        let mut config = EbWorkerConfig::default();
        config
            .queues
            .insert("default".into(), "https://sqs.local/1/default".into());
        let registry = QueueRegistry::from_config(&config, Arc::new(InMemoryTransport::new()));
        assert_eq!(registry.configured().collect::<Vec<_>>(), ["default"]);
        assert_eq!(registry.address("default"), Some("https://sqs.local/1/default"));
    }
}
