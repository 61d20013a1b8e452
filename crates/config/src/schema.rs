/// Config schema types (queues, message routes, worker endpoint, metrics).
use std::collections::BTreeMap;

use {
    ipnet::IpNet,
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EbWorkerConfig {
    /// Logical queue name → provider queue URL.
    pub queues: BTreeMap<String, String>,
    /// Message name → handler chain.
    pub messages: BTreeMap<String, HandlerSpec>,
    pub worker: WorkerConfig,
    pub metrics: MetricsConfig,
}

impl EbWorkerConfig {
    /// Queue URL configured for `name`, if any.
    #[must_use]
    pub fn queue_url(&self, name: &str) -> Option<&str> {
        self.queues.get(name).map(String::as_str)
    }
}

/// Handlers mapped to one message name.
///
/// Accepts either a single handler name or an ordered list:
///
/// ```toml
/// [messages]
/// "user.created" = "send-welcome-email"
/// "order.paid"   = ["audit", "fulfil-order"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HandlerSpec {
    Single(String),
    Chain(Vec<String>),
}

impl HandlerSpec {
    /// Handler names in execution order.
    #[must_use]
    pub fn handlers(&self) -> &[String] {
        match self {
            Self::Single(name) => std::slice::from_ref(name),
            Self::Chain(names) => names,
        }
    }
}

impl From<&str> for HandlerSpec {
    fn from(name: &str) -> Self {
        Self::Single(name.to_string())
    }
}

impl From<Vec<String>> for HandlerSpec {
    fn from(names: Vec<String>) -> Self {
        Self::Chain(names)
    }
}

/// Inbound worker endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Route the daemon posts deliveries to. Defaults to "/internal/worker".
    pub path: String,
    /// Substring the `User-Agent` must contain, case-insensitively.
    /// Defaults to "aws-sqsd".
    pub user_agent: String,
    /// Networks trusted besides loopback. Defaults to `172.0.0.0/8`, which
    /// covers the Docker bridge addresses the daemon posts from.
    pub trusted_networks: Vec<IpNet>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            path: "/internal/worker".into(),
            user_agent: ebworker_common::DAEMON_USER_AGENT.into(),
            trusted_networks: default_trusted_networks(),
        }
    }
}

fn default_trusted_networks() -> Vec<IpNet> {
    ["172.0.0.0/8"]
        .iter()
        .filter_map(|net| net.parse().ok())
        .collect()
}

/// Metrics configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled. Defaults to false.
    pub enabled: bool,
    /// Global labels attached to every metric.
    pub labels: BTreeMap<String, String>,
}
