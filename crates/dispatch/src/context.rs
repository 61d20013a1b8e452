use std::net::IpAddr;

use serde_json::Value;

/// How the delivery was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryKind {
    /// Scheduled task from the daemon's cron configuration; no payload.
    Periodic,
    /// Message sent by an application, named by its `Name` attribute.
    Standard,
    /// Provider notification (e.g. an S3 event) carrying `Records`.
    Event,
}

impl DeliveryKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Periodic => "periodic",
            Self::Standard => "standard",
            Self::Event => "event",
        }
    }
}

impl std::fmt::Display for DeliveryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything handlers know about a delivery. Built once by extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub kind: DeliveryKind,
    pub message_name: String,
    /// Decoded body; `{}` for periodic tasks.
    pub payload: Value,
    pub message_id: Option<String>,
    /// Queue the daemon pulled the message from.
    pub queue: Option<String>,
    pub scheduled_at: Option<String>,
    pub first_received_at: Option<String>,
    pub receive_count: Option<u32>,
    pub sender_id: Option<String>,
    pub remote_addr: IpAddr,
    pub user_agent: String,
}

impl RequestContext {
    /// Field of an object payload.
    pub fn payload_field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// True when the daemon has delivered this message before.
    pub fn is_redelivery(&self) -> bool {
        self.receive_count.is_some_and(|n| n > 1)
    }
}
