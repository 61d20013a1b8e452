//! Units of outbound work.

use {
    rand::RngCore,
    serde::Serialize,
    serde_json::{Map, Value},
};

use crate::{Error, Result};

/// Longest delay the provider accepts, in seconds.
pub const MAX_DELAY_SECONDS: u32 = 900;

/// Number of random bytes behind a generated FIFO group id.
const GROUP_ID_BYTES: usize = 64;

/// Validated delivery delay for non-FIFO queues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Delay(u32);

impl Delay {
    /// Fails with [`Error::InvalidDelay`] when `seconds` exceeds
    /// [`MAX_DELAY_SECONDS`].
    pub fn new(seconds: u64) -> Result<Self> {
        match u32::try_from(seconds) {
            Ok(secs) if secs <= MAX_DELAY_SECONDS => Ok(Self(secs)),
            _ => Err(Error::InvalidDelay { seconds }),
        }
    }

    #[must_use]
    pub const fn seconds(self) -> u32 {
        self.0
    }
}

/// A named unit of work with a JSON object payload.
///
/// FIFO fields only reach the wire for `.fifo` queues and the delay only for
/// standard queues; see [`crate::encode`].
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    name: String,
    payload: Map<String, Value>,
    delay: Option<Delay>,
    group_id: String,
    deduplication_id: Option<String>,
}

impl Message {
    pub fn new(name: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            payload,
            delay: None,
            group_id: random_group_id(),
            deduplication_id: None,
        }
    }

    /// Message with an empty payload.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Map::new())
    }

    /// Build from any serializable payload. It must serialize to a JSON
    /// object, otherwise [`Error::PayloadNotObject`] is returned.
    pub fn from_serialize<T: Serialize + ?Sized>(name: impl Into<String>, payload: &T) -> Result<Self> {
        match serde_json::to_value(payload)? {
            Value::Object(map) => Ok(Self::new(name, map)),
            _ => Err(Error::PayloadNotObject),
        }
    }

    /// Message delayed by `seconds`; fails like [`Delay::new`].
    pub fn delayed(name: impl Into<String>, payload: Map<String, Value>, seconds: u64) -> Result<Self> {
        Ok(Self::new(name, payload).with_delay(Delay::new(seconds)?))
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = group_id.into();
        self
    }

    #[must_use]
    pub fn with_deduplication_id(mut self, deduplication_id: impl Into<String>) -> Self {
        self.deduplication_id = Some(deduplication_id.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn delay(&self) -> Option<Delay> {
        self.delay
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn deduplication_id(&self) -> Option<&str> {
        self.deduplication_id.as_deref()
    }
}

/// Per-push overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOptions {
    /// Replaces the message's own delay for this push.
    pub delay: Option<Delay>,
}

impl PushOptions {
    #[must_use]
    pub fn delayed(delay: Delay) -> Self {
        Self { delay: Some(delay) }
    }
}

fn random_group_id() -> String {
    let mut bytes = [0u8; GROUP_ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
