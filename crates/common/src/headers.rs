//! Header and attribute names shared by the outbound encoder and inbound
//! extraction.
//!
//! The queue daemon turns each SQS delivery into an HTTP `POST`, copying the
//! message metadata into `X-Aws-Sqsd-*` headers. Message attributes set at
//! enqueue time come back as `X-Aws-Sqsd-Attr-<name>`.

use std::fmt;

/// Message attribute carrying the message name. The daemon forwards it as
/// [`SqsdHeader::AttrName`].
pub const NAME_ATTRIBUTE: &str = "Name";

/// Substring the daemon's `User-Agent` must contain (matched case-insensitively).
pub const DAEMON_USER_AGENT: &str = "aws-sqsd";

/// Diagnostic header attached to every response the worker pipeline produces.
pub const HANDLED_BY_HEADER: &str = "x-handled-by";

/// Value of [`HANDLED_BY_HEADER`].
pub const HANDLED_BY_VALUE: &str = "ebworker";

/// Headers set by the queue daemon on every delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqsdHeader {
    /// Provider message id.
    MessageId,
    /// Logical name of the queue the message was read from.
    Queue,
    /// Epoch millis of the first receive.
    FirstReceivedAt,
    /// Approximate receive count (starts at 1).
    ReceiveCount,
    /// Account or principal that enqueued the message.
    SenderId,
    /// Present only on periodic tasks.
    TaskName,
    /// Schedule time of a periodic task.
    ScheduledAt,
    /// The `Name` message attribute.
    AttrName,
}

impl SqsdHeader {
    /// All variants, for iteration.
    pub const ALL: &'static [SqsdHeader] = &[
        Self::MessageId,
        Self::Queue,
        Self::FirstReceivedAt,
        Self::ReceiveCount,
        Self::SenderId,
        Self::TaskName,
        Self::ScheduledAt,
        Self::AttrName,
    ];

    /// Lower-case wire name, usable directly as an `http::HeaderName`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MessageId => "x-aws-sqsd-msgid",
            Self::Queue => "x-aws-sqsd-queue",
            Self::FirstReceivedAt => "x-aws-sqsd-first-received-at",
            Self::ReceiveCount => "x-aws-sqsd-receive-count",
            Self::SenderId => "x-aws-sqsd-sender-id",
            Self::TaskName => "x-aws-sqsd-taskname",
            Self::ScheduledAt => "x-aws-sqsd-scheduled-at",
            Self::AttrName => "x-aws-sqsd-attr-name",
        }
    }
}

impl fmt::Display for SqsdHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
