use std::net::IpAddr;

use {http::StatusCode, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    #[error("delivery from untrusted address {remote}")]
    UntrustedOrigin { remote: IpAddr },

    #[error("unexpected user agent \"{agent}\"")]
    UnexpectedAgent { agent: String },

    #[error("delivery carries no message name")]
    MissingMessageName,

    #[error("delivery body is not valid JSON: {source}")]
    InvalidPayload {
        #[source]
        source: serde_json::Error,
    },

    #[error("no handlers are mapped to message \"{name}\"")]
    UnmappedMessage { name: String },

    #[error("invalid handler chain for \"{message}\": {reason}")]
    HandlerSpec { message: String, reason: String },

    #[error("handler chain for \"{message}\" failed: {source}")]
    Handler {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Coarse classification used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Origin or agent checks failed.
    Validation,
    /// The delivery itself is malformed.
    BadRequest,
    /// Routing is missing or inconsistent.
    Configuration,
    /// A handler returned an error.
    Handler,
}

impl ErrorKind {
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::FORBIDDEN,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Configuration | Self::Handler => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Error {
    #[must_use]
    pub fn unmapped(name: impl Into<String>) -> Self {
        Self::UnmappedMessage { name: name.into() }
    }

    #[must_use]
    pub fn handler_spec(message: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::HandlerSpec {
            message: message.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UntrustedOrigin { .. } | Self::UnexpectedAgent { .. } => ErrorKind::Validation,
            Self::MissingMessageName | Self::InvalidPayload { .. } => ErrorKind::BadRequest,
            Self::UnmappedMessage { .. } | Self::HandlerSpec { .. } => ErrorKind::Configuration,
            Self::Handler { .. } => ErrorKind::Handler,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
