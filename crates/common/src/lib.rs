//! Shared keys and error helpers used across all ebworker crates.

pub mod error;
pub mod headers;

pub use {
    error::FromMessage,
    headers::{DAEMON_USER_AGENT, HANDLED_BY_HEADER, HANDLED_BY_VALUE, NAME_ATTRIBUTE, SqsdHeader},
};
