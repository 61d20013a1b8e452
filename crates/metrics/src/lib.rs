//! Metrics collection and export for ebworker.
//!
//! Metric names live in one place so the queue and dispatch crates record
//! under consistent keys. Recording goes through the `metrics` facade and is a
//! no-op until a recorder is installed with [`init_metrics`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use ebworker_metrics::{counter, labels, queue};
//!
//! counter!(queue::MESSAGES_SENT_TOTAL, labels::QUEUE => "default").increment(10);
//! ```
//!
//! # Features
//!
//! - `prometheus`: install a Prometheus recorder and render the text format

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
