//! Metric name and label definitions.

/// Outbound queue metrics.
pub mod queue {
    /// Messages accepted into a queue buffer
    pub const MESSAGES_PUSHED_TOTAL: &str = "ebworker_queue_messages_pushed_total";
    /// Messages acknowledged by the provider
    pub const MESSAGES_SENT_TOTAL: &str = "ebworker_queue_messages_sent_total";
    /// Messages that failed to send and were put back in the buffer
    pub const MESSAGES_FAILED_TOTAL: &str = "ebworker_queue_messages_failed_total";
    /// Batch calls issued to the provider
    pub const BATCHES_SENT_TOTAL: &str = "ebworker_queue_batches_sent_total";
    /// Batch calls that failed outright
    pub const BATCH_ERRORS_TOTAL: &str = "ebworker_queue_batch_errors_total";
    /// Wall time of one flush in seconds
    pub const FLUSH_DURATION_SECONDS: &str = "ebworker_queue_flush_duration_seconds";
    /// Messages currently buffered
    pub const BUFFERED_MESSAGES: &str = "ebworker_queue_buffered_messages";
}

/// Inbound worker metrics.
pub mod worker {
    /// Deliveries that reached the worker endpoint
    pub const DELIVERIES_TOTAL: &str = "ebworker_worker_deliveries_total";
    /// Deliveries refused by the origin policy
    pub const REJECTED_TOTAL: &str = "ebworker_worker_rejected_total";
    /// Deliveries whose message name has no route
    pub const UNMAPPED_TOTAL: &str = "ebworker_worker_unmapped_total";
    /// Handler chains that returned an error
    pub const HANDLER_ERRORS_TOTAL: &str = "ebworker_worker_handler_errors_total";
    /// Time spent running a handler chain in seconds
    pub const DISPATCH_DURATION_SECONDS: &str = "ebworker_worker_dispatch_duration_seconds";
}

/// Common label keys used across metrics
pub mod labels {
    pub const QUEUE: &str = "queue";
    pub const MESSAGE: &str = "message";
    pub const KIND: &str = "kind";
    pub const REASON: &str = "reason";
    pub const STATUS: &str = "status";
}

/// Standard histogram buckets
pub mod buckets {
    /// Flush duration buckets (in seconds)
    /// Covers 5ms to 30s
    pub const FLUSH_DURATION: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
    ];

    /// Handler chain duration buckets (in seconds)
    /// Covers 1ms to 15 minutes, the longest a daemon waits on one delivery
    pub const DISPATCH_DURATION: &[f64] = &[
        0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0,
    ];
}
