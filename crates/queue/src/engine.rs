//! Per-queue buffer and batch flushing.

use std::{sync::Arc, time::Instant};

use {
    tokio::task::JoinHandle,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use ebworker_metrics::{counter, gauge, histogram, labels, queue as queue_metrics};

use crate::{
    Error, Message, PushOptions, Result,
    encode::{MAX_BATCH_SIZE, encode_entry, is_fifo},
    transport::{FailedEntry, QueueTransport, TransportError},
};

#[derive(Debug, Clone)]
struct Pending {
    message: Message,
    options: PushOptions,
}

/// Outcome of a flush in which every chunk was acknowledged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub queue: String,
    /// Batch calls issued.
    pub batches: usize,
    /// Messages the provider accepted.
    pub sent: usize,
}

/// Why (part of) a chunk did not reach the queue.
#[derive(Debug)]
pub enum FailureCause {
    /// The batch call itself failed.
    Transport(TransportError),
    /// The call was acknowledged but these entries were refused.
    Entries(Vec<FailedEntry>),
    /// The chunk could not be encoded, so no call was made.
    Encode(serde_json::Error),
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{e}"),
            Self::Entries(entries) => write!(f, "{} entries refused", entries.len()),
            Self::Encode(e) => write!(f, "encoding failed: {e}"),
        }
    }
}

/// A chunk with unsent messages.
///
/// After [`MessageQueue::flush`] the same messages are back in the buffer;
/// after a detached flush they exist only here.
#[derive(Debug)]
pub struct ChunkFailure {
    /// Zero-based chunk index within the flush.
    pub chunk: usize,
    /// Unsent messages in push order.
    pub messages: Vec<Message>,
    pub cause: FailureCause,
}

/// Owned handle to a detached flush.
///
/// Dropping it leaves the send running unobserved.
#[must_use = "dropping the handle detaches the flush"]
#[derive(Debug)]
pub struct FlushHandle {
    queue: String,
    task: JoinHandle<Result<FlushSummary>>,
}

impl FlushHandle {
    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the background send and return its outcome.
    pub async fn wait(self) -> Result<FlushSummary> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(Error::Detached {
                queue: self.queue,
                message: e.to_string(),
            }),
        }
    }
}

/// Buffers messages for one destination and sends them in chunks of at most
/// [`MAX_BATCH_SIZE`].
pub struct MessageQueue {
    name: String,
    url: String,
    transport: Arc<dyn QueueTransport>,
    buffer: Vec<Pending>,
}

impl std::fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueue")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

impl MessageQueue {
    /// An empty `url` makes the queue unbound: pushes are accepted but
    /// flushing fails with [`Error::UnboundQueue`].
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        transport: Arc<dyn QueueTransport>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            transport,
            buffer: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_bound(&self) -> bool {
        !self.url.is_empty()
    }

    pub fn is_fifo(&self) -> bool {
        is_fifo(&self.url)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Buffered messages in push order.
    pub fn pending(&self) -> impl Iterator<Item = &Message> {
        self.buffer.iter().map(|p| &p.message)
    }

    pub fn push(&mut self, message: Message) {
        self.push_with(message, PushOptions::default());
    }

    pub fn push_with(&mut self, message: Message, options: PushOptions) {
        debug!(queue = %self.name, message = %message.name(), "buffered message");
        self.buffer.push(Pending { message, options });

        #[cfg(feature = "metrics")]
        {
            counter!(queue_metrics::MESSAGES_PUSHED_TOTAL, labels::QUEUE => self.name.clone())
                .increment(1);
            gauge!(queue_metrics::BUFFERED_MESSAGES, labels::QUEUE => self.name.clone())
                .set(self.buffer.len() as f64);
        }
    }

    /// Send every buffered message, one chunk at a time, awaiting each
    /// acknowledgement before the next chunk.
    ///
    /// Messages leave the buffer only once their chunk is acknowledged, so a
    /// flush future dropped mid-send keeps everything not yet accepted.
    /// Unsent messages stay buffered in their original order and the flush
    /// returns [`Error::PartialFlush`]. A failing chunk does not stop later
    /// chunks.
    pub async fn flush(&mut self) -> Result<FlushSummary> {
        self.ensure_bound()?;
        if self.buffer.is_empty() {
            return Ok(self.empty_summary());
        }

        let fifo = self.is_fifo();
        let mut progress = FlushProgress::new();
        let mut offset = 0;
        let mut chunk_index = 0;

        while offset < self.buffer.len() {
            let end = (offset + MAX_BATCH_SIZE).min(self.buffer.len());
            let unsent = send_chunk(
                &self.name,
                &self.url,
                self.transport.as_ref(),
                fifo,
                chunk_index,
                &self.buffer[offset..end],
                &mut progress,
            )
            .await;

            let mut position = 0;
            self.buffer.retain(|_| {
                let keep = position < offset
                    || position >= end
                    || unsent.contains(&(position - offset));
                position += 1;
                keep
            });
            offset += unsent.len();
            chunk_index += 1;
        }

        #[cfg(feature = "metrics")]
        gauge!(queue_metrics::BUFFERED_MESSAGES, labels::QUEUE => self.name.clone())
            .set(self.buffer.len() as f64);

        progress.finish(&self.name, self.buffer.len())
    }

    /// Drain the buffer into a background task and return immediately.
    ///
    /// Must be called within a Tokio runtime. Failed messages are reported
    /// through the handle's [`ChunkFailure`]s instead of being re-buffered.
    pub fn flush_detached(&mut self) -> Result<FlushHandle> {
        self.ensure_bound()?;

        let pending = std::mem::take(&mut self.buffer);
        let name = self.name.clone();
        let url = self.url.clone();
        let fifo = self.is_fifo();
        let transport = Arc::clone(&self.transport);
        debug!(queue = %name, count = pending.len(), "detaching flush");

        #[cfg(feature = "metrics")]
        gauge!(queue_metrics::BUFFERED_MESSAGES, labels::QUEUE => name.clone()).set(0.0);

        let task = tokio::spawn({
            let name = name.clone();
            async move {
                if pending.is_empty() {
                    return Ok(FlushSummary {
                        queue: name,
                        ..Default::default()
                    });
                }
                let mut progress = FlushProgress::new();
                let mut unsent = 0;
                for (chunk_index, chunk) in pending.chunks(MAX_BATCH_SIZE).enumerate() {
                    unsent += send_chunk(
                        &name,
                        &url,
                        transport.as_ref(),
                        fifo,
                        chunk_index,
                        chunk,
                        &mut progress,
                    )
                    .await
                    .len();
                }
                progress.finish(&name, unsent)
            }
        });

        Ok(FlushHandle { queue: name, task })
    }

    fn ensure_bound(&self) -> Result<()> {
        if self.is_bound() {
            Ok(())
        } else {
            Err(Error::unbound_queue(&self.name))
        }
    }

    fn empty_summary(&self) -> FlushSummary {
        FlushSummary {
            queue: self.name.clone(),
            ..Default::default()
        }
    }
}

/// Running totals of one flush.
struct FlushProgress {
    started: Instant,
    batches: usize,
    sent: usize,
    failures: Vec<ChunkFailure>,
}

impl FlushProgress {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            batches: 0,
            sent: 0,
            failures: Vec::new(),
        }
    }

    fn record_failure<'a>(
        &mut self,
        chunk: usize,
        unsent: impl IntoIterator<Item = &'a Pending>,
        cause: FailureCause,
    ) {
        self.failures.push(ChunkFailure {
            chunk,
            messages: unsent.into_iter().map(|p| p.message.clone()).collect(),
            cause,
        });
    }

    fn finish(self, name: &str, unsent: usize) -> Result<FlushSummary> {
        #[cfg(feature = "metrics")]
        {
            counter!(queue_metrics::MESSAGES_SENT_TOTAL, labels::QUEUE => name.to_string())
                .increment(self.sent as u64);
            counter!(queue_metrics::MESSAGES_FAILED_TOTAL, labels::QUEUE => name.to_string())
                .increment(unsent as u64);
            histogram!(queue_metrics::FLUSH_DURATION_SECONDS, labels::QUEUE => name.to_string())
                .record(self.started.elapsed().as_secs_f64());
        }

        let Self {
            started,
            batches,
            sent,
            failures,
        } = self;
        let elapsed_ms = started.elapsed().as_millis();
        if failures.is_empty() {
            info!(queue = %name, batches, sent, elapsed_ms, "flushed queue");
            Ok(FlushSummary {
                queue: name.to_string(),
                batches,
                sent,
            })
        } else {
            warn!(queue = %name, batches, sent, unsent, elapsed_ms, "partial flush");
            Err(Error::PartialFlush {
                queue: name.to_string(),
                sent,
                unsent,
                failures,
            })
        }
    }
}

/// Send one chunk and return the in-chunk positions that were not accepted,
/// in ascending order.
async fn send_chunk(
    name: &str,
    url: &str,
    transport: &dyn QueueTransport,
    fifo: bool,
    chunk_index: usize,
    chunk: &[Pending],
    progress: &mut FlushProgress,
) -> Vec<usize> {
    let entries = match chunk
        .iter()
        .enumerate()
        .map(|(i, p)| encode_entry(i, &p.message, &p.options, fifo))
        .collect::<serde_json::Result<Vec<_>>>()
    {
        Ok(entries) => entries,
        Err(e) => {
            warn!(queue = %name, chunk = chunk_index, error = %e, "failed to encode chunk");
            progress.record_failure(chunk_index, chunk, FailureCause::Encode(e));
            return (0..chunk.len()).collect();
        },
    };

    progress.batches += 1;
    #[cfg(feature = "metrics")]
    counter!(queue_metrics::BATCHES_SENT_TOTAL, labels::QUEUE => name.to_string()).increment(1);

    match transport.send_batch(url, entries).await {
        Ok(ack) if ack.is_complete() => {
            debug!(queue = %name, chunk = chunk_index, count = chunk.len(), "chunk acknowledged");
            progress.sent += chunk.len();
            Vec::new()
        },
        Ok(ack) => {
            let (refused, unknown): (Vec<FailedEntry>, Vec<FailedEntry>) = ack
                .failed
                .into_iter()
                .partition(|f| resolve_entry(&f.id, chunk.len()).is_some());
            if !unknown.is_empty() {
                let ids: Vec<&str> = unknown.iter().map(|f| f.id.as_str()).collect();
                warn!(queue = %name, chunk = chunk_index, ?ids, "provider refused unknown entry ids");
            }

            let mut positions: Vec<usize> = refused
                .iter()
                .filter_map(|f| resolve_entry(&f.id, chunk.len()))
                .collect();
            positions.sort_unstable();
            positions.dedup();

            progress.sent += chunk.len() - positions.len();
            if positions.is_empty() {
                debug!(queue = %name, chunk = chunk_index, count = chunk.len(), "chunk acknowledged");
                return positions;
            }

            warn!(
                queue = %name,
                chunk = chunk_index,
                refused = positions.len(),
                "provider refused entries"
            );
            let unsent = positions.iter().map(|&i| &chunk[i]);
            progress.record_failure(chunk_index, unsent, FailureCause::Entries(refused));
            positions
        },
        Err(e) => {
            warn!(queue = %name, chunk = chunk_index, error = %e, "batch call failed");
            #[cfg(feature = "metrics")]
            counter!(queue_metrics::BATCH_ERRORS_TOTAL, labels::QUEUE => name.to_string())
                .increment(1);
            progress.record_failure(chunk_index, chunk, FailureCause::Transport(e));
            (0..chunk.len()).collect()
        },
    }
}

/// Map a provider-echoed entry id back to its position in the chunk.
fn resolve_entry(id: &str, chunk_len: usize) -> Option<usize> {
    id.parse::<usize>().ok().filter(|&i| i < chunk_len)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use {
        super::*,
        crate::{BatchAck, BatchEntry, Delay, InMemoryTransport},
        async_trait::async_trait,
        rstest::rstest,
        serde_json::json,
    };

    /// Acknowledges the first `acked` calls, then never answers.
    struct StallingTransport {
        acked: usize,
        calls: AtomicUsize,
    }

    impl StallingTransport {
        fn after(acked: usize) -> Arc<Self> {
            Arc::new(Self {
                acked,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QueueTransport for StallingTransport {
        async fn send_batch(
            &self,
            _queue_url: &str,
            _entries: Vec<BatchEntry>,
        ) -> std::result::Result<BatchAck, TransportError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.acked {
                return Ok(BatchAck::ok());
            }
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(BatchAck::ok())
        }
    }

    const STANDARD_URL: &str = "https://sqs.us-east-1.amazonaws.com/123/default";
    const FIFO_URL: &str = "https://sqs.us-east-1.amazonaws.com/123/reports.fifo";

    fn queue(url: &str) -> (MessageQueue, Arc<InMemoryTransport>) {
        let transport = Arc::new(InMemoryTransport::new());
        let queue = MessageQueue::new("default", url, transport.clone());
        (queue, transport)
    }

    fn push_numbered(queue: &mut MessageQueue, count: usize) {
        for i in 0..count {
            queue.push(Message::named(format!("m{i}")));
        }
    }

    fn names(messages: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
        messages.into_iter().map(|m| m.as_ref().to_string()).collect()
    }

    #[rstest]
    #[case(1, 1)]
    #[case(9, 1)]
    #[case(10, 1)]
    #[case(11, 2)]
    #[case(25, 3)]
    #[tokio::test]
    async fn flush_issues_ceil_n_over_ten_batches(#[case] count: usize, #[case] calls: usize) {
        let (mut queue, transport) = queue(STANDARD_URL);
        push_numbered(&mut queue, count);

        let summary = queue.flush().await.unwrap();
        assert_eq!(summary.batches, calls);
        assert_eq!(summary.sent, count);
        assert!(queue.is_empty());

        let recorded = transport.calls();
        assert_eq!(recorded.len(), calls);
        for call in &recorded {
            assert!(call.entries.len() <= MAX_BATCH_SIZE);
            assert_eq!(call.queue_url, STANDARD_URL);
            let ids: Vec<_> = call.entries.iter().map(|e| e.id).collect();
            let expected: Vec<_> = (0..call.entries.len()).collect();
            assert_eq!(ids, expected);
        }

        let sent_names = names(transport.entries().iter().map(|e| e.name.as_str()));
        let pushed_names = names((0..count).map(|i| format!("m{i}")));
        assert_eq!(sent_names, pushed_names);
    }

    #[tokio::test]
    async fn empty_flush_makes_no_call() {
        let (mut queue, transport) = queue(STANDARD_URL);
        let summary = queue.flush().await.unwrap();
        assert_eq!(summary.batches, 0);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn second_flush_sends_nothing_new() {
        let (mut queue, transport) = queue(STANDARD_URL);
        queue.push(Message::named("once"));
        queue.flush().await.unwrap();
        queue.flush().await.unwrap();
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn standard_queue_wire_entry() {
        let (mut queue, transport) = queue(STANDARD_URL);
        let payload = json!({"id": 1}).as_object().cloned().unwrap();
        queue.push(Message::new("user.created", payload));
        queue.flush().await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        let wire = serde_json::to_value(&calls[0].entries).unwrap();
        assert_eq!(
            wire,
            json!([{
                "id": 0,
                "body": r#"{"name":"user.created","payload":{"id":1}}"#,
                "name": "user.created",
                "delaySeconds": 0
            }])
        );
    }

    #[tokio::test]
    async fn fifo_queue_sends_group_and_never_delay() {
        let (mut queue, transport) = queue(FIFO_URL);
        assert!(queue.is_fifo());
        queue.push(Message::named("a").with_delay(Delay::new(30).unwrap()));
        queue.push_with(
            Message::named("b").with_group_id("tenant-1"),
            PushOptions::delayed(Delay::new(60).unwrap()),
        );
        queue.flush().await.unwrap();

        let entries = transport.entries();
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert!(entry.delay_seconds.is_none());
            assert!(!entry.group_id.as_deref().unwrap_or_default().is_empty());
        }
        assert_eq!(entries[1].group_id.as_deref(), Some("tenant-1"));
    }

    #[tokio::test]
    async fn failed_chunk_stays_buffered_and_later_chunks_still_go() {
        let (mut queue, transport) = queue(STANDARD_URL);
        push_numbered(&mut queue, 25);
        transport.succeed_next_call();
        transport.fail_next_call("throttled");

        let err = queue.flush().await.unwrap_err();
        let Error::PartialFlush {
            sent,
            unsent,
            ref failures,
            ..
        } = err
        else {
            panic!("expected partial flush, got {err}");
        };
        assert_eq!(sent, 15);
        assert_eq!(unsent, 10);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].chunk, 1);
        assert!(matches!(failures[0].cause, FailureCause::Transport(_)));
        assert_eq!(transport.call_count(), 3);

        let kept = names(queue.pending().map(Message::name));
        assert_eq!(kept, names((10..20).map(|i| format!("m{i}"))));

        queue.flush().await.unwrap();
        assert!(queue.is_empty());
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test]
    async fn refused_entries_are_rebuffered_in_order() {
        let (mut queue, transport) = queue(STANDARD_URL);
        push_numbered(&mut queue, 5);
        transport.fail_next_entries(["3", "1"]);

        let err = queue.flush().await.unwrap_err();
        assert_eq!(err.chunk_failures().len(), 1);
        assert!(matches!(
            err.chunk_failures()[0].cause,
            FailureCause::Entries(ref failed) if failed.len() == 2
        ));
        assert_eq!(names(queue.pending().map(Message::name)), ["m1", "m3"]);
    }

    #[tokio::test]
    async fn unbound_queue_fails_before_any_call() {
        let (mut queue, transport) = queue("");
        queue.push(Message::named("a"));

        let err = queue.flush().await.unwrap_err();
        assert!(matches!(err, Error::UnboundQueue { ref queue } if queue == "default"));
        assert_eq!(queue.len(), 1);
        assert_eq!(transport.call_count(), 0);

        assert!(matches!(
            queue.flush_detached().unwrap_err(),
            Error::UnboundQueue { .. }
        ));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn detached_flush_drains_immediately() {
        let (mut queue, transport) = queue(STANDARD_URL);
        push_numbered(&mut queue, 12);

        let handle = queue.flush_detached().unwrap();
        assert!(queue.is_empty());
        assert_eq!(handle.queue(), "default");

        let summary = handle.wait().await.unwrap();
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.sent, 12);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn detached_failure_returns_unsent_messages() {
        let (mut queue, transport) = queue(STANDARD_URL);
        push_numbered(&mut queue, 3);
        transport.fail_next_call("down");

        let err = queue.flush_detached().unwrap().wait().await.unwrap_err();
        let failures = err.chunk_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(names(failures[0].messages.iter().map(Message::name)), ["m0", "m1", "m2"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn cancelled_flush_keeps_every_unacknowledged_message() {
        let transport = StallingTransport::after(0);
        let mut queue = MessageQueue::new("default", STANDARD_URL, transport.clone());
        push_numbered(&mut queue, 25);

        let timed_out = tokio::time::timeout(Duration::from_millis(20), queue.flush()).await;
        assert!(timed_out.is_err());
        assert_eq!(queue.len(), 25);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_flush_drops_only_acknowledged_chunks() {
        let transport = StallingTransport::after(1);
        let mut queue = MessageQueue::new("default", STANDARD_URL, transport);
        push_numbered(&mut queue, 25);

        let timed_out = tokio::time::timeout(Duration::from_millis(20), queue.flush()).await;
        assert!(timed_out.is_err());
        assert_eq!(
            names(queue.pending().map(Message::name)),
            names((10..25).map(|i| format!("m{i}")))
        );
    }

    #[tokio::test]
    async fn unknown_refused_ids_are_ignored() {
        let (mut queue, transport) = queue(STANDARD_URL);
        push_numbered(&mut queue, 5);
        transport.fail_next_entries(["entry-x", "42"]);

        let summary = queue.flush().await.unwrap();
        assert_eq!(summary.sent, 5);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn refused_failure_lists_only_resolved_entries() {
        let (mut queue, transport) = queue(STANDARD_URL);
        push_numbered(&mut queue, 5);
        transport.fail_next_entries(["2", "42", "2"]);

        let err = queue.flush().await.unwrap_err();
        let Error::PartialFlush {
            sent,
            unsent,
            ref failures,
            ..
        } = err
        else {
            panic!("expected partial flush, got {err}");
        };
        assert_eq!((sent, unsent), (4, 1));
        assert_eq!(names(failures[0].messages.iter().map(Message::name)), ["m2"]);
        assert!(matches!(
            failures[0].cause,
            FailureCause::Entries(ref refused) if refused.iter().all(|f| f.id == "2")
        ));
        assert_eq!(names(queue.pending().map(Message::name)), ["m2"]);
    }
}
