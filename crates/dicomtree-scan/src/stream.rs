//! Streaming scan: walker and sniffer on a blocking task, records pulled
//! by the consumer through a bounded channel.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use dicomtree_core::{DicomRecord, ScanConfig, ScanError, ScanWarning};

use crate::progress::{ProgressTracker, ScanProgress};
use crate::sniffer::{SniffOutcome, sniff_entry};
use crate::walker::DirectoryWalker;

/// Starts streaming scans and publishes their progress.
pub struct DicomScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl DicomScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Start scanning `config.roots`.
    ///
    /// Must be called from within a tokio runtime. The producer runs on a
    /// blocking thread and stops when the channel is full until the
    /// consumer pulls again, when the returned stream is cancelled or
    /// dropped, or when every reachable file has been visited.
    pub fn scan(&self, config: ScanConfig) -> Result<ScanStream, ScanError> {
        let walker = DirectoryWalker::with_threads(config.threads)?;
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        let progress_tx = self.progress_tx.clone();
        let producer =
            tokio::task::spawn_blocking(move || produce(&walker, &config, &tx, &token, &progress_tx));

        Ok(ScanStream {
            records: ReceiverStream::new(rx),
            cancel,
            producer: Some(producer),
        })
    }
}

impl Default for DicomScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn produce(
    walker: &DirectoryWalker,
    config: &ScanConfig,
    tx: &mpsc::Sender<DicomRecord>,
    cancel: &CancellationToken,
    progress_tx: &broadcast::Sender<ScanProgress>,
) -> ScanProgress {
    let mut tracker = ProgressTracker::new();
    info!(roots = config.roots.len(), deep = config.deep, "scan started");
    if config.deep {
        debug!("deep flag is reserved; traversal is fully recursive either way");
    }

    let mut walk = walker.walk(&config.roots).with_cancel(cancel.clone());
    for entry in walk.by_ref() {
        if cancel.is_cancelled() || tx.is_closed() {
            tracker.mark_cancelled();
            break;
        }
        tracker.record_file(&entry.path);

        match sniff_entry(&entry) {
            SniffOutcome::Included(record) => {
                // Blocks while the channel is full; fails once the consumer is gone.
                if tx.blocking_send(record).is_err() {
                    tracker.mark_cancelled();
                    break;
                }
                tracker.record_emitted();
            }
            SniffOutcome::Excluded(reason) => {
                trace!(path = %entry.path, %reason, "excluded");
                tracker.record_excluded();
            }
            SniffOutcome::Failed(reason) => {
                warn!(path = %entry.path, %reason, "cannot parse");
                tracker.record_failed(ScanWarning::parse_error(&entry.path, &reason));
            }
        }

        if tracker.files_visited() % config.progress_interval.max(1) == 0 {
            let _ = progress_tx.send(tracker.snapshot());
        }
    }

    if walk.is_interrupted() {
        tracker.mark_cancelled();
    }
    tracker.set_dirs_visited(walk.dirs_visited());
    tracker.record_warnings(walk.take_warnings());
    let progress = tracker.finish();
    let _ = progress_tx.send(progress.clone());

    info!(
        files = progress.files_visited,
        records = progress.records_emitted,
        failed = progress.files_failed,
        cancelled = progress.cancelled,
        elapsed_ms = progress.elapsed.as_millis() as u64,
        "scan finished"
    );
    progress
}

/// Consumer side of a running scan.
///
/// Records arrive in discovery order. Dropping the stream cancels the
/// scan; records already received stay valid.
pub struct ScanStream {
    records: ReceiverStream<DicomRecord>,
    cancel: CancellationToken,
    producer: Option<JoinHandle<ScanProgress>>,
}

impl ScanStream {
    /// Pull the next record; `None` once the scan is complete or cancelled
    /// and the buffer is drained.
    pub async fn recv(&mut self) -> Option<DicomRecord> {
        self.records.next().await
    }

    /// Stop the scan. The producer observes this before its next file.
    ///
    /// Records already buffered can still be drained with [`recv`](Self::recv).
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.records.close();
    }

    /// Token that cancels this scan when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Close the stream and wait for the producer to stop.
    ///
    /// Undelivered records are discarded, so drain the stream first to
    /// get a complete scan.
    pub async fn finish(mut self) -> Result<ScanProgress, ScanError> {
        self.cancel.cancel();
        self.records.close();
        let producer = self.producer.take().ok_or_else(|| ScanError::Other {
            message: "scan already finished".to_string(),
        })?;
        producer.await.map_err(|e| ScanError::Other {
            message: e.to_string(),
        })
    }

    /// Drain every record, then wait for the producer.
    pub async fn collect_all(mut self) -> Result<(Vec<DicomRecord>, ScanProgress), ScanError> {
        let mut records = Vec::new();
        while let Some(record) = self.recv().await {
            records.push(record);
        }
        let progress = self.finish().await?;
        Ok((records, progress))
    }
}

impl Stream for ScanStream {
    type Item = DicomRecord;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().records).poll_next(cx)
    }
}

impl Drop for ScanStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
