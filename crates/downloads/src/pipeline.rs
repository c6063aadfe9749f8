//! Serialized download queue
//!
//! One worker drains a FIFO of jobs, so at most one transcode runs at a time.
//! Producers never block: the queue is an unbounded channel and `enqueue`
//! returns as soon as the job is handed over.

use async_trait::async_trait;
use station_core::{ControlError, ControlResult, DownloadJob, DownloadStatus};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// Progress text while nothing is downloading
pub const IDLE_PROGRESS: &str = "All downloads complete";

/// Progress text between dequeue and the first progress report
pub const STARTING_PROGRESS: &str = "Starting...";

/// One progress report from the downloader, already formatted by it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadProgress {
    pub percent: String,
    pub speed: String,
    pub eta: String,
    pub total: String,
}

impl fmt::Display for DownloadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | Speed: {} | ETA: {} | Size: {}",
            self.percent, self.speed, self.eta, self.total
        )
    }
}

/// Handle on the single shared progress string
#[derive(Clone)]
pub struct ProgressReporter {
    current: Arc<Mutex<String>>,
}

impl ProgressReporter {
    pub(crate) fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(IDLE_PROGRESS.to_string())),
        }
    }

    pub fn report(&self, progress: &DownloadProgress) {
        self.set(progress.to_string());
    }

    pub fn get(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set(&self, value: impl Into<String>) {
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = value.into();
    }
}

/// Fetches and transcodes the audio behind one url
#[async_trait]
pub trait AudioFetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &str, progress: &ProgressReporter) -> anyhow::Result<()>;
}

enum QueueMessage {
    Job(DownloadJob),
    Shutdown,
}

pub struct DownloadPipeline {
    sender: mpsc::UnboundedSender<QueueMessage>,
    progress: ProgressReporter,
    /// Jobs queued or running
    pending: Arc<AtomicUsize>,
    drained: Arc<Notify>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl DownloadPipeline {
    /// Spawn the worker; must be called inside a tokio runtime
    pub fn start(fetcher: Arc<dyn AudioFetcher>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let progress = ProgressReporter::new();
        let pending = Arc::new(AtomicUsize::new(0));
        let drained = Arc::new(Notify::new());

        let worker = tokio::spawn(run_worker(
            receiver,
            fetcher,
            progress.clone(),
            pending.clone(),
            drained.clone(),
        ));

        Self {
            sender,
            progress,
            pending,
            drained,
            worker: tokio::sync::Mutex::new(Some(worker)),
        }
    }

    pub fn enqueue(&self, url: impl Into<String>) -> ControlResult<()> {
        let job = DownloadJob::new(url);
        let url = job.url.clone();

        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(QueueMessage::Job(job)).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(ControlError::backend("download worker has stopped"));
        }

        tracing::info!("Queued download: {}", url);
        Ok(())
    }

    pub fn progress(&self) -> String {
        self.progress.get()
    }

    /// Number of jobs queued or in flight
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Resolve once every job enqueued so far has finished or failed
    pub async fn wait_until_done(&self) {
        loop {
            let drained = self.drained.notified();
            if self.pending() == 0 {
                return;
            }
            drained.await;
        }
    }

    /// Stop the worker after it has drained the jobs already queued
    pub async fn shutdown(&self) {
        let Some(worker) = self.worker.lock().await.take() else {
            return;
        };

        if self.sender.send(QueueMessage::Shutdown).is_err() {
            tracing::debug!("Download worker already gone");
        }
        if let Err(e) = worker.await {
            tracing::error!("Download worker ended abnormally: {}", e);
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<QueueMessage>,
    fetcher: Arc<dyn AudioFetcher>,
    progress: ProgressReporter,
    pending: Arc<AtomicUsize>,
    drained: Arc<Notify>,
) {
    tracing::debug!("Download worker started");

    while let Some(message) = receiver.recv().await {
        let mut job = match message {
            QueueMessage::Job(job) => job,
            QueueMessage::Shutdown => break,
        };

        tracing::info!("Starting download: {}", job.url);
        job.status = DownloadStatus::Running;
        progress.set(STARTING_PROGRESS);

        // Run the job on its own task so a panicking fetcher cannot take the queue down
        let task = {
            let fetcher = fetcher.clone();
            let progress = progress.clone();
            let url = job.url.clone();
            tokio::spawn(async move { fetcher.fetch(&url, &progress).await })
        };

        job.status = match task.await {
            Ok(Ok(())) => DownloadStatus::Finished,
            Ok(Err(e)) => {
                tracing::error!("Download failed for {}: {:#}", job.url, e);
                DownloadStatus::Failed
            }
            Err(e) => {
                tracing::error!("Download task for {} aborted: {}", job.url, e);
                DownloadStatus::Failed
            }
        };
        tracing::info!("Download {} ended as {:?}", job.url, job.status);

        progress.set(IDLE_PROGRESS);
        if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            drained.notify_waiters();
        }
    }

    tracing::info!("Download worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_format() {
        let progress = DownloadProgress {
            percent: "42.0%".to_string(),
            speed: "1.21MiB/s".to_string(),
            eta: "00:07".to_string(),
            total: "8.50MiB".to_string(),
        };
        assert_eq!(
            progress.to_string(),
            "42.0% | Speed: 1.21MiB/s | ETA: 00:07 | Size: 8.50MiB"
        );
    }

    #[test]
    fn test_reporter_starts_idle() {
        let reporter = ProgressReporter::new();
        assert_eq!(reporter.get(), IDLE_PROGRESS);
        reporter.set(STARTING_PROGRESS);
        assert_eq!(reporter.clone().get(), STARTING_PROGRESS);
    }
}
