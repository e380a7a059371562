//! Sequential batch decryption.
//!
//! ```text
//! Idle ──run──> Running ──all files ok──────> Completed
//!                  │ ──cancel at file boundary──> Cancelled
//!                  └──first file error──────────> Failed
//! ```
//! Files are processed strictly in order. Cancellation is checked before each
//! file; a file in progress always runs to completion.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use redexter_core::{BatchState, RedexterError, RedexterResult};
use redexter_crypto::{decrypt_file, DecryptSummary};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::job::DecryptionJob;

/// Terminal result of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed { files: usize },
    Cancelled { completed: usize },
    Failed { file: PathBuf, reason: String },
}

impl BatchOutcome {
    pub fn state(&self) -> BatchState {
        match self {
            Self::Completed { .. } => BatchState::Completed,
            Self::Cancelled { .. } => BatchState::Cancelled,
            Self::Failed { .. } => BatchState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Emitted by a running batch, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// A file finished; `percent` never decreases
    Progress {
        completed: usize,
        total: usize,
        percent: u8,
    },
    FileDone(DecryptSummary),
    /// Always the last event
    Finished(BatchOutcome),
}

/// Synchronous event callback, invoked on the worker thread
pub type EventFn = Box<dyn Fn(&BatchEvent) + Send + Sync>;

/// Rounded percentage of `completed` out of `total`; halves round up.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let (c, t) = (completed as u64, total as u64);
    ((200 * c + t) / (2 * t)).min(100) as u8
}

/// State shared between a batch and whoever started it.
#[derive(Debug)]
pub struct BatchStatus {
    progress: AtomicU8,
    state: Mutex<BatchState>,
}

impl BatchStatus {
    fn new() -> Self {
        Self {
            progress: AtomicU8::new(0),
            state: Mutex::new(BatchState::Idle),
        }
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Acquire)
    }

    pub fn state(&self) -> BatchState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(BatchState::Failed)
    }

    fn set_state(&self, next: BatchState) {
        if let Ok(mut state) = self.state.lock() {
            debug!(from = ?*state, to = ?next, "batch state");
            *state = next;
        }
    }
}

/// Runs one [`DecryptionJob`].
pub struct Orchestrator {
    job: DecryptionJob,
    status: Arc<BatchStatus>,
}

impl Orchestrator {
    pub fn new(job: DecryptionJob) -> Self {
        Self {
            job,
            status: Arc::new(BatchStatus::new()),
        }
    }

    pub fn status(&self) -> Arc<BatchStatus> {
        Arc::clone(&self.status)
    }

    /// Decrypt every file in order, stopping at the first failure or at a
    /// file boundary once `cancel` fires.
    pub fn run(self, cancel: &CancellationToken, on_event: Option<&EventFn>) -> BatchOutcome {
        let emit = |event: BatchEvent| {
            if let Some(cb) = on_event {
                cb(&event);
            }
        };

        let total = self.job.len();
        self.status.set_state(BatchState::Running);
        info!(files = total, dest = ?self.job.dest_dir(), "starting batch");

        let mut outcome = BatchOutcome::Completed { files: total };
        for (idx, file) in self.job.files().iter().enumerate() {
            if cancel.is_cancelled() {
                info!(completed = idx, total, "batch cancelled");
                outcome = BatchOutcome::Cancelled { completed: idx };
                break;
            }

            match decrypt_file(file, self.job.key(), self.job.dest_dir()) {
                Ok(summary) => {
                    emit(BatchEvent::FileDone(summary));
                    let pct = percent(idx + 1, total);
                    self.status.progress.fetch_max(pct, Ordering::AcqRel);
                    emit(BatchEvent::Progress {
                        completed: idx + 1,
                        total,
                        percent: pct,
                    });
                }
                Err(e) => {
                    warn!(
                        file = %file.display(),
                        file_format = e.is_file_format(),
                        "decryption failed: {e}"
                    );
                    outcome = BatchOutcome::Failed {
                        file: file.clone(),
                        reason: e.to_string(),
                    };
                    break;
                }
            }
        }

        self.status.set_state(outcome.state());
        emit(BatchEvent::Finished(outcome.clone()));
        outcome
    }
}

/// A batch running on its own worker thread.
pub struct BatchHandle {
    cancel: CancellationToken,
    status: Arc<BatchStatus>,
    worker: JoinHandle<BatchOutcome>,
    /// Every event of the batch, ending with [`BatchEvent::Finished`]
    pub events: mpsc::UnboundedReceiver<BatchEvent>,
}

impl BatchHandle {
    /// Request a stop at the next file boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn progress(&self) -> u8 {
        self.status.progress()
    }

    pub fn state(&self) -> BatchState {
        self.status.state()
    }

    /// Wait for the worker thread and return its outcome.
    pub fn join(self) -> RedexterResult<BatchOutcome> {
        self.worker
            .join()
            .map_err(|_| RedexterError::Other(anyhow::anyhow!("batch worker panicked")))
    }
}

/// Start `job` on a background thread.
///
/// `on_event`, when given, runs on the worker thread for every event before
/// it is queued on [`BatchHandle::events`].
pub fn spawn(job: DecryptionJob, on_event: Option<EventFn>) -> RedexterResult<BatchHandle> {
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let orchestrator = Orchestrator::new(job);
    let status = orchestrator.status();

    let token = cancel.clone();
    let forward: EventFn = Box::new(move |event: &BatchEvent| {
        if let Some(cb) = &on_event {
            cb(event);
        }
        // receiver dropped: nobody is listening
        let _ = tx.send(event.clone());
    });

    let worker = std::thread::Builder::new()
        .name("redexter-batch".into())
        .spawn(move || orchestrator.run(&token, Some(&forward)))?;

    Ok(BatchHandle {
        cancel,
        status,
        worker,
        events: rx,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_rounds_half_up() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(1, 8), 13); // 12.5
        assert_eq!(percent(1, 200), 1); // 0.5
        assert_eq!(percent(0, 5), 0);
    }

    #[test]
    fn test_percent_monotonic() {
        for total in 1..50 {
            let mut last = 0;
            for done in 1..=total {
                let p = percent(done, total);
                assert!(p >= last);
                last = p;
            }
            assert_eq!(last, 100);
        }
    }

    #[test]
    fn test_outcome_state() {
        assert_eq!(
            BatchOutcome::Completed { files: 1 }.state(),
            BatchState::Completed
        );
        assert_eq!(
            BatchOutcome::Cancelled { completed: 0 }.state(),
            BatchState::Cancelled
        );
        assert!(!BatchOutcome::Failed {
            file: PathBuf::from("x"),
            reason: "bad".into()
        }
        .is_success());
    }
}
