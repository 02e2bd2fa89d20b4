//! Background reconciliation task
//!
//! One thread per domain wakes up every `interval` and reconciles the domain
//! with its directory. Stopping is two-phased: a stop message first, then a
//! cancellation flag, each bounded by the shutdown timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::domain::{DomainHandle, DomainSyncOutcome};
use crate::error::{PapError, PapResult};

pub struct SyncTask {
    domain_id: String,
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SyncTask {
    pub fn spawn(domain: Weak<DomainHandle>, domain_id: &str, interval: Duration) -> PapResult<Self> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        let thread = {
            let cancelled = Arc::clone(&cancelled);
            let thread_domain_id = domain_id.to_string();
            thread::Builder::new()
                .name(format!("pap-sync-{domain_id}"))
                .spawn(move || {
                    run(&domain, &thread_domain_id, interval, &stop_rx, &cancelled);
                    let _ = done_tx.send(());
                })
                .map_err(|e| PapError::storage("spawn sync thread for", domain_id, e))?
        };

        tracing::info!(domain_id, interval_secs = interval.as_secs(), "scheduled domain reconciliation");
        Ok(Self {
            domain_id: domain_id.to_string(),
            stop_tx,
            done_rx,
            cancelled,
            thread: Some(thread),
        })
    }

    /// Stop the task, waiting at most `timeout` per phase
    ///
    /// Returns whether the thread terminated. Called from the task's own
    /// thread it only signals.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        let Some(thread) = self.thread.take() else {
            return true;
        };
        let _ = self.stop_tx.send(());

        if thread.thread().id() == thread::current().id() {
            self.cancelled.store(true, Ordering::SeqCst);
            return true;
        }

        if !self.wait_done(timeout) {
            self.cancelled.store(true, Ordering::SeqCst);
            if !self.wait_done(timeout) {
                tracing::error!(
                    domain_id = %self.domain_id,
                    timeout_secs = timeout.as_secs(),
                    "domain sync task did not terminate"
                );
                return false;
            }
        }

        if thread.join().is_err() {
            tracing::error!(domain_id = %self.domain_id, "domain sync task panicked");
        }
        true
    }

    fn wait_done(&self, timeout: Duration) -> bool {
        !matches!(self.done_rx.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
    }
}

impl Drop for SyncTask {
    fn drop(&mut self) {
        // signal only: never block in drop
        if self.thread.is_some() {
            self.cancelled.store(true, Ordering::SeqCst);
            let _ = self.stop_tx.send(());
        }
    }
}

fn run(
    domain: &Weak<DomainHandle>,
    domain_id: &str,
    interval: Duration,
    stop_rx: &Receiver<()>,
    cancelled: &AtomicBool,
) {
    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        let Some(domain) = domain.upgrade() else {
            break;
        };

        tracing::debug!(domain_id, "synchronizing domain with directory");
        match domain.reconcile() {
            Ok(DomainSyncOutcome::Removed) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::error!(domain_id, error = %e, "error synchronizing domain with directory");
            }
        }
    }
    tracing::debug!(domain_id, "domain sync task stopped");
}
