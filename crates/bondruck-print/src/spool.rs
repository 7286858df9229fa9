// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-worker FIFO spooler.
//
// The queue is a channel: enqueue appends to the tail and never blocks
// or fails; the worker task is the only consumer, so at most one job is
// ever in flight and the busy/idle state machine is simply whether
// `recv` is awaiting. Retries re-enter at the tail, behind any jobs
// that arrived in the meantime. A dequeued job always runs to a
// terminal disposition; there is no cancellation.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use bondruck_audit::AuditLog;
use bondruck_core::PrintJob;

use crate::executor::{ExecuteJob, Outcome};
use crate::retry::{Disposition, RETRY_BUDGET, decide};

/// Cloneable handle for submitting jobs to the spooler.
#[derive(Clone)]
pub struct SpoolHandle {
    tx: mpsc::UnboundedSender<PrintJob>,
}

impl SpoolHandle {
    /// Append a job to the tail of the queue. Never blocks; a send
    /// after worker shutdown is dropped with a warning.
    pub fn enqueue(&self, job: PrintJob) {
        if self.tx.send(job).is_err() {
            warn!("spooler worker is gone; job dropped");
        }
    }

    /// A handle wired to a bare channel, with the receiving end handed
    /// back to the caller. Useful for tests and custom workers.
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<PrintJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

pub struct Spooler;

impl Spooler {
    /// Spawn the worker task and return the enqueue handle alongside
    /// the worker's join handle.
    pub fn spawn(
        executor: Arc<dyn ExecuteJob>,
        audit: Arc<AuditLog>,
    ) -> (SpoolHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SpoolHandle { tx: tx.clone() };
        let worker = tokio::spawn(run_worker(rx, tx, executor, audit));
        (handle, worker)
    }
}

/// Worker loop: idle until a job arrives, then run it to completion
/// before looking at the queue again.
async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<PrintJob>,
    tx: mpsc::UnboundedSender<PrintJob>,
    executor: Arc<dyn ExecuteJob>,
    audit: Arc<AuditLog>,
) {
    while let Some(mut job) = rx.recv().await {
        let outcome = attempt(executor.as_ref(), &job).await;
        match decide(&outcome, job.retry_count) {
            Disposition::Done => {
                info!(job_id = %job.id, "job completed");
            }
            Disposition::Rejected(reason) => {
                // The rejection itself was already audited by the
                // executor; nothing further to do with the job.
                info!(job_id = %job.id, %reason, "job rejected");
            }
            Disposition::Retry(next) => {
                job.retry_count = next;
                audit.record_visible(&format!("Retrying job ({next}/{RETRY_BUDGET})..."), true);
                // Tail, not head: fresh jobs already queued go first.
                let _ = tx.send(job);
            }
            Disposition::Exhausted => {
                audit.record_visible(
                    &format!(
                        "Retries exhausted for job {}; giving up after {RETRY_BUDGET} attempts.",
                        job.id
                    ),
                    true,
                );
            }
        }
        debug!(queued = rx.len(), "worker pass complete");
    }
}

/// Run one executor attempt, converting a panic into a retryable
/// outcome so the worker always returns to its loop.
#[instrument(skip_all, fields(job_id = %job.id))]
async fn attempt(executor: &dyn ExecuteJob, job: &PrintJob) -> Outcome {
    match AssertUnwindSafe(executor.execute(job)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!("executor panicked; treating as transient");
            Outcome::Retryable("unexpected executor failure".into())
        }
    }
}
