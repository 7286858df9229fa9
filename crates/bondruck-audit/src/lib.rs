// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Append-only audit trail for the print pipeline.
//
// Every component records what it did as a timestamped line in a plain
// text file, one line per entry, never truncated or reordered. A fixed
// marker list decides which entries are also forwarded to live
// observers; the rest is diagnostic chatter that stays on disk only.
// Failing to write the file is itself non-fatal: the failure goes to
// the tracing output and job execution carries on.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::error;

/// Name of the log file inside the audit directory.
const LOG_FILE: &str = "logs.txt";

/// Capacity of the live observer channel. A slow observer misses
/// entries rather than blocking the pipeline.
const LIVE_CAPACITY: usize = 256;

/// Phrases that mark an entry as interesting to a live observer:
/// success, failure, rejection, retries, connectivity changes, and
/// startup readiness. Matched case-insensitively against the message.
const SALIENT_MARKERS: &[&str] = &[
    "printed successfully",
    "printing content",
    "print request received",
    "failed",
    "rejected",
    "retrying",
    "exhausted",
    "connected",
    "connection error",
    "ready to receive",
];

/// A single entry in the audit trail, as seen by live observers.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub visible: bool,
}

/// Decide whether a message is surfaced to live observers when no
/// explicit override is given.
///
/// Pure and idempotent: the same message always classifies the same
/// way.
pub fn is_salient(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    SALIENT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Append-only audit log: a durable text file plus a live feed.
///
/// `record` is safe to call concurrently from ingestion and execution;
/// a mutex serializes the appends so lines land whole and in call
/// order.
pub struct AuditLog {
    dir: PathBuf,
    append_lock: Mutex<()>,
    live: broadcast::Sender<AuditEntry>,
}

impl AuditLog {
    /// Create an audit log writing to `<dir>/logs.txt`.
    ///
    /// The directory is created on the first append, not here, so a
    /// not-yet-existing data directory never prevents startup.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let (live, _) = broadcast::channel(LIVE_CAPACITY);
        Self {
            dir: dir.into(),
            append_lock: Mutex::new(()),
            live,
        }
    }

    /// Path of the log file this instance appends to.
    pub fn path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    /// Record an entry; visibility is decided by the marker
    /// classification.
    pub fn record(&self, message: &str) {
        self.append(message, None);
    }

    /// Record an entry with an explicit visibility override.
    pub fn record_visible(&self, message: &str, visible: bool) {
        self.append(message, Some(visible));
    }

    /// Subscribe to the live feed. Only observer-visible entries are
    /// forwarded; having no observers at all is fine.
    pub fn subscribe(&self) -> broadcast::Receiver<AuditEntry> {
        self.live.subscribe()
    }

    fn append(&self, message: &str, force_visible: Option<bool>) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            message: message.to_string(),
            visible: force_visible.unwrap_or_else(|| is_salient(message)),
        };
        let line = format!("[{}] {}\n", entry.timestamp.to_rfc3339(), entry.message);

        {
            let _guard = self
                .append_lock
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Err(e) = self.write_line(&line) {
                // The audit trail must never take the pipeline down
                // with it.
                error!(error = %e, path = %self.path().display(), "failed to append audit entry");
            }
        }

        if entry.visible {
            let _ = self.live.send(entry);
        }
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path())?;
        file.write_all(line.as_bytes())
    }
}
