// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retry policy: fixed budget, immediate re-enqueue, no backoff.
//
// The only throttle on retries is the serialized worker itself; a
// retried job goes to the tail of the queue, so jobs that arrived in
// the meantime print first.

use crate::executor::Outcome;

/// Maximum number of executor attempts per job.
pub const RETRY_BUDGET: u32 = 3;

/// What the spooler should do with a job after one executor attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Printed; drop the job.
    Done,
    /// Re-enqueue at the tail with this retry count.
    Retry(u32),
    /// Transient failures used up the whole budget; drop the job.
    Exhausted,
    /// The job itself is defective; drop it without retrying.
    Rejected(String),
}

/// Pure decision function consuming an execution outcome.
///
/// Attempts run at retry counts 0, 1, and 2; once the incremented count
/// reaches the budget the job is discarded, so `(1/3)` and `(2/3)` are
/// the only retry announcements a job can produce.
pub fn decide(outcome: &Outcome, retry_count: u32) -> Disposition {
    match outcome {
        Outcome::Success => Disposition::Done,
        Outcome::Terminal(reason) => Disposition::Rejected(reason.clone()),
        Outcome::Retryable(_) => {
            let next = retry_count.saturating_add(1);
            if next >= RETRY_BUDGET {
                Disposition::Exhausted
            } else {
                Disposition::Retry(next)
            }
        }
    }
}
