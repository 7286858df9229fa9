// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bondruck Ingest — subscribes to the pub/sub channel and turns each
// delivered print event into a validated job enqueue. Channel
// connectivity is logged but never drains or pauses the queue.

pub mod client;
pub mod protocol;

pub use client::Subscriber;
pub use protocol::{JobRequest, PRINT_CHANNEL, PRINT_EVENT, PusherFrame};
