// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bondruck Core — domain types, the unified error taxonomy, and the
// configuration surface shared by every crate in the workspace.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, PrinterDefaults};
pub use error::{BondruckError, ErrorClass, Result, classify};
pub use types::{Endpoint, JobId, PrintJob, TransportKind};
