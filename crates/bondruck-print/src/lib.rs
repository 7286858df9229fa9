// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bondruck Print — the dispatch engine. Transport backends (raw TCP and
// USB), ESC/POS payload rendering, the job executor with its
// transient/terminal outcome classification, the retry policy, and the
// single-worker spooler that serializes access to the physical printer.

pub mod backend;
pub mod escpos;
pub mod executor;
pub mod network;
pub mod retry;
pub mod spool;
pub mod usb;

pub use backend::{BackendFactory, DefaultBackendFactory, PrinterBackend, PrinterTarget};
pub use executor::{CONNECT_TIMEOUT, ExecuteJob, Executor, Outcome};
pub use network::NetworkBackend;
pub use retry::{Disposition, RETRY_BUDGET, decide};
pub use spool::{SpoolHandle, Spooler};
pub use usb::UsbBackend;
