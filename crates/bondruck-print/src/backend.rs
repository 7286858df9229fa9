// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport backends for reaching the physical printer.

use std::time::Duration;

use async_trait::async_trait;

use bondruck_core::Result;

use crate::network::NetworkBackend;
use crate::usb::UsbBackend;

/// Fully resolved printer address, produced by the executor once the
/// configured defaults have been applied and required fields checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrinterTarget {
    Network { host: String, port: u16 },
    Usb { selector: Option<String> },
}

impl std::fmt::Display for PrinterTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network { host, port } => write!(f, "network {host}:{port}"),
            Self::Usb { selector: Some(s) } => write!(f, "usb {s}"),
            Self::Usb { selector: None } => write!(f, "usb (first attached)"),
        }
    }
}

/// Capability contract shared by every printer transport.
///
/// `open` must either succeed within the timeout or report an error; it
/// must not hang. `close` must be safe to call at any point, including
/// after a failed `open`, so the executor can always attempt cleanup.
#[async_trait]
pub trait PrinterBackend: Send {
    /// Establish the connection within `timeout`.
    async fn open(&mut self, timeout: Duration) -> Result<()>;

    /// Send raw bytes to the printer.
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Feed and cut the receipt.
    async fn cut(&mut self) -> Result<()>;

    /// Release the connection. Best-effort and idempotent.
    async fn close(&mut self);
}

/// Where the executor gets its backends from. Production code uses
/// [`DefaultBackendFactory`]; tests substitute scripted fakes.
pub trait BackendFactory: Send + Sync {
    fn build(&self, target: &PrinterTarget) -> Box<dyn PrinterBackend>;
}

/// The closed set of real transports. Construction itself cannot fail;
/// a bad address surfaces when the backend is opened.
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn build(&self, target: &PrinterTarget) -> Box<dyn PrinterBackend> {
        match target {
            PrinterTarget::Network { host, port } => Box::new(NetworkBackend::new(host, *port)),
            PrinterTarget::Usb { selector } => Box::new(UsbBackend::new(selector.clone())),
        }
    }
}
