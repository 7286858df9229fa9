// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bondruck print daemon.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a print job, used for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport used to reach the physical printer.
///
/// A closed set: adding a transport means adding a variant and a backend,
/// not another string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    /// Raw TCP socket to the printer (JetDirect style).
    Network,
    /// Locally attached USB printer-class device.
    Usb,
}

impl TransportKind {
    /// Parse a wire tag. `lan` is accepted as a historical alias for
    /// network printers.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "network" | "lan" => Some(Self::Network),
            "usb" => Some(Self::Usb),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Usb => write!(f, "usb"),
        }
    }
}

/// Transport-specific printer addressing.
///
/// Network printers need `host` and `port` by print time (a configured
/// default may supply them). For USB, an absent `device` selector means
/// "first attached printer-class device".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub device: Option<String>,
}

/// One request to render text on the physical printer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: JobId,
    /// Text content to print. Required; jobs without content are
    /// rejected, never retried.
    pub payload: String,
    /// Raw transport tag from the wire. Resolved against the configured
    /// default when the job is executed, so an unknown tag fails the
    /// job rather than the message that carried it.
    pub transport: Option<String>,
    pub endpoint: Endpoint,
    /// Number of times this job has been re-enqueued after a transient
    /// failure. Monotonically non-decreasing across the job's lifetime.
    pub retry_count: u32,
}

impl PrintJob {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            payload: payload.into(),
            transport: None,
            endpoint: Endpoint::default(),
            retry_count: 0,
        }
    }

    pub fn with_transport(mut self, tag: impl Into<String>) -> Self {
        self.transport = Some(tag.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }
}
