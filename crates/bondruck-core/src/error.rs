// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error type and the transient/permanent classification that
// drives the retry policy.

use thiserror::Error;

/// Top-level error type for all Bondruck operations.
#[derive(Debug, Error)]
pub enum BondruckError {
    // -- Job validation --
    #[error("missing content")]
    MissingContent,

    #[error("missing printer address")]
    MissingAddress,

    #[error("unsupported printer type: {0}")]
    UnsupportedTransport(String),

    #[error("invalid device selector: {0}")]
    InvalidSelector(String),

    // -- Transports --
    #[error("connection to {addr} timed out after {secs}s")]
    ConnectTimeout { addr: String, secs: u64 },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("USB error: {0}")]
    Usb(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    // -- Event channel --
    #[error("event channel error: {0}")]
    Channel(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    // -- Configuration --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BondruckError>;

/// How an error relates to the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Property of the environment at this instant; another attempt can
    /// succeed.
    Transient,
    /// Property of the job's own data or configuration; retrying cannot
    /// help.
    Permanent,
}

/// Classify an error for the retry decision.
///
/// Connectivity and device-state errors are transient. Anything that is
/// wrong with the job itself is permanent. Errors with no obvious class
/// lean transient, so a single unanticipated failure can never wedge
/// the worker on a job that would have printed on the next attempt.
pub fn classify(err: &BondruckError) -> ErrorClass {
    match err {
        BondruckError::MissingContent
        | BondruckError::MissingAddress
        | BondruckError::UnsupportedTransport(_)
        | BondruckError::InvalidSelector(_)
        | BondruckError::MalformedMessage(_)
        | BondruckError::Config(_)
        | BondruckError::Serialization(_) => ErrorClass::Permanent,

        BondruckError::ConnectTimeout { .. }
        | BondruckError::Connection(_)
        | BondruckError::Usb(_)
        | BondruckError::Channel(_)
        | BondruckError::Io(_) => ErrorClass::Transient,
    }
}
