// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration, read once at startup.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BondruckError, Result};

/// Printer used when a job does not name a transport or endpoint.
///
/// The transport is kept as a raw tag so a misconfigured value surfaces
/// as a per-job "unsupported printer type" failure instead of a parse
/// error at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterDefaults {
    pub transport: String,
    pub host: String,
    pub port: u16,
}

impl Default for PrinterDefaults {
    fn default() -> Self {
        Self {
            transport: "network".into(),
            host: "192.168.0.100".into(),
            port: 9100,
        }
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application key for the pub/sub provider.
    #[serde(default)]
    pub app_key: String,
    /// Provider cluster, e.g. "ap2".
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub printer: PrinterDefaults,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_key: String::new(),
            cluster: String::new(),
            printer: PrinterDefaults::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file, then apply environment
    /// overrides (`BONDRUCK_APP_KEY`, `BONDRUCK_CLUSTER`,
    /// `BONDRUCK_PRINTER_TRANSPORT`, `BONDRUCK_PRINTER_HOST`,
    /// `BONDRUCK_PRINTER_PORT`). A missing file is fine; missing
    /// credentials after both sources are not, because the daemon
    /// cannot subscribe without them.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        } else {
            Self::default()
        };
        config.apply_env();

        if config.app_key.is_empty() || config.cluster.is_empty() {
            return Err(BondruckError::Config(format!(
                "app_key and cluster must be set ({} or BONDRUCK_APP_KEY / BONDRUCK_CLUSTER)",
                path.display()
            )));
        }
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("BONDRUCK_APP_KEY") {
            self.app_key = v;
        }
        if let Ok(v) = std::env::var("BONDRUCK_CLUSTER") {
            self.cluster = v;
        }
        if let Ok(v) = std::env::var("BONDRUCK_PRINTER_TRANSPORT") {
            self.printer.transport = v;
        }
        if let Ok(v) = std::env::var("BONDRUCK_PRINTER_HOST") {
            self.printer.host = v;
        }
        if let Ok(v) = std::env::var("BONDRUCK_PRINTER_PORT")
            && let Ok(port) = v.parse()
        {
            self.printer.port = port;
        }
    }
}
