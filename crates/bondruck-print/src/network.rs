// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP backend (JetDirect, port 9100).
//
// The simplest transport thermal printers speak: open a socket and dump
// bytes. No negotiation beyond the TCP handshake; the printer must
// interpret the byte stream natively.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use bondruck_core::{BondruckError, Result};

use crate::backend::PrinterBackend;
use crate::escpos;

pub struct NetworkBackend {
    addr: String,
    stream: Option<TcpStream>,
}

impl NetworkBackend {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            stream: None,
        }
    }

    /// The address this backend connects to.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl PrinterBackend for NetworkBackend {
    async fn open(&mut self, timeout: Duration) -> Result<()> {
        info!(addr = %self.addr, "connecting to network printer");
        let stream = tokio::time::timeout(timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| BondruckError::ConnectTimeout {
                addr: self.addr.clone(),
                secs: timeout.as_secs(),
            })?
            .map_err(|e| BondruckError::Connection(format!("{}: {e}", self.addr)))?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| BondruckError::Connection("not connected".into()))?;
        stream.write_all(data).await?;
        stream.flush().await?;
        debug!(addr = %self.addr, bytes = data.len(), "bytes sent");
        Ok(())
    }

    async fn cut(&mut self) -> Result<()> {
        self.write(&escpos::cut_feed(escpos::CUT_FEED_LINES)).await
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            // Give the printer a clean EOF; failures here are moot.
            let _ = stream.shutdown().await;
        }
    }
}
