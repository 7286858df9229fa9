// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// WebSocket subscriber translating channel events into job enqueues.
//
// Runs for the process lifetime. Connection failures back off
// exponentially (capped) and the daemon keeps reconnecting for as long
// as it lives; an outage holds back new jobs but whatever is already
// queued keeps printing.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument};

use bondruck_audit::AuditLog;
use bondruck_core::{AppConfig, BondruckError, Result};
use bondruck_print::SpoolHandle;

use crate::protocol::{
    EVENT_ERROR, EVENT_ESTABLISHED, EVENT_PING, EVENT_SUBSCRIBED, JobRequest, PRINT_CHANNEL,
    PRINT_EVENT, PusherFrame, pong_frame, subscribe_frame,
};

/// Base delay between reconnection attempts.
const RECONNECT_BASE_DELAY_SECS: u64 = 2;

/// Ceiling on the reconnection delay.
const MAX_RECONNECT_DELAY_SECS: u64 = 60;

/// Subscriber connecting to the pub/sub cluster and feeding the
/// spooler.
pub struct Subscriber {
    url: String,
    audit: Arc<AuditLog>,
    spool: SpoolHandle,
}

impl Subscriber {
    pub fn new(config: &AppConfig, audit: Arc<AuditLog>, spool: SpoolHandle) -> Self {
        let url = format!(
            "wss://ws-{}.pusher.com:443/app/{}?protocol=7&client=bondruck&version={}",
            config.cluster,
            config.app_key,
            env!("CARGO_PKG_VERSION"),
        );
        Self { url, audit, spool }
    }

    /// Connect and serve until the task is dropped. Consecutive
    /// connection failures widen the reconnect delay; any successful
    /// connection resets it.
    pub async fn run(self) {
        let mut failures: u32 = 0;
        loop {
            match self.run_connection().await {
                Ok(()) => {
                    failures = 0;
                    self.audit.record_visible("Websocket disconnected.", true);
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    self.audit
                        .record_visible(&format!("Websocket connection error: {e}"), true);
                }
            }
            let delay = backoff_delay(failures);
            debug!(secs = delay, "reconnecting after delay");
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }
    }

    /// One connection's lifetime: connect, answer the protocol, and
    /// pump events until the stream ends.
    #[instrument(skip_all)]
    async fn run_connection(&self) -> Result<()> {
        info!("connecting to event channel");
        let (stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| BondruckError::Channel(e.to_string()))?;
        let (mut write, mut read) = stream.split();

        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if let Some(reply) = self.handle_frame(text.as_ref()) {
                        write
                            .send(Message::Text(reply.into()))
                            .await
                            .map_err(|e| BondruckError::Channel(e.to_string()))?;
                    }
                }
                Ok(Message::Ping(payload)) => {
                    write
                        .send(Message::Pong(payload))
                        .await
                        .map_err(|e| BondruckError::Channel(e.to_string()))?;
                }
                Ok(Message::Close(_)) => break,
                Err(e) => return Err(BondruckError::Channel(e.to_string())),
                _ => {}
            }
        }
        Ok(())
    }

    /// Handle one text frame; returns the reply frame when the protocol
    /// requires one.
    fn handle_frame(&self, text: &str) -> Option<String> {
        let frame = match PusherFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                // Chatter on the socket we don't understand; recorded
                // but not worth an observer's attention.
                self.audit.record(&format!("ignoring unreadable frame: {e}"));
                return None;
            }
        };

        match frame.event.as_str() {
            EVENT_ESTABLISHED => {
                self.audit.record_visible("Websocket connected.", true);
                Some(subscribe_frame(PRINT_CHANNEL))
            }
            EVENT_PING => Some(pong_frame()),
            EVENT_ERROR => {
                let detail = frame
                    .data
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "unknown".into());
                self.audit
                    .record_visible(&format!("Websocket connection error: {detail}"), true);
                None
            }
            EVENT_SUBSCRIBED => {
                self.audit
                    .record(&format!("subscription to '{PRINT_CHANNEL}' acknowledged"));
                None
            }
            PRINT_EVENT => {
                self.handle_print_event(&frame);
                None
            }
            other => {
                debug!(event = other, "ignoring event");
                None
            }
        }
    }

    /// Translate one print event into an enqueue, or record why it was
    /// dropped. A redelivered message simply becomes a duplicate job.
    fn handle_print_event(&self, frame: &PusherFrame) {
        if frame.channel.as_deref() != Some(PRINT_CHANNEL) {
            debug!(channel = ?frame.channel, "print event on unexpected channel");
            return;
        }
        self.audit.record_visible("Print request received.", true);

        let job = frame
            .decoded_data()
            .and_then(|data| {
                serde_json::from_value::<JobRequest>(data)
                    .map_err(|e| BondruckError::MalformedMessage(e.to_string()))
            })
            .and_then(JobRequest::into_job);

        match job {
            Ok(job) => {
                debug!(job_id = %job.id, "job enqueued");
                self.spool.enqueue(job);
            }
            Err(e) => {
                self.audit
                    .record_visible(&format!("Print request rejected: {e}"), true);
            }
        }
    }
}

/// Exponential backoff, capped. Zero consecutive failures (a clean
/// disconnect) still waits one base period before dialling again.
fn backoff_delay(failures: u32) -> u64 {
    RECONNECT_BASE_DELAY_SECS
        .saturating_mul(1 << failures.min(5))
        .min(MAX_RECONNECT_DELAY_SECS)
}
