// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pusher channel-protocol frames and the print request wire schema.
//
// Only the slice of the protocol this daemon uses: the connection
// handshake, ping/pong keepalive, channel subscription, and data
// events. Event payloads arrive with `data` double-encoded as a JSON
// string; the already-decoded object form is accepted too.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use bondruck_core::{BondruckError, Endpoint, PrintJob, Result};

/// Sent by the server once the socket is established.
pub const EVENT_ESTABLISHED: &str = "pusher:connection_established";
/// Keepalive from the server; must be answered with a pong.
pub const EVENT_PING: &str = "pusher:ping";
/// Protocol-level error report from the server.
pub const EVENT_ERROR: &str = "pusher:error";
/// Acknowledgement of a channel subscription.
pub const EVENT_SUBSCRIBED: &str = "pusher_internal:subscription_succeeded";

/// Channel carrying print requests.
pub const PRINT_CHANNEL: &str = "printer";
/// Application event that carries one print request.
pub const PRINT_EVENT: &str = r"App\Events\PrinterEvent";

/// A single inbound frame on the socket.
#[derive(Debug, Deserialize)]
pub struct PusherFrame {
    pub event: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl PusherFrame {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| BondruckError::MalformedMessage(format!("frame: {e}")))
    }

    /// Decode the `data` field, unwrapping the double encoding when
    /// present.
    pub fn decoded_data(&self) -> Result<Value> {
        match &self.data {
            None => Ok(Value::Null),
            Some(Value::String(inner)) => serde_json::from_str(inner)
                .map_err(|e| BondruckError::MalformedMessage(format!("event data: {e}"))),
            Some(other) => Ok(other.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
struct Subscribe<'a> {
    event: &'a str,
    data: SubscribeData<'a>,
}

#[derive(Debug, Serialize)]
struct SubscribeData<'a> {
    channel: &'a str,
}

/// Outbound frame subscribing to `channel`.
pub fn subscribe_frame(channel: &str) -> String {
    serde_json::to_string(&Subscribe {
        event: "pusher:subscribe",
        data: SubscribeData { channel },
    })
    .unwrap_or_default()
}

/// Outbound keepalive reply.
pub fn pong_frame() -> String {
    r#"{"event":"pusher:pong","data":"{}"}"#.to_string()
}

/// Wire schema of one print request, as published by the POS backend.
///
/// Every field except `text` is optional; the executor fills gaps from
/// the configured defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub printer_type: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub printer_port: Option<u16>,
    #[serde(default)]
    pub device: Option<String>,
}

impl JobRequest {
    /// Validate the request and build the internal job record.
    ///
    /// Requests without printable content are refused here, at the
    /// ingestion boundary, and never reach the queue.
    pub fn into_job(self) -> Result<PrintJob> {
        let payload = self.text.unwrap_or_default();
        if payload.trim().is_empty() {
            return Err(BondruckError::MalformedMessage("missing text to print".into()));
        }

        let mut job = PrintJob::new(payload);
        job.transport = self.printer_type.filter(|t| !t.trim().is_empty());
        job.endpoint = Endpoint {
            host: self.ip.filter(|h| !h.trim().is_empty()),
            port: self.printer_port,
            device: self.device.filter(|d| !d.trim().is_empty()),
        };
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_with_double_encoded_data() {
        let frame = PusherFrame::parse(
            r#"{"event":"App\\Events\\PrinterEvent","channel":"printer","data":"{\"text\":\"Receipt #1\",\"printerType\":\"lan\"}"}"#,
        )
        .expect("parse frame");
        assert_eq!(frame.event, PRINT_EVENT);
        assert_eq!(frame.channel.as_deref(), Some(PRINT_CHANNEL));

        let data = frame.decoded_data().expect("decode data");
        assert_eq!(data["text"], "Receipt #1");
        assert_eq!(data["printerType"], "lan");
    }

    #[test]
    fn frame_with_plain_object_data() {
        let frame = PusherFrame::parse(
            r#"{"event":"App\\Events\\PrinterEvent","data":{"text":"Receipt #1"}}"#,
        )
        .expect("parse frame");
        let data = frame.decoded_data().expect("decode data");
        assert_eq!(data["text"], "Receipt #1");
    }

    #[test]
    fn unparseable_frame_is_malformed() {
        assert!(matches!(
            PusherFrame::parse("not json"),
            Err(BondruckError::MalformedMessage(_))
        ));
    }

    #[test]
    fn subscribe_frame_shape() {
        let frame = subscribe_frame(PRINT_CHANNEL);
        let value: Value = serde_json::from_str(&frame).expect("valid json");
        assert_eq!(value["event"], "pusher:subscribe");
        assert_eq!(value["data"]["channel"], "printer");
    }

    #[test]
    fn pong_frame_is_valid_json() {
        let value: Value = serde_json::from_str(&pong_frame()).expect("valid json");
        assert_eq!(value["event"], "pusher:pong");
    }

    #[test]
    fn full_request_becomes_a_job() {
        let request: JobRequest = serde_json::from_str(
            r#"{"text":"Receipt #1","printerType":"network","ip":"10.0.0.5","printerPort":9100}"#,
        )
        .expect("parse request");
        let job = request.into_job().expect("valid job");

        assert_eq!(job.payload, "Receipt #1");
        assert_eq!(job.transport.as_deref(), Some("network"));
        assert_eq!(job.endpoint.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(job.endpoint.port, Some(9100));
        assert_eq!(job.retry_count, 0);
    }

    #[test]
    fn bare_request_leaves_gaps_for_defaults() {
        let request: JobRequest =
            serde_json::from_str(r#"{"text":"Receipt #1"}"#).expect("parse request");
        let job = request.into_job().expect("valid job");

        assert!(job.transport.is_none());
        assert!(job.endpoint.host.is_none());
        assert!(job.endpoint.port.is_none());
    }

    #[test]
    fn missing_text_is_refused() {
        let request: JobRequest = serde_json::from_str(r#"{"printerType":"usb"}"#).expect("parse");
        assert!(matches!(
            request.into_job(),
            Err(BondruckError::MalformedMessage(_))
        ));
    }

    #[test]
    fn blank_text_is_refused() {
        let request: JobRequest =
            serde_json::from_str(r#"{"text":"   "}"#).expect("parse request");
        assert!(request.into_job().is_err());
    }
}
