// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// USB backend for locally attached printer-class devices.
//
// Opens the first attached device exposing a USB printer-class (07h)
// interface, or the device matching a `vid:pid` selector, and streams
// bytes to its bulk-OUT endpoint. libusb calls are blocking, so they
// run on the blocking pool. Human-facing device listing (vendor and
// product strings) is someone else's job; this backend only needs
// open/write/cut/close.

use std::time::Duration;

use async_trait::async_trait;
use rusb::{Context, DeviceHandle, Direction, TransferType, UsbContext};
use tracing::{debug, info};

use bondruck_core::{BondruckError, Result};

use crate::backend::PrinterBackend;
use crate::escpos;

/// USB base class for printers.
const USB_CLASS_PRINTER: u8 = 0x07;

/// Per-transfer timeout for bulk writes.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// An opened, claimed printer device.
struct UsbLink {
    handle: DeviceHandle<Context>,
    iface: u8,
    endpoint: u8,
}

pub struct UsbBackend {
    selector: Option<String>,
    link: Option<UsbLink>,
}

impl UsbBackend {
    /// `selector` is an opaque `vid:pid` hex pair (e.g. `04b8:0e15`);
    /// `None` means "first attached printer-class device".
    pub fn new(selector: Option<String>) -> Self {
        Self {
            selector,
            link: None,
        }
    }
}

#[async_trait]
impl PrinterBackend for UsbBackend {
    async fn open(&mut self, timeout: Duration) -> Result<()> {
        info!(selector = self.selector.as_deref(), "opening USB printer");
        let selector = self.selector.clone();
        let opened = tokio::time::timeout(
            timeout,
            tokio::task::spawn_blocking(move || open_device(selector.as_deref())),
        )
        .await
        .map_err(|_| BondruckError::ConnectTimeout {
            addr: "usb".into(),
            secs: timeout.as_secs(),
        })?
        .map_err(|e| BondruckError::Usb(format!("blocking task failed: {e}")))??;

        self.link = Some(opened);
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let link = self
            .link
            .take()
            .ok_or_else(|| BondruckError::Usb("not connected".into()))?;
        let data = data.to_vec();

        let (link, result) = tokio::task::spawn_blocking(move || {
            let result = blocking_write(&link, &data);
            (link, result)
        })
        .await
        .map_err(|e| BondruckError::Usb(format!("blocking task failed: {e}")))?;

        self.link = Some(link);
        result
    }

    async fn cut(&mut self) -> Result<()> {
        self.write(&escpos::cut_feed(escpos::CUT_FEED_LINES)).await
    }

    async fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            // Dropping the handle closes the device; releasing the
            // interface first keeps the kernel driver happy.
            let _ = tokio::task::spawn_blocking(move || {
                let _ = link.handle.release_interface(link.iface);
            })
            .await;
        }
    }
}

/// Parse a `vid:pid` selector. Both halves are hex.
fn parse_selector(selector: &str) -> Result<(u16, u16)> {
    let invalid = || BondruckError::InvalidSelector(selector.to_string());
    let (vid, pid) = selector.split_once(':').ok_or_else(invalid)?;
    let vid = u16::from_str_radix(vid.trim(), 16).map_err(|_| invalid())?;
    let pid = u16::from_str_radix(pid.trim(), 16).map_err(|_| invalid())?;
    Ok((vid, pid))
}

fn usb_err(e: rusb::Error) -> BondruckError {
    BondruckError::Usb(e.to_string())
}

/// Find, open, and claim a printer device.
fn open_device(selector: Option<&str>) -> Result<UsbLink> {
    let wanted = match selector {
        Some(s) if !s.is_empty() => Some(parse_selector(s)?),
        _ => None,
    };

    let context = Context::new().map_err(usb_err)?;
    let devices = context.devices().map_err(usb_err)?;

    for device in devices.iter() {
        let descriptor = match device.device_descriptor() {
            Ok(d) => d,
            Err(_) => continue,
        };
        if let Some((vid, pid)) = wanted
            && (descriptor.vendor_id(), descriptor.product_id()) != (vid, pid)
        {
            continue;
        }
        let Some((iface, endpoint)) = printer_interface(&device) else {
            continue;
        };

        let mut handle = device.open().map_err(usb_err)?;
        if handle.kernel_driver_active(iface).unwrap_or(false) {
            handle.detach_kernel_driver(iface).map_err(usb_err)?;
        }
        handle.claim_interface(iface).map_err(usb_err)?;

        debug!(
            vid = format!("{:04x}", descriptor.vendor_id()),
            pid = format!("{:04x}", descriptor.product_id()),
            iface,
            endpoint,
            "USB printer claimed"
        );
        return Ok(UsbLink {
            handle,
            iface,
            endpoint,
        });
    }

    Err(BondruckError::Usb(match wanted {
        Some((vid, pid)) => format!("device {vid:04x}:{pid:04x} not attached"),
        None => "no printer-class device attached".into(),
    }))
}

/// Locate a printer-class interface and its bulk-OUT endpoint.
fn printer_interface(device: &rusb::Device<Context>) -> Option<(u8, u8)> {
    let config = device
        .active_config_descriptor()
        .or_else(|_| device.config_descriptor(0))
        .ok()?;
    for interface in config.interfaces() {
        for descriptor in interface.descriptors() {
            if descriptor.class_code() != USB_CLASS_PRINTER {
                continue;
            }
            for endpoint in descriptor.endpoint_descriptors() {
                if endpoint.direction() == Direction::Out
                    && endpoint.transfer_type() == TransferType::Bulk
                {
                    return Some((descriptor.interface_number(), endpoint.address()));
                }
            }
        }
    }
    None
}

fn blocking_write(link: &UsbLink, data: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < data.len() {
        let n = link
            .handle
            .write_bulk(link.endpoint, &data[written..], WRITE_TIMEOUT)
            .map_err(usb_err)?;
        if n == 0 {
            return Err(BondruckError::Usb("device accepted no data".into()));
        }
        written += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parses_hex_pairs() {
        assert_eq!(parse_selector("04b8:0e15").expect("valid"), (0x04b8, 0x0e15));
        assert_eq!(parse_selector("4B8:E15").expect("valid"), (0x04b8, 0x0e15));
    }

    #[test]
    fn bad_selectors_are_rejected() {
        assert!(matches!(
            parse_selector("04b8"),
            Err(BondruckError::InvalidSelector(_))
        ));
        assert!(matches!(
            parse_selector("zz:0e15"),
            Err(BondruckError::InvalidSelector(_))
        ));
        assert!(matches!(
            parse_selector(""),
            Err(BondruckError::InvalidSelector(_))
        ));
    }

    #[tokio::test]
    async fn invalid_selector_fails_open() {
        // The selector is checked before any device access, so this is
        // safe to run on machines with no USB stack at all.
        let mut backend = UsbBackend::new(Some("not-a-selector".into()));
        let err = backend
            .open(Duration::from_secs(1))
            .await
            .expect_err("invalid selector");
        assert!(matches!(err, BondruckError::InvalidSelector(_)));
    }

    #[tokio::test]
    async fn write_before_open_fails() {
        let mut backend = UsbBackend::new(None);
        let err = backend.write(b"hello").await.expect_err("not connected");
        assert!(matches!(err, BondruckError::Usb(_)));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let mut backend = UsbBackend::new(None);
        backend.close().await;
        backend.close().await;
    }
}
