//! USB device enumeration.
//!
//! Candidates come from either a captured `lsusb`-style listing or a live
//! scan through nusb; both yield the same `{manufacturer, device_id}` shape
//! that the registry filters against its identifier table.

use nusb::MaybeFuture;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("No supported device found by USB auto-detection")]
    NoSupportedDevice,

    #[error("USB enumeration failed: {0}")]
    Scan(String),
}

/// One connected device candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDevice {
    pub manufacturer: String,
    /// "vendor:product" identifier, lowercase hex.
    pub device_id: String,
}

/// Parse an `lsusb`-style listing, one device per line:
///
/// `Bus 001 Device 004: ID 0483:374b STMicroelectronics ST-LINK/V2.1`
///
/// The device id sits at field index 5 and the manufacturer text follows.
/// Malformed or short lines are skipped, not fatal.
pub fn parse_device_listing(text: &str) -> Vec<UsbDevice> {
    let mut devices = Vec::new();
    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 7 {
            if !line.trim().is_empty() {
                debug!(line, "Skipping malformed device line");
            }
            continue;
        }
        devices.push(UsbDevice {
            manufacturer: fields[6..].join(" "),
            device_id: fields[5].to_string(),
        });
    }
    devices
}

/// Enumerate connected devices through nusb.
///
/// Devices without a manufacturer string descriptor are skipped; they cannot
/// match the manufacturer filter anyway.
pub fn scan() -> Result<Vec<UsbDevice>, DetectionError> {
    let devices = nusb::list_devices()
        .wait()
        .map_err(|e| DetectionError::Scan(e.to_string()))?;

    let mut found = Vec::new();
    for info in devices {
        let Some(manufacturer) = info.manufacturer_string() else {
            continue;
        };
        let device = UsbDevice {
            manufacturer: manufacturer.to_string(),
            device_id: format!("{:04x}:{:04x}", info.vendor_id(), info.product_id()),
        };
        debug!(id = %device.device_id, manufacturer = %device.manufacturer, "Enumerated device");
        found.push(device);
    }
    if found.is_empty() {
        warn!("USB scan returned no named devices");
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Bus 001 Device 002: ID 8087:0024 Intel Corp. Integrated Rate Matching Hub
Bus 001 Device 004: ID 0483:374b STMicroelectronics ST-LINK/V2.1
garbage line
Bus 001 Device 005: ID 0451:2046 Texas Instruments, Inc. TUSB2046 Hub
";

    #[test]
    fn test_parse_listing() {
        let devices = parse_device_listing(LISTING);
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[1].device_id, "0483:374b");
        assert!(devices[1].manufacturer.starts_with("STMicroelectronics"));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let devices = parse_device_listing("garbage line\n\nBus 001\n");
        assert!(devices.is_empty());
    }
}
