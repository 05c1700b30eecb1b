//! Board resolution tables.
//!
//! Two static, read-only tables: board-name → `BoardKind`, and USB
//! "vendor:product" identifier → board metadata. Resolution either fully
//! succeeds or fails explicitly; no partial or default target is ever
//! produced.

use tracing::{debug, info};

use crate::board::{BoardKind, UnsupportedBoardError};
use crate::usb::{DetectionError, UsbDevice};

/// Manufacturer-name substrings that mark a device as a flashing candidate.
pub const KNOWN_MANUFACTURERS: &[&str] = &["Texas", "STMicro"];

/// Metadata for one known USB identifier.
///
/// Some boards only enumerate once they are already in programming mode
/// (the PyBoard announces itself as a DFU device only then); others expose
/// a permanently-attached debug probe.
#[derive(Debug)]
pub struct UsbEntry {
    /// "vendor:product", lowercase hex.
    pub key: &'static str,
    pub friendly_name: &'static str,
    pub supported: bool,
    /// Flasher configuration file, for tools that take one.
    pub tool_config: Option<&'static str>,
    /// Board-specific tool command or argument.
    pub tool_argument: Option<&'static str>,
}

impl UsbEntry {
    /// The board variant this identifier belongs to, when supported.
    pub fn board_kind(&self) -> Option<BoardKind> {
        match self.key {
            "0483:3748" | "0483:374b" => Some(BoardKind::Stm32f407Disco),
            "0483:df11" => Some(BoardKind::Pyboard),
            "0451:2046" => Some(BoardKind::Msp430f5529),
            _ => None,
        }
    }
}

/// Known USB identifiers.
///
/// An ST-LINK probe can be wired to boards other than the one assumed here;
/// the table maps each probe to the bench's default board for it.
pub static USB_IDENTIFIERS: &[UsbEntry] = &[
    UsbEntry {
        key: "0483:3748",
        friendly_name: "STMicro ST-LINK/V2 (old type)",
        supported: true,
        tool_config: Some("stm32f407vg.cfg"),
        tool_argument: Some("stm32f4_flash"),
    },
    UsbEntry {
        key: "0483:374b",
        friendly_name: "STMicro ST-LINK/V2 (new type)",
        supported: true,
        tool_config: Some("stm32f407g-disc1.cfg"),
        tool_argument: Some("stm32f4_flash"),
    },
    UsbEntry {
        key: "0483:df11",
        friendly_name: "STM32F405 PyBoard",
        supported: true,
        tool_config: None,
        tool_argument: None,
    },
    UsbEntry {
        key: "0451:2046",
        friendly_name: "TI MSP430F5529 Launchpad",
        supported: true,
        tool_config: None,
        tool_argument: None,
    },
    UsbEntry {
        key: "0451:f432",
        friendly_name: "TI MSP430G2553 Launchpad",
        supported: false,
        tool_config: None,
        tool_argument: None,
    },
];

/// Look up a board by its canonical name.
pub fn resolve_by_name(name: &str) -> Result<BoardKind, UnsupportedBoardError> {
    name.parse()
}

/// Look up a USB "vendor:product" identifier.
pub fn resolve_usb_identifier(key: &str) -> Option<&'static UsbEntry> {
    USB_IDENTIFIERS.iter().find(|e| e.key == key)
}

/// Pick the first supported board among the scanned devices.
///
/// Filters candidates by manufacturer substring, resolves each identifier,
/// and returns the first entry whose `supported` flag is set. When nothing
/// matches the caller must fall back to an explicit board name.
pub fn detect_connected_board(devices: &[UsbDevice]) -> Result<&'static UsbEntry, DetectionError> {
    for device in devices {
        let is_candidate = KNOWN_MANUFACTURERS
            .iter()
            .any(|m| device.manufacturer.contains(m));
        if !is_candidate {
            continue;
        }
        debug!(id = %device.device_id, manufacturer = %device.manufacturer, "Candidate device");

        match resolve_usb_identifier(&device.device_id) {
            Some(entry) if entry.supported => {
                info!(id = entry.key, name = entry.friendly_name, "Detected supported board");
                return Ok(entry);
            }
            Some(entry) => {
                debug!(id = entry.key, name = entry.friendly_name, "Known but unsupported");
            }
            None => {
                debug!(id = %device.device_id, "Unknown identifier");
            }
        }
    }
    Err(DetectionError::NoSupportedDevice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_name() {
        assert_eq!(
            resolve_by_name("msp430f5529-gcc").unwrap(),
            BoardKind::Msp430f5529
        );
    }

    #[test]
    fn test_unknown_name_never_yields_a_target() {
        assert!(resolve_by_name("frdm-k64f-gcc").is_err());
        assert!(resolve_by_name("").is_err());
    }

    #[test]
    fn test_stlink_v2_entry() {
        let entry = resolve_usb_identifier("0483:374b").unwrap();
        assert!(entry.supported);
        assert_eq!(entry.tool_config, Some("stm32f407g-disc1.cfg"));
        assert_eq!(entry.board_kind(), Some(BoardKind::Stm32f407Disco));
    }

    #[test]
    fn test_msp430g2553_is_known_but_unsupported() {
        let entry = resolve_usb_identifier("0451:f432").unwrap();
        assert!(!entry.supported);
        assert_eq!(entry.board_kind(), None);
    }

    #[test]
    fn test_unknown_identifier() {
        assert!(resolve_usb_identifier("1d50:6018").is_none());
    }

    fn device(manufacturer: &str, id: &str) -> UsbDevice {
        UsbDevice {
            manufacturer: manufacturer.to_string(),
            device_id: id.to_string(),
        }
    }

    #[test]
    fn test_detect_picks_first_supported() {
        let devices = vec![
            device("Intel Corp.", "8087:0024"),
            device("Texas Instruments, Inc.", "0451:f432"), // known, unsupported
            device("STMicroelectronics ST-LINK/V2.1", "0483:374b"),
        ];
        let entry = detect_connected_board(&devices).unwrap();
        assert_eq!(entry.key, "0483:374b");
    }

    #[test]
    fn test_detect_fails_without_supported_device() {
        let devices = vec![
            device("Intel Corp.", "8087:0024"),
            device("Texas Instruments, Inc.", "0451:f432"),
        ];
        assert!(matches!(
            detect_connected_board(&devices),
            Err(DetectionError::NoSupportedDevice)
        ));
    }

    #[test]
    fn test_detect_ignores_unknown_manufacturer_with_known_id() {
        // The identifier table is only consulted for candidate manufacturers.
        let devices = vec![device("SomeVendor", "0483:374b")];
        assert!(detect_connected_board(&devices).is_err());
    }
}
