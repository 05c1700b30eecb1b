//! sysfs-based pin driver.
//!
//! Drives the host's GPIO harness through `/sys/class/gpio`. Pins are
//! exported on first use and configured as outputs. This layer stays thin:
//! electrical behavior belongs to the harness, not to this crate.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::traits::{HardwareError, Level, PinDriver};

pub struct SysfsPinDriver {
    root: PathBuf,
    exported: Mutex<Vec<u8>>,
}

impl SysfsPinDriver {
    pub fn new() -> Self {
        Self::with_root("/sys/class/gpio")
    }

    /// Use an alternate sysfs root. Exists for harness relocation and tests.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            exported: Mutex::new(Vec::new()),
        }
    }

    fn pin_dir(&self, number: u8) -> PathBuf {
        self.root.join(format!("gpio{number}"))
    }

    fn ensure_exported(&self, number: u8) -> Result<(), HardwareError> {
        let mut exported = self.exported.lock().unwrap();
        if exported.contains(&number) {
            return Ok(());
        }
        if !self.pin_dir(number).exists() {
            fs::write(self.root.join("export"), number.to_string())?;
        }
        fs::write(self.pin_dir(number).join("direction"), "out")?;
        debug!(pin = number, "Exported GPIO as output");
        exported.push(number);
        Ok(())
    }
}

impl Default for SysfsPinDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl PinDriver for SysfsPinDriver {
    fn write(&self, number: u8, level: Level) -> Result<(), HardwareError> {
        self.ensure_exported(number)?;
        let value = match level {
            Level::Low => "0",
            Level::High => "1",
        };
        fs::write(self.pin_dir(number).join("value"), value).map_err(|e| {
            HardwareError::DriveFailed {
                number,
                message: e.to_string(),
            }
        })?;
        debug!(pin = number, level = %level, "Pin driven");
        Ok(())
    }

    fn release(&self, number: u8) -> Result<(), HardwareError> {
        // Drive low before unexport so the board is left in a known state.
        if let Err(e) = self.write(number, Level::Low) {
            warn!(pin = number, error = %e, "Could not drive pin low on release");
        }
        let mut exported = self.exported.lock().unwrap();
        if let Some(idx) = exported.iter().position(|&n| n == number) {
            if let Err(e) = fs::write(self.root.join("unexport"), number.to_string()) {
                warn!(pin = number, error = %e, "Unexport failed");
            }
            exported.remove(idx);
        }
        Ok(())
    }
}
