//! Pin driver abstraction.
//!
//! Defines the `PinDriver` trait for digital output control,
//! allowing different implementations (sysfs, mock, etc.).

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("Unknown pin '{name}' for this target")]
    UnknownPin { name: String },

    #[error("Pins already claimed by another session: {pins:?}")]
    PinsBusy { pins: Vec<u8> },

    #[error("Duplicate pin number {number} in pin map")]
    DuplicatePin { number: u8 },

    #[error("Failed to drive pin {number}: {message}")]
    DriveFailed { number: u8, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Logical output level of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "low"),
            Level::High => write!(f, "high"),
        }
    }
}

/// Abstract digital-output capability.
///
/// This trait enables:
/// - Production implementation driving the host GPIO harness
/// - Mock implementation for unit testing
///
/// Electrical faults are not modeled; a driver only fails if the host
/// refuses the operation outright.
pub trait PinDriver: Send + Sync {
    /// Drive a pin to the given level.
    fn write(&self, number: u8, level: Level) -> Result<(), HardwareError>;

    /// Return a pin to its unconfigured state. Best effort; called on
    /// release and must tolerate repeated invocation.
    fn release(&self, number: u8) -> Result<(), HardwareError> {
        self.write(number, Level::Low)
    }
}
