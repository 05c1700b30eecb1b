//! Mock pin driver for testing.

use std::sync::{Arc, Mutex};

use super::traits::{HardwareError, Level, PinDriver};

/// Mock driver that records every transition instead of touching hardware.
pub struct MockPinDriver {
    /// Captured (pin, level) writes in order.
    transitions: Arc<Mutex<Vec<(u8, Level)>>>,
    /// Pins that have been released.
    released: Arc<Mutex<Vec<u8>>>,
    /// Pin numbers the driver refuses to drive (to simulate host refusal).
    refused: Arc<Mutex<Vec<u8>>>,
}

impl MockPinDriver {
    pub fn new() -> Self {
        Self {
            transitions: Arc::new(Mutex::new(Vec::new())),
            released: Arc::new(Mutex::new(Vec::new())),
            refused: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get all captured transitions.
    pub fn transitions(&self) -> Vec<(u8, Level)> {
        self.transitions.lock().unwrap().clone()
    }

    /// Get released pin numbers, in release order.
    pub fn released(&self) -> Vec<u8> {
        self.released.lock().unwrap().clone()
    }

    /// Clear captured transitions.
    pub fn clear(&self) {
        self.transitions.lock().unwrap().clear();
    }

    /// Make the driver refuse writes to a pin.
    pub fn refuse(&self, number: u8) {
        self.refused.lock().unwrap().push(number);
    }

    /// Index of the first transition driving `number` to `level`, if any.
    pub fn position_of(&self, number: u8, level: Level) -> Option<usize> {
        self.transitions
            .lock()
            .unwrap()
            .iter()
            .position(|&(n, l)| n == number && l == level)
    }
}

impl Default for MockPinDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl PinDriver for MockPinDriver {
    fn write(&self, number: u8, level: Level) -> Result<(), HardwareError> {
        if self.refused.lock().unwrap().contains(&number) {
            return Err(HardwareError::DriveFailed {
                number,
                message: "refused by mock".into(),
            });
        }
        self.transitions.lock().unwrap().push((number, level));
        Ok(())
    }

    fn release(&self, number: u8) -> Result<(), HardwareError> {
        self.write(number, Level::Low)?;
        self.released.lock().unwrap().push(number);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_transitions() {
        let mock = MockPinDriver::new();
        mock.write(17, Level::High).unwrap();
        mock.write(18, Level::High).unwrap();
        mock.write(17, Level::Low).unwrap();

        let t = mock.transitions();
        assert_eq!(t.len(), 3);
        assert_eq!(t[0], (17, Level::High));
        assert_eq!(t[2], (17, Level::Low));
    }

    #[test]
    fn test_mock_refusal() {
        let mock = MockPinDriver::new();
        mock.refuse(22);
        assert!(mock.write(22, Level::High).is_err());
        assert!(mock.write(17, Level::High).is_ok());
    }
}
