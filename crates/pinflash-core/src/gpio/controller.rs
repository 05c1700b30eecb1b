//! Pin ownership and control.
//!
//! A `GpioController` hands out exclusive claims over sets of pins. Exactly
//! one claim may hold a given pin number at a time; a second session asking
//! for overlapping pins fails fast instead of silently interleaving with the
//! active one. The controller is an explicit object passed into the session,
//! never process-global state.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::traits::{HardwareError, Level, PinDriver};

/// A named digital-output pin with its last driven level.
#[derive(Debug, Clone)]
pub struct Pin {
    pub name: &'static str,
    pub number: u8,
    pub state: Level,
}

pub struct GpioController {
    driver: Arc<dyn PinDriver>,
    claimed: Arc<Mutex<HashSet<u8>>>,
}

impl GpioController {
    pub fn new(driver: Arc<dyn PinDriver>) -> Self {
        Self {
            driver,
            claimed: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Claim exclusive ownership of the given pins for one session.
    pub fn claim(&self, pins: &[(&'static str, u8)]) -> Result<PinClaim, HardwareError> {
        let mut seen = HashSet::new();
        for &(_, number) in pins {
            if !seen.insert(number) {
                return Err(HardwareError::DuplicatePin { number });
            }
        }

        let mut claimed = self.claimed.lock().unwrap();
        let busy: Vec<u8> = pins
            .iter()
            .map(|&(_, n)| n)
            .filter(|n| claimed.contains(n))
            .collect();
        if !busy.is_empty() {
            return Err(HardwareError::PinsBusy { pins: busy });
        }
        for &(_, number) in pins {
            claimed.insert(number);
        }
        debug!(pins = ?pins, "Pins claimed");

        Ok(PinClaim {
            driver: Arc::clone(&self.driver),
            claimed: Arc::clone(&self.claimed),
            pins: pins
                .iter()
                .map(|&(name, number)| Pin {
                    name,
                    number,
                    state: Level::Low,
                })
                .collect(),
            released: false,
        })
    }
}

/// Exclusive ownership of a pin set for the duration of one session.
///
/// Released explicitly via `release_all` or implicitly on drop.
pub struct PinClaim {
    driver: Arc<dyn PinDriver>,
    claimed: Arc<Mutex<HashSet<u8>>>,
    pins: Vec<Pin>,
    released: bool,
}

impl std::fmt::Debug for PinClaim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinClaim")
            .field("pins", &self.pins)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl PinClaim {
    /// Drive a pin by logical name.
    pub fn set(&mut self, name: &str, level: Level) -> Result<(), HardwareError> {
        let pin = self
            .pins
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| HardwareError::UnknownPin { name: name.into() })?;
        self.driver.write(pin.number, level)?;
        pin.state = level;
        Ok(())
    }

    /// Last driven level of a pin, if it belongs to this claim.
    pub fn level(&self, name: &str) -> Option<Level> {
        self.pins.iter().find(|p| p.name == name).map(|p| p.state)
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// Return the pins to the controller without driving them, leaving the
    /// board's lines in their current electrical state.
    pub fn relinquish(mut self) {
        if self.released {
            return;
        }
        let mut claimed = self.claimed.lock().unwrap();
        for pin in &self.pins {
            claimed.remove(&pin.number);
        }
        drop(claimed);
        self.released = true;
        debug!("Pins relinquished without release");
    }

    /// Release every pin back to the controller. Idempotent; always succeeds.
    pub fn release_all(&mut self) {
        if self.released {
            return;
        }
        let mut claimed = self.claimed.lock().unwrap();
        for pin in &mut self.pins {
            if let Err(e) = self.driver.release(pin.number) {
                warn!(pin = pin.number, error = %e, "Release failed, pin dropped anyway");
            }
            pin.state = Level::Low;
            claimed.remove(&pin.number);
        }
        self.released = true;
        debug!("All pins released");
    }
}

impl Drop for PinClaim {
    fn drop(&mut self) {
        self.release_all();
    }
}
