//! Programming-mode entry sequencing.
//!
//! The sequence is linear and non-branching: there is no retry and no
//! mid-sequence recovery. If a later stage finds the board did not actually
//! reach its bootloader, the whole session restarts from `Idle`.

use std::fmt;
use std::thread;

use tracing::info;

use crate::gpio::{HardwareError, Level, PinClaim};

use super::profile::EntryDelays;

/// States of the bootloader-entry sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgState {
    Idle,
    ResetAsserted,
    ProgramAsserted,
    ResetReleased,
    Ready,
}

impl Default for ProgState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for ProgState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgState::Idle => write!(f, "IDLE"),
            ProgState::ResetAsserted => write!(f, "RESET_ASSERTED"),
            ProgState::ProgramAsserted => write!(f, "PROGRAM_ASSERTED"),
            ProgState::ResetReleased => write!(f, "RESET_RELEASED"),
            ProgState::Ready => write!(f, "READY"),
        }
    }
}

fn goto_state(state: &mut ProgState, new_state: ProgState) {
    info!(from = %state, to = %new_state, "Programming-mode transition");
    *state = new_state;
}

/// Hold the board in reset, select programming mode, then let it boot into
/// the bootloader. Timing comes from the board profile; pin assertion is
/// assumed electrically possible, so reaching `Ready` is the only exit.
pub fn enter_programming_mode(
    claim: &mut PinClaim,
    delays: &EntryDelays,
) -> Result<(), HardwareError> {
    let mut state = ProgState::Idle;

    claim.set("rst", Level::High)?;
    goto_state(&mut state, ProgState::ResetAsserted);
    thread::sleep(delays.t1);

    claim.set("prg", Level::High)?;
    goto_state(&mut state, ProgState::ProgramAsserted);
    thread::sleep(delays.t2);

    claim.set("rst", Level::Low)?;
    goto_state(&mut state, ProgState::ResetReleased);

    claim.set("prg", Level::Low)?;
    thread::sleep(delays.t3);
    goto_state(&mut state, ProgState::Ready);

    Ok(())
}
