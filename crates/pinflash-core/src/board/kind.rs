//! Supported board identifiers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug)]
#[error("Board name '{name}' does not match the supported boards: {supported}")]
pub struct UnsupportedBoardError {
    pub name: String,
    pub supported: String,
}

/// Closed set of board families this tool can flash.
///
/// Resolution either names one of these exactly or fails; there is no
/// partially-configured fallback target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardKind {
    /// MicroPython PyBoard (STM32F405), flashed over DFU.
    Pyboard,
    /// STM32F407 Discovery via its on-board ST-LINK.
    Stm32f407Disco,
    /// TI MSP430F5529 LaunchPad.
    Msp430f5529,
    /// NanoAvionics SatBus 3C0 flight controller.
    NaSatbus3c0,
}

impl BoardKind {
    pub const ALL: [BoardKind; 4] = [
        BoardKind::Pyboard,
        BoardKind::Stm32f407Disco,
        BoardKind::Msp430f5529,
        BoardKind::NaSatbus3c0,
    ];

    /// Canonical board name as accepted on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            BoardKind::Pyboard => "pyboard-gcc",
            BoardKind::Stm32f407Disco => "stm32f407-disco-gcc",
            BoardKind::Msp430f5529 => "msp430f5529-gcc",
            BoardKind::NaSatbus3c0 => "na-satbus-3c0-gcc",
        }
    }

    fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|k| k.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for BoardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for BoardKind {
    type Err = UnsupportedBoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnsupportedBoardError {
                name: s.to_string(),
                supported: Self::supported_list(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for kind in BoardKind::ALL {
            assert_eq!(kind.name().parse::<BoardKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = "esp32-devkit".parse::<BoardKind>().unwrap_err();
        assert!(err.to_string().contains("esp32-devkit"));
        assert!(err.supported.contains("pyboard-gcc"));
    }
}
