//! Static per-board configuration.
//!
//! Each supported board differs only in pin numbers, architecture, and the
//! external tool it is flashed with; the programming-mode sequence is shared.
//! Pin numbers are BCM addresses on the bench harness header.

use std::path::Path;
use std::time::Duration;

use crate::artifact::FileKind;

use super::kind::BoardKind;

/// Harness pins wired to one board slot. Numbers are unique per profile.
#[derive(Debug, Clone, Copy)]
pub struct PinMap {
    /// Reset line, active high through the harness driver.
    pub rst: u8,
    /// Programming-select line (BOOT0 / TEST, board dependent).
    pub prg: u8,
    /// Board power enable.
    pub pwr: u8,
    /// Spare option line.
    pub opt: u8,
}

impl PinMap {
    pub fn as_claims(&self) -> [(&'static str, u8); 4] {
        [
            ("rst", self.rst),
            ("prg", self.prg),
            ("pwr", self.pwr),
            ("opt", self.opt),
        ]
    }
}

/// Bootloader-entry timing. Dictated by the target silicon, not tunable.
#[derive(Debug, Clone, Copy)]
pub struct EntryDelays {
    /// Reset assertion settle time.
    pub t1: Duration,
    /// Programming-select hold time under reset.
    pub t2: Duration,
    /// Bootloader startup time after release.
    pub t3: Duration,
}

const STANDARD_ENTRY: EntryDelays = EntryDelays {
    t1: Duration::from_millis(200),
    t2: Duration::from_millis(500),
    t3: Duration::from_millis(100),
};

/// How the external tool is invoked for a board.
#[derive(Debug, Clone, Copy)]
pub enum Invocation {
    /// dfu-util download to a fixed flash offset.
    DfuDownload { offset: &'static str },
    /// openocd `program` command against a board config file.
    OpenOcdProgram {
        config: &'static str,
        offset: &'static str,
    },
    /// openocd with a board-specific flash script command.
    OpenOcdCommand {
        config: &'static str,
        command: &'static str,
    },
    /// mspdebug with the given debug driver.
    MspDebugProg { driver: &'static str },
}

/// External flashing tool binding.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    /// Tool binary, resolved on PATH at flash time.
    pub program: &'static str,
    pub invocation: Invocation,
    /// Substring of the tool's stdout that confirms a successful write.
    pub success_phrase: &'static str,
}

impl ToolSpec {
    /// Build the fixed argument list for flashing `firmware`.
    pub fn argv(&self, firmware: &Path) -> Vec<String> {
        let file = firmware.display().to_string();
        match self.invocation {
            Invocation::DfuDownload { offset } => vec![
                "--alt".into(),
                "0".into(),
                "-D".into(),
                file,
                "-i".into(),
                "0".into(),
                "-s".into(),
                offset.into(),
            ],
            Invocation::OpenOcdProgram { config, offset } => vec![
                "-f".into(),
                config.into(),
                "-c".into(),
                format!("program {file} verify reset exit {offset}"),
            ],
            Invocation::OpenOcdCommand { config, command } => vec![
                "-f".into(),
                config.into(),
                "-c".into(),
                format!("{command} {file}"),
            ],
            Invocation::MspDebugProg { driver } => {
                vec![driver.into(), format!("prog {file}")]
            }
        }
    }
}

/// Everything that distinguishes one board variant from another.
#[derive(Debug, Clone, Copy)]
pub struct BoardProfile {
    pub arch: &'static str,
    pub cpu: &'static str,
    pub pins: PinMap,
    pub expected_kind: FileKind,
    pub entry_delays: EntryDelays,
    pub tool: ToolSpec,
}

static PYBOARD: BoardProfile = BoardProfile {
    arch: "ARM",
    cpu: "stm32f405",
    pins: PinMap {
        rst: 17,
        prg: 18,
        pwr: 27,
        opt: 22,
    },
    expected_kind: FileKind::RawBinary,
    entry_delays: STANDARD_ENTRY,
    tool: ToolSpec {
        program: "dfu-util",
        invocation: Invocation::DfuDownload {
            offset: "0x08000000",
        },
        success_phrase: "File downloaded successfully",
    },
};

static STM32F407_DISCO: BoardProfile = BoardProfile {
    arch: "ARM",
    cpu: "stm32f407",
    pins: PinMap {
        rst: 5,
        prg: 6,
        pwr: 13,
        opt: 19,
    },
    expected_kind: FileKind::RawBinary,
    entry_delays: STANDARD_ENTRY,
    tool: ToolSpec {
        program: "openocd",
        invocation: Invocation::OpenOcdProgram {
            config: "stm32f407g-disc1.cfg",
            offset: "0x08000000",
        },
        success_phrase: "** Programming Finished **",
    },
};

static MSP430F5529: BoardProfile = BoardProfile {
    arch: "MSP430",
    cpu: "msp430f5529",
    pins: PinMap {
        rst: 20,
        prg: 16,
        pwr: 21,
        opt: 12,
    },
    expected_kind: FileKind::RawBinary,
    entry_delays: STANDARD_ENTRY,
    tool: ToolSpec {
        program: "mspdebug",
        invocation: Invocation::MspDebugProg { driver: "tilib" },
        success_phrase: "Done",
    },
};

static NA_SATBUS_3C0: BoardProfile = BoardProfile {
    arch: "ARM",
    cpu: "stm32f405",
    pins: PinMap {
        rst: 23,
        prg: 24,
        pwr: 25,
        opt: 8,
    },
    expected_kind: FileKind::RawBinary,
    entry_delays: STANDARD_ENTRY,
    tool: ToolSpec {
        program: "openocd",
        invocation: Invocation::OpenOcdCommand {
            config: "na-satbus-3c0.cfg",
            command: "stm32f4_flash",
        },
        success_phrase: "** Programming Finished **",
    },
};

impl BoardKind {
    pub fn profile(&self) -> &'static BoardProfile {
        match self {
            BoardKind::Pyboard => &PYBOARD,
            BoardKind::Stm32f407Disco => &STM32F407_DISCO,
            BoardKind::Msp430f5529 => &MSP430F5529,
            BoardKind::NaSatbus3c0 => &NA_SATBUS_3C0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    #[test]
    fn test_pin_numbers_unique_within_each_profile() {
        for kind in BoardKind::ALL {
            let pins = kind.profile().pins.as_claims();
            let numbers: HashSet<u8> = pins.iter().map(|&(_, n)| n).collect();
            assert_eq!(numbers.len(), pins.len(), "{kind} has duplicate pins");
        }
    }

    #[test]
    fn test_dfu_argv() {
        let argv = PYBOARD.tool.argv(&PathBuf::from("/tmp/app.bin"));
        assert_eq!(
            argv,
            vec!["--alt", "0", "-D", "/tmp/app.bin", "-i", "0", "-s", "0x08000000"]
        );
    }

    #[test]
    fn test_openocd_program_argv() {
        let argv = STM32F407_DISCO.tool.argv(&PathBuf::from("app.bin"));
        assert_eq!(argv[0], "-f");
        assert_eq!(argv[1], "stm32f407g-disc1.cfg");
        assert_eq!(argv[3], "program app.bin verify reset exit 0x08000000");
    }

    #[test]
    fn test_custom_command_argv() {
        let argv = NA_SATBUS_3C0.tool.argv(&PathBuf::from("app.bin"));
        assert_eq!(argv[3], "stm32f4_flash app.bin");
    }

    #[test]
    fn test_mspdebug_argv() {
        let argv = MSP430F5529.tool.argv(&PathBuf::from("app.bin"));
        assert_eq!(argv, vec!["tilib", "prog app.bin"]);
    }
}
