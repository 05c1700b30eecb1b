//! Flash session - high-level orchestrator.
//!
//! Drives one complete flashing attempt, strictly sequentially: resolve a
//! target, validate the artifact, enter programming mode, invoke the tool,
//! clean up. Any stage's failure aborts all later stages. Nothing in here
//! retries; a caller that wants another attempt starts a fresh session from
//! programming-mode entry.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::artifact::{ArtifactError, BinaryArtifact};
use crate::board::{BoardKind, Target, UnsupportedBoardError};
use crate::events::{FlashEvent, FlashObserver, FlashPhase, TracingObserver};
use crate::gpio::{GpioController, HardwareError};
use crate::registry;
use crate::tool::{FlashOutcome, SystemToolRunner, ToolError, ToolRunner};
use crate::usb::{self, DetectionError};

/// Environment variables the bench expects to be set. Presence only; the
/// values are not validated.
pub const REQUIRED_ENV: &[&str] = &["LD_LIBRARY_PATH", "LIBUSB_LIBRARY"];

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No firmware file configured")]
    MissingFirmware,

    #[error(transparent)]
    UnsupportedBoard(#[from] UnsupportedBoardError),

    #[error("Artifact rejected for {board}: {reason}")]
    ArtifactRejected { board: &'static str, reason: String },

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Overall result of a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Tool confirmed the write.
    Confirmed,
    /// Tool exited cleanly without its success phrase; caller judgment.
    Unconfirmed,
}

/// Configuration for a flashing session.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Board name; when absent the session falls back to USB auto-detection.
    pub board: Option<String>,
    /// Path to the firmware artifact.
    pub firmware: Option<PathBuf>,
    /// Declared artifact architecture; defaults to the board's own.
    pub arch: Option<String>,
    /// Release (drive low and unexport) all pins when done.
    pub free_pins: bool,
    /// Power the board down when done.
    pub shutdown: bool,
}

impl SessionConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SessionConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Orchestrates one flashing attempt against one board.
pub struct FlashSession<O: FlashObserver> {
    config: SessionConfig,
    gpio: GpioController,
    runner: Box<dyn ToolRunner>,
    observer: Arc<O>,
}

impl FlashSession<TracingObserver> {
    /// Create a session with the production tool runner and tracing observer.
    pub fn new(config: SessionConfig, gpio: GpioController) -> Self {
        Self::with_parts(
            config,
            gpio,
            Box::new(SystemToolRunner),
            Arc::new(TracingObserver),
        )
    }
}

impl<O: FlashObserver + 'static> FlashSession<O> {
    pub fn with_parts(
        config: SessionConfig,
        gpio: GpioController,
        runner: Box<dyn ToolRunner>,
        observer: Arc<O>,
    ) -> Self {
        Self {
            config,
            gpio,
            runner,
            observer,
        }
    }

    fn phase(&self, from: FlashPhase, to: FlashPhase) {
        self.observer.on_event(&FlashEvent::PhaseChanged { from, to });
    }

    /// Resolve the board to flash: explicit name first, USB detection as the
    /// fallback. An unknown name or an empty detection is fatal to the
    /// session; no default target exists.
    fn resolve_target(&self) -> Result<BoardKind, SessionError> {
        if let Some(name) = &self.config.board {
            return Ok(registry::resolve_by_name(name)?);
        }

        info!("No board name configured, trying USB auto-detection");
        let devices = usb::scan()?;
        let entry = registry::detect_connected_board(&devices)?;
        self.observer.on_event(&FlashEvent::DeviceDetected {
            device_id: entry.key.to_string(),
            name: entry.friendly_name.to_string(),
        });
        entry
            .board_kind()
            .ok_or(SessionError::Detection(DetectionError::NoSupportedDevice))
    }

    /// Run the complete flashing sequence.
    #[instrument(skip(self))]
    pub fn run(&mut self) -> Result<SessionOutcome, SessionError> {
        let kind = self.resolve_target()?;
        self.observer
            .on_event(&FlashEvent::TargetResolved { board: kind.name() });

        self.phase(FlashPhase::ResolvingTarget, FlashPhase::ValidatingArtifact);
        let path = self
            .config
            .firmware
            .clone()
            .ok_or(SessionError::MissingFirmware)?;
        let declared_arch = self
            .config
            .arch
            .clone()
            .unwrap_or_else(|| kind.profile().arch.to_string());
        let mut artifact = BinaryArtifact::open(&path, &declared_arch)?;
        artifact.validate()?;

        let mut target = Target::acquire(kind, &self.gpio)?;
        if let Some(reason) = target.rejection_reason(&artifact) {
            target.release_pins();
            return Err(SessionError::ArtifactRejected {
                board: kind.name(),
                reason,
            });
        }
        self.observer.on_event(&FlashEvent::ArtifactValidated {
            file: artifact.file_name.clone(),
            kind: artifact.kind.to_string(),
            size: artifact.size,
        });

        self.phase(
            FlashPhase::ValidatingArtifact,
            FlashPhase::EnteringProgrammingMode,
        );
        if let Err(e) = target.enter_programming_mode() {
            target.release_pins();
            return Err(e.into());
        }

        self.phase(FlashPhase::EnteringProgrammingMode, FlashPhase::Flashing);
        self.observer.on_event(&FlashEvent::ToolInvoked {
            program: target.profile().tool.program.to_string(),
        });
        let outcome = match target.flash(&artifact, self.runner.as_ref()) {
            Ok(o) => o,
            Err(e) => {
                target.release_pins();
                return Err(e.into());
            }
        };
        self.observer.on_event(&FlashEvent::Outcome { outcome });

        self.phase(FlashPhase::Flashing, FlashPhase::Cleanup);
        if self.config.shutdown {
            if let Err(e) = target.power_down() {
                target.release_pins();
                return Err(e.into());
            }
        }
        if self.config.free_pins {
            target.release_pins();
        } else {
            target.relinquish_pins();
        }
        self.phase(FlashPhase::Cleanup, FlashPhase::Complete);

        Ok(match outcome {
            FlashOutcome::Confirmed => SessionOutcome::Confirmed,
            FlashOutcome::Unconfirmed => SessionOutcome::Unconfirmed,
        })
    }
}

/// Report which of the given environment variables are unset or empty.
pub fn check_environment(names: &[&str]) -> Vec<String> {
    names
        .iter()
        .filter(|name| {
            std::env::var_os(name)
                .map(|value| value.is_empty())
                .unwrap_or(true)
        })
        .map(|name| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullObserver;
    use crate::gpio::MockPinDriver;
    use crate::tool::MockToolRunner;
    use std::path::Path;

    fn write_artifact(name: &str, data: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join("pinflash-session-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    fn raw_binary(name: &str) -> PathBuf {
        write_artifact(name, &[0x00, 0x20, 0x00, 0x20, 0xAD, 0x01, 0x00, 0x08])
    }

    fn elf_binary(name: &str) -> PathBuf {
        let mut data = vec![0u8; 0x40];
        data[0..4].copy_from_slice(b"\x7fELF");
        data[5] = 1;
        data[0x12] = 0x28;
        write_artifact(name, &data)
    }

    struct Parts {
        driver: Arc<MockPinDriver>,
        runner: Arc<MockToolRunner>,
    }

    fn session(config: SessionConfig) -> (FlashSession<NullObserver>, Parts) {
        let driver = Arc::new(MockPinDriver::new());
        let runner = Arc::new(MockToolRunner::new());
        let gpio = GpioController::new(driver.clone());
        let session = FlashSession::with_parts(
            config,
            gpio,
            Box::new(SharedRunner(runner.clone())),
            Arc::new(NullObserver),
        );
        (session, Parts { driver, runner })
    }

    // Lets tests keep a handle on the runner the session consumes.
    struct SharedRunner(Arc<MockToolRunner>);

    impl ToolRunner for SharedRunner {
        fn resolve(&self, program: &str) -> Result<PathBuf, ToolError> {
            self.0.resolve(program)
        }
        fn run(&self, program: &str, args: &[String]) -> Result<crate::tool::ToolOutput, ToolError> {
            self.0.run(program, args)
        }
    }

    fn pyboard_config(firmware: &Path) -> SessionConfig {
        SessionConfig {
            board: Some("pyboard-gcc".into()),
            firmware: Some(firmware.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_confirmed_flash() {
        let fw = raw_binary("ok.bin");
        let (mut session, parts) = session(pyboard_config(&fw));
        parts.runner.queue_stdout("File downloaded successfully");

        assert_eq!(session.run().unwrap(), SessionOutcome::Confirmed);
        assert_eq!(parts.runner.invocations().len(), 1);
    }

    #[test]
    fn test_unconfirmed_is_not_an_error() {
        let fw = raw_binary("quiet.bin");
        let (mut session, parts) = session(pyboard_config(&fw));
        parts.runner.queue_stdout("Download done, status unknown");

        assert_eq!(session.run().unwrap(), SessionOutcome::Unconfirmed);
    }

    #[test]
    fn test_unknown_board_aborts_before_anything_runs() {
        let fw = raw_binary("never.bin");
        let mut config = pyboard_config(&fw);
        config.board = Some("frdm-k64f-gcc".into());
        let (mut session, parts) = session(config);

        assert!(matches!(
            session.run(),
            Err(SessionError::UnsupportedBoard(_))
        ));
        assert!(parts.runner.invocations().is_empty());
        assert!(parts.driver.transitions().is_empty());
    }

    #[test]
    fn test_elf_artifact_aborts_before_tool_invocation() {
        let fw = elf_binary("container.elf");
        let (mut session, parts) = session(pyboard_config(&fw));

        match session.run() {
            Err(SessionError::ArtifactRejected { board, reason }) => {
                assert_eq!(board, "pyboard-gcc");
                assert!(reason.contains("ELF"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(parts.runner.invocations().is_empty());
    }

    #[test]
    fn test_arch_mismatch_aborts() {
        let fw = raw_binary("wrongarch.bin");
        let mut config = pyboard_config(&fw);
        config.arch = Some("MSP430".into());
        let (mut session, parts) = session(config);

        assert!(matches!(
            session.run(),
            Err(SessionError::ArtifactRejected { .. })
        ));
        assert!(parts.runner.invocations().is_empty());
    }

    #[test]
    fn test_missing_firmware_path() {
        let (mut session, _) = session(SessionConfig {
            board: Some("pyboard-gcc".into()),
            ..Default::default()
        });
        assert!(matches!(session.run(), Err(SessionError::MissingFirmware)));
    }

    #[test]
    fn test_tool_failure_is_surfaced_for_caller_retry() {
        let fw = raw_binary("fails.bin");
        let (mut session, parts) = session(pyboard_config(&fw));
        parts.runner.queue_failure("dfu-util", 74, "Lost device after RESET");

        assert!(matches!(session.run(), Err(SessionError::Tool(_))));

        // The whole sequence may be retried from scratch by the caller.
        parts.runner.queue_stdout("File downloaded successfully");
        let gpio = GpioController::new(parts.driver.clone());
        let mut retry = FlashSession::with_parts(
            pyboard_config(&fw),
            gpio,
            Box::new(SharedRunner(parts.runner.clone())),
            Arc::new(NullObserver),
        );
        assert_eq!(retry.run().unwrap(), SessionOutcome::Confirmed);
    }

    #[test]
    fn test_missing_tool_binary() {
        let fw = raw_binary("notool.bin");
        let (mut session, parts) = session(pyboard_config(&fw));
        parts.runner.remove_program("dfu-util");

        assert!(matches!(
            session.run(),
            Err(SessionError::Tool(ToolError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_free_pins_flag_releases_the_claim() {
        let fw = raw_binary("freepins.bin");
        let mut config = pyboard_config(&fw);
        config.free_pins = true;
        let (mut session, parts) = session(config);
        parts.runner.queue_stdout("File downloaded successfully");

        session.run().unwrap();
        assert!(!parts.driver.released().is_empty());
    }

    #[test]
    fn test_pins_left_configured_without_free_pins() {
        let fw = raw_binary("keeppins.bin");
        let (mut session, parts) = session(pyboard_config(&fw));
        parts.runner.queue_stdout("File downloaded successfully");

        session.run().unwrap();
        assert!(parts.driver.released().is_empty());
    }

    #[test]
    fn test_shutdown_flag_powers_board_down() {
        let fw = raw_binary("shutdown.bin");
        let mut config = pyboard_config(&fw);
        config.shutdown = true;
        let (mut session, parts) = session(config);
        parts.runner.queue_stdout("File downloaded successfully");

        session.run().unwrap();
        // pwr pin of the pyboard profile driven low during cleanup.
        assert!(parts
            .driver
            .transitions()
            .contains(&(27, crate::gpio::Level::Low)));
    }

    #[test]
    fn test_config_round_trip() {
        let dir = std::env::temp_dir().join("pinflash-session-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("session.toml");

        let config = SessionConfig {
            board: Some("stm32f407-disco-gcc".into()),
            firmware: Some(PathBuf::from("/srv/firmware/app.bin")),
            arch: None,
            free_pins: true,
            shutdown: false,
        };
        config.save_to_file(&path).unwrap();

        let loaded = SessionConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.board.as_deref(), Some("stm32f407-disco-gcc"));
        assert!(loaded.free_pins);
        assert!(!loaded.shutdown);
    }

    #[test]
    fn test_check_environment_reports_missing() {
        // SAFETY: single-threaded mutation of a test-only variable name.
        unsafe { std::env::set_var("PINFLASH_TEST_ENV_SET", "1") };
        let missing = check_environment(&["PINFLASH_TEST_ENV_SET", "PINFLASH_TEST_ENV_UNSET"]);
        assert_eq!(missing, vec!["PINFLASH_TEST_ENV_UNSET"]);
    }
}
