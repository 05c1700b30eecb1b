//! pinflash-core: GPIO-sequenced firmware flashing for bench-attached boards.
//!
//! This crate drives a test-bench harness that can reboot embedded boards
//! into their bootloaders by toggling digital pins, then hands the firmware
//! image to the board's external flashing tool.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Gpio**: pin-driver abstraction, exclusive pin ownership
//! - **Artifact**: firmware file inspection and validation
//! - **Board**: supported variants, profiles, programming-mode sequencing
//! - **Registry**: board-name and USB-identifier resolution tables
//! - **Usb**: device enumeration (textual listings and live scan)
//! - **Tool**: external flasher invocation behind a testable seam
//! - **Events**: observer pattern for UI decoupling
//! - **Session**: high-level orchestrator
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pinflash_core::gpio::{GpioController, SysfsPinDriver};
//! use pinflash_core::session::{FlashSession, SessionConfig};
//!
//! let config = SessionConfig {
//!     board: Some("pyboard-gcc".to_string()),
//!     firmware: Some("app.bin".into()),
//!     ..Default::default()
//! };
//!
//! let gpio = GpioController::new(Arc::new(SysfsPinDriver::new()));
//! let mut session = FlashSession::new(config, gpio);
//! let outcome = session.run().expect("flash failed");
//! println!("{outcome:?}");
//! ```

pub mod artifact;
pub mod board;
pub mod events;
pub mod gpio;
pub mod registry;
pub mod session;
pub mod tool;
pub mod usb;

// Re-exports for convenience
pub use artifact::{ArtifactError, BinaryArtifact, FileKind};
pub use board::{BoardKind, BoardProfile, ProgState, Target, UnsupportedBoardError};
pub use events::{FlashEvent, FlashObserver, FlashPhase, LogLevel, NullObserver, TracingObserver};
pub use gpio::{GpioController, HardwareError, Level, MockPinDriver, PinDriver, SysfsPinDriver};
pub use registry::{UsbEntry, detect_connected_board, resolve_by_name, resolve_usb_identifier};
pub use session::{FlashSession, SessionConfig, SessionError, SessionOutcome, check_environment};
pub use tool::{FlashOutcome, MockToolRunner, SystemToolRunner, ToolError, ToolRunner};
pub use usb::{DetectionError, UsbDevice, parse_device_listing};
