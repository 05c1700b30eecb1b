//! Event system for UI decoupling.
//!
//! Lets a CLI (or any other front end) follow a flashing session without
//! tight coupling to the core logic.

use std::fmt;

use crate::tool::FlashOutcome;

/// Log level for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Stages of a flashing session, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashPhase {
    /// Resolving a board by name or USB auto-detection.
    ResolvingTarget,
    /// Inspecting and validating the firmware artifact.
    ValidatingArtifact,
    /// Timed pin sequence into the bootloader.
    EnteringProgrammingMode,
    /// External tool running.
    Flashing,
    /// Releasing pins / powering down.
    Cleanup,
    /// Session finished.
    Complete,
}

impl fmt::Display for FlashPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashPhase::ResolvingTarget => write!(f, "Resolving Target"),
            FlashPhase::ValidatingArtifact => write!(f, "Validating Artifact"),
            FlashPhase::EnteringProgrammingMode => write!(f, "Entering Programming Mode"),
            FlashPhase::Flashing => write!(f, "Flashing"),
            FlashPhase::Cleanup => write!(f, "Cleanup"),
            FlashPhase::Complete => write!(f, "Complete"),
        }
    }
}

/// Events emitted by a flashing session.
#[derive(Debug, Clone)]
pub enum FlashEvent {
    /// A board was resolved, by name or detection.
    TargetResolved { board: &'static str },
    /// USB auto-detection matched a connected device.
    DeviceDetected { device_id: String, name: String },
    /// The artifact passed inspection.
    ArtifactValidated {
        file: String,
        kind: String,
        size: u64,
    },
    /// Phase changed.
    PhaseChanged { from: FlashPhase, to: FlashPhase },
    /// The external tool was invoked.
    ToolInvoked { program: String },
    /// Final flash classification.
    Outcome { outcome: FlashOutcome },
    /// Log message.
    Log { level: LogLevel, message: String },
}

/// Observer trait for receiving session events.
pub trait FlashObserver: Send + Sync {
    fn on_event(&self, event: &FlashEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl FlashObserver for NullObserver {
    fn on_event(&self, _event: &FlashEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl FlashObserver for TracingObserver {
    fn on_event(&self, event: &FlashEvent) {
        match event {
            FlashEvent::TargetResolved { board } => {
                tracing::info!(board = %board, "Target resolved");
            }
            FlashEvent::DeviceDetected { device_id, name } => {
                tracing::info!(id = %device_id, name = %name, "Device detected");
            }
            FlashEvent::ArtifactValidated { file, kind, size } => {
                tracing::info!(file = %file, kind = %kind, size = size, "Artifact validated");
            }
            FlashEvent::PhaseChanged { from, to } => {
                tracing::info!(from = %from, to = %to, "Phase changed");
            }
            FlashEvent::ToolInvoked { program } => {
                tracing::info!(program = %program, "Tool invoked");
            }
            FlashEvent::Outcome { outcome } => match outcome {
                FlashOutcome::Confirmed => tracing::info!("Flash confirmed"),
                FlashOutcome::Unconfirmed => {
                    tracing::warn!("Flash finished without confirmation")
                }
            },
            FlashEvent::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
        }
    }
}
