//! The board instance a flashing session drives.

use tracing::{info, instrument, warn};

use crate::artifact::BinaryArtifact;
use crate::gpio::{GpioController, HardwareError, Level, PinClaim};
use crate::tool::{FlashOutcome, ToolError, ToolRunner};

use super::kind::BoardKind;
use super::profile::BoardProfile;
use super::sequence;

/// One board, bound to its profile and exclusively owning its harness pins
/// for the duration of a session.
pub struct Target {
    kind: BoardKind,
    profile: &'static BoardProfile,
    claim: PinClaim,
}

impl Target {
    /// Claim the board's pins and bind its profile. Fails fast if another
    /// session holds any of the pins.
    pub fn acquire(kind: BoardKind, gpio: &GpioController) -> Result<Self, HardwareError> {
        let profile = kind.profile();
        let claim = gpio.claim(&profile.pins.as_claims())?;
        info!(board = %kind, arch = profile.arch, cpu = profile.cpu, "Target acquired");
        Ok(Self {
            kind,
            profile,
            claim,
        })
    }

    pub fn kind(&self) -> BoardKind {
        self.kind
    }

    pub fn profile(&self) -> &'static BoardProfile {
        self.profile
    }

    /// Reboot the board into its bootloader via the timed pin sequence.
    #[instrument(skip(self), fields(board = %self.kind))]
    pub fn enter_programming_mode(&mut self) -> Result<(), HardwareError> {
        sequence::enter_programming_mode(&mut self.claim, &self.profile.entry_delays)
    }

    /// True iff the artifact has been validated and both its detected
    /// container format and declared architecture match this board. Pure;
    /// no side effects. Must hold before `flash` is invoked.
    pub fn verify_artifact(&self, artifact: &BinaryArtifact) -> bool {
        artifact.is_validated()
            && artifact.kind == self.profile.expected_kind
            && artifact.declared_arch == self.profile.arch
    }

    /// Why `verify_artifact` would reject this artifact, for diagnostics.
    pub fn rejection_reason(&self, artifact: &BinaryArtifact) -> Option<String> {
        if !artifact.is_validated() {
            return Some("artifact was not validated".to_string());
        }
        if artifact.kind != self.profile.expected_kind {
            let embedded = artifact
                .embedded_arch
                .map(|a| format!(" (contains {a} code)"))
                .unwrap_or_default();
            return Some(format!(
                "file type is {}{embedded}, expected {}",
                artifact.kind, self.profile.expected_kind
            ));
        }
        if artifact.declared_arch != self.profile.arch {
            return Some(format!(
                "declared architecture is {}, expected {}",
                artifact.declared_arch, self.profile.arch
            ));
        }
        None
    }

    /// Invoke the board's external tool on a validated, verified artifact.
    ///
    /// Precondition: `artifact.is_validated()` and `verify_artifact` is
    /// true; the session enforces this before any pin or tool activity.
    #[instrument(skip(self, artifact, runner), fields(board = %self.kind, tool = self.profile.tool.program))]
    pub fn flash(
        &self,
        artifact: &BinaryArtifact,
        runner: &dyn ToolRunner,
    ) -> Result<FlashOutcome, ToolError> {
        let tool = &self.profile.tool;
        let firmware = artifact.abspath().map_err(|source| ToolError::Io {
            program: tool.program.to_string(),
            source,
        })?;
        let argv = tool.argv(&firmware);

        let output = runner.run(tool.program, &argv)?;

        if output.stdout.contains(tool.success_phrase) {
            info!(board = %self.kind, "Flash confirmed by tool output");
            Ok(FlashOutcome::Confirmed)
        } else {
            warn!(
                board = %self.kind,
                phrase = tool.success_phrase,
                "Tool exited cleanly but did not confirm the write"
            );
            Ok(FlashOutcome::Unconfirmed)
        }
    }

    /// Deassert the board's power-enable line.
    pub fn power_down(&mut self) -> Result<(), HardwareError> {
        info!(board = %self.kind, "Powering board down");
        self.claim.set("pwr", Level::Low)
    }

    /// Release all pins back to the controller. Idempotent.
    pub fn release_pins(&mut self) {
        self.claim.release_all();
    }

    /// Return the pins without driving them, leaving the board as-is.
    pub fn relinquish_pins(self) {
        self.claim.relinquish();
    }
}
