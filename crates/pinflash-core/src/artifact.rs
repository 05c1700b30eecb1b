//! Firmware artifact inspection.
//!
//! A `BinaryArtifact` describes the file handed to a flashing session: where
//! it lives, what architecture the caller says it was built for, and what
//! container format it actually is. Detection looks at file content, not the
//! extension, so an `.bin` that is really an ELF is caught before any tool
//! runs.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Artifact is empty: {}", path.display())]
    Empty { path: PathBuf },

    #[error("IO error reading artifact: {0}")]
    Io(#[from] io::Error),
}

/// Detected container format of a firmware file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Flat binary image, directly flashable.
    RawBinary,
    /// ELF container (not flashable by the raw-binary tools).
    Elf,
    /// Intel HEX text records.
    IntelHex,
    /// Zero-length file.
    Empty,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::RawBinary => write!(f, "raw binary"),
            FileKind::Elf => write!(f, "ELF"),
            FileKind::IntelHex => write!(f, "Intel HEX"),
            FileKind::Empty => write!(f, "empty"),
        }
    }
}

/// Validated descriptor of a firmware file.
#[derive(Debug, Clone)]
pub struct BinaryArtifact {
    pub path: PathBuf,
    pub file_name: String,
    pub declared_arch: String,
    pub kind: FileKind,
    pub size: u64,
    /// Architecture named inside an ELF header, for diagnostics only.
    pub embedded_arch: Option<&'static str>,
    validated: bool,
}

impl BinaryArtifact {
    /// Read a firmware file and detect its container format.
    pub fn open(path: &Path, declared_arch: &str) -> Result<Self, ArtifactError> {
        let data = std::fs::read(path)?;
        let kind = detect_file_kind(&data);
        let embedded_arch = match kind {
            FileKind::Elf => elf_machine_name(&data),
            _ => None,
        };
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        debug!(
            file = %file_name,
            kind = %kind,
            size = data.len(),
            "Artifact inspected"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            declared_arch: declared_arch.to_string(),
            kind,
            size: data.len() as u64,
            embedded_arch,
            validated: false,
        })
    }

    /// Run the board-independent checks and freeze the descriptor.
    ///
    /// Must be called before the artifact may be flashed; the board-specific
    /// kind/architecture match happens in `Target::verify_artifact`.
    pub fn validate(&mut self) -> Result<(), ArtifactError> {
        if self.kind == FileKind::Empty {
            return Err(ArtifactError::Empty {
                path: self.path.clone(),
            });
        }
        self.validated = true;
        Ok(())
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Absolute path handed to the external tool.
    pub fn abspath(&self) -> io::Result<PathBuf> {
        std::fs::canonicalize(&self.path)
    }
}

fn detect_file_kind(data: &[u8]) -> FileKind {
    if data.is_empty() {
        return FileKind::Empty;
    }
    if data.len() >= 4 && &data[0..4] == b"\x7fELF" {
        return FileKind::Elf;
    }
    if is_intel_hex(data) {
        return FileKind::IntelHex;
    }
    FileKind::RawBinary
}

// An Intel HEX file starts each line with ':' followed by hex digit pairs.
// Checking the first record is enough to tell it from a flat image.
fn is_intel_hex(data: &[u8]) -> bool {
    if data.first() != Some(&b':') {
        return false;
    }
    let line_end = data
        .iter()
        .position(|&b| b == b'\n' || b == b'\r')
        .unwrap_or(data.len());
    let body = &data[1..line_end];
    body.len() >= 10 && body.iter().all(|b| b.is_ascii_hexdigit())
}

/// Decode the `e_machine` field of an ELF header to a human-readable name.
fn elf_machine_name(data: &[u8]) -> Option<&'static str> {
    if data.len() < 0x14 {
        return None;
    }
    // EI_DATA at offset 5 selects the header byte order.
    let machine = match data[5] {
        1 => LittleEndian::read_u16(&data[0x12..0x14]),
        2 => BigEndian::read_u16(&data[0x12..0x14]),
        _ => return None,
    };
    match machine {
        0x03 => Some("x86"),
        0x28 => Some("ARM"),
        0x3E => Some("x86-64"),
        0x69 => Some("MSP430"),
        0xF3 => Some("RISC-V"),
        _ => None,
    }
}
