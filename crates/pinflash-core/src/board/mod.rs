//! Board model: supported variants, per-variant profiles, programming-mode
//! sequencing, and the `Target` a flashing session drives.

pub mod kind;
pub mod profile;
pub mod sequence;
pub mod target;

pub use kind::{BoardKind, UnsupportedBoardError};
pub use profile::{BoardProfile, EntryDelays, Invocation, PinMap, ToolSpec};
pub use sequence::ProgState;
pub use target::Target;
