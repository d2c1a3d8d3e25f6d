//! The error surface the engine façade can return.

use thiserror::Error;

/// Errors the public engine API can report.
///
/// Nothing inside the ring bus itself can fail at run time (see
/// [`crate::ik13`]); a malformed ROM is a construction-time fault and
/// aborts instead. A powered-off engine is not an error: [`crate::Engine::do_step`]
/// silently no-ops while power is off.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A key press was made with coordinates outside the key matrix.
    #[error("key ({key1}, {key2}) is outside the key matrix")]
    InvalidKey {
        /// The out-of-range (or otherwise rejected) first key coordinate.
        key1: i32,
        /// The out-of-range (or otherwise rejected) second key coordinate.
        key2: i32,
    },

    /// An accessor was asked for a register enumerant outside its range.
    ///
    /// Callers that stick to the provided [`crate::RegStack`]/[`crate::RegMem`]
    /// enumerations cannot trigger this; it exists for completeness of the
    /// error surface described by the register accessor contract.
    #[error("register enumerant is out of range")]
    InvalidRegister,

    /// A state stream produced fewer bytes than restoring an engine requires.
    #[error("short read while restoring engine state: {0}")]
    SerialisationShortRead(std::io::Error),

    /// A state stream rejected (or failed to accept) a write.
    #[error("error writing engine state: {0}")]
    SerialisationWriteError(std::io::Error),

    /// The state stream did not contain a recognisable engine state.
    #[error("state stream has an unrecognised format")]
    UnrecognisedState,
}
