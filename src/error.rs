//! Error types for routing restriction programs

use thiserror::Error;

use crate::program::ProgramId;
use crate::store::RoutingPoint;

/// Structural faults found while validating conditional nesting
///
/// Offsets are instruction indices into the candidate sequence.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// `else` or `end if` with no open block
    #[error("else/end if at offset {offset} has no matching if")]
    NoMatchingIf {
        /// Offset of the offending instruction
        offset: usize,
    },

    /// Second `else` in the same chain
    #[error("duplicate else at offset {offset}")]
    DuplicateElse {
        /// Offset of the second else
        offset: usize,
    },

    /// `else if`/`or if` with no open block
    #[error("else if/or if at offset {offset} has no matching if")]
    ChainWithoutIf {
        /// Offset of the offending instruction
        offset: usize,
    },

    /// `else if`/`or if` following the chain's `else`
    #[error("else if/or if at offset {offset} follows an else")]
    ChainAfterElse {
        /// Offset of the offending instruction
        offset: usize,
    },

    /// Program ends inside one or more conditional blocks
    #[error("unterminated conditional block ({open_blocks} still open)")]
    UnterminatedBlock {
        /// Number of blocks left open at the end of the program
        open_blocks: usize,
    },
}

/// Routing restriction errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Structural validation errors
    /// Candidate program failed structural validation
    ///
    /// **Triggered by:** An edit or snapshot that leaves if/else/end if badly nested
    /// **Recovery:** The candidate is discarded, the committed program is unchanged
    #[error("Invalid program: {0}")]
    Validation(#[from] ValidationError),

    // Edit contract errors
    /// Modify/remove issued against a routing point with no program
    #[error("No restriction program at {point}")]
    NoProgram {
        /// Routing point the edit addressed
        point: RoutingPoint,
    },

    /// Edit offset outside the program
    ///
    /// **Triggered by:** Insert past `len`, or modify/remove at or past `len`
    #[error("Offset {offset} out of range for program of length {length}")]
    OffsetOutOfRange {
        /// Requested offset
        offset: usize,
        /// Current instruction count
        length: usize,
    },

    /// Modify would turn a condition into an action or vice versa
    #[error("Cannot change conditionality of instruction at offset {offset}")]
    ConditionalityMismatch {
        /// Offset of the slot being modified
        offset: usize,
    },

    /// Remove issued against an `end if`
    #[error("Cannot remove end if at offset {offset}")]
    CannotRemoveEndIf {
        /// Offset of the end if
        offset: usize,
    },

    /// Instruction word that may never be placed in a program
    #[error("Invalid instruction word 0x{raw:08x}")]
    InvalidInstruction {
        /// Raw encoded word
        raw: u32,
    },

    /// Share/copy with the same routing point as source and target
    #[error("Cannot share or copy {point} with itself")]
    SelfReference {
        /// Routing point used on both sides
        point: RoutingPoint,
    },

    /// Caller does not own the addressed routing point
    #[error("Not the owner of {point}")]
    NotOwner {
        /// Routing point the caller tried to modify
        point: RoutingPoint,
    },

    // Capacity errors
    /// Program store has no free slot
    ///
    /// **Triggered by:** Creating a program while `max_programs` are live
    /// **Recovery:** Reported as a creation failure, nothing is mutated
    #[error("Program store full (capacity: {capacity})")]
    StoreFull {
        /// Configured store capacity
        capacity: usize,
    },

    // Persistence errors
    /// Identity does not name a live program
    #[error("Unknown program {id}")]
    UnknownProgram {
        /// Identity that was looked up
        id: ProgramId,
    },

    /// Snapshot written by a newer encoding revision
    #[error("Unsupported snapshot version {found} (supported up to {supported})")]
    UnsupportedVersion {
        /// Version recorded in the snapshot
        found: u32,
        /// Newest version this build understands
        supported: u32,
    },

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    // Internal consistency
    /// Invariant violation, e.g. a removal span that runs off the program
    #[error("Internal error: {0}")]
    Internal(String),

    /// General runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Logic bug elsewhere in the system; the request must not be retried as-is
    Fatal,
    /// Data or request problem reported back to the caller
    Recoverable,
}

impl Error {
    /// Create an internal-consistency error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Create a runtime error with a message
    pub fn runtime(msg: impl Into<String>) -> Self {
        Error::RuntimeError(msg.into())
    }

    /// Classify error severity
    pub fn classify(&self) -> ErrorSeverity {
        match self {
            Error::Internal(_) => ErrorSeverity::Fatal,
            Error::UnknownProgram { .. } => ErrorSeverity::Fatal,
            _ => ErrorSeverity::Recoverable,
        }
    }

    /// Returns the structural fault if this is a validation error
    pub fn validation(&self) -> Option<ValidationError> {
        match self {
            Error::Validation(e) => Some(*e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Snapshot(e.to_string())
    }
}

/// Result type for routing restriction operations
pub type Result<T> = std::result::Result<T, Error>;
