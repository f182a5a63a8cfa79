//! # Routing Restrict - Conditional Routing Rules for Signals
//!
//! Small, user-authored programs attached to signals on a track network. When
//! the pathfinder considers a route through a restricted signal it runs the
//! program against the train's state and gets back a routing decision: whether
//! passage is denied and how much extra cost to add to the path.
//!
//! ## Quick Start
//!
//! ```rust
//! use routing_restrict::{
//!     CondOp, EditOp, EvaluationContext, Instruction, ItemType, ProgramResult, Restrictions,
//!     RoutingPoint, TileIndex, Track,
//! };
//!
//! # fn main() -> routing_restrict::Result<()> {
//! let signal = RoutingPoint::new(TileIndex(1042), Track::X);
//! let mut restrictions = Restrictions::default();
//!
//! // if train length > 5 / penalty 10 / end if
//! restrictions.apply(
//!     signal,
//!     EditOp::Insert {
//!         offset: 0,
//!         item: Instruction::if_cond(ItemType::CondTrainLength, CondOp::MoreThan, 5),
//!     },
//! )?;
//! restrictions.apply(
//!     signal,
//!     EditOp::Insert { offset: 1, item: Instruction::penalty(10) },
//! )?;
//!
//! let long = EvaluationContext::with_length_tiles(8);
//! let short = EvaluationContext::with_length_tiles(3);
//! assert_eq!(
//!     restrictions.evaluate(signal, &long),
//!     Some(ProgramResult { deny: false, penalty: 10 })
//! );
//! assert_eq!(restrictions.evaluate(signal, &short), Some(ProgramResult::default()));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Command → ownership check → Edit → validate → Program Store ← Reference Mapping
//!                                                     ↓
//!                                Pathfinder → evaluate(point, agent) → ProgramResult
//! ```
//!
//! ### Main Components
//!
//! - [`Instruction`] - Packed 32-bit program step (condition or action)
//! - [`execute`] - Condition-stack evaluator
//! - [`validate`] - Structural check of if/else-if/or-if/else/end-if nesting
//! - [`ProgramStore`] - Bounded arena of reference-counted programs
//! - [`ReferenceMapping`] - Routing point to program bindings
//! - [`Restrictions`] - Owns store and mapping; edits, sharing, snapshots
//! - [`RestrictionCommand`] - Serializable command with ownership check
//!
//! ## Error Handling
//!
//! Structural, edit-contract and capacity failures come back as [`Error`]
//! values and leave the committed programs untouched. Executing a program
//! that never passed validation is a logic error and panics.

/// Version of the routing restriction library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod command;
pub mod edit;
pub mod error;
pub mod parallel;
pub mod program;
pub mod store;

// Re-export main types
pub use command::{CommandAction, OwnerId, PointOwnership, RestrictionCommand};
pub use edit::{apply_edit, EditOp, EditedProgram};
pub use error::{Error, ErrorSeverity, Result, ValidationError};
pub use parallel::{evaluate_batch, ParallelConfig, SharedRestrictions};
pub use program::{
    execute, validate, ActionsUsed, AgentState, CondFlags, CondOp, EntryDirection,
    EvaluationContext, Instruction, ItemType, PenaltyPreset, Program, ProgramId, ProgramResult,
};
pub use store::{
    ChangeObserver, ProgramStore, ReferenceMapping, RestrictionConfig, RestrictionSnapshot,
    Restrictions, RoutingPoint, TileIndex, Track,
};
