//! Restriction programs: instruction words, execution and validation
//!
//! ## Module Structure
//!
//! ```text
//! program/
//! ├── mod.rs          # Program, ProgramId
//! ├── instruction.rs  # Packed instruction word and its field enums
//! ├── condition.rs    # Condition stack shared by execution and validation
//! ├── evaluator.rs    # execute(), AgentState, ProgramResult
//! └── validator.rs    # validate(), ActionsUsed
//! ```

mod condition;
mod evaluator;
mod instruction;
mod validator;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use evaluator::{
    execute, AgentState, EntryDirection, EvaluationContext, ProgramResult, TILE_LENGTH,
};
pub use instruction::{
    CondFlags, CondOp, Instruction, ItemType, OpClass, PenaltyPreset, TypeProperties, ValueClass,
    COND_TYPE_BEGIN, ENCODING_VERSION,
};
pub use validator::{validate, ActionsUsed};

/// Stable identity of a program in the [`ProgramStore`](crate::store::ProgramStore)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(pub u32);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Instruction sequence shared by one or more routing points
#[derive(Debug, Clone, Default)]
pub struct Program {
    items: Vec<Instruction>,
    refcount: u32,
    actions_used: ActionsUsed,
}

impl Program {
    /// Instructions in execution order
    pub fn items(&self) -> &[Instruction] {
        &self.items
    }

    /// Number of routing points bound to this program
    pub fn refcount(&self) -> u32 {
        self.refcount
    }

    /// Action kinds present in the program
    pub fn actions_used(&self) -> ActionsUsed {
        self.actions_used
    }

    /// Instruction count
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the program has no instructions
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Runs the program against one agent
    pub fn execute<S: AgentState + ?Sized>(&self, state: &S) -> ProgramResult {
        if self.actions_used.is_empty() {
            return ProgramResult::default();
        }
        execute(&self.items, state)
    }

    /// Replaces the instructions with an already validated sequence
    pub(crate) fn commit(&mut self, items: Vec<Instruction>, actions_used: ActionsUsed) {
        self.items = items;
        self.actions_used = actions_used;
    }

    pub(crate) fn increment_refcount(&mut self) {
        self.refcount += 1;
    }

    /// Returns the remaining count
    pub(crate) fn decrement_refcount(&mut self) -> u32 {
        debug_assert!(self.refcount > 0, "refcount underflow");
        self.refcount = self.refcount.saturating_sub(1);
        self.refcount
    }
}
