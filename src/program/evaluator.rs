//! Program execution against agent state
//!
//! Execution is a single left-to-right pass over the instruction words with a
//! private [`ConditionStack`]. It never allocates shared state, never logs and
//! never mutates the program, so any number of path searches may evaluate the
//! same program at once.

use serde::{Deserialize, Serialize};

use super::condition::ConditionStack;
use super::instruction::{CondFlags, Instruction, ItemType};

/// Length units per tile; agent lengths are rounded up to whole tiles
pub const TILE_LENGTH: u32 = 16;

/// Side of the routing point the agent enters from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u16)]
pub enum EntryDirection {
    /// Entering from the north-east
    #[default]
    NorthEast = 0,
    /// Entering from the south-east
    SouthEast = 1,
    /// Entering from the south-west
    SouthWest = 2,
    /// Entering from the north-west
    NorthWest = 3,
}

/// Agent properties conditions can observe
///
/// Implemented by [`EvaluationContext`]; simulations may implement it directly
/// on their own agent type to avoid building a snapshot per query.
pub trait AgentState {
    /// Cached total length in length units
    fn total_length(&self) -> u32;
    /// Maximum speed
    fn max_speed(&self) -> u16;
    /// Weight
    fn weight(&self) -> u16;
    /// Side of the routing point being entered
    fn entry_direction(&self) -> EntryDirection;
}

/// Read-only snapshot of an agent at a routing point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Cached total length in length units
    pub total_length: u32,
    /// Maximum speed
    pub max_speed: u16,
    /// Weight
    pub weight: u16,
    /// Side of the routing point being entered
    pub entry_direction: EntryDirection,
}

impl EvaluationContext {
    /// Context for an agent `tiles` tiles long, everything else zero
    pub fn with_length_tiles(tiles: u32) -> Self {
        EvaluationContext {
            total_length: tiles.saturating_mul(TILE_LENGTH),
            ..Self::default()
        }
    }
}

impl AgentState for EvaluationContext {
    fn total_length(&self) -> u32 {
        self.total_length
    }

    fn max_speed(&self) -> u16 {
        self.max_speed
    }

    fn weight(&self) -> u16 {
        self.weight
    }

    fn entry_direction(&self) -> EntryDirection {
        self.entry_direction
    }
}

/// Routing decision produced by one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgramResult {
    /// Passage is denied
    pub deny: bool,
    /// Extra path cost
    pub penalty: u32,
}

fn length_in_tiles(total_length: u32) -> u16 {
    let tiles = total_length.div_ceil(TILE_LENGTH);
    u16::try_from(tiles).unwrap_or(u16::MAX)
}

/// Evaluates one condition word. Undefined kinds and comparators are false.
fn test_condition<S: AgentState + ?Sized>(item: Instruction, state: &S) -> bool {
    let Some(op) = item.cond_op() else {
        return false;
    };
    let lhs = match item.kind() {
        ItemType::CondTrainLength => length_in_tiles(state.total_length()),
        ItemType::CondMaxSpeed => state.max_speed(),
        ItemType::CondTrainWeight => state.weight(),
        ItemType::CondEntryDirection => state.entry_direction() as u16,
        _ => return false,
    };
    op.compare(lhs, item.value())
}

/// Executes `items` against `state`.
///
/// # Panics
///
/// On sequences that would not pass [`validate`](super::validate): badly
/// nested chains, or actions of an undefined kind. Those indicate a program
/// that bypassed validation and are treated as logic errors.
pub fn execute<S: AgentState + ?Sized>(items: &[Instruction], state: &S) -> ProgramResult {
    let mut stack = ConditionStack::new();
    let mut result = ProgramResult::default();

    for &item in items {
        if item.is_conditional() {
            let flags = item.cond_flags();
            if item.is_endif_word() {
                if flags.contains(CondFlags::ELSE) {
                    assert!(!stack.is_empty(), "else without an open block");
                    assert!(!stack.seen_else(), "duplicate else in chain");
                    stack.handle(flags, || true);
                    stack.mark_else();
                } else {
                    assert!(stack.pop().is_some(), "end if without an open block");
                }
            } else {
                assert!(
                    !(flags.is_continuation() && stack.is_empty()),
                    "chain continuation without an open block"
                );
                stack.handle(flags, || test_condition(item, state));
            }
        } else if stack.is_active() {
            match item.kind() {
                ItemType::PfDeny => result.deny = item.value() != 0,
                ItemType::PfPenalty => {
                    result.penalty = result.penalty.saturating_add(u32::from(item.value()))
                }
                other => unreachable!("undefined action {:?} reached execution", other),
            }
        }
    }

    assert!(
        stack.is_empty(),
        "condition stack not empty at end of program"
    );
    result
}
