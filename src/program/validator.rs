//! Structural validation of conditional nesting
//!
//! Drives the same [`ConditionStack`] as execution with every condition
//! treated as true, so no agent state is needed. Comparators and operands
//! are never inspected.

use super::condition::ConditionStack;
use super::instruction::{CondFlags, Instruction, ItemType};
use crate::error::ValidationError;

/// Action kinds present anywhere in a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionsUsed {
    /// Contains a deny/allow instruction
    pub deny: bool,
    /// Contains a penalty instruction
    pub penalty: bool,
}

impl ActionsUsed {
    /// True if execution can never change the default result
    pub fn is_empty(&self) -> bool {
        !self.deny && !self.penalty
    }
}

/// Checks that `items` forms correctly nested if/else-if/or-if/else/end-if chains.
///
/// Returns the action summary on success.
pub fn validate(items: &[Instruction]) -> Result<ActionsUsed, ValidationError> {
    let mut stack = ConditionStack::new();
    let mut used = ActionsUsed::default();

    for (offset, &item) in items.iter().enumerate() {
        if !item.is_conditional() {
            match item.kind() {
                ItemType::PfDeny => used.deny = true,
                ItemType::PfPenalty => used.penalty = true,
                _ => {}
            }
            continue;
        }

        let flags = item.cond_flags();
        if item.is_endif_word() {
            if stack.is_empty() {
                return Err(ValidationError::NoMatchingIf { offset });
            }
            if flags.contains(CondFlags::ELSE) {
                if stack.seen_else() {
                    return Err(ValidationError::DuplicateElse { offset });
                }
                stack.handle(flags, || true);
                stack.mark_else();
            } else {
                stack.pop();
            }
        } else {
            if flags.is_continuation() {
                if stack.is_empty() {
                    return Err(ValidationError::ChainWithoutIf { offset });
                }
                if stack.seen_else() {
                    return Err(ValidationError::ChainAfterElse { offset });
                }
            }
            stack.handle(flags, || true);
        }
    }

    if !stack.is_empty() {
        return Err(ValidationError::UnterminatedBlock {
            open_blocks: stack.depth(),
        });
    }
    Ok(used)
}
