//! Single-item program edits
//!
//! [`apply_edit`] is pure: it takes the committed instruction sequence and
//! returns a validated replacement or an error, leaving the input untouched.
//! [`Restrictions::apply`] resolves the routing point, runs it and swaps the
//! result into the shared program in place.

mod manage;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::program::{validate, ActionsUsed, CondFlags, Instruction};
use crate::store::{Restrictions, RoutingPoint};

/// One item edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditOp {
    /// Insert `item` before `offset` (`offset == len` appends)
    Insert {
        /// Insert position
        offset: usize,
        /// New instruction
        item: Instruction,
    },
    /// Replace the instruction at `offset`
    Modify {
        /// Slot to replace
        offset: usize,
        /// Replacement instruction
        item: Instruction,
    },
    /// Remove the instruction at `offset`, or the whole block it opens
    Remove {
        /// Slot to remove
        offset: usize,
    },
}

impl EditOp {
    /// Offset the edit addresses
    pub fn offset(&self) -> usize {
        match *self {
            EditOp::Insert { offset, .. }
            | EditOp::Modify { offset, .. }
            | EditOp::Remove { offset } => offset,
        }
    }
}

/// Validated replacement sequence produced by an edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedProgram {
    /// New instruction sequence
    pub items: Vec<Instruction>,
    /// Action summary of `items`
    pub actions_used: ActionsUsed,
}

/// Applies `op` to a copy of `items` and validates the result
pub fn apply_edit(items: &[Instruction], op: EditOp) -> Result<EditedProgram> {
    let length = items.len();
    let offset = op.offset();
    let in_range = match op {
        EditOp::Insert { .. } => offset <= length,
        EditOp::Modify { .. } | EditOp::Remove { .. } => offset < length,
    };
    if !in_range {
        return Err(Error::OffsetOutOfRange { offset, length });
    }

    let mut candidate = items.to_vec();
    match op {
        EditOp::Insert { item, .. } => {
            check_placeable(item)?;
            candidate.insert(offset, item);
            if item.opens_block() {
                candidate.insert(offset + 1, Instruction::end_if());
            }
        }
        EditOp::Modify { item, .. } => {
            check_placeable(item)?;
            let slot = &mut candidate[offset];
            if slot.is_conditional() != item.is_conditional() {
                return Err(Error::ConditionalityMismatch { offset });
            }
            *slot = item;
        }
        EditOp::Remove { .. } => remove_at(&mut candidate, offset)?,
    }

    let actions_used = validate(&candidate)?;
    Ok(EditedProgram {
        items: candidate,
        actions_used,
    })
}

fn check_placeable(item: Instruction) -> Result<()> {
    if item.is_placeable() {
        Ok(())
    } else {
        Err(Error::InvalidInstruction { raw: item.raw() })
    }
}

/// Removes the instruction at `offset`.
///
/// Actions and `or if` go alone. An opening `if` takes its whole block up to
/// and including the matching `end if`. `else if`/`else` take their branch up
/// to, but not including, the next member of the same chain or its `end if`.
fn remove_at(items: &mut Vec<Instruction>, offset: usize) -> Result<()> {
    let item = items[offset];
    if item.is_end_if() {
        return Err(Error::CannotRemoveEndIf { offset });
    }
    if !item.is_conditional() || item.cond_flags() == CondFlags::OR {
        items.remove(offset);
        return Ok(());
    }

    let whole_block = item.opens_block();
    let mut depth = 1usize;
    let mut end = None;
    for (index, current) in items.iter().enumerate().skip(offset + 1) {
        if current.is_end_if() {
            depth -= 1;
            if depth == 0 {
                end = Some(if whole_block { index + 1 } else { index });
                break;
            }
        } else if current.opens_block() {
            depth += 1;
        } else if current.is_conditional() && depth == 1 && !whole_block {
            end = Some(index);
            break;
        }
    }

    let Some(end) = end else {
        return Err(Error::internal(format!(
            "no end if closes the block opened at offset {}",
            offset
        )));
    };
    items.drain(offset..end);
    Ok(())
}

impl Restrictions {
    /// Applies one edit to the program at `point`.
    ///
    /// Inserts may create the program. The edit lands in the shared program,
    /// so every routing point bound to it sees the change.
    pub fn apply(&mut self, point: RoutingPoint, op: EditOp) -> Result<()> {
        let existing = self.lookup(point);
        let current = match existing {
            Some(id) => self.program_mut(id)?.items().to_vec(),
            None if matches!(op, EditOp::Insert { .. }) => Vec::new(),
            None => return Err(Error::NoProgram { point }),
        };

        let edited = match apply_edit(&current, op) {
            Ok(edited) => edited,
            Err(e) => {
                tracing::warn!(%point, ?op, "rejected program edit: {}", e);
                return Err(e);
            }
        };

        let id = match existing {
            Some(id) => id,
            None => self.create_program(point)?,
        };
        let program = self.program_mut(id)?;
        program.commit(edited.items, edited.actions_used);
        let unused = program.is_empty() && program.refcount() == 1;
        tracing::debug!(%point, program = %id, length = program.len(), "committed program edit");

        if unused && self.config.cleanup_empty_programs {
            self.unbind(point);
        } else {
            self.notify(self.tiles_referencing(id));
        }
        Ok(())
    }
}
