//! Bounded program arena
//!
//! Owns every [`Program`] and its reference count. Everything else holds
//! [`ProgramId`]s.

use crate::error::{Error, Result};
use crate::program::{Program, ProgramId};

/// Bounded arena of programs indexed by [`ProgramId`]
///
/// Freed slots are reused lowest-first so identities stay deterministic
/// across replays of the same command stream.
#[derive(Debug, Clone)]
pub struct ProgramStore {
    /// Slot per identity; `None` for free slots
    slots: Vec<Option<Program>>,
    /// Maximum number of live programs
    capacity: usize,
    /// Number of occupied slots
    live: usize,
}

impl ProgramStore {
    /// Creates an empty store holding at most `capacity` programs
    pub fn new(capacity: usize) -> Self {
        ProgramStore {
            slots: Vec::new(),
            capacity,
            live: 0,
        }
    }

    /// Maximum number of live programs
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live programs
    pub fn len(&self) -> usize {
        self.live
    }

    /// True if no program is live
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Creates an empty, unreferenced program
    pub(crate) fn allocate(&mut self) -> Result<ProgramId> {
        if self.live >= self.capacity {
            tracing::warn!("program store full ({} programs)", self.capacity);
            return Err(Error::StoreFull {
                capacity: self.capacity,
            });
        }

        let index = match self.slots.iter().position(Option::is_none) {
            Some(index) => index,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        let id = ProgramId(
            u32::try_from(index).map_err(|_| Error::StoreFull {
                capacity: self.capacity,
            })?,
        );
        self.slots[index] = Some(Program::default());
        self.live += 1;
        tracing::debug!(program = %id, "allocated restriction program");
        Ok(id)
    }

    /// Looks up a live program
    pub fn get(&self, id: ProgramId) -> Option<&Program> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: ProgramId) -> Option<&mut Program> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Adds one reference to a live program
    pub(crate) fn acquire(&mut self, id: ProgramId) -> Result<()> {
        let program = self.get_mut(id).ok_or(Error::UnknownProgram { id })?;
        program.increment_refcount();
        Ok(())
    }

    /// Drops one reference, destroying the program when none remain.
    ///
    /// Returns true if the program was destroyed.
    pub(crate) fn release(&mut self, id: ProgramId) -> bool {
        let Some(program) = self.get_mut(id) else {
            tracing::warn!(program = %id, "release of unknown program");
            return false;
        };
        if program.decrement_refcount() > 0 {
            return false;
        }
        self.slots[id.0 as usize] = None;
        self.live -= 1;
        tracing::debug!(program = %id, "released restriction program");
        true
    }

    /// Places a program at a fixed identity. Used when restoring a snapshot.
    pub(crate) fn insert_at(&mut self, id: ProgramId, program: Program) -> Result<()> {
        let index = id.0 as usize;
        if index >= self.capacity {
            return Err(Error::Snapshot(format!(
                "program {} outside store capacity {}",
                id, self.capacity
            )));
        }
        if self.slots.get(index).map_or(false, Option::is_some) {
            return Err(Error::Snapshot(format!("duplicate program {}", id)));
        }
        if self.live >= self.capacity {
            return Err(Error::StoreFull {
                capacity: self.capacity,
            });
        }
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(program);
        self.live += 1;
        Ok(())
    }

    /// Live programs in identity order
    pub fn iter(&self) -> impl Iterator<Item = (ProgramId, &Program)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|p| (ProgramId(index as u32), p)))
    }

    /// Drops every program
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.live = 0;
    }
}
