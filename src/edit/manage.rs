//! Whole-program operations: share, copy, unshare, reset and signal removal

use crate::error::{Error, Result};
use crate::program::{Program, ProgramId};
use crate::store::{Restrictions, RoutingPoint, TileIndex};

impl Restrictions {
    /// Binds `point` to the program at `source`, creating an empty one there if needed.
    ///
    /// Both points then co-mutate under later edits.
    pub fn share(&mut self, point: RoutingPoint, source: RoutingPoint) -> Result<()> {
        if point == source {
            return Err(Error::SelfReference { point });
        }
        let id = self
            .get_or_create(source, true)?
            .ok_or_else(|| Error::internal("program creation returned nothing"))?;
        if self.lookup(point) == Some(id) {
            return Ok(());
        }
        self.bind(point, id)
    }

    /// Gives `point` a private program holding a copy of `source`'s instructions.
    ///
    /// If `source` has no program, `point` is reset.
    pub fn copy(&mut self, point: RoutingPoint, source: RoutingPoint) -> Result<()> {
        if point == source {
            return Err(Error::SelfReference { point });
        }
        match self.program(source).cloned() {
            Some(program) => self.install_copy(point, program),
            None => {
                self.reset(point);
                Ok(())
            }
        }
    }

    /// Replaces the program at `point` with a private copy, leaving other
    /// referents on the original. No-op if the program is not shared.
    pub fn unshare(&mut self, point: RoutingPoint) -> Result<()> {
        let Some(id) = self.lookup(point) else {
            return Err(Error::NoProgram { point });
        };
        let program = self.program_mut(id)?;
        if program.refcount() <= 1 {
            return Ok(());
        }
        let program = program.clone();
        self.install_copy(point, program)
    }

    /// Removes any program from `point`
    pub fn reset(&mut self, point: RoutingPoint) -> bool {
        self.unbind(point)
    }

    /// Unbinds every routing point on `tile`; called when its signals are removed.
    ///
    /// Returns the number of points unbound.
    pub fn remove_tile(&mut self, tile: TileIndex) -> usize {
        let points: Vec<RoutingPoint> =
            self.mapping.on_tile(tile).map(|(point, _)| point).collect();
        points.into_iter().filter(|point| self.unbind(*point)).count()
    }

    fn install_copy(&mut self, point: RoutingPoint, source: Program) -> Result<()> {
        let id: ProgramId = self.store.allocate()?;
        let copy = self.program_mut(id)?;
        copy.commit(source.items().to_vec(), source.actions_used());
        self.bind(point, id)?;
        tracing::debug!(%point, program = %id, "installed private program copy");
        Ok(())
    }
}
