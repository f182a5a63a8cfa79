use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::command::{OwnerId, PointOwnership, RestrictionCommand};
use crate::error::Result;
use crate::program::{AgentState, ProgramResult};
use crate::store::{RestrictionConfig, Restrictions, RoutingPoint};

/// Restrictions shared between path searches and the command stream
///
/// Path searches take the read lock and evaluate concurrently. Commands take
/// the write lock, so each mutation completes before the next evaluation sees
/// the state.
#[derive(Debug, Clone, Default)]
pub struct SharedRestrictions {
    inner: Arc<RwLock<Restrictions>>,
}

impl SharedRestrictions {
    /// Wraps an existing service
    pub fn new(restrictions: Restrictions) -> Self {
        SharedRestrictions {
            inner: Arc::new(RwLock::new(restrictions)),
        }
    }

    /// Empty service with `config`
    pub fn with_config(config: RestrictionConfig) -> Self {
        Self::new(Restrictions::new(config))
    }

    /// Shared read access
    pub fn read(&self) -> RwLockReadGuard<'_, Restrictions> {
        self.inner.read()
    }

    /// Exclusive write access
    pub fn write(&self) -> RwLockWriteGuard<'_, Restrictions> {
        self.inner.write()
    }

    /// Evaluates the program at `point` under the read lock
    pub fn evaluate<S: AgentState + ?Sized>(
        &self,
        point: RoutingPoint,
        state: &S,
    ) -> Option<ProgramResult> {
        self.inner.read().evaluate(point, state)
    }

    /// Executes a command under the write lock
    pub fn execute<O>(
        &self,
        command: &RestrictionCommand,
        ownership: &O,
        caller: OwnerId,
    ) -> Result<()>
    where
        O: PointOwnership + ?Sized,
    {
        command.execute(&mut self.inner.write(), ownership, caller)
    }
}
