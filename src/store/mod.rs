//! Program store, routing point mapping and the [`Restrictions`] service that owns both
//!
//! One `Restrictions` value is constructed per simulation and cleared on
//! teardown. Programs are only ever reached through it: the mapping holds
//! [`ProgramId`]s, the store owns the programs and their reference counts.

mod mapping;
mod pool;
mod snapshot;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::program::{AgentState, Program, ProgramId, ProgramResult};

pub use mapping::{ReferenceMapping, RoutingPoint, TileIndex, Track};
pub use pool::ProgramStore;
pub use snapshot::{MappingRecord, ProgramRecord, RestrictionSnapshot, SNAPSHOT_VERSION};

/// Receives the tiles whose restrictions changed after a committed mutation
///
/// Pathfinder caches and tile redraws hang off this.
pub trait ChangeObserver: Send + Sync {
    /// Called once per committed mutation with every affected tile
    fn restrictions_changed(&self, tiles: &[TileIndex]);
}

/// Configuration for a [`Restrictions`] service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestrictionConfig {
    /// Maximum number of live programs (default: 64000)
    pub max_programs: usize,
    /// Unbind a point whose edit leaves its unshared program empty (default: true)
    pub cleanup_empty_programs: bool,
}

impl Default for RestrictionConfig {
    fn default() -> Self {
        Self {
            max_programs: 64_000,
            cleanup_empty_programs: true,
        }
    }
}

/// Program store plus reference mapping for one simulation
pub struct Restrictions {
    pub(crate) config: RestrictionConfig,
    pub(crate) store: ProgramStore,
    pub(crate) mapping: ReferenceMapping,
    observer: Option<Arc<dyn ChangeObserver>>,
}

impl fmt::Debug for Restrictions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Restrictions")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("mapping", &self.mapping)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Default for Restrictions {
    fn default() -> Self {
        Self::new(RestrictionConfig::default())
    }
}

impl Restrictions {
    /// Creates an empty service
    pub fn new(config: RestrictionConfig) -> Self {
        Restrictions {
            config,
            store: ProgramStore::new(config.max_programs),
            mapping: ReferenceMapping::new(),
            observer: None,
        }
    }

    /// Installs the observer notified after every committed mutation
    pub fn set_observer(&mut self, observer: Arc<dyn ChangeObserver>) {
        self.observer = Some(observer);
    }

    /// Active configuration
    pub fn config(&self) -> &RestrictionConfig {
        &self.config
    }

    /// Program store (read-only)
    pub fn store(&self) -> &ProgramStore {
        &self.store
    }

    /// Reference mapping (read-only)
    pub fn mapping(&self) -> &ReferenceMapping {
        &self.mapping
    }

    /// Program identity bound to `point`
    pub fn lookup(&self, point: RoutingPoint) -> Option<ProgramId> {
        self.mapping.lookup(point)
    }

    /// Program bound to `point`
    pub fn program(&self, point: RoutingPoint) -> Option<&Program> {
        self.lookup(point).and_then(|id| self.store.get(id))
    }

    /// Whether any point on `tile` carries a program
    pub fn is_restricted(&self, tile: TileIndex) -> bool {
        self.mapping.is_restricted(tile)
    }

    /// Runs the program at `point`; `None` if the point has no program
    pub fn evaluate<S: AgentState + ?Sized>(
        &self,
        point: RoutingPoint,
        state: &S,
    ) -> Option<ProgramResult> {
        self.program(point).map(|program| program.execute(state))
    }

    /// Binds `point` to an existing program
    pub fn bind(&mut self, point: RoutingPoint, id: ProgramId) -> Result<()> {
        let previous = self.lookup(point);
        self.mapping.bind(&mut self.store, point, id)?;
        let mut tiles = self.tiles_referencing(id);
        if let Some(previous) = previous {
            tiles.extend(self.tiles_referencing(previous));
        }
        tiles.push(point.tile);
        self.notify(tiles);
        Ok(())
    }

    /// Removes the binding at `point`, destroying its program if it was the last referent
    pub fn unbind(&mut self, point: RoutingPoint) -> bool {
        let previous = self.lookup(point);
        if !self.mapping.unbind(&mut self.store, point) {
            return false;
        }
        let mut tiles = previous.map_or_else(Vec::new, |id| self.tiles_referencing(id));
        tiles.push(point.tile);
        self.notify(tiles);
        true
    }

    /// Program at `point`, creating and binding an empty one if allowed
    pub fn get_or_create(
        &mut self,
        point: RoutingPoint,
        allow_create: bool,
    ) -> Result<Option<ProgramId>> {
        if let Some(id) = self.lookup(point) {
            return Ok(Some(id));
        }
        if !allow_create {
            return Ok(None);
        }
        let id = self.create_program(point)?;
        self.notify(vec![point.tile]);
        Ok(Some(id))
    }

    /// Allocates an empty program and binds `point` to it, without notifying
    pub(crate) fn create_program(&mut self, point: RoutingPoint) -> Result<ProgramId> {
        let id = self.store.allocate()?;
        self.mapping.bind(&mut self.store, point, id)?;
        Ok(id)
    }

    /// Drops every program and binding
    pub fn clear(&mut self) {
        let tiles: Vec<TileIndex> = self.mapping.iter().map(|(point, _)| point.tile).collect();
        self.mapping.clear();
        self.store.clear();
        tracing::debug!("cleared all restriction programs");
        self.notify(tiles);
    }

    pub(crate) fn tiles_referencing(&self, id: ProgramId) -> Vec<TileIndex> {
        self.mapping.referents(id).map(|point| point.tile).collect()
    }

    pub(crate) fn program_mut(&mut self, id: ProgramId) -> Result<&mut Program> {
        self.store
            .get_mut(id)
            .ok_or_else(|| Error::internal(format!("mapping refers to missing program {}", id)))
    }

    pub(crate) fn notify(&self, mut tiles: Vec<TileIndex>) {
        let Some(observer) = &self.observer else {
            return;
        };
        tiles.sort_unstable();
        tiles.dedup();
        if !tiles.is_empty() {
            observer.restrictions_changed(&tiles);
        }
    }
}
