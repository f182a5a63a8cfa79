//! Routing point identities and their program bindings
//!
//! The restricted-tile set is derived from the bindings and refreshed on
//! every bind and unbind that touches a tile.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::pool::ProgramStore;
use crate::error::Result;
use crate::program::ProgramId;

/// Index of a map tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileIndex(pub u32);

/// Track piece within a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Track {
    /// Along the X axis
    X,
    /// Along the Y axis
    Y,
    /// Upper corner piece
    Upper,
    /// Lower corner piece
    Lower,
    /// Left corner piece
    Left,
    /// Right corner piece
    Right,
}

impl Track {
    /// Every track, in key order
    pub const ALL: [Track; 6] = [
        Track::X,
        Track::Y,
        Track::Upper,
        Track::Lower,
        Track::Left,
        Track::Right,
    ];
}

/// A signal on one track of one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoutingPoint {
    /// Tile holding the signal
    pub tile: TileIndex,
    /// Track the signal protects
    pub track: Track,
}

impl RoutingPoint {
    /// Creates a routing point
    pub fn new(tile: TileIndex, track: Track) -> Self {
        RoutingPoint { tile, track }
    }
}

impl fmt::Display for RoutingPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile {}/{:?}", self.tile.0, self.track)
    }
}

/// Routing point to program bindings, with a per-tile "restricted" index
///
/// Ordered by tile first so all points of a tile form one key range.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMapping {
    entries: BTreeMap<RoutingPoint, ProgramId>,
    /// Tiles with at least one entry; derived from `entries`
    restricted_tiles: HashSet<TileIndex>,
}

impl ReferenceMapping {
    /// Creates an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `point` to `id`, releasing whatever it was bound to before
    pub fn bind(
        &mut self,
        store: &mut ProgramStore,
        point: RoutingPoint,
        id: ProgramId,
    ) -> Result<()> {
        store.acquire(id)?;
        if let Some(old) = self.entries.insert(point, id) {
            store.release(old);
        }
        self.refresh_tile(point.tile);
        tracing::debug!(%point, program = %id, "bound restriction program");
        Ok(())
    }

    /// Removes the binding of `point`, releasing its program.
    ///
    /// Returns false if the point was not bound.
    pub fn unbind(&mut self, store: &mut ProgramStore, point: RoutingPoint) -> bool {
        let Some(id) = self.entries.remove(&point) else {
            return false;
        };
        store.release(id);
        self.refresh_tile(point.tile);
        tracing::debug!(%point, program = %id, "unbound restriction program");
        true
    }

    /// Program bound to `point`
    pub fn lookup(&self, point: RoutingPoint) -> Option<ProgramId> {
        self.entries.get(&point).copied()
    }

    /// Whether any point on `tile` is bound
    pub fn is_restricted(&self, tile: TileIndex) -> bool {
        self.restricted_tiles.contains(&tile)
    }

    /// Bindings on one tile
    pub fn on_tile(&self, tile: TileIndex) -> impl Iterator<Item = (RoutingPoint, ProgramId)> + '_ {
        let range = RoutingPoint::new(tile, Track::X)..=RoutingPoint::new(tile, Track::Right);
        self.entries.range(range).map(|(point, id)| (*point, *id))
    }

    /// Points bound to `id`
    pub fn referents(&self, id: ProgramId) -> impl Iterator<Item = RoutingPoint> + '_ {
        self.entries
            .iter()
            .filter(move |(_, bound)| **bound == id)
            .map(|(point, _)| *point)
    }

    /// All bindings in key order
    pub fn iter(&self) -> impl Iterator<Item = (RoutingPoint, ProgramId)> + '_ {
        self.entries.iter().map(|(point, id)| (*point, *id))
    }

    /// Number of bound points
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is bound
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every binding without touching the store
    pub fn clear(&mut self) {
        self.entries.clear();
        self.restricted_tiles.clear();
    }

    fn refresh_tile(&mut self, tile: TileIndex) {
        if self.on_tile(tile).next().is_some() {
            self.restricted_tiles.insert(tile);
        } else {
            self.restricted_tiles.remove(&tile);
        }
    }
}
