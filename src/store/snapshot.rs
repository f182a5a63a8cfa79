//! Enumeration and reconstruction of the store and mapping for persistence
//!
//! The persistence layer owns the on-disk format. This module only hands it a
//! plain serde-serializable snapshot and rebuilds a [`Restrictions`] from one,
//! recomputing reference counts from the mapping rather than trusting stored
//! counts.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{RestrictionConfig, Restrictions, RoutingPoint};
use crate::error::{Error, Result};
use crate::program::{validate, Instruction, Program, ProgramId, ENCODING_VERSION};

/// Newest snapshot revision this build reads and the one it writes
pub const SNAPSHOT_VERSION: u32 = ENCODING_VERSION;

/// One stored program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRecord {
    /// Identity in the store
    pub id: ProgramId,
    /// Instruction words in order
    pub items: Vec<Instruction>,
}

/// One routing point binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    /// Bound routing point
    pub point: RoutingPoint,
    /// Program it is bound to
    pub program: ProgramId,
}

/// Complete persisted state of a [`Restrictions`] service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionSnapshot {
    /// Instruction encoding revision the snapshot was written with
    pub version: u32,
    /// Programs in identity order
    pub programs: Vec<ProgramRecord>,
    /// Bindings in routing point order
    pub mappings: Vec<MappingRecord>,
}

impl RestrictionSnapshot {
    /// Serializes to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Restrictions {
    /// Enumerates every program and binding
    pub fn snapshot(&self) -> RestrictionSnapshot {
        RestrictionSnapshot {
            version: SNAPSHOT_VERSION,
            programs: self
                .store
                .iter()
                .map(|(id, program)| ProgramRecord {
                    id,
                    items: program.items().to_vec(),
                })
                .collect(),
            mappings: self
                .mapping
                .iter()
                .map(|(point, program)| MappingRecord { point, program })
                .collect(),
        }
    }

    /// Rebuilds a service from a snapshot.
    ///
    /// Every program is validated; programs nothing is bound to are dropped.
    pub fn restore(config: RestrictionConfig, snapshot: &RestrictionSnapshot) -> Result<Self> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(Error::UnsupportedVersion {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            });
        }

        let referenced: BTreeSet<ProgramId> =
            snapshot.mappings.iter().map(|record| record.program).collect();

        let mut restrictions = Restrictions::new(config);
        for record in &snapshot.programs {
            if !referenced.contains(&record.id) {
                tracing::warn!(program = %record.id, "dropping unreferenced program from snapshot");
                continue;
            }
            if let Some(item) = record.items.iter().find(|item| !item.is_placeable()) {
                return Err(Error::InvalidInstruction { raw: item.raw() });
            }
            let actions = validate(&record.items)?;
            let mut program = Program::default();
            program.commit(record.items.clone(), actions);
            restrictions.store.insert_at(record.id, program)?;
        }

        for record in &snapshot.mappings {
            if restrictions.mapping.lookup(record.point).is_some() {
                return Err(Error::Snapshot(format!("duplicate binding for {}", record.point)));
            }
            restrictions
                .mapping
                .bind(&mut restrictions.store, record.point, record.program)?;
        }

        tracing::debug!(
            programs = restrictions.store.len(),
            mappings = restrictions.mapping.len(),
            "restored restriction programs"
        );
        Ok(restrictions)
    }
}
