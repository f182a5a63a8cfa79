//! Transport-addressable restriction commands with ownership checks
//!
//! A [`RestrictionCommand`] is what travels over the network command stream.
//! Executing it checks that the caller owns every routing point the command
//! touches, then delegates to [`Restrictions`].

use serde::{Deserialize, Serialize};

use crate::edit::EditOp;
use crate::error::{Error, Result};
use crate::store::{Restrictions, RoutingPoint};

/// Identity of the party issuing a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub u16);

/// Ownership check supplied by the world layer
pub trait PointOwnership {
    /// Whether `caller` may modify the restrictions at `point`
    fn owns(&self, caller: OwnerId, point: RoutingPoint) -> bool;
}

impl<F> PointOwnership for F
where
    F: Fn(OwnerId, RoutingPoint) -> bool,
{
    fn owns(&self, caller: OwnerId, point: RoutingPoint) -> bool {
        self(caller, point)
    }
}

/// What a command does to its routing point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandAction {
    /// Single-item edit
    Edit(EditOp),
    /// Share the program at `source`
    Share {
        /// Point whose program is shared
        source: RoutingPoint,
    },
    /// Copy the program at `source`
    Copy {
        /// Point whose program is copied
        source: RoutingPoint,
    },
    /// Take a private copy of a shared program
    Unshare,
    /// Remove the program
    Reset,
}

/// One command on the restriction command stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionCommand {
    /// Routing point the command modifies
    pub point: RoutingPoint,
    /// Operation to perform
    pub action: CommandAction,
}

impl RestrictionCommand {
    /// Edit command
    pub fn edit(point: RoutingPoint, op: EditOp) -> Self {
        RestrictionCommand {
            point,
            action: CommandAction::Edit(op),
        }
    }

    /// Routing points the caller must own
    fn touched_points(&self) -> impl Iterator<Item = RoutingPoint> {
        let source = match self.action {
            CommandAction::Share { source } | CommandAction::Copy { source } => Some(source),
            _ => None,
        };
        std::iter::once(self.point).chain(source)
    }

    /// Checks ownership and applies the command
    pub fn execute<O>(
        &self,
        restrictions: &mut Restrictions,
        ownership: &O,
        caller: OwnerId,
    ) -> Result<()>
    where
        O: PointOwnership + ?Sized,
    {
        if let Some(point) = self.touched_points().find(|point| !ownership.owns(caller, *point)) {
            tracing::warn!(%point, owner = caller.0, "restriction command from non-owner");
            return Err(Error::NotOwner { point });
        }

        match self.action {
            CommandAction::Edit(op) => restrictions.apply(self.point, op),
            CommandAction::Share { source } => restrictions.share(self.point, source),
            CommandAction::Copy { source } => restrictions.copy(self.point, source),
            CommandAction::Unshare => restrictions.unshare(self.point),
            CommandAction::Reset => {
                restrictions.reset(self.point);
                Ok(())
            }
        }
    }

    /// Serializes for transport
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes from transport
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
