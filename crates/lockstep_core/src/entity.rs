//! Ambient "current entity" and "current faction" tracking.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::context::{first_error, settle, DeterminismContext};
use crate::error::DeterminismError;
use crate::stack::StateStack;
use crate::world::RegionId;

pub type EntityId = i32;
pub type FactionId = i32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Pawn,
    Building,
    Item,
    Plant,
    Mote,
}

impl EntityKind {
    pub fn can_have_faction(self) -> bool {
        matches!(self, Self::Pawn | Self::Building)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    #[serde(default)]
    pub faction: Option<FactionId>,
    /// Region the entity is spawned in, if any.
    #[serde(default)]
    pub region: Option<RegionId>,
}

/// Token returned by [`DeterminismContext::begin_entity_op`].
#[must_use = "an entity op must be passed back to end_entity_op"]
#[derive(Debug)]
pub struct EntityOp {
    entity: EntityId,
    active: bool,
    /// Region whose faction stack was pushed, captured at begin time so a
    /// mid-operation move still pops the right stack.
    faction_region: Option<RegionId>,
}

impl EntityOp {
    pub fn entity(&self) -> EntityId {
        self.entity
    }
}

impl DeterminismContext {
    pub fn begin_entity_op(&mut self, entity: &Entity) -> Result<EntityOp, DeterminismError> {
        self.check_thread()?;
        if !self.is_multiplayer() {
            return Ok(EntityOp {
                entity: entity.id,
                active: false,
                faction_region: None,
            });
        }

        self.entities.push(entity.id);
        let faction_region = match (entity.kind.can_have_faction(), entity.faction, entity.region) {
            (true, Some(faction), Some(region)) => {
                self.factions
                    .entry(region)
                    .or_insert_with(|| StateStack::new("faction"))
                    .push(faction);
                Some(region)
            }
            _ => None,
        };
        trace!(entity = entity.id, ?faction_region, "begin entity op");
        Ok(EntityOp {
            entity: entity.id,
            active: true,
            faction_region,
        })
    }

    pub fn end_entity_op(&mut self, entity: &Entity, op: EntityOp) -> Result<(), DeterminismError> {
        self.check_thread()?;
        if !op.active {
            return Ok(());
        }
        if op.entity != entity.id {
            return Err(DeterminismError::EntityMismatch {
                ended: entity.id,
                active: Some(op.entity),
            });
        }

        let faction = match op.faction_region {
            Some(region) => self
                .factions
                .get_mut(&region)
                .ok_or(DeterminismError::StackUnderflow { stack: "faction" })
                .and_then(|stack| stack.pop().map(|_| ())),
            None => Ok(()),
        };
        let current = self.entities.pop().and_then(|popped| {
            if popped == entity.id {
                Ok(())
            } else {
                Err(DeterminismError::EntityMismatch {
                    ended: entity.id,
                    active: Some(popped),
                })
            }
        });
        trace!(entity = entity.id, "end entity op");
        first_error(faction, current)
    }

    /// Run `body` as an operation on `entity`.
    pub fn with_entity_op<T, E, F>(&mut self, entity: &Entity, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<DeterminismError> + std::fmt::Display,
    {
        let op = self.begin_entity_op(entity)?;
        let outcome = body(self);
        let release = self.end_entity_op(entity, op);
        settle(outcome, release)
    }

    /// Innermost entity whose operation is in flight.
    pub fn current_entity(&self) -> Option<EntityId> {
        self.entities.peek().copied()
    }

    /// Innermost faction in effect for `region`.
    pub fn current_faction(&self, region: RegionId) -> Option<FactionId> {
        self.factions
            .get(&region)
            .and_then(|stack| stack.peek().copied())
    }

    pub fn faction_depth(&self, region: RegionId) -> usize {
        self.factions.get(&region).map_or(0, StateStack::depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;

    fn pawn(id: EntityId, faction: FactionId) -> Entity {
        Entity {
            id,
            kind: EntityKind::Pawn,
            faction: Some(faction),
            region: Some(1),
        }
    }

    #[test]
    fn faction_kinds() {
        assert!(EntityKind::Pawn.can_have_faction());
        assert!(EntityKind::Building.can_have_faction());
        assert!(!EntityKind::Plant.can_have_faction());
        assert!(!EntityKind::Mote.can_have_faction());
    }

    #[test]
    fn mismatched_end_is_reported() {
        let mut ctx = DeterminismContext::new(SessionConfig::multiplayer(3));
        let a = pawn(1, 10);
        let b = pawn(2, 20);
        let op_a = ctx.begin_entity_op(&a).unwrap();
        let err = ctx.end_entity_op(&b, op_a).unwrap_err();
        assert_eq!(
            err,
            DeterminismError::EntityMismatch {
                ended: 2,
                active: Some(1),
            }
        );
    }

    #[test]
    fn moved_entity_pops_original_region() {
        let mut ctx = DeterminismContext::new(SessionConfig::multiplayer(3));
        let mut a = pawn(1, 10);
        let op = ctx.begin_entity_op(&a).unwrap();
        a.region = Some(2);
        ctx.end_entity_op(&a, op).unwrap();
        assert_eq!(ctx.faction_depth(1), 0);
        assert_eq!(ctx.faction_depth(2), 0);
    }

    #[test]
    fn single_player_tracks_nothing() {
        let mut ctx = DeterminismContext::new(SessionConfig::single_player());
        let a = pawn(1, 10);
        let op = ctx.begin_entity_op(&a).unwrap();
        assert_eq!(ctx.current_entity(), None);
        assert_eq!(ctx.current_faction(1), None);
        ctx.end_entity_op(&a, op).unwrap();
    }
}
