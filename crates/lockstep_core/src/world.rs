use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId};
use crate::ids::IdBlock;

pub type RegionId = i32;

/// A persisted region and the identifier block reserved for it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Region {
    pub id: RegionId,
    pub id_block: IdBlock,
}

/// Static registry of regions and entities a replay runs against.
#[derive(Clone, Debug, Default)]
pub struct World {
    regions: BTreeMap<RegionId, Region>,
    entities: BTreeMap<EntityId, Entity>,
}

impl World {
    pub fn new(regions: Vec<Region>, entities: Vec<Entity>) -> Result<Self> {
        let mut world = Self::default();
        for region in regions {
            let id = region.id;
            if world.regions.insert(id, region).is_some() {
                bail!("duplicate region id {}", id);
            }
        }
        for entity in entities {
            if let Some(region) = entity.region {
                if !world.regions.contains_key(&region) {
                    bail!("entity {} placed in unknown region {}", entity.id, region);
                }
            }
            let id = entity.id;
            if world.entities.insert(id, entity).is_some() {
                bail!("duplicate entity id {}", id);
            }
        }
        Ok(world)
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity> {
        self.entities
            .get(&id)
            .with_context(|| format!("unknown entity {}", id))
    }

    pub fn has_region(&self, id: RegionId) -> bool {
        self.regions.contains_key(&id)
    }
}
