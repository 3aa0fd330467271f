use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::SessionConfig;
use crate::entity::{Entity, EntityId};
use crate::lifecycle::LoadPhase;
use crate::world::{Region, RegionId, World};

/// Replay scenario: a session, the regions and entities it knows about, and
/// the host lifecycle steps to drive through the context.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    pub name: String,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    pub steps: Vec<Step>,
}

/// One host action. Scoped steps carry a nested `body`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    LoadGame {
        #[serde(default)]
        body: Vec<Step>,
    },
    ExposeRegion {
        region: RegionId,
        phase: LoadPhase,
        #[serde(default)]
        body: Vec<Step>,
    },
    FinalizeRegion {
        region: RegionId,
        #[serde(default)]
        body: Vec<Step>,
    },
    Entity {
        entity: EntityId,
        #[serde(default)]
        body: Vec<Step>,
    },
    Suppressed {
        #[serde(default)]
        body: Vec<Step>,
    },
    /// Run `body`, record its failure if any, and carry on.
    Try {
        #[serde(default)]
        body: Vec<Step>,
    },
    /// Draw from the general-purpose generator.
    Roll {
        #[serde(default = "one")]
        count: u32,
    },
    /// Draw from the engine generator.
    EngineRoll {
        #[serde(default = "one")]
        count: u32,
    },
    MintId {
        #[serde(default = "one")]
        count: u32,
    },
    /// Record the current entity and the current faction of `region`.
    Context { region: RegionId },
    Fail { message: String },
}

fn one() -> u32 {
    1
}

impl Script {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open script file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let script: Self = serde_json::from_reader(reader).context("invalid script json")?;
        script.session.validate()?;
        Ok(script)
    }

    pub fn build_world(&self) -> Result<World> {
        World::new(self.regions.clone(), self.entities.clone())
            .with_context(|| format!("script {:?} describes an inconsistent world", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_nested_steps() {
        let json = r#"{
            "name": "nested",
            "session": {"session_id": 7},
            "regions": [{"id": 42, "id_block": {"start": 100, "count": 3}}],
            "steps": [
                {"op": "finalize_region", "region": 42, "body": [
                    {"op": "mint_id", "count": 2},
                    {"op": "roll"}
                ]}
            ]
        }"#;
        let script = Script::from_reader(json.as_bytes()).unwrap();
        assert_eq!(script.session.resolved_session_id(), 7);
        assert_eq!(
            script.steps,
            vec![Step::FinalizeRegion {
                region: 42,
                body: vec![Step::MintId { count: 2 }, Step::Roll { count: 1 }],
            }]
        );
    }

    #[test]
    fn repository_scripts_deserialize() {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let scripts_dir = manifest_dir.join("../../testdata/scripts");
        for name in ["nested_regions.json", "entity_ticks.json"] {
            let path = scripts_dir.join(name);
            let script = Script::load_from_path(&path)
                .unwrap_or_else(|err| panic!("failed to load {:?}: {}", path, err));
            assert!(!script.steps.is_empty(), "script {:?} must define steps", path);
            script
                .build_world()
                .unwrap_or_else(|err| panic!("inconsistent world in {:?}: {}", path, err));
        }
    }
}
