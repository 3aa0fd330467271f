use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::seed::session_id_from_label;

/// Fixed seed installed while a multiplayer game session loads.
pub const GAME_LOAD_SEED: i32 = 1;

/// Per-session settings shared by every replica.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    #[serde(default)]
    pub session_id: Option<i32>,
    /// Alternative to `session_id`; hashed into one.
    #[serde(default)]
    pub session_label: Option<String>,
    #[serde(default = "default_multiplayer")]
    pub multiplayer: bool,
    #[serde(default = "default_game_load_seed")]
    pub game_load_seed: i32,
    /// Seed both generators start from.
    #[serde(default)]
    pub initial_seed: i32,
    /// First identifier handed out when no block is current.
    #[serde(default)]
    pub first_id: i32,
}

fn default_multiplayer() -> bool {
    true
}

fn default_game_load_seed() -> i32 {
    GAME_LOAD_SEED
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: None,
            session_label: None,
            multiplayer: default_multiplayer(),
            game_load_seed: default_game_load_seed(),
            initial_seed: 0,
            first_id: 0,
        }
    }
}

impl SessionConfig {
    pub fn multiplayer(session_id: i32) -> Self {
        Self {
            session_id: Some(session_id),
            ..Self::default()
        }
    }

    pub fn single_player() -> Self {
        Self {
            multiplayer: false,
            ..Self::default()
        }
    }

    /// Load a standalone session config document from disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open session config {:?}", path))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: Self = serde_json::from_reader(reader).context("invalid session config json")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.session_id.is_none() || self.session_label.is_none(),
            "session_id and session_label are mutually exclusive"
        );
        Ok(())
    }

    /// Effective session id; `0` when neither an id nor a label is set.
    pub fn resolved_session_id(&self) -> i32 {
        match (&self.session_id, &self.session_label) {
            (Some(id), _) => *id,
            (None, Some(label)) => session_id_from_label(label),
            (None, None) => 0,
        }
    }
}
