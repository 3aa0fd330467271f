//! The per-session determinism context.
//!
//! One [`DeterminismContext`] models a single replica's execution trace. It is
//! built when a session starts, threaded through every lifecycle boundary,
//! and consumed by [`DeterminismContext::finish`] when the session ends.

use std::collections::BTreeMap;
use std::thread::{self, ThreadId};

use rand_chacha::ChaCha8Rng;
use tracing::error;

use crate::config::SessionConfig;
use crate::entity::{EntityId, FactionId};
use crate::error::DeterminismError;
use crate::ids::{IdBlock, IdMinter};
use crate::rng::{EngineRand, RandState, SimRand};
use crate::stack::StateStack;
use crate::world::RegionId;

#[derive(Debug)]
pub struct DeterminismContext {
    config: SessionConfig,
    session_id: i32,
    owner: ThreadId,
    pub(crate) rand: SimRand,
    pub(crate) engine: EngineRand,
    pub(crate) rand_states: StateStack<RandState>,
    pub(crate) engine_states: StateStack<ChaCha8Rng>,
    pub(crate) entities: StateStack<EntityId>,
    pub(crate) factions: BTreeMap<RegionId, StateStack<FactionId>>,
    pub(crate) blocks: BTreeMap<RegionId, IdBlock>,
    pub(crate) current_block: Option<RegionId>,
    pub(crate) minter: IdMinter,
    /// `rand_states` depth reached by each open suppressed scope.
    pub(crate) suppressed: Vec<usize>,
    pub(crate) nested_suppressions: u64,
}

impl DeterminismContext {
    /// Build a context bound to the calling thread.
    pub fn new(config: SessionConfig) -> Self {
        let session_id = config.resolved_session_id();
        Self {
            rand: SimRand::from_seed(config.initial_seed),
            engine: EngineRand::from_seed(config.initial_seed),
            minter: IdMinter::new(config.first_id),
            session_id,
            owner: thread::current().id(),
            rand_states: StateStack::new("rand"),
            engine_states: StateStack::new("engine rand"),
            entities: StateStack::new("entity"),
            factions: BTreeMap::new(),
            blocks: BTreeMap::new(),
            current_block: None,
            suppressed: Vec::new(),
            nested_suppressions: 0,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn session_id(&self) -> i32 {
        self.session_id
    }

    pub fn is_multiplayer(&self) -> bool {
        self.config.multiplayer
    }

    pub fn rand(&mut self) -> &mut SimRand {
        &mut self.rand
    }

    pub fn engine(&mut self) -> &mut EngineRand {
        &mut self.engine
    }

    /// Fail unless called from the thread that built the context.
    pub fn check_thread(&self) -> Result<(), DeterminismError> {
        let actual = thread::current().id();
        if actual != self.owner {
            return Err(DeterminismError::WrongThread {
                owner: self.owner,
                actual,
            });
        }
        Ok(())
    }

    /// Tear the context down, verifying every scope was closed.
    pub fn finish(self) -> Result<(), DeterminismError> {
        self.check_thread()?;
        let mut open = Vec::new();
        for stack in [
            (self.rand_states.label(), self.rand_states.depth()),
            (self.engine_states.label(), self.engine_states.depth()),
            (self.entities.label(), self.entities.depth()),
        ] {
            if stack.1 > 0 {
                open.push(format!("{} depth {}", stack.0, stack.1));
            }
        }
        for (region, stack) in &self.factions {
            if !stack.is_empty() {
                open.push(format!("faction depth {} in region {}", stack.depth(), region));
            }
        }
        if let Some(region) = self.current_block {
            open.push(format!("id block of region {} still current", region));
        }
        if !self.suppressed.is_empty() {
            open.push(format!("suppression depth {}", self.suppressed.len()));
        }
        if open.is_empty() {
            Ok(())
        } else {
            Err(DeterminismError::OpenScopes(open.join(", ")))
        }
    }
}

/// Combine the outcome of a scoped body with the outcome of releasing the
/// scope.
///
/// A failed release is an invariant violation and wins over the body's
/// result; the body's own error is logged so it is not lost.
pub(crate) fn settle<T, E>(
    outcome: Result<T, E>,
    release: Result<(), DeterminismError>,
) -> Result<T, E>
where
    E: From<DeterminismError> + std::fmt::Display,
{
    match (outcome, release) {
        (outcome, Ok(())) => outcome,
        (Ok(_), Err(release_err)) => Err(release_err.into()),
        (Err(body_err), Err(release_err)) => {
            error!(%body_err, "scope body failed before release error");
            Err(release_err.into())
        }
    }
}

/// First error of two release steps that must both run.
pub(crate) fn first_error(
    first: Result<(), DeterminismError>,
    second: Result<(), DeterminismError>,
) -> Result<(), DeterminismError> {
    match (first, second) {
        (Err(err), second) => {
            if let Err(other) = second {
                error!(%other, "second release step also failed");
            }
            Err(err)
        }
        (Ok(()), second) => second,
    }
}
