//! Seeded generator scopes.
//!
//! A region scope re-seeds both generators from the region and session ids
//! and restores them on exit, so anything a region does while loading draws
//! the same numbers on every replica no matter what ran before it.

use tracing::debug;

use crate::context::{settle, DeterminismContext};
use crate::error::DeterminismError;
use crate::rng::Generator;
use crate::seed::ScopeSeed;
use crate::world::RegionId;

/// Token returned by [`DeterminismContext::enter_region_scope`].
///
/// Records whether the scope actually pushed anything (it does not outside
/// multiplayer) and the depths it pushed both generator stacks to, which exit
/// checks.
#[must_use = "a region scope must be passed back to exit_region_scope"]
#[derive(Debug)]
pub struct RegionScope {
    region: RegionId,
    depths: Option<(usize, usize)>,
}

impl RegionScope {
    pub fn region(&self) -> RegionId {
        self.region
    }

    pub fn is_active(&self) -> bool {
        self.depths.is_some()
    }
}

/// Token returned by [`DeterminismContext::enter_game_load_scope`].
#[must_use = "a game load scope must be passed back to exit_game_load_scope"]
#[derive(Debug)]
pub struct GameLoadScope {
    depth: usize,
}

impl DeterminismContext {
    pub fn enter_region_scope(
        &mut self,
        region: RegionId,
    ) -> Result<RegionScope, DeterminismError> {
        self.check_thread()?;
        if !self.is_multiplayer() {
            return Ok(RegionScope {
                region,
                depths: None,
            });
        }

        let seed = ScopeSeed::for_region(region, self.session_id());
        self.push_seeded(seed);
        let depths = (self.rand_states.depth(), self.engine_states.depth());
        debug!(region, seed = seed.value(), depth = depths.0, "entered region scope");
        Ok(RegionScope {
            region,
            depths: Some(depths),
        })
    }

    pub fn exit_region_scope(&mut self, scope: RegionScope) -> Result<(), DeterminismError> {
        self.check_thread()?;
        let Some((rand_depth, engine_depth)) = scope.depths else {
            return Ok(());
        };
        for (stack, expected, actual) in [
            ("rand", rand_depth, self.rand_states.depth()),
            ("engine rand", engine_depth, self.engine_states.depth()),
        ] {
            if actual != expected {
                return Err(DeterminismError::UnbalancedScope {
                    stack,
                    expected,
                    actual,
                });
            }
        }
        self.pop_seeded()?;
        debug!(region = scope.region, depth = rand_depth - 1, "exited region scope");
        Ok(())
    }

    /// Run `body` inside a region scope, exiting it on every path.
    pub fn with_region_scope<T, E, F>(&mut self, region: RegionId, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<DeterminismError> + std::fmt::Display,
    {
        let scope = self.enter_region_scope(region)?;
        let outcome = body(self);
        let release = self.exit_region_scope(scope);
        settle(outcome, release)
    }

    /// Push the general-purpose generator and, under multiplayer, pin it to
    /// the session's fixed game-load seed.
    pub fn enter_game_load_scope(&mut self) -> Result<GameLoadScope, DeterminismError> {
        self.check_thread()?;
        let saved = self.rand.snapshot();
        self.rand_states.push(saved);
        if self.is_multiplayer() {
            let seed = self.config().game_load_seed;
            self.rand.init_state(seed);
            debug!(seed, "seeded game load");
        }
        Ok(GameLoadScope {
            depth: self.rand_states.depth(),
        })
    }

    pub fn exit_game_load_scope(&mut self, scope: GameLoadScope) -> Result<(), DeterminismError> {
        self.check_thread()?;
        let actual = self.rand_states.depth();
        if actual != scope.depth {
            return Err(DeterminismError::UnbalancedScope {
                stack: "rand",
                expected: scope.depth,
                actual,
            });
        }
        let saved = self.rand_states.pop()?;
        self.rand.restore(saved);
        Ok(())
    }

    fn push_seeded(&mut self, seed: ScopeSeed) {
        let rand_state = self.rand.snapshot();
        self.rand_states.push(rand_state);
        self.rand.init_state(seed.value());

        let engine_state = self.engine.snapshot();
        self.engine_states.push(engine_state);
        self.engine.init_state(seed.value());
    }

    fn pop_seeded(&mut self) -> Result<(), DeterminismError> {
        let engine_state = self.engine_states.pop()?;
        self.engine.restore(engine_state);

        let rand_state = self.rand_states.pop()?;
        self.rand.restore(rand_state);
        Ok(())
    }
}
