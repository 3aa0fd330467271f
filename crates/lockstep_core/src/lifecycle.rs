//! Host lifecycle boundaries.
//!
//! Each boundary wraps a body closure: scopes are entered before it runs and
//! released in reverse order after it returns, whether or not it failed.

use serde::{Deserialize, Serialize};

use crate::context::{first_error, settle, DeterminismContext};
use crate::error::DeterminismError;
use crate::world::RegionId;

/// Persistence pass the host is currently running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    #[default]
    Inactive,
    Saving,
    LoadingVars,
    ResolvingCrossRefs,
    PostLoadInit,
}

impl LoadPhase {
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            Self::LoadingVars | Self::ResolvingCrossRefs | Self::PostLoadInit
        )
    }

    /// Raw variable loading never mints identifiers; the later passes may.
    pub fn mints_ids(self) -> bool {
        matches!(self, Self::ResolvingCrossRefs | Self::PostLoadInit)
    }
}

impl DeterminismContext {
    /// Game session load: the general-purpose generator is saved and, under
    /// multiplayer, pinned to the fixed game-load seed.
    pub fn load_game<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<DeterminismError> + std::fmt::Display,
    {
        let scope = self.enter_game_load_scope()?;
        let outcome = body(self);
        let release = self.exit_game_load_scope(scope);
        settle(outcome, release)
    }

    /// A region's data pass. Seeds both generators for every load phase and
    /// makes the region's id block current once raw variables are loaded.
    pub fn expose_region<T, E, F>(
        &mut self,
        region: RegionId,
        phase: LoadPhase,
        body: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<DeterminismError> + std::fmt::Display,
    {
        if !phase.is_loading() {
            return body(self);
        }
        self.seeded_region_scope(region, phase.mints_ids(), body)
    }

    /// Post-load finalization of a region; always seeds and always sets the
    /// region's id block.
    pub fn finalize_region<T, E, F>(&mut self, region: RegionId, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<DeterminismError> + std::fmt::Display,
    {
        self.seeded_region_scope(region, true, body)
    }

    fn seeded_region_scope<T, E, F>(
        &mut self,
        region: RegionId,
        with_block: bool,
        body: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<DeterminismError> + std::fmt::Display,
    {
        let scope = self.enter_region_scope(region)?;
        let block = if with_block {
            match self.set_current_block(region) {
                Ok(block) => Some(block),
                Err(err) => {
                    self.exit_region_scope(scope)?;
                    return Err(err.into());
                }
            }
        } else {
            None
        };

        let outcome = body(self);

        let cleared = match block {
            Some(block) => self.clear_current_block(block),
            None => Ok(()),
        };
        let exited = self.exit_region_scope(scope);
        settle(outcome, first_error(cleared, exited))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::ids::IdBlock;

    fn context() -> DeterminismContext {
        let mut ctx = DeterminismContext::new(SessionConfig::multiplayer(7));
        ctx.reserve_block(42, IdBlock::new(100, 3));
        ctx
    }

    #[test]
    fn phases() {
        assert!(!LoadPhase::Saving.is_loading());
        assert!(LoadPhase::LoadingVars.is_loading());
        assert!(!LoadPhase::LoadingVars.mints_ids());
        assert!(LoadPhase::PostLoadInit.mints_ids());
    }

    #[test]
    fn loading_vars_seeds_without_block() {
        let mut ctx = context();
        ctx.expose_region(42, LoadPhase::LoadingVars, |ctx| {
            assert_eq!(ctx.rand_states.depth(), 1);
            assert_eq!(ctx.current_block(), None);
            Ok::<_, DeterminismError>(())
        })
        .unwrap();
        ctx.finish().unwrap();
    }

    #[test]
    fn saving_is_untouched() {
        let mut ctx = context();
        ctx.expose_region(42, LoadPhase::Saving, |ctx| {
            assert_eq!(ctx.rand_states.depth(), 0);
            Ok::<_, DeterminismError>(())
        })
        .unwrap();
    }

    #[test]
    fn unknown_block_unwinds_the_seed_scope() {
        let mut ctx = DeterminismContext::new(SessionConfig::multiplayer(7));
        let err = ctx
            .finalize_region(5, |_| Ok::<_, DeterminismError>(()))
            .unwrap_err();
        assert_eq!(err, DeterminismError::UnknownRegion(5));
        ctx.finish().unwrap();
    }
}
