//! Suppressed-randomness scopes.
//!
//! Code that must run without perturbing the shared stream (previews,
//! tooltips, speculative checks) wraps itself in a suppressed scope: the
//! general-purpose generator is saved on entry and restored on exit, and
//! [`DeterminismContext::is_suppressed`] lets unrelated code skip
//! randomness-driven side effects meanwhile.

use tracing::warn;

use crate::context::{settle, DeterminismContext};
use crate::error::DeterminismError;
use crate::rng::Generator;

impl DeterminismContext {
    pub fn begin_suppressed_scope(&mut self) -> Result<(), DeterminismError> {
        self.check_thread()?;
        let saved = self.rand.snapshot();
        self.rand_states.push(saved);
        if !self.suppressed.is_empty() {
            self.nested_suppressions += 1;
            warn!(depth = self.suppressed.len(), "nested suppressed scope");
        }
        self.suppressed.push(self.rand_states.depth());
        Ok(())
    }

    /// Restore the generator saved by the innermost suppressed scope.
    ///
    /// Fails without touching any state if a scope entered after it is still
    /// open on the shared generator stack.
    pub fn end_suppressed_scope(&mut self) -> Result<(), DeterminismError> {
        self.check_thread()?;
        let Some(&expected) = self.suppressed.last() else {
            return Err(DeterminismError::SuppressionUnderflow);
        };
        let actual = self.rand_states.depth();
        if actual != expected {
            return Err(DeterminismError::UnbalancedScope {
                stack: self.rand_states.label(),
                expected,
                actual,
            });
        }
        self.suppressed.pop();
        let saved = self.rand_states.pop()?;
        self.rand.restore(saved);
        Ok(())
    }

    pub fn with_suppressed<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<DeterminismError> + std::fmt::Display,
    {
        self.begin_suppressed_scope()?;
        let outcome = body(self);
        let release = self.end_suppressed_scope();
        settle(outcome, release)
    }

    pub fn is_suppressed(&self) -> bool {
        !self.suppressed.is_empty()
    }

    pub fn suppression_depth(&self) -> usize {
        self.suppressed.len()
    }

    /// Number of times a suppressed scope was entered while one was active.
    pub fn nested_suppressions(&self) -> u64 {
        self.nested_suppressions
    }
}
