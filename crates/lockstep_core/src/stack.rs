//! Last-in-first-out storage for saved generator states and other ambient
//! context.
//!
//! A [`StateStack`] never invents a value: popping an empty stack is reported
//! as [`DeterminismError::StackUnderflow`] so that an unmatched pop surfaces
//! at the call site instead of as a desync many ticks later.

use crate::error::DeterminismError;

#[derive(Clone, Debug)]
pub struct StateStack<T> {
    label: &'static str,
    entries: Vec<T>,
    pushes: u64,
    pops: u64,
}

impl<T> StateStack<T> {
    /// Create an empty stack. `label` names the stack in error messages.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: Vec::new(),
            pushes: 0,
            pops: 0,
        }
    }

    pub fn push(&mut self, state: T) {
        self.entries.push(state);
        self.pushes += 1;
        debug_assert_eq!(self.pushes - self.pops, self.entries.len() as u64);
    }

    /// Remove and return the most recently pushed state.
    pub fn pop(&mut self) -> Result<T, DeterminismError> {
        let state = self
            .entries
            .pop()
            .ok_or(DeterminismError::StackUnderflow { stack: self.label })?;
        self.pops += 1;
        debug_assert_eq!(self.pushes - self.pops, self.entries.len() as u64);
        Ok(state)
    }

    pub fn peek(&self) -> Option<&T> {
        self.entries.last()
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn pushes(&self) -> u64 {
        self.pushes
    }

    pub fn pops(&self) -> u64 {
        self.pops
    }
}
