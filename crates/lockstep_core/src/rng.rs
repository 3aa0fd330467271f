//! The two pseudo-random generators a replica carries.
//!
//! [`SimRand`] is the general-purpose simulation generator, a splitmix-style
//! counter stream whose whole state fits in a `u128`. [`EngineRand`] stands in
//! for the engine-provided generator and is backed by ChaCha8. Both are driven
//! through [`Generator`] so the scope controllers can snapshot, restore and
//! re-seed them without caring which one they hold.

use std::fmt;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A generator whose full state can be captured and reinstated.
pub trait Generator {
    type State: Clone + fmt::Debug + PartialEq;

    fn snapshot(&self) -> Self::State;

    fn restore(&mut self, state: Self::State);

    /// Discard the current stream and start over from `seed`.
    fn init_state(&mut self, seed: i32);

    fn next_u32(&mut self) -> u32;
}

/// Captured state of a [`SimRand`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RandState(u128);

#[derive(Clone, Debug)]
pub struct SimRand {
    /// Upper 64 bits store the stream id; lower 64 bits store the rolling
    /// counter.
    state: u128,
}

impl SimRand {
    pub fn from_seed(seed: i32) -> Self {
        let mut stream_id = u64::from(seed as u32)
            .wrapping_mul(0xA0761D6478BD642F)
            .wrapping_add(0xE7037ED1A0B428DB);
        stream_id = mix64(stream_id);
        let counter = mix64(stream_id ^ 0xD1342543DE82EF95);
        Self {
            state: (u128::from(stream_id) << 64) | u128::from(counter),
        }
    }

    /// Advance the stream and return the next `u64` sample.
    pub fn next_u64(&mut self) -> u64 {
        let stream_id = (self.state >> 64) as u64;
        let mut counter = self.state as u64;
        counter = counter.wrapping_add(0x9E3779B97F4A7C15);
        self.state = (u128::from(stream_id) << 64) | u128::from(counter);
        mix64(stream_id ^ counter)
    }

    /// Advance the stream and return the next `f64` sample in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        const SCALE: f64 = (1u64 << 53) as f64;
        ((self.next_u64() >> 11) as f64) / SCALE
    }

    /// Sample an integer in `[min, max)`. Returns `min` for an empty range.
    pub fn range(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (i64::from(max) - i64::from(min)) as u64;
        (i64::from(min) + (self.next_u64() % span) as i64) as i32
    }

    /// Returns `true` with probability `chance`.
    pub fn chance(&mut self, chance: f64) -> bool {
        self.next_f64() < chance
    }
}

impl Generator for SimRand {
    type State = RandState;

    fn snapshot(&self) -> RandState {
        RandState(self.state)
    }

    fn restore(&mut self, state: RandState) {
        self.state = state.0;
    }

    fn init_state(&mut self, seed: i32) {
        *self = Self::from_seed(seed);
    }

    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineRand {
    core: ChaCha8Rng,
}

impl EngineRand {
    pub fn from_seed(seed: i32) -> Self {
        Self {
            core: ChaCha8Rng::seed_from_u64(u64::from(seed as u32)),
        }
    }

    /// Next sample in `[0, 1)`.
    pub fn value(&mut self) -> f32 {
        self.core.gen::<f32>()
    }
}

impl Generator for EngineRand {
    type State = ChaCha8Rng;

    fn snapshot(&self) -> ChaCha8Rng {
        self.core.clone()
    }

    fn restore(&mut self, state: ChaCha8Rng) {
        self.core = state;
    }

    fn init_state(&mut self, seed: i32) {
        *self = Self::from_seed(seed);
    }

    fn next_u32(&mut self) -> u32 {
        self.core.next_u32()
    }
}

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
