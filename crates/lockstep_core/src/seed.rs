//! Seed derivation for region scopes.

use rand::RngCore;
use rand_chacha::ChaCha8Rng;
use rand_seeder::Seeder;

use crate::world::RegionId;

/// Mix two identifiers into one seed: `a ^ rotate_left(b, 16)`.
///
/// Not commutative; the rotation keeps small session ids from cancelling
/// small region ids.
pub fn combine(a: i32, b: i32) -> i32 {
    a ^ b.rotate_left(16)
}

/// Seed installed while a region scope is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeSeed(i32);

impl ScopeSeed {
    pub fn for_region(region: RegionId, session_id: i32) -> Self {
        Self(combine(region, session_id))
    }

    pub fn fixed(seed: i32) -> Self {
        Self(seed)
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

/// Hash a human-readable session label into a session id.
pub fn session_id_from_label(label: &str) -> i32 {
    let mut rng: ChaCha8Rng = Seeder::from(label).make_rng();
    rng.next_u32() as i32
}
