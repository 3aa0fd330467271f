//! Error types for the determinism core.
//!
//! Every variant except the two exhaustion errors signals a broken
//! nesting invariant: a replica that keeps running after one of those has
//! almost certainly diverged from its peers, so callers should treat them as
//! fatal rather than retry.

use std::thread::ThreadId;

use thiserror::Error;

use crate::entity::EntityId;
use crate::world::RegionId;

/// Coarse classification used by hosts to tell desync bugs apart from
/// ordinary allocation failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A push/pop or set/clear pairing was violated.
    Invariant,
    /// A reserved identifier block ran out.
    Exhaustion,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeterminismError {
    #[error("pop on empty {stack} stack")]
    StackUnderflow { stack: &'static str },

    #[error("{stack} scope closed out of order: expected depth {expected}, found {actual}")]
    UnbalancedScope {
        stack: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("entity operation on {ended} ended while {active:?} was innermost")]
    EntityMismatch {
        ended: EntityId,
        active: Option<EntityId>,
    },

    #[error("id block cleared while no block is current")]
    DoubleClear,

    #[error("id block cleared for region {cleared} while region {current} holds the slot")]
    BlockMismatch { cleared: RegionId, current: RegionId },

    #[error("region {0} has no reserved id block")]
    UnknownRegion(RegionId),

    #[error("id block of region {region} exhausted ({count} ids from {start})")]
    BlockExhausted {
        region: RegionId,
        start: i32,
        count: i32,
    },

    #[error("host id counter exhausted after {last}")]
    HostIdsExhausted { last: i32 },

    #[error("suppressed scope ended while none is active")]
    SuppressionUnderflow,

    #[error("determinism context owned by {owner:?} used from {actual:?}")]
    WrongThread { owner: ThreadId, actual: ThreadId },

    #[error("context torn down with open scopes: {0}")]
    OpenScopes(String),
}

impl DeterminismError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BlockExhausted { .. } | Self::HostIdsExhausted { .. } => ErrorKind::Exhaustion,
            _ => ErrorKind::Invariant,
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        self.kind() == ErrorKind::Invariant
    }
}
