//! Identifier allocation.
//!
//! Each region owns a block of identifiers reserved for it ahead of time.
//! While a region loads or finalizes, its block sits in the context's single
//! ambient slot and every minted identifier comes from that block's cursor.
//! Outside those scopes identifiers come from the host's own counter.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::DeterminismContext;
use crate::error::DeterminismError;
use crate::world::RegionId;

/// Contiguous range `[start, start + count)` with a cursor at the next free id.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "BlockRange")]
pub struct IdBlock {
    start: i32,
    count: i32,
    /// Wider than the range so the cursor can sit one past `i32::MAX`.
    cursor: i64,
}

#[derive(Deserialize)]
struct BlockRange {
    start: i32,
    count: i32,
    #[serde(default)]
    cursor: Option<i64>,
}

impl TryFrom<BlockRange> for IdBlock {
    type Error = String;

    fn try_from(range: BlockRange) -> Result<Self, Self::Error> {
        let mut block = IdBlock::new(range.start, range.count);
        if let Some(cursor) = range.cursor {
            if cursor < i64::from(block.start) || cursor > block.end() {
                return Err(format!(
                    "cursor {} outside id block [{}, {}]",
                    cursor,
                    block.start,
                    block.end()
                ));
            }
            block.cursor = cursor;
        }
        Ok(block)
    }
}

impl IdBlock {
    pub fn new(start: i32, count: i32) -> Self {
        Self {
            start,
            count: count.max(0),
            cursor: i64::from(start),
        }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn count(&self) -> i32 {
        self.count
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// One past the last id the block may hand out; never beyond `i32::MAX`.
    fn end(&self) -> i64 {
        (i64::from(self.start) + i64::from(self.count)).min(i64::from(i32::MAX) + 1)
    }

    pub fn remaining(&self) -> i64 {
        (self.end() - self.cursor).max(0)
    }

    /// Hand out the id under the cursor and advance it.
    pub fn next_id(&mut self, region: RegionId) -> Result<i32, DeterminismError> {
        let exhausted = DeterminismError::BlockExhausted {
            region,
            start: self.start,
            count: self.count,
        };
        if self.remaining() == 0 {
            return Err(exhausted);
        }
        let id = i32::try_from(self.cursor).map_err(|_| exhausted)?;
        self.cursor += 1;
        Ok(id)
    }
}

/// The host's own monotonically increasing identifier counter.
#[derive(Clone, Debug)]
pub struct IdMinter {
    next: i32,
    exhausted: bool,
}

impl IdMinter {
    pub fn new(first: i32) -> Self {
        Self {
            next: first,
            exhausted: false,
        }
    }

    pub fn next_id(&mut self) -> Result<i32, DeterminismError> {
        if self.exhausted {
            return Err(DeterminismError::HostIdsExhausted { last: self.next });
        }
        let id = self.next;
        match self.next.checked_add(1) {
            Some(next) => self.next = next,
            None => self.exhausted = true,
        }
        Ok(id)
    }
}

/// Token returned by [`DeterminismContext::set_current_block`]; remembers the
/// slot's previous occupant so nested region loads restore it.
#[must_use = "a block scope must be passed back to clear_current_block"]
#[derive(Debug)]
pub struct BlockScope {
    region: RegionId,
    previous: Option<RegionId>,
    active: bool,
}

impl BlockScope {
    pub fn region(&self) -> RegionId {
        self.region
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl DeterminismContext {
    /// Register the block reserved for `region`, replacing any earlier one.
    pub fn reserve_block(&mut self, region: RegionId, block: IdBlock) {
        self.blocks.insert(region, block);
    }

    pub fn block(&self, region: RegionId) -> Option<&IdBlock> {
        self.blocks.get(&region)
    }

    pub fn current_block(&self) -> Option<RegionId> {
        self.current_block
    }

    pub fn set_current_block(&mut self, region: RegionId) -> Result<BlockScope, DeterminismError> {
        self.check_thread()?;
        if !self.is_multiplayer() {
            return Ok(BlockScope {
                region,
                previous: None,
                active: false,
            });
        }
        if !self.blocks.contains_key(&region) {
            return Err(DeterminismError::UnknownRegion(region));
        }
        let previous = self.current_block.replace(region);
        debug!(region, ?previous, "id block current");
        Ok(BlockScope {
            region,
            previous,
            active: true,
        })
    }

    pub fn clear_current_block(&mut self, scope: BlockScope) -> Result<(), DeterminismError> {
        self.check_thread()?;
        if !scope.active {
            return Ok(());
        }
        match self.current_block {
            None => Err(DeterminismError::DoubleClear),
            Some(current) if current != scope.region => Err(DeterminismError::BlockMismatch {
                cleared: scope.region,
                current,
            }),
            Some(_) => {
                self.current_block = scope.previous;
                Ok(())
            }
        }
    }

    /// Mint a new identifier, drawing from the current block if one is set.
    pub fn mint_id(&mut self) -> Result<i32, DeterminismError> {
        self.check_thread()?;
        match self.current_block {
            Some(region) => self
                .blocks
                .get_mut(&region)
                .ok_or(DeterminismError::UnknownRegion(region))?
                .next_id(region),
            None => self.minter.next_id(),
        }
    }
}
