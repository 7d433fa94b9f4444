//! Section interior visibility.
//!
//! For every ordered pair of faces a section records whether sight entering
//! through one face can leave through the other. Renderers use this to skip
//! sections buried in solid terrain.

mod pool;
pub mod tracer;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use super::{
    block::{is_full_opaque, BlockState},
    direction::{DirectionPair, DIRECTION_PAIRS},
    section::SectionBlocks,
};

/// One entry per ordered face pair; `true` means sight is blocked.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct OcclusionTable([bool; DIRECTION_PAIRS]);

impl OcclusionTable {
    /// Fully permeable.
    pub const EMPTY: OcclusionTable = OcclusionTable([false; DIRECTION_PAIRS]);
    /// Fully sealed.
    pub const FULL: OcclusionTable = OcclusionTable([true; DIRECTION_PAIRS]);

    pub fn is_occluded(&self, pair: DirectionPair) -> bool {
        self.0[pair.index()]
    }

    pub fn set(&mut self, pair: DirectionPair, occluded: bool) {
        self.0[pair.index()] = occluded;
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum CacheState {
    Valid,
    Invalid,
}

/// Lazily computed occlusion table of one section.
pub struct SectionOcclusion {
    state: CacheState,
    table: OcclusionTable,
    version: Arc<AtomicU64>,
}

impl SectionOcclusion {
    pub fn new(version: Arc<AtomicU64>) -> SectionOcclusion {
        SectionOcclusion {
            state: CacheState::Valid,
            table: OcclusionTable::EMPTY,
            version,
        }
    }

    /// Recomputes right away when a shortcut applies, otherwise defers the
    /// full trace to the next query.
    pub fn invalidate(&mut self, blocks: &SectionBlocks, notify: bool) {
        match tracer::shortcut(blocks) {
            Some(table) => self.store(table, notify),
            None => self.state = CacheState::Invalid,
        }
    }

    pub fn on_set(
        &mut self,
        blocks: &SectionBlocks,
        previous: Option<BlockState>,
        state: Option<BlockState>,
    ) {
        if is_full_opaque(previous) == is_full_opaque(state) {
            return;
        }
        self.invalidate(blocks, true);
    }

    pub fn is_occluded(&mut self, blocks: &SectionBlocks, pair: DirectionPair) -> bool {
        self.table(blocks).is_occluded(pair)
    }

    pub fn table(&mut self, blocks: &SectionBlocks) -> OcclusionTable {
        if self.state == CacheState::Invalid {
            let table = tracer::trace(blocks);
            self.store(table, true);
        }
        self.table
    }

    pub fn is_valid(&self) -> bool {
        self.state == CacheState::Valid
    }

    fn store(&mut self, table: OcclusionTable, notify: bool) {
        self.state = CacheState::Valid;
        if table == self.table {
            return;
        }
        self.table = table;
        if notify {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{
        block::blocks,
        direction::Direction,
        pos::{section_index, SECTION_BLOCKS},
    };

    fn pair(from: Direction, to: Direction) -> DirectionPair {
        DirectionPair::new(from, to).unwrap()
    }

    #[test]
    fn shortcuts_apply_immediately() {
        let version = Arc::new(AtomicU64::new(0));
        let mut occlusion = SectionOcclusion::new(version.clone());
        let blocks = SectionBlocks::from_states(vec![Some(blocks::STONE); SECTION_BLOCKS]);

        occlusion.invalidate(&blocks, true);
        assert!(occlusion.is_valid());
        assert!(occlusion.is_occluded(&blocks, pair(Direction::Up, Direction::Down)));
        assert_eq!(version.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn full_trace_is_deferred() {
        let version = Arc::new(AtomicU64::new(0));
        let mut occlusion = SectionOcclusion::new(version.clone());
        let mut data = SectionBlocks::default();
        for x in 0..16 {
            for z in 0..16 {
                data.set(section_index(x, 8, z), Some(blocks::STONE));
            }
        }

        occlusion.invalidate(&data, true);
        assert!(!occlusion.is_valid());
        assert_eq!(version.load(Ordering::SeqCst), 0);

        assert!(occlusion.is_occluded(&data, pair(Direction::Up, Direction::Down)));
        assert!(!occlusion.is_occluded(&data, pair(Direction::North, Direction::South)));
        assert!(occlusion.is_valid());
        assert_eq!(version.load(Ordering::SeqCst), 1);

        // Same table again: no version bump.
        occlusion.invalidate(&data, true);
        occlusion.table(&data);
        assert_eq!(version.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn opacity_preserving_swaps_keep_the_table() {
        let version = Arc::new(AtomicU64::new(0));
        let mut occlusion = SectionOcclusion::new(version.clone());
        let data = SectionBlocks::from_states(vec![Some(blocks::STONE); SECTION_BLOCKS]);
        occlusion.invalidate(&data, false);

        occlusion.on_set(&data, Some(blocks::STONE), Some(blocks::DIRT));
        occlusion.on_set(&data, None, Some(blocks::GLASS));
        assert!(occlusion.is_valid());
        assert_eq!(version.load(Ordering::SeqCst), 0);
    }
}
