use std::sync::{atomic::AtomicU64, Arc};

use super::{
    direction::Direction,
    section::{ChunkSection, SectionBlocks},
};

/// Sparse, height-indexed sections of one chunk column.
pub struct SectionIndex {
    min_section: i32,
    max_section: i32,
    sections: Vec<Option<Arc<ChunkSection>>>,
    occlusion_version: Arc<AtomicU64>,
}

impl SectionIndex {
    pub fn new(min_section: i32, max_section: i32, occlusion_version: Arc<AtomicU64>) -> SectionIndex {
        debug_assert!(min_section <= max_section);
        let count = (max_section - min_section + 1) as usize;
        SectionIndex {
            min_section,
            max_section,
            sections: vec![None; count],
            occlusion_version,
        }
    }

    pub fn min_section(&self) -> i32 {
        self.min_section
    }

    pub fn max_section(&self) -> i32 {
        self.max_section
    }

    fn slot(&self, height: i32) -> Option<usize> {
        if height < self.min_section || height > self.max_section {
            return None;
        }
        Some((height - self.min_section) as usize)
    }

    pub fn get(&self, height: i32) -> Option<&Arc<ChunkSection>> {
        self.slot(height).and_then(|slot| self.sections[slot].as_ref())
    }

    /// Returns the section at `height`, allocating an empty one if needed.
    pub fn create(&mut self, height: i32) -> Option<&Arc<ChunkSection>> {
        self.create_with(height, SectionBlocks::default)
    }

    /// Like [`SectionIndex::create`], filling a new section from `blocks`.
    pub fn create_with(
        &mut self,
        height: i32,
        blocks: impl FnOnce() -> SectionBlocks,
    ) -> Option<&Arc<ChunkSection>> {
        let slot = self.slot(height)?;
        if self.sections[slot].is_none() {
            let section = Arc::new(ChunkSection::with_blocks(
                height,
                blocks(),
                self.occlusion_version.clone(),
            ));
            if let Some(below) = self.get(height - 1) {
                ChunkSection::link(&section, Direction::Down, below);
            }
            if let Some(above) = self.get(height + 1) {
                ChunkSection::link(&section, Direction::Up, above);
            }
            self.sections[slot] = Some(section);
        }
        self.sections[slot].as_ref()
    }

    /// Allocated sections in ascending height order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ChunkSection>> {
        self.sections.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|section| section.is_none())
    }
}
