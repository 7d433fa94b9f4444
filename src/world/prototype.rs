use std::collections::{BTreeMap, HashMap};

use super::{
    block::{BlockEntity, BlockState},
    pos::InChunkPos,
    section::SectionBlocks,
};

/// Partial chunk payload collected before a [`super::Chunk`] is built.
/// Missing fields are `None` until some payload provides them.
#[derive(Clone, Debug, Default)]
pub struct ChunkPrototype {
    pub sections: Option<BTreeMap<i32, SectionBlocks>>,
    pub block_entities: Option<HashMap<InChunkPos, BlockEntity>>,
}

impl ChunkPrototype {
    pub fn new() -> ChunkPrototype {
        Default::default()
    }

    /// A prototype with block data (possibly no sections at all).
    pub fn with_blocks() -> ChunkPrototype {
        ChunkPrototype {
            sections: Some(BTreeMap::new()),
            block_entities: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.sections.is_some()
    }

    pub fn set_section(&mut self, height: i32, blocks: SectionBlocks) {
        self.sections
            .get_or_insert_with(BTreeMap::new)
            .insert(height, blocks);
    }

    /// Writes one block, allocating the section on the first non-air write.
    pub fn set_block(&mut self, pos: InChunkPos, state: Option<BlockState>) {
        let sections = self.sections.get_or_insert_with(BTreeMap::new);
        let height = pos.section_height();
        match (sections.get_mut(&height), state) {
            (Some(section), _) => {
                section.set(pos.section_index(), state);
            }
            (None, Some(_)) => {
                let mut section = SectionBlocks::default();
                section.set(pos.section_index(), state);
                sections.insert(height, section);
            }
            (None, None) => {}
        }
    }

    pub fn get_block(&self, pos: InChunkPos) -> Option<BlockState> {
        self.sections
            .as_ref()?
            .get(&pos.section_height())?
            .get(pos.section_index())
    }

    pub fn set_block_entity(&mut self, pos: InChunkPos, entity: BlockEntity) {
        self.block_entities
            .get_or_insert_with(HashMap::new)
            .insert(pos, entity);
    }

    /// Merges `next` into this prototype. Whatever `next` carries wins;
    /// sections and entities it does not mention are kept.
    pub fn update(&mut self, next: ChunkPrototype) {
        match (&mut self.sections, next.sections) {
            (Some(sections), Some(next)) => sections.extend(next),
            (current @ None, next @ Some(_)) => *current = next,
            (_, None) => {}
        }
        match (&mut self.block_entities, next.block_entities) {
            (Some(entities), Some(next)) => entities.extend(next),
            (current @ None, next @ Some(_)) => *current = next,
            (_, None) => {}
        }
    }
}
