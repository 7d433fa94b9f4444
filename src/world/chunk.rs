use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use log::{debug, trace, warn};
use parking_lot::RwLock;

use super::{
    block::{BlockEntity, BlockState},
    direction::HorizontalDirection,
    event::WorldEvent,
    prototype::ChunkPrototype,
    section::ChunkSection,
    section_index::SectionIndex,
    ChunkPos, InChunkPos, WorldShared,
};
use crate::error::WorldError;

/// One position/state pair of an update batch. `None` clears the block.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct BlockUpdate {
    pub pos: InChunkPos,
    pub state: Option<BlockState>,
}

impl BlockUpdate {
    pub fn new(pos: InChunkPos, state: Option<BlockState>) -> BlockUpdate {
        BlockUpdate { pos, state }
    }
}

struct ChunkInner {
    sections: SectionIndex,
    block_entities: HashMap<InChunkPos, BlockEntity>,
}

/// One column of the world.
pub struct Chunk {
    pos: ChunkPos,
    shared: Arc<WorldShared>,
    inner: RwLock<ChunkInner>,
    neighbors: RwLock<[Weak<Chunk>; 8]>,
}

impl Chunk {
    pub fn new(pos: ChunkPos, shared: Arc<WorldShared>) -> Chunk {
        let sections = SectionIndex::new(
            shared.dimension.min_section(),
            shared.dimension.max_section(),
            shared.occlusion_version.clone(),
        );
        Chunk {
            pos,
            shared,
            inner: RwLock::new(ChunkInner {
                sections,
                block_entities: HashMap::new(),
            }),
            neighbors: RwLock::new(Default::default()),
        }
    }

    pub fn from_prototype(pos: ChunkPos, shared: Arc<WorldShared>, prototype: ChunkPrototype) -> Chunk {
        let chunk = Chunk::new(pos, shared);
        {
            let mut inner = chunk.inner.write();
            for (height, blocks) in prototype.sections.unwrap_or_default() {
                if blocks.is_empty() {
                    continue;
                }
                if inner.sections.create_with(height, || blocks).is_none() {
                    warn!("Dropping section {} of chunk {:?}: outside of the world", height, pos);
                }
            }

            for (at, entity) in prototype.block_entities.unwrap_or_default() {
                let stored = inner
                    .sections
                    .get(at.section_height())
                    .and_then(|section| section.get(at.x as usize, (at.y & 0x0f) as usize, at.z as usize));
                if stored == Some(entity.state()) {
                    inner.block_entities.insert(at, entity);
                } else {
                    debug!("Ignoring block entity at {:?} without a matching state", at);
                }
            }
        }
        chunk
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    pub fn get_block(&self, pos: InChunkPos) -> Option<BlockState> {
        let inner = self.inner.read();
        let section = inner.sections.get(pos.section_height())?;
        section.get(pos.x as usize, (pos.y & 0x0f) as usize, pos.z as usize)
    }

    pub fn set_block(&self, pos: InChunkPos, state: Option<BlockState>) -> bool {
        self.apply([BlockUpdate::new(pos, state)]) > 0
    }

    /// Applies one batch of updates and returns how many changed the stored
    /// state. A non-empty change set is announced as a single
    /// [`WorldEvent::BlocksUpdate`].
    pub fn apply(&self, updates: impl IntoIterator<Item = BlockUpdate>) -> usize {
        let mut changed = HashMap::new();
        let mut created = Vec::new();
        let mut total = 0;

        {
            let mut inner = self.inner.write();
            let inner = &mut *inner;
            for BlockUpdate { pos, state } in updates {
                total += 1;
                let height = pos.section_height();
                let section = match state {
                    Some(_) => {
                        let existed = inner.sections.get(height).is_some();
                        match inner.sections.create(height) {
                            Some(section) => {
                                if !existed {
                                    created.push(section.clone());
                                }
                                section.clone()
                            }
                            None => {
                                warn!("Ignoring update at {:?} in chunk {:?}: outside of the world", pos, self.pos);
                                continue;
                            }
                        }
                    }
                    None => match inner.sections.get(height) {
                        Some(section) => section.clone(),
                        None => continue,
                    },
                };

                let (x, y, z) = (pos.x as usize, (pos.y & 0x0f) as usize, pos.z as usize);
                if section.get(x, y, z) == state {
                    continue;
                }
                section.set(x, y, z, state);

                match state {
                    Some(state) if state.has_block_entity() => {
                        inner.block_entities.insert(pos, BlockEntity::new(state));
                    }
                    _ => {
                        inner.block_entities.remove(&pos);
                    }
                }
                changed.insert(pos, state);
            }
        }

        for section in &created {
            self.link_new_section(section);
        }

        trace!(
            "Applied {} of {} updates to chunk {:?} ({} new sections)",
            changed.len(),
            total,
            self.pos,
            created.len()
        );

        let count = changed.len();
        if count > 0 {
            self.shared.events.dispatch(WorldEvent::BlocksUpdate {
                chunk: self.pos,
                updates: changed,
            });
        }
        count
    }

    pub fn section(&self, height: i32) -> Option<Arc<ChunkSection>> {
        self.inner.read().sections.get(height).cloned()
    }

    /// Snapshot of the allocated sections, lowest first.
    pub fn sections(&self) -> Vec<Arc<ChunkSection>> {
        self.inner.read().sections.iter().cloned().collect()
    }

    pub fn block_entity(&self, pos: InChunkPos) -> Option<BlockEntity> {
        self.inner.read().block_entities.get(&pos).cloned()
    }

    /// Edits the block entity at `pos`.
    pub fn update_block_entity(
        &self,
        pos: InChunkPos,
        update: impl FnOnce(&mut BlockEntity),
    ) -> Result<(), WorldError> {
        let mut inner = self.inner.write();
        let entity = inner
            .block_entities
            .get_mut(&pos)
            .ok_or(WorldError::NoBlockEntity(pos))?;
        update(entity);
        Ok(())
    }

    pub fn block_entity_count(&self) -> usize {
        self.inner.read().block_entities.len()
    }

    pub fn neighbor(&self, direction: HorizontalDirection) -> Option<Arc<Chunk>> {
        self.neighbors.read()[direction.index()].upgrade()
    }

    pub fn set_neighbor(&self, direction: HorizontalDirection, neighbor: Option<&Arc<Chunk>>) {
        self.neighbors.write()[direction.index()] = neighbor.map(Arc::downgrade).unwrap_or_default();
    }

    /// Links every section of this chunk with the section at the same
    /// height of `other`, which lies in the cardinal `direction`.
    pub fn link_sections(&self, direction: HorizontalDirection, other: &Chunk) {
        let face = match direction.face() {
            Some(face) => face,
            None => return,
        };
        let own = self.sections();
        let theirs: HashMap<i32, Arc<ChunkSection>> = other
            .sections()
            .into_iter()
            .map(|section| (section.height(), section))
            .collect();

        for section in own {
            if let Some(neighbor) = theirs.get(&section.height()) {
                ChunkSection::link(&section, face, neighbor);
            }
        }
    }

    /// Clears the section links pointing towards the cardinal `direction`.
    pub fn unlink_sections(&self, direction: HorizontalDirection) {
        if let Some(face) = direction.face() {
            for section in self.sections() {
                section.unlink(face);
            }
        }
    }

    pub fn invalidate_ambient(&self) {
        for section in self.sections() {
            section.invalidate_ambient();
        }
    }

    fn link_new_section(&self, section: &Arc<ChunkSection>) {
        let height = section.height();
        for direction in HorizontalDirection::ALL {
            let neighbor = match self.neighbor(direction) {
                Some(neighbor) => neighbor,
                None => continue,
            };
            if let Some(face) = direction.face() {
                if let Some(other) = neighbor.section(height) {
                    ChunkSection::link(section, face, &other);
                }
            }
            // Sections sampling this one through a diagonal.
            for other in [height - 1, height + 1]
                .into_iter()
                .chain(direction.face().is_none().then(|| height))
                .filter_map(|h| neighbor.section(h))
            {
                other.invalidate_ambient();
            }
        }
    }
}
