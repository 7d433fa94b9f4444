pub mod ambient;
pub mod block;
pub mod chunk;
pub mod direction;
pub mod event;
pub mod gen;
pub mod occlusion;
pub mod pos;
pub mod prototype;
pub mod sched;
pub mod section;
pub mod section_index;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use dashmap::{mapref::entry::Entry, DashMap};
use flume::Receiver;
use log::debug;

pub use block::{BlockEntity, BlockState};
pub use chunk::{BlockUpdate, Chunk};
pub use direction::{Direction, DirectionPair, HorizontalDirection};
pub use event::WorldEvent;
pub use pos::{BlockPos, ChunkPos, InChunkPos};
pub use prototype::ChunkPrototype;
pub use section::ChunkSection;

use crate::{config::DimensionConfig, error::WorldError};
use event::EventBus;

/// State every chunk of one world refers back to.
pub struct WorldShared {
    pub(crate) dimension: DimensionConfig,
    pub(crate) occlusion_version: Arc<AtomicU64>,
    pub(crate) events: EventBus,
}

impl WorldShared {
    pub fn new(dimension: DimensionConfig) -> WorldShared {
        WorldShared {
            dimension,
            occlusion_version: Arc::new(AtomicU64::new(0)),
            events: EventBus::default(),
        }
    }
}

pub struct World {
    shared: Arc<WorldShared>,
    chunks: DashMap<ChunkPos, Arc<Chunk>>,
    pending: DashMap<ChunkPos, ChunkPrototype>,
}

impl World {
    pub fn new(dimension: DimensionConfig) -> World {
        World {
            shared: Arc::new(WorldShared::new(dimension)),
            chunks: DashMap::with_capacity(32),
            pending: DashMap::new(),
        }
    }

    pub fn dimension(&self) -> DimensionConfig {
        self.shared.dimension
    }

    pub fn subscribe(&self) -> Receiver<WorldEvent> {
        self.shared.events.subscribe()
    }

    /// Bumped whenever some section's occlusion table changed.
    pub fn occlusion_version(&self) -> u64 {
        self.shared.occlusion_version.load(Ordering::SeqCst)
    }

    pub fn get_chunk(&self, pos: ChunkPos) -> Option<Arc<Chunk>> {
        self.chunks.get(&pos).map(|chunk| chunk.clone())
    }

    pub fn has_chunk(&self, x: i32, z: i32) -> bool {
        self.chunks.contains_key(&ChunkPos::new(x, z))
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Positions holding an incomplete payload.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn chunks(&self) -> Vec<Arc<Chunk>> {
        self.chunks.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Merges a (possibly partial) payload for `pos`. Once block data is
    /// known the chunk is built and loaded, replacing any previous one.
    pub fn receive_chunk(&self, pos: ChunkPos, prototype: ChunkPrototype) -> Option<Arc<Chunk>> {
        let prototype = match self.pending.entry(pos) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().update(prototype);
                if !entry.get().is_complete() {
                    debug!("Chunk {:?} is still incomplete", pos);
                    return None;
                }
                entry.remove()
            }
            Entry::Vacant(entry) => {
                if !prototype.is_complete() {
                    debug!("Chunk {:?} is still incomplete", pos);
                    entry.insert(prototype);
                    return None;
                }
                prototype
            }
        };

        if self.chunks.contains_key(&pos) {
            self.unload_chunk(pos);
        }
        let chunk = Arc::new(Chunk::from_prototype(pos, self.shared.clone(), prototype));
        self.insert_chunk(chunk.clone());
        Some(chunk)
    }

    /// Registers a built chunk and links it with every loaded neighbor.
    pub fn insert_chunk(&self, chunk: Arc<Chunk>) {
        let pos = chunk.pos();
        self.chunks.insert(pos, chunk.clone());

        for direction in HorizontalDirection::ALL {
            let neighbor = match self.get_chunk(pos.offset(direction)) {
                Some(neighbor) => neighbor,
                None => continue,
            };
            chunk.set_neighbor(direction, Some(&neighbor));
            neighbor.set_neighbor(direction.inverse(), Some(&chunk));
            chunk.link_sections(direction, &neighbor);
            // Sections of every height may sample the new column diagonally.
            neighbor.invalidate_ambient();
        }

        debug!("Loaded chunk {:?} with {} sections", pos, chunk.sections().len());
        self.shared.events.dispatch(WorldEvent::ChunkLoaded(pos));
    }

    pub fn unload_chunk(&self, pos: ChunkPos) -> Option<Arc<Chunk>> {
        let (_, chunk) = self.chunks.remove(&pos)?;

        for direction in HorizontalDirection::ALL {
            if let Some(neighbor) = chunk.neighbor(direction) {
                neighbor.set_neighbor(direction.inverse(), None);
                neighbor.unlink_sections(direction.inverse());
                neighbor.invalidate_ambient();
            }
            chunk.set_neighbor(direction, None);
        }

        debug!("Unloaded chunk {:?}", pos);
        self.shared.events.dispatch(WorldEvent::ChunkUnloaded(pos));
        Some(chunk)
    }

    pub fn get_block(&self, pos: BlockPos) -> Option<BlockState> {
        self.get_chunk(pos.chunk_pos())?.get_block(pos.in_chunk())
    }

    pub fn set_block(&self, pos: BlockPos, state: Option<BlockState>) -> Result<bool, WorldError> {
        let chunk_pos = pos.chunk_pos();
        let chunk = self
            .get_chunk(chunk_pos)
            .ok_or(WorldError::ChunkNotLoaded(chunk_pos))?;
        Ok(chunk.set_block(pos.in_chunk(), state))
    }

    pub fn block_entity(&self, pos: BlockPos) -> Option<BlockEntity> {
        self.get_chunk(pos.chunk_pos())?.block_entity(pos.in_chunk())
    }

    pub fn update_block_entity(
        &self,
        pos: BlockPos,
        update: impl FnOnce(&mut BlockEntity),
    ) -> Result<(), WorldError> {
        let chunk_pos = pos.chunk_pos();
        let chunk = self
            .get_chunk(chunk_pos)
            .ok_or(WorldError::ChunkNotLoaded(chunk_pos))?;
        chunk.update_block_entity(pos.in_chunk(), update)
    }

    /// Applies world-space updates, one batch (and one event) per chunk.
    /// Returns the number of effective changes.
    pub fn apply_updates(&self, updates: impl IntoIterator<Item = (BlockPos, Option<BlockState>)>) -> usize {
        let mut batches: HashMap<ChunkPos, Vec<BlockUpdate>> = HashMap::new();
        for (pos, state) in updates {
            batches
                .entry(pos.chunk_pos())
                .or_default()
                .push(BlockUpdate::new(pos.in_chunk(), state));
        }

        let mut changed = 0;
        for (pos, batch) in batches {
            match self.get_chunk(pos) {
                Some(chunk) => changed += chunk.apply(batch),
                None => debug!("Dropping {} updates for unloaded chunk {:?}", batch.len(), pos),
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::block::blocks;

    fn world() -> World {
        World::new(DimensionConfig::default())
    }

    fn load(world: &World, x: i32, z: i32) -> Arc<Chunk> {
        world
            .receive_chunk(ChunkPos::new(x, z), ChunkPrototype::with_blocks())
            .unwrap()
    }

    #[test]
    fn partial_payloads_wait_for_blocks() {
        let world = world();
        let pos = ChunkPos::new(0, 0);
        let mut entities = ChunkPrototype::new();
        entities.set_block_entity(InChunkPos::new(1, 1, 1), BlockEntity::new(blocks::CHEST));
        assert!(world.receive_chunk(pos, entities).is_none());
        assert!(!world.has_chunk(0, 0));

        let mut data = ChunkPrototype::with_blocks();
        data.set_block(InChunkPos::new(1, 1, 1), Some(blocks::CHEST));
        let chunk = world.receive_chunk(pos, data).unwrap();
        assert!(world.has_chunk(0, 0));
        assert!(chunk.block_entity(InChunkPos::new(1, 1, 1)).is_some());
    }

    #[test]
    fn loading_links_sections_across_chunks() {
        let world = world();
        let west = load(&world, 0, 0);
        west.set_block(InChunkPos::new(15, 0, 0), Some(blocks::STONE));
        let east = load(&world, 1, 0);
        east.set_block(InChunkPos::new(0, 0, 0), Some(blocks::STONE));

        let west_section = west.section(0).unwrap();
        let east_section = east.section(0).unwrap();
        assert!(Arc::ptr_eq(&west_section.neighbor(Direction::East).unwrap(), &east_section));
        assert!(Arc::ptr_eq(&east_section.neighbor(Direction::West).unwrap(), &west_section));
        assert!(Arc::ptr_eq(
            &west.neighbor(HorizontalDirection::East).unwrap(),
            &east
        ));

        let north = load(&world, 0, -1);
        assert!(Arc::ptr_eq(&west.neighbor(HorizontalDirection::North).unwrap(), &north));
        let diagonal = load(&world, 1, -1);
        assert!(Arc::ptr_eq(&west.neighbor(HorizontalDirection::NorthEast).unwrap(), &diagonal));
    }

    #[test]
    fn unloading_clears_links() {
        let world = world();
        let a = load(&world, 0, 0);
        let b = load(&world, 0, 1);
        a.set_block(InChunkPos::new(0, 0, 15), Some(blocks::STONE));
        b.set_block(InChunkPos::new(0, 0, 0), Some(blocks::STONE));
        let section = a.section(0).unwrap();
        assert!(section.neighbor(Direction::South).is_some());

        assert!(world.unload_chunk(ChunkPos::new(0, 1)).is_some());
        assert!(section.neighbor(Direction::South).is_none());
        assert!(a.neighbor(HorizontalDirection::South).is_none());
        assert!(world.unload_chunk(ChunkPos::new(0, 1)).is_none());
    }

    #[test]
    fn lifecycle_events_are_dispatched() {
        let world = world();
        let events = world.subscribe();
        load(&world, 2, 3);
        world.unload_chunk(ChunkPos::new(2, 3));
        assert_eq!(events.try_recv().unwrap(), WorldEvent::ChunkLoaded(ChunkPos::new(2, 3)));
        assert_eq!(events.try_recv().unwrap(), WorldEvent::ChunkUnloaded(ChunkPos::new(2, 3)));
    }

    #[test]
    fn updates_are_grouped_per_chunk() {
        let world = world();
        load(&world, 0, 0);
        load(&world, -1, 0);
        let events = world.subscribe();

        let changed = world.apply_updates([
            (BlockPos::new(1, 5, 1), Some(blocks::STONE)),
            (BlockPos::new(2, 5, 1), Some(blocks::STONE)),
            (BlockPos::new(-1, 5, 1), Some(blocks::DIRT)),
            (BlockPos::new(40, 5, 1), Some(blocks::DIRT)),
        ]);
        assert_eq!(changed, 3);
        assert_eq!(events.try_iter().count(), 2);
        assert_eq!(world.get_block(BlockPos::new(-1, 5, 1)), Some(blocks::DIRT));
        assert_eq!(world.get_block(BlockPos::new(40, 5, 1)), None);
        assert_eq!(
            world.set_block(BlockPos::new(40, 5, 1), Some(blocks::DIRT)),
            Err(WorldError::ChunkNotLoaded(ChunkPos::new(2, 0)))
        );
    }

    #[test]
    fn ambient_occlusion_sees_neighbor_chunks() {
        let world = world();
        let west = load(&world, 0, 0);
        let east = load(&world, 1, 0);
        west.set_block(InChunkPos::new(15, 4, 4), Some(blocks::STONE));
        let section = west.section(0).unwrap();
        assert_eq!(section.ambient_occlusion(Direction::Up, 15, 4, 4), [0; 4]);

        // A block diagonally above the top face's +x edge, in the next chunk.
        east.set_block(InChunkPos::new(0, 5, 4), Some(blocks::STONE));
        let levels = section.ambient_occlusion(Direction::Up, 15, 4, 4);
        assert!(levels.iter().any(|&level| level > 0));
    }

    #[test]
    fn occlusion_version_tracks_table_changes() {
        let world = world();
        let chunk = load(&world, 0, 0);
        let before = world.occlusion_version();
        let wall: Vec<_> = (0..16)
            .flat_map(|y| (0..16).map(move |z| BlockUpdate::new(InChunkPos::new(3, y, z), Some(blocks::STONE))))
            .collect();
        chunk.apply(wall);
        let section = chunk.section(0).unwrap();
        assert!(section.is_occluded(Direction::West, Direction::East));
        assert!(world.occlusion_version() > before);
    }

    #[test]
    fn loading_refreshes_diagonal_ambient_occlusion() {
        let world = world();
        let mut east = ChunkPrototype::with_blocks();
        east.set_block(InChunkPos::new(8, 0, 8), Some(blocks::STONE));
        east.set_block(InChunkPos::new(0, 16, 5), Some(blocks::STONE));
        let east = world.receive_chunk(ChunkPos::new(1, 0), east).unwrap();
        let upper = east.section(1).unwrap();
        assert_eq!(upper.ambient_occlusion(Direction::Down, 0, 0, 5), [0; 4]);

        // Reached from the upper section through Down then West.
        let mut west = ChunkPrototype::with_blocks();
        west.set_block(InChunkPos::new(15, 15, 5), Some(blocks::STONE));
        world.receive_chunk(ChunkPos::new(0, 0), west).unwrap();
        assert_eq!(upper.ambient_occlusion(Direction::Down, 0, 0, 5), [1, 1, 0, 0]);

        world.unload_chunk(ChunkPos::new(0, 0));
        assert_eq!(upper.ambient_occlusion(Direction::Down, 0, 0, 5), [0; 4]);
    }

    #[test]
    fn late_partial_payloads_are_kept() {
        let at = InChunkPos::new(1, 1, 1);
        for _ in 0..200 {
            let world = Arc::new(world());
            let pos = ChunkPos::new(0, 0);

            let complete = {
                let world = world.clone();
                std::thread::spawn(move || {
                    let mut data = ChunkPrototype::with_blocks();
                    data.set_block(at, Some(blocks::CHEST));
                    world.receive_chunk(pos, data);
                })
            };
            let partial = {
                let world = world.clone();
                std::thread::spawn(move || {
                    let mut entities = ChunkPrototype::new();
                    entities.set_block_entity(at, BlockEntity::new(blocks::CHEST));
                    world.receive_chunk(pos, entities);
                })
            };
            complete.join().unwrap();
            partial.join().unwrap();

            let merged = world
                .get_chunk(pos)
                .map_or(false, |chunk| chunk.block_entity(at).is_some());
            assert!(merged || world.pending_count() == 1);
        }
    }
}
