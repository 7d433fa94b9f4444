use std::sync::{atomic::AtomicU64, Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::{
    ambient::{self, AmbientOcclusionCache, OpacityGrid},
    block::{is_full_opaque, BlockState},
    direction::{Axis, Direction},
    occlusion::{OcclusionTable, SectionOcclusion},
    pos::{section_coords, section_index, SECTION_BLOCKS},
    DirectionPair,
};

/// Inclusive bounding box of the non-air slots of a section.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct SectionBounds {
    pub min: [u8; 3],
    pub max: [u8; 3],
}

impl SectionBounds {
    fn single(x: usize, y: usize, z: usize) -> SectionBounds {
        let at = [x as u8, y as u8, z as u8];
        SectionBounds { min: at, max: at }
    }

    fn include(&mut self, x: usize, y: usize, z: usize) {
        for (axis, value) in [x, y, z].into_iter().enumerate() {
            self.min[axis] = self.min[axis].min(value as u8);
            self.max[axis] = self.max[axis].max(value as u8);
        }
    }

    fn touches(&self, x: usize, y: usize, z: usize) -> bool {
        [x, y, z].into_iter().enumerate().any(|(axis, value)| {
            value as u8 == self.min[axis] || value as u8 == self.max[axis]
        })
    }

    /// True when no slot lies on any of the six boundary shells.
    pub fn is_strictly_inside(&self) -> bool {
        self.min.iter().all(|&v| v >= 1) && self.max.iter().all(|&v| v <= 14)
    }
}

/// The dense block grid of one section together with its counters.
#[derive(Clone, Debug)]
pub struct SectionBlocks {
    states: Box<[Option<BlockState>]>,
    opaque: u16,
    non_air: u16,
    bounds: Option<SectionBounds>,
}

impl Default for SectionBlocks {
    fn default() -> Self {
        SectionBlocks {
            states: vec![None; SECTION_BLOCKS].into_boxed_slice(),
            opaque: 0,
            non_air: 0,
            bounds: None,
        }
    }
}

impl SectionBlocks {
    pub fn from_states(states: Vec<Option<BlockState>>) -> SectionBlocks {
        debug_assert_eq!(states.len(), SECTION_BLOCKS);
        let mut blocks = SectionBlocks {
            states: states.into_boxed_slice(),
            ..Default::default()
        };
        blocks.recount();
        blocks
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<BlockState> {
        self.states[index]
    }

    #[inline]
    pub fn is_opaque(&self, index: usize) -> bool {
        is_full_opaque(self.states[index])
    }

    /// Writes `state` and returns the previous one. Equal states leave the
    /// section untouched.
    pub fn set(&mut self, index: usize, state: Option<BlockState>) -> Option<BlockState> {
        let previous = self.states[index];
        if previous == state {
            return previous;
        }
        self.states[index] = state;

        match (is_full_opaque(previous), is_full_opaque(state)) {
            (false, true) => self.opaque += 1,
            (true, false) => self.opaque -= 1,
            _ => {}
        }

        let (x, y, z) = section_coords(index);
        match (previous.is_some(), state.is_some()) {
            (false, true) => {
                self.non_air += 1;
                match &mut self.bounds {
                    Some(bounds) => bounds.include(x, y, z),
                    None => self.bounds = Some(SectionBounds::single(x, y, z)),
                }
            }
            (true, false) => {
                self.non_air -= 1;
                if self.non_air == 0 {
                    self.bounds = None;
                } else if self.bounds.map_or(false, |b| b.touches(x, y, z)) {
                    self.recalculate_bounds();
                }
            }
            _ => {}
        }
        previous
    }

    pub fn opaque_count(&self) -> usize {
        self.opaque as usize
    }

    pub fn non_air_count(&self) -> usize {
        self.non_air as usize
    }

    pub fn bounds(&self) -> Option<SectionBounds> {
        self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.non_air == 0
    }

    fn recount(&mut self) {
        self.opaque = self.states.iter().filter(|s| is_full_opaque(**s)).count() as u16;
        self.non_air = self.states.iter().filter(|s| s.is_some()).count() as u16;
        self.recalculate_bounds();
    }

    fn recalculate_bounds(&mut self) {
        let mut bounds: Option<SectionBounds> = None;
        for (index, state) in self.states.iter().enumerate() {
            if state.is_none() {
                continue;
            }
            let (x, y, z) = section_coords(index);
            match &mut bounds {
                Some(bounds) => bounds.include(x, y, z),
                None => bounds = Some(SectionBounds::single(x, y, z)),
            }
        }
        self.bounds = bounds;
    }
}

/// A 16x16x16 sub-volume of a chunk column.
pub struct ChunkSection {
    height: i32,
    blocks: RwLock<SectionBlocks>,
    neighbors: RwLock<[Weak<ChunkSection>; 6]>,
    occlusion: Mutex<SectionOcclusion>,
    ambient: Mutex<AmbientOcclusionCache>,
}

impl ChunkSection {
    pub fn new(height: i32, occlusion_version: Arc<AtomicU64>) -> ChunkSection {
        Self::with_blocks(height, SectionBlocks::default(), occlusion_version)
    }

    pub fn with_blocks(
        height: i32,
        blocks: SectionBlocks,
        occlusion_version: Arc<AtomicU64>,
    ) -> ChunkSection {
        let mut occlusion = SectionOcclusion::new(occlusion_version);
        occlusion.invalidate(&blocks, false);
        ChunkSection {
            height,
            blocks: RwLock::new(blocks),
            neighbors: RwLock::new(Default::default()),
            occlusion: Mutex::new(occlusion),
            ambient: Mutex::new(AmbientOcclusionCache::default()),
        }
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<BlockState> {
        self.blocks.read().get(section_index(x, y, z))
    }

    /// Writes one block and returns the previous state. Caches are only
    /// invalidated when full opacity changes.
    pub fn set(&self, x: usize, y: usize, z: usize, state: Option<BlockState>) -> Option<BlockState> {
        let mut blocks = self.blocks.write();
        let previous = blocks.set(section_index(x, y, z), state);
        if is_full_opaque(previous) == is_full_opaque(state) {
            return previous;
        }
        self.occlusion.lock().on_set(&blocks, previous, state);
        self.ambient.lock().invalidate();
        drop(blocks);

        self.invalidate_neighbor_ambient(x, y, z);
        previous
    }

    pub fn opaque_count(&self) -> usize {
        self.blocks.read().opaque_count()
    }

    pub fn non_air_count(&self) -> usize {
        self.blocks.read().non_air_count()
    }

    pub fn bounds(&self) -> Option<SectionBounds> {
        self.blocks.read().bounds()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    pub fn neighbor(&self, direction: Direction) -> Option<Arc<ChunkSection>> {
        self.neighbors.read()[direction.index()].upgrade()
    }

    /// Resolves the section at a relative offset (each component in
    /// `-1..=1`) by walking neighbor links. Any axis order that reaches the
    /// target is accepted.
    pub fn neighbor_at(&self, offset: [i32; 3]) -> Option<Arc<ChunkSection>> {
        const ORDERS: [[Axis; 3]; 6] = [
            [Axis::X, Axis::Y, Axis::Z],
            [Axis::X, Axis::Z, Axis::Y],
            [Axis::Y, Axis::X, Axis::Z],
            [Axis::Y, Axis::Z, Axis::X],
            [Axis::Z, Axis::X, Axis::Y],
            [Axis::Z, Axis::Y, Axis::X],
        ];
        let steps = offset.iter().filter(|&&v| v != 0).count();
        if steps == 0 {
            return None;
        }
        // One step has a single path; skip the permutations.
        let orders = if steps == 1 { &ORDERS[..1] } else { &ORDERS[..] };
        orders
            .iter()
            .find_map(|order| self.walk(offset, order))
    }

    fn walk(&self, offset: [i32; 3], order: &[Axis; 3]) -> Option<Arc<ChunkSection>> {
        let mut current: Option<Arc<ChunkSection>> = None;
        for &axis in order {
            let step = offset[axis.index()];
            if step == 0 {
                continue;
            }
            let direction = Direction::from_axis(axis, step);
            let next = match &current {
                Some(section) => section.neighbor(direction),
                None => self.neighbor(direction),
            };
            current = Some(next?);
        }
        current
    }

    /// Links two sections through `direction` (as seen from `section`).
    pub fn link(section: &Arc<ChunkSection>, direction: Direction, other: &Arc<ChunkSection>) {
        section.neighbors.write()[direction.index()] = Arc::downgrade(other);
        other.neighbors.write()[direction.inverse().index()] = Arc::downgrade(section);
        section.ambient.lock().invalidate();
        other.ambient.lock().invalidate();
    }

    pub fn unlink(&self, direction: Direction) {
        self.neighbors.write()[direction.index()] = Weak::new();
        self.ambient.lock().invalidate();
    }

    /// Drops cached AO levels, e.g. after a diagonal neighbor appeared.
    pub fn invalidate_ambient(&self) {
        self.ambient.lock().invalidate();
    }

    pub fn is_occluded(&self, from: Direction, to: Direction) -> bool {
        let pair = match DirectionPair::new(from, to) {
            Some(pair) => pair,
            None => return false,
        };
        let blocks = self.blocks.read();
        let result = self.occlusion.lock().is_occluded(&blocks, pair);
        result
    }

    pub fn occlusion_table(&self) -> OcclusionTable {
        let blocks = self.blocks.read();
        let table = self.occlusion.lock().table(&blocks);
        table
    }

    /// Drops every cached result of this section.
    pub fn invalidate_caches(&self, notify: bool) {
        let blocks = self.blocks.read();
        self.occlusion.lock().invalidate(&blocks, notify);
        self.ambient.lock().invalidate();
    }

    /// Corner darkness levels of the face `direction` of the block at
    /// `(x, y, z)`.
    pub fn ambient_occlusion(&self, direction: Direction, x: usize, y: usize, z: usize) -> [u8; 4] {
        self.face_ambient_occlusion(direction)[section_index(x, y, z)]
    }

    /// Corner levels of `direction` faces for all 4096 blocks, indexed like
    /// the block grid.
    pub fn face_ambient_occlusion(&self, direction: Direction) -> Arc<[[u8; 4]]> {
        let revision = {
            let cache = self.ambient.lock();
            if let Some(levels) = cache.get(direction) {
                return levels;
            }
            cache.revision()
        };

        let mut grid = OpacityGrid::default();
        self.gather_shell(&mut grid);

        let blocks = self.blocks.read();
        grid.fill_interior(&blocks);
        let levels: Arc<[[u8; 4]]> = ambient::sample_face(&grid, direction).into();
        self.ambient
            .lock()
            .store(direction, levels.clone(), revision);
        levels
    }

    fn gather_shell(&self, grid: &mut OpacityGrid) {
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let offset = [dx, dy, dz];
                    if let Some(neighbor) = self.neighbor_at(offset) {
                        let blocks = neighbor.blocks.read();
                        grid.fill_shell(offset, &blocks);
                    }
                }
            }
        }
    }

    fn invalidate_neighbor_ambient(&self, x: usize, y: usize, z: usize) {
        let candidates = |v: usize| match v {
            0 => [0, -1],
            15 => [0, 1],
            _ => [0, 0],
        };
        for dx in candidates(x) {
            for dy in candidates(y) {
                for dz in candidates(z) {
                    if let Some(neighbor) = self.neighbor_at([dx, dy, dz]) {
                        neighbor.ambient.lock().invalidate();
                    }
                }
            }
        }
    }
}
