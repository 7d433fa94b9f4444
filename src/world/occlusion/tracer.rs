use super::{pool, OcclusionTable};
use crate::world::{
    direction::{Direction, DirectionPair},
    pos::{section_coords, section_index, SECTION_BLOCKS},
    section::SectionBlocks,
};

/// Below one full layer of opaque blocks no face pair can be sealed.
const MIN_OPAQUE: usize = 16 * 16;

const UNVISITED: i16 = -1;
const BLOCKED: i16 = -2;

const SET_WORDS: usize = SECTION_BLOCKS / 64;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub(super) enum Cell {
    Unvisited,
    Blocked,
    Region(u16),
}

/// Region label of every cell, packed into `i16` with negative sentinels.
pub(super) struct Regions(Box<[i16]>);

impl Regions {
    #[inline]
    pub(super) fn get(&self, index: usize) -> Cell {
        match self.0[index] {
            UNVISITED => Cell::Unvisited,
            BLOCKED => Cell::Blocked,
            region => Cell::Region(region as u16),
        }
    }

    #[inline]
    pub(super) fn set_region(&mut self, index: usize, region: u16) {
        debug_assert!((region as usize) < SECTION_BLOCKS);
        self.0[index] = region as i16;
    }

    #[inline]
    pub(super) fn set_blocked(&mut self, index: usize) {
        self.0[index] = BLOCKED;
    }

    fn reset(&mut self) {
        self.0.fill(UNVISITED);
    }
}

/// Bit set over region ids.
#[derive(Clone)]
struct RegionSet([u64; SET_WORDS]);

impl RegionSet {
    fn insert(&mut self, region: u16) {
        self.0[region as usize / 64] |= 1 << (region % 64);
    }

    fn is_empty(&self) -> bool {
        self.0.iter().all(|&word| word == 0)
    }

    fn intersects(&self, other: &RegionSet) -> bool {
        self.0.iter().zip(other.0.iter()).any(|(a, b)| a & b != 0)
    }

    fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().enumerate().flat_map(|(word_index, &word)| {
            (0..64)
                .filter(move |bit| word & (1 << bit) != 0)
                .map(move |bit| (word_index * 64 + bit) as u16)
        })
    }

    fn clear(&mut self) {
        self.0 = [0; SET_WORDS];
    }
}

/// Reusable buffers of one trace.
pub struct TraceScratch {
    pub(super) regions: Regions,
    parents: Box<[u16]>,
    stack: Vec<(u16, [i8; 3])>,
    faces: [RegionSet; 6],
}

impl Default for TraceScratch {
    fn default() -> Self {
        TraceScratch {
            regions: Regions(vec![UNVISITED; SECTION_BLOCKS].into_boxed_slice()),
            parents: (0..SECTION_BLOCKS as u16).collect(),
            stack: Vec::with_capacity(SECTION_BLOCKS),
            faces: std::array::from_fn(|_| RegionSet([0; SET_WORDS])),
        }
    }
}

impl TraceScratch {
    pub(super) fn reset(&mut self) {
        self.regions.reset();
        self.stack.clear();
        for face in &mut self.faces {
            face.clear();
        }
    }

    #[cfg(test)]
    pub(super) fn is_clean(&self) -> bool {
        (0..SECTION_BLOCKS).all(|i| self.regions.get(i) == Cell::Unvisited)
            && self.faces.iter().all(|face| face.is_empty())
    }

    fn flood(&mut self, blocks: &SectionBlocks) {
        for direction in Direction::ALL {
            for index in face_cells(direction) {
                let region = match self.regions.get(index) {
                    Cell::Blocked => continue,
                    Cell::Region(region) => region,
                    Cell::Unvisited => {
                        if blocks.is_opaque(index) {
                            self.regions.set_blocked(index);
                            continue;
                        }
                        let region = index as u16;
                        self.fill(blocks, index, region);
                        region
                    }
                };
                self.faces[direction.index()].insert(region);
            }
        }
    }

    /// Labels every open cell reachable from `start`. Each branch keeps the
    /// per-axis direction it committed to and never turns back on that axis.
    fn fill(&mut self, blocks: &SectionBlocks, start: usize, region: u16) {
        self.parents[region as usize] = region;
        self.regions.set_region(start, region);
        self.stack.clear();
        self.stack.push((start as u16, [0; 3]));

        while let Some((index, constraint)) = self.stack.pop() {
            let (x, y, z) = section_coords(index as usize);
            let coords = [x as i32, y as i32, z as i32];

            for direction in Direction::ALL {
                let axis = direction.axis().index();
                let sign = direction.sign() as i8;
                if constraint[axis] != 0 && constraint[axis] != sign {
                    continue;
                }
                let vector = direction.vector();
                let next = [
                    coords[0] + vector[0],
                    coords[1] + vector[1],
                    coords[2] + vector[2],
                ];
                if next.iter().any(|&v| !(0..16).contains(&v)) {
                    continue;
                }
                let next = section_index(next[0] as usize, next[1] as usize, next[2] as usize);

                match self.regions.get(next) {
                    Cell::Unvisited => {
                        if blocks.is_opaque(next) {
                            self.regions.set_blocked(next);
                            continue;
                        }
                        self.regions.set_region(next, region);
                        let mut constraint = constraint;
                        constraint[axis] = sign;
                        self.stack.push((next as u16, constraint));
                    }
                    Cell::Region(other) if other != region => self.union(region, other),
                    _ => {}
                }
            }
        }
    }

    fn find(&mut self, mut region: u16) -> u16 {
        while self.parents[region as usize] != region {
            let grandparent = self.parents[self.parents[region as usize] as usize];
            self.parents[region as usize] = grandparent;
            region = grandparent;
        }
        region
    }

    fn union(&mut self, a: u16, b: u16) {
        let a = self.find(a);
        let b = self.find(b);
        if a != b {
            self.parents[a.max(b) as usize] = a.min(b);
        }
    }

    fn table(&mut self) -> OcclusionTable {
        let mut roots: [RegionSet; 6] = std::array::from_fn(|_| RegionSet([0; SET_WORDS]));
        for (face, root_set) in roots.iter_mut().enumerate() {
            let regions: Vec<u16> = self.faces[face].iter().collect();
            for region in regions {
                root_set.insert(self.find(region));
            }
        }

        let mut table = OcclusionTable::EMPTY;
        for pair in DirectionPair::all() {
            let from = &roots[pair.from.index()];
            let to = &roots[pair.to.index()];
            table.set(pair, from.is_empty() || to.is_empty() || !from.intersects(to));
        }
        table
    }
}

/// The 256 boundary cells of a face.
fn face_cells(direction: Direction) -> impl Iterator<Item = usize> {
    (0..16).flat_map(move |a| {
        (0..16).map(move |b| match direction {
            Direction::Down => section_index(a, 0, b),
            Direction::Up => section_index(a, 15, b),
            Direction::North => section_index(a, b, 0),
            Direction::South => section_index(a, b, 15),
            Direction::West => section_index(0, a, b),
            Direction::East => section_index(15, a, b),
        })
    })
}

/// Tables that follow from the counters alone.
pub fn shortcut(blocks: &SectionBlocks) -> Option<OcclusionTable> {
    let opaque = blocks.opaque_count();
    if opaque < MIN_OPAQUE {
        return Some(OcclusionTable::EMPTY);
    }
    if opaque == SECTION_BLOCKS {
        return Some(OcclusionTable::FULL);
    }
    if blocks.bounds().map_or(false, |bounds| bounds.is_strictly_inside()) {
        return Some(OcclusionTable::EMPTY);
    }
    None
}

pub fn trace(blocks: &SectionBlocks) -> OcclusionTable {
    match shortcut(blocks) {
        Some(table) => table,
        None => full_trace(blocks),
    }
}

/// The flood-fill pass without any shortcut.
pub fn full_trace(blocks: &SectionBlocks) -> OcclusionTable {
    let mut scratch = pool::checkout();
    scratch.flood(blocks);
    scratch.table()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::block::blocks;

    fn visible(table: &OcclusionTable, from: Direction, to: Direction) -> bool {
        !table.is_occluded(DirectionPair::new(from, to).unwrap())
    }

    fn filled_except(open: &[(usize, usize, usize)]) -> SectionBlocks {
        let mut data = SectionBlocks::from_states(vec![Some(blocks::STONE); SECTION_BLOCKS]);
        for &(x, y, z) in open {
            data.set(section_index(x, y, z), None);
        }
        data
    }

    #[test]
    fn sparse_sections_are_permeable() {
        let mut data = SectionBlocks::default();
        for x in 0..15 {
            for z in 0..16 {
                data.set(section_index(x, 0, z), Some(blocks::STONE));
            }
        }
        assert_eq!(data.opaque_count(), 240);
        assert_eq!(trace(&data), OcclusionTable::EMPTY);
    }

    #[test]
    fn filled_sections_are_sealed() {
        let data = SectionBlocks::from_states(vec![Some(blocks::STONE); SECTION_BLOCKS]);
        assert_eq!(trace(&data), OcclusionTable::FULL);
    }

    #[test]
    fn interior_blocks_never_seal() {
        let mut data = SectionBlocks::default();
        for x in 1..15 {
            for y in 1..15 {
                for z in 1..15 {
                    data.set(section_index(x, y, z), Some(blocks::STONE));
                }
            }
        }
        assert!(data.opaque_count() > MIN_OPAQUE);
        assert_eq!(shortcut(&data), Some(OcclusionTable::EMPTY));
        assert_eq!(full_trace(&data), OcclusionTable::EMPTY);
    }

    #[test]
    fn empty_section_sees_through_every_face() {
        let table = full_trace(&SectionBlocks::default());
        assert_eq!(table, OcclusionTable::EMPTY);
        assert!(visible(&table, Direction::Up, Direction::Down));
        assert!(visible(&table, Direction::West, Direction::East));
    }

    #[test]
    fn wall_blocks_only_the_separated_pair() {
        let mut data = SectionBlocks::default();
        for y in 0..16 {
            for z in 0..16 {
                data.set(section_index(8, y, z), Some(blocks::STONE));
            }
        }
        let table = trace(&data);
        assert!(!visible(&table, Direction::West, Direction::East));
        assert!(!visible(&table, Direction::East, Direction::West));
        assert!(visible(&table, Direction::West, Direction::Up));
        assert!(visible(&table, Direction::North, Direction::South));
        assert!(visible(&table, Direction::Up, Direction::Down));
        assert!(visible(&table, Direction::East, Direction::North));
    }

    #[test]
    fn solid_face_blocks_every_pair_through_it() {
        let mut data = SectionBlocks::default();
        for x in 0..16 {
            for z in 0..16 {
                data.set(section_index(x, 0, z), Some(blocks::STONE));
            }
        }
        let table = trace(&data);
        for direction in Direction::ALL {
            if direction != Direction::Down {
                assert!(!visible(&table, Direction::Down, direction));
            }
        }
        assert!(visible(&table, Direction::Up, Direction::North));
        assert!(visible(&table, Direction::West, Direction::East));
    }

    #[test]
    fn tunnel_connects_its_two_faces() {
        let tunnel: Vec<_> = (0..16).map(|z| (5, 5, z)).collect();
        let table = trace(&filled_except(&tunnel));
        assert!(visible(&table, Direction::North, Direction::South));
        assert!(!visible(&table, Direction::North, Direction::East));
        assert!(!visible(&table, Direction::Up, Direction::Down));
    }

    #[test]
    fn folded_tunnel_merges_regions() {
        let mut path = Vec::new();
        path.extend((0..=10).map(|y| (2, y, 2)));
        path.extend((3..=10).map(|x| (x, 10, 2)));
        path.extend((3..=9).map(|y| (10, y, 2)));
        path.extend((3..=15).map(|z| (10, 3, z)));
        let table = trace(&filled_except(&path));
        assert!(visible(&table, Direction::Down, Direction::South));
        assert!(visible(&table, Direction::South, Direction::Down));
        assert!(!visible(&table, Direction::Down, Direction::Up));
        assert!(!visible(&table, Direction::West, Direction::East));
    }
}
