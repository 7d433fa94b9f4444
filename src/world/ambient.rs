//! Per-face ambient occlusion.
//!
//! Every block face gets four corner levels in `0..=3`, where `0` is a fully
//! lit corner. The levels of one face only depend on the opacity of the
//! blocks in the plane directly in front of it, which may belong to
//! neighboring sections.

use std::{ops::RangeInclusive, sync::Arc};

use super::{
    direction::{Axis, Direction},
    pos::{section_coords, section_index, SECTION_BLOCKS},
    section::SectionBlocks,
};

pub const MAX_LEVEL: u8 = 3;

const PADDED: usize = 18;

/// Corner order for quads facing along a positive axis; negative faces use
/// the mirrored order so both sides wind the same way.
const CORNERS: [(i32, i32); 4] = [(-1, -1), (1, -1), (1, 1), (-1, 1)];
const FLIPPED_CORNERS: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, 1), (1, -1)];

/// Darkness of one corner given its two edge neighbors and the diagonal.
pub fn level(edge1: bool, edge2: bool, corner: bool) -> u8 {
    if edge1 && edge2 {
        return MAX_LEVEL;
    }
    edge1 as u8 + edge2 as u8 + corner as u8
}

/// The two in-plane axes of a face, in the order the corners walk them.
fn tangents(direction: Direction) -> (Axis, Axis) {
    match direction.axis() {
        Axis::X => (Axis::Z, Axis::Y),
        Axis::Y => (Axis::X, Axis::Z),
        Axis::Z => (Axis::X, Axis::Y),
    }
}

/// Opacity of a section plus a one-block shell taken from its neighbors.
/// Coordinates range over `-1..=16` on each axis; shell cells of missing
/// neighbors stay transparent.
pub struct OpacityGrid {
    cells: Box<[bool]>,
}

impl Default for OpacityGrid {
    fn default() -> Self {
        OpacityGrid {
            cells: vec![false; PADDED * PADDED * PADDED].into_boxed_slice(),
        }
    }
}

impl OpacityGrid {
    #[inline]
    fn index(x: i32, y: i32, z: i32) -> usize {
        debug_assert!((-1..=16).contains(&x) && (-1..=16).contains(&y) && (-1..=16).contains(&z));
        (((y + 1) as usize * PADDED) + (z + 1) as usize) * PADDED + (x + 1) as usize
    }

    #[inline]
    pub fn is_opaque(&self, x: i32, y: i32, z: i32) -> bool {
        self.cells[Self::index(x, y, z)]
    }

    pub fn set(&mut self, x: i32, y: i32, z: i32, opaque: bool) {
        self.cells[Self::index(x, y, z)] = opaque;
    }

    pub fn fill_interior(&mut self, blocks: &SectionBlocks) {
        for index in 0..SECTION_BLOCKS {
            let (x, y, z) = section_coords(index);
            self.set(x as i32, y as i32, z as i32, blocks.is_opaque(index));
        }
    }

    /// Copies the cells of the neighbor at `offset` that touch this section.
    pub fn fill_shell(&mut self, offset: [i32; 3], blocks: &SectionBlocks) {
        let range = |step: i32| -> RangeInclusive<i32> {
            match step {
                -1 => -1..=-1,
                1 => 16..=16,
                _ => 0..=15,
            }
        };
        for y in range(offset[1]) {
            for z in range(offset[2]) {
                for x in range(offset[0]) {
                    let source = section_index(
                        x.rem_euclid(16) as usize,
                        y.rem_euclid(16) as usize,
                        z.rem_euclid(16) as usize,
                    );
                    self.set(x, y, z, blocks.is_opaque(source));
                }
            }
        }
    }
}

/// Corner levels of the `direction` face of the block at `(x, y, z)`.
pub fn corner_levels(grid: &OpacityGrid, direction: Direction, x: i32, y: i32, z: i32) -> [u8; 4] {
    let normal = direction.vector();
    let plane = [x + normal[0], y + normal[1], z + normal[2]];
    let (u, v) = tangents(direction);
    let corners = if direction.sign() < 0 {
        &FLIPPED_CORNERS
    } else {
        &CORNERS
    };

    let sample = |du: i32, dv: i32| {
        let mut at = plane;
        at[u.index()] += du;
        at[v.index()] += dv;
        grid.is_opaque(at[0], at[1], at[2])
    };

    let mut levels = [0; 4];
    for (slot, &(du, dv)) in corners.iter().enumerate() {
        levels[slot] = level(sample(du, 0), sample(0, dv), sample(du, dv));
    }
    levels
}

/// Corner levels of every block of the section for one face direction.
pub fn sample_face(grid: &OpacityGrid, direction: Direction) -> Vec<[u8; 4]> {
    (0..SECTION_BLOCKS)
        .map(|index| {
            let (x, y, z) = section_coords(index);
            corner_levels(grid, direction, x as i32, y as i32, z as i32)
        })
        .collect()
}

/// Lazily filled per-direction results of one section.
#[derive(Default)]
pub struct AmbientOcclusionCache {
    valid: u8,
    revision: u64,
    faces: [Option<Arc<[[u8; 4]]>>; 6],
}

impl AmbientOcclusionCache {
    pub fn get(&self, direction: Direction) -> Option<Arc<[[u8; 4]]>> {
        if self.valid & (1 << direction.index()) == 0 {
            return None;
        }
        self.faces[direction.index()].clone()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Stores a result unless the cache was invalidated after `revision` was
    /// read.
    pub fn store(&mut self, direction: Direction, levels: Arc<[[u8; 4]]>, revision: u64) -> bool {
        if revision != self.revision {
            return false;
        }
        self.faces[direction.index()] = Some(levels);
        self.valid |= 1 << direction.index();
        true
    }

    pub fn invalidate(&mut self) {
        self.valid = 0;
        self.revision = self.revision.wrapping_add(1);
        self.faces = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;

    use super::*;
    use crate::world::{block::blocks, section::ChunkSection};

    #[test]
    fn two_solid_edges_fully_darken() {
        assert_eq!(level(true, true, false), MAX_LEVEL);
        assert_eq!(level(true, true, true), MAX_LEVEL);
        assert_eq!(level(true, false, true), 2);
        assert_eq!(level(false, false, true), 1);
        assert_eq!(level(false, false, false), 0);
    }

    #[test]
    fn open_face_is_fully_lit() {
        let grid = OpacityGrid::default();
        for direction in Direction::ALL {
            assert_eq!(corner_levels(&grid, direction, 8, 8, 8), [0; 4]);
        }
    }

    #[test]
    fn edge_pair_without_diagonal_hits_max() {
        let mut grid = OpacityGrid::default();
        // Top face of (5, 5, 5): plane is y = 6; first corner walks -x and -z.
        grid.set(4, 6, 5, true);
        grid.set(5, 6, 4, true);
        let levels = corner_levels(&grid, Direction::Up, 5, 5, 5);
        assert_eq!(levels[0], MAX_LEVEL);
        assert_eq!(levels[2], 0);
        assert_eq!(levels[1], 1);
        assert_eq!(levels[3], 1);
    }

    #[test]
    fn flipped_faces_mirror_corner_order() {
        let mut grid = OpacityGrid::default();
        // Bottom face of (5, 5, 5): plane is y = 4. Only the +x edge is solid.
        grid.set(6, 4, 5, true);
        let down = corner_levels(&grid, Direction::Down, 5, 5, 5);
        assert_eq!(down, [0, 0, 1, 1]);

        let mut grid = OpacityGrid::default();
        grid.set(6, 6, 5, true);
        let up = corner_levels(&grid, Direction::Up, 5, 5, 5);
        assert_eq!(up, [0, 1, 1, 0]);
    }

    #[test]
    fn shell_reads_wrapped_neighbor_cells() {
        let mut neighbor = SectionBlocks::default();
        neighbor.set(section_index(0, 3, 4), Some(blocks::STONE));
        let mut grid = OpacityGrid::default();
        grid.fill_shell([1, 0, 0], &neighbor);
        assert!(grid.is_opaque(16, 3, 4));
        assert!(!grid.is_opaque(16, 3, 5));
    }

    #[test]
    fn shell_fills_only_the_touching_edge() {
        let mut neighbor = SectionBlocks::default();
        neighbor.set(section_index(15, 0, 6), Some(blocks::STONE));
        neighbor.set(section_index(14, 0, 6), Some(blocks::STONE));
        neighbor.set(section_index(15, 1, 6), Some(blocks::STONE));
        let mut grid = OpacityGrid::default();
        grid.fill_shell([-1, 1, 0], &neighbor);
        assert!(grid.is_opaque(-1, 16, 6));
        assert!(!grid.is_opaque(-1, 16, 7));
        assert!(!grid.is_opaque(0, 16, 6));
        assert!(!grid.is_opaque(-1, 15, 6));
    }

    #[test]
    fn unlinked_boundary_samples_are_transparent() {
        let section = ChunkSection::new(0, Arc::new(AtomicU64::new(0)));
        section.set(15, 15, 15, Some(blocks::STONE));
        for direction in Direction::ALL {
            assert_eq!(section.ambient_occlusion(direction, 15, 15, 15), [0; 4]);
        }
    }

    #[test]
    fn samples_across_linked_sections() {
        let version = Arc::new(AtomicU64::new(0));
        let lower = Arc::new(ChunkSection::new(0, version.clone()));
        let upper = Arc::new(ChunkSection::new(1, version));
        ChunkSection::link(&lower, Direction::Up, &upper);

        lower.set(8, 15, 8, Some(blocks::STONE));
        assert_eq!(lower.ambient_occlusion(Direction::Up, 8, 15, 8), [0; 4]);

        // Both edges of the first corner live in the upper section.
        upper.set(7, 0, 8, Some(blocks::STONE));
        upper.set(8, 0, 7, Some(blocks::STONE));
        let levels = lower.ambient_occlusion(Direction::Up, 8, 15, 8);
        assert_eq!(levels[0], MAX_LEVEL);
    }

    #[test]
    fn stale_results_are_not_stored() {
        let mut cache = AmbientOcclusionCache::default();
        let revision = cache.revision();
        cache.invalidate();
        let levels: Arc<[[u8; 4]]> = vec![[0; 4]; SECTION_BLOCKS].into();
        assert!(!cache.store(Direction::Up, levels.clone(), revision));
        assert!(cache.get(Direction::Up).is_none());
        assert!(cache.store(Direction::Up, levels, cache.revision()));
        assert!(cache.get(Direction::Up).is_some());
    }
}
