use super::direction::HorizontalDirection;

pub const SECTION_WIDTH: i32 = 16;
pub const SECTION_BLOCKS: usize = 16 * 16 * 16;

/// Flat index of an in-section position.
#[inline]
pub fn section_index(x: usize, y: usize, z: usize) -> usize {
    debug_assert!(x < 16 && y < 16 && z < 16);
    (y << 8) | (z << 4) | x
}

/// Inverse of [`section_index`].
#[inline]
pub fn section_coords(index: usize) -> (usize, usize, usize) {
    (index & 0x0f, index >> 8, (index >> 4) & 0x0f)
}

#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> BlockPos {
        BlockPos { x, y, z }
    }

    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos::from_block_pos(self.x, self.z)
    }

    pub fn in_chunk(&self) -> InChunkPos {
        InChunkPos::new((self.x & 0x0f) as u8, self.y, (self.z & 0x0f) as u8)
    }
}

#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> ChunkPos {
        ChunkPos { x, z }
    }

    pub fn from_block_pos(x: i32, z: i32) -> ChunkPos {
        ChunkPos::new(x >> 4, z >> 4)
    }

    pub fn offset(&self, direction: HorizontalDirection) -> ChunkPos {
        let (dx, dz) = direction.offset();
        ChunkPos::new(self.x + dx, self.z + dz)
    }

    pub fn block_pos(&self, pos: InChunkPos) -> BlockPos {
        BlockPos::new(
            (self.x << 4) + pos.x as i32,
            pos.y,
            (self.z << 4) + pos.z as i32,
        )
    }
}

/// Position inside a chunk column: x/z in `0..16`, y absolute.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct InChunkPos {
    pub x: u8,
    pub y: i32,
    pub z: u8,
}

impl InChunkPos {
    pub fn new(x: u8, y: i32, z: u8) -> InChunkPos {
        debug_assert!(x < 16 && z < 16);
        InChunkPos { x, y, z }
    }

    pub fn section_height(&self) -> i32 {
        self.y >> 4
    }

    pub fn section_index(&self) -> usize {
        section_index(self.x as usize, (self.y & 0x0f) as usize, self.z as usize)
    }
}
