use log::debug;
use noise::{NoiseFn, Seedable, SuperSimplex};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::{DimensionConfig, WorldGenConfig};

use super::{
    block::{blocks, BlockState},
    prototype::ChunkPrototype,
    ChunkPos, InChunkPos,
};

const BEDROCK_LAYERS: i32 = 4;
const DIRT_DEPTH: i32 = 3;

/// Produces terrain payloads for chunk positions. Output only depends on
/// the seed and the position.
pub struct WorldGenerator {
    config: WorldGenConfig,
    dimension: DimensionConfig,
    noise: SuperSimplex,
}

impl WorldGenerator {
    pub fn new(config: WorldGenConfig, dimension: DimensionConfig) -> WorldGenerator {
        debug!("Using seed {} for world generation", config.seed);

        WorldGenerator {
            noise: SuperSimplex::new().set_seed(config.seed),
            config,
            dimension,
        }
    }

    pub fn generate(&self, pos: ChunkPos) -> ChunkPrototype {
        let mut prototype = ChunkPrototype::with_blocks();
        let mut rng = StdRng::seed_from_u64(self.chunk_seed(pos));
        let base_x = pos.x << 4;
        let base_z = pos.z << 4;

        for x in 0..16u8 {
            for z in 0..16u8 {
                let world_x = base_x + x as i32;
                let world_z = base_z + z as i32;
                self.generate_column(&mut prototype, &mut rng, x, z, world_x, world_z);
            }
        }
        prototype
    }

    /// Terrain surface height of the column at world `(x, z)`.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        let elevation =
            self.sample_noise_fractal(x, z, self.config.elevation_scale, self.config.elevation_lac);
        let height = self.config.base_height + (elevation * self.config.amplitude) as i32;
        height.clamp(self.min_y() + BEDROCK_LAYERS, self.max_y())
    }

    fn min_y(&self) -> i32 {
        self.dimension.min_y
    }

    fn max_y(&self) -> i32 {
        self.dimension.min_y + self.dimension.height as i32 - 1
    }

    fn chunk_seed(&self, pos: ChunkPos) -> u64 {
        let column = ((pos.x as u32 as u64) << 32) | pos.z as u32 as u64;
        column.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ self.config.seed as u64
    }

    fn generate_column(
        &self,
        prototype: &mut ChunkPrototype,
        rng: &mut StdRng,
        x: u8,
        z: u8,
        world_x: i32,
        world_z: i32,
    ) {
        let terrain_height = self.surface_height(world_x, world_z);
        let sea_level = self.config.sea_level.min(self.max_y());
        let top = terrain_height.max(sea_level);

        for y in self.min_y()..=top {
            let state = self.determine_block(rng, world_x, y, world_z, terrain_height, sea_level);
            if state.is_some() {
                prototype.set_block(InChunkPos::new(x, y, z), state);
            }
        }

        // Surface decoration
        if terrain_height >= sea_level && terrain_height < self.max_y() && rng.gen_bool(0.08) {
            prototype.set_block(InChunkPos::new(x, terrain_height + 1, z), Some(blocks::TALL_GRASS));
        }
    }

    fn determine_block(
        &self,
        rng: &mut StdRng,
        x: i32,
        y: i32,
        z: i32,
        th: i32,
        sea_level: i32,
    ) -> Option<BlockState> {
        let min_y = self.min_y();
        let state = if y > th {
            if y <= sea_level {
                blocks::WATER
            } else {
                return None;
            }
        } else if y == th {
            if th >= sea_level {
                blocks::GRASS
            } else {
                blocks::SAND
            }
        } else if y > th - DIRT_DEPTH {
            blocks::DIRT
        } else if y == min_y {
            blocks::BEDROCK
        } else if y < min_y + BEDROCK_LAYERS {
            if rng.gen_bool(0.5) {
                blocks::BEDROCK
            } else {
                blocks::STONE
            }
        } else {
            self.determine_block_underground(x, y, z)
        };
        Some(state)
    }

    fn determine_block_underground(&self, x: i32, y: i32, z: i32) -> BlockState {
        for ore in &self.config.ores {
            let diff = (ore.center - (y as f64)).abs();
            if diff > ore.spread {
                continue;
            }

            let offset = ore.id as f64 * 1000.0;
            let noise = self.noise.get([
                x as f64 * ore.scale,
                y as f64 * ore.scale + offset,
                z as f64 * ore.scale,
            ]);

            let threshold = ore.threshold + (diff / ore.spread) * 0.055;
            if noise > threshold {
                return blocks::ore(ore.id);
            }
        }

        blocks::STONE
    }

    fn sample_noise_fractal(&self, x: i32, z: i32, mut scale: f64, lac: f64) -> f64 {
        let mut result = 0.0;
        let mut denom = 0.0;
        scale *= self.config.master_scale;

        let mut amplitude = 1.0;
        for _ in 0..self.config.octaves {
            result += amplitude * self.noise.get([x as f64 * scale, z as f64 * scale]);
            denom += amplitude;

            scale *= lac;
            amplitude *= self.config.falloff;
        }

        if denom == 0.0 {
            0.0
        } else {
            result / denom
        }
    }
}
