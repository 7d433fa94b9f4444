use std::{fs, path::Path};

use serde_derive::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct WorldConfig {
    pub dimension: DimensionConfig,
    pub generator: WorldGenConfig,
    pub scheduler: SchedulerConfig,
}

pub const MIN_Y: i32 = -2032;
pub const MAX_Y: i32 = 2031;
pub const MAX_HEIGHT: u32 = 4064;

/// Vertical extent of the world, in blocks.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct DimensionConfig {
    pub min_y: i32,
    pub height: u32,
}

impl Default for DimensionConfig {
    fn default() -> Self {
        DimensionConfig {
            min_y: -64,
            height: 384,
        }
    }
}

impl DimensionConfig {
    pub fn min_section(&self) -> i32 {
        self.min_y >> 4
    }

    pub fn max_section(&self) -> i32 {
        (self.min_y + self.height as i32 - 1) >> 4
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.height == 0 {
            return Err(ConfigError::InvalidDimension(
                "height must be positive".to_string(),
            ));
        }
        let top = self.min_y as i64 + self.height as i64;
        if self.min_y < MIN_Y || self.height > MAX_HEIGHT || top > MAX_Y as i64 + 1 {
            return Err(ConfigError::InvalidDimension(format!(
                "min_y ({}) and height ({}) must stay within {}..={}",
                self.min_y, self.height, MIN_Y, MAX_Y
            )));
        }
        if self.min_y & 0x0f != 0 || self.height & 0x0f != 0 {
            return Err(ConfigError::InvalidDimension(format!(
                "min_y ({}) and height ({}) must be multiples of 16",
                self.min_y, self.height
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OreConfig {
    pub id: u8,
    pub scale: f64,
    pub center: f64,
    pub spread: f64,
    pub threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WorldGenConfig {
    pub seed: u32,
    pub master_scale: f64,
    pub octaves: i32,
    pub falloff: f64,
    pub elevation_scale: f64,
    pub elevation_lac: f64,
    pub base_height: i32,
    pub amplitude: f64,
    pub sea_level: i32,
    pub ores: Vec<OreConfig>,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        WorldGenConfig {
            seed: 0,
            master_scale: 1.0,
            octaves: 4,
            falloff: 0.5,
            elevation_scale: 0.005,
            elevation_lac: 2.0,
            base_height: 64,
            amplitude: 24.0,
            sea_level: 62,
            ores: vec![
                OreConfig {
                    id: 16,
                    scale: 0.1,
                    center: 40.0,
                    spread: 40.0,
                    threshold: 0.75,
                },
                OreConfig {
                    id: 15,
                    scale: 0.12,
                    center: 16.0,
                    spread: 32.0,
                    threshold: 0.8,
                },
                OreConfig {
                    id: 56,
                    scale: 0.15,
                    center: -48.0,
                    spread: 16.0,
                    threshold: 0.85,
                },
            ],
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SchedulerConfig {
    pub threads: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig { threads: 4 }
    }
}

impl WorldConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<WorldConfig, ConfigError> {
        let data = fs::read_to_string(path)?;
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<WorldConfig, ConfigError> {
        let config = toml::from_str::<WorldConfig>(data)?;
        config.dimension.validate()?;
        Ok(config)
    }
}
