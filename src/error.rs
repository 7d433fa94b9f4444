use thiserror::Error;

use crate::world::{ChunkPos, InChunkPos};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid dimension: {0}")]
    InvalidDimension(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("chunk {0:?} is not loaded")]
    ChunkNotLoaded(ChunkPos),

    #[error("no block entity at {0:?}")]
    NoBlockEntity(InChunkPos),
}
