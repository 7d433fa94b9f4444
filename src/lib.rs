pub mod config;
pub mod error;
pub mod world;

pub use error::{ConfigError, WorldError};
