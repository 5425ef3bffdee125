/// Error types for grid construction and configuration
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("grid size must be at least 1")]
    ZeroSize,

    #[error("grid is not square: row {row} has {len} cells, expected {expected}")]
    NotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },

    #[error("expected a {expected}x{expected} pattern, got {got} rows")]
    SizeMismatch { got: usize, expected: usize },

    #[error("cell ({x}, {y}) is outside a {size}x{size} grid")]
    OutOfBounds { x: usize, y: usize, size: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown preset `{0}`")]
    UnknownPreset(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
