use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Everything here is fatal where it is detected: a non-unit ray or an
/// escaped traversal is a programming or map-authoring defect, and a
/// missing asset means rendering cannot start at all.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("ray direction must be unit length, got |d| = {length}")]
    InvalidRayDirection { length: f32 },

    #[error("cell ({x}, {y}) is outside the {width}x{height} map; the border must be solid")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: usize,
        height: usize,
    },

    #[error("column {column}: no wall within {max_distance} units")]
    MissedRay { column: usize, max_distance: f32 },

    #[error("failed to load texture {path}")]
    MissingAsset {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("texture {path} is {width}x{height}; dimensions must be powers of two")]
    TextureSize {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    #[error("map must be a non-empty rectangle, got {rows} rows of width {width}")]
    MalformedMap { rows: usize, width: usize },

    #[error("spawn cell ({x}, {y}) is solid")]
    SpawnBlocked { x: i32, y: i32 },

    #[error("failed to read {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    FileParse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}
