use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Runtime settings. Read from a RON file when one sits next to the
/// binary, defaults otherwise; every field may be omitted in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial window size in logical pixels.
    pub window_width: u32,
    pub window_height: u32,
    /// Fixed internal framebuffer height; the width follows the window's
    /// aspect ratio.
    pub internal_height: usize,
    /// World units per second.
    pub move_speed: f32,
    /// Radians per second.
    pub turn_speed: f32,
    /// Eye-height units per second.
    pub eye_speed: f32,
    /// Sample the floor texture per pixel; flat gradient otherwise.
    pub textured_floor: bool,
    /// Directory holding `wall.png` and `floor.png`. When unset, the
    /// ASSETS_PATH environment variable is tried, then procedural
    /// textures.
    pub assets_dir: Option<PathBuf>,
    /// Level file to load instead of the built-in map.
    pub level_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_width: 1000,
            window_height: 1000,
            internal_height: 480,
            move_speed: 2.0,
            turn_speed: 3.0,
            eye_speed: 1.0,
            textured_floor: true,
            assets_dir: None,
            level_path: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| EngineError::FileRead {
            path: path.into(),
            source,
        })?;
        ron::from_str(&text).map_err(|source| EngineError::FileParse {
            path: path.into(),
            source,
        })
    }

    /// Assets directory after applying the environment fallback.
    pub fn resolve_assets_dir(&self) -> Option<PathBuf> {
        self.assets_dir
            .clone()
            .or_else(|| std::env::var_os("ASSETS_PATH").map(PathBuf::from))
    }
}
