use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::math::Vec2;

/// Static occupancy grid. `0` is empty; any nonzero cell is solid and
/// carries a material id (occupancy is all the renderer uses). Built once
/// at startup, read-only afterwards.
#[derive(Debug, Clone)]
pub struct WorldMap {
    width: usize,
    height: usize,
    cells: Vec<u8>, // row-major
}

impl WorldMap {
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if height == 0 || width == 0 || rows.iter().any(|r| r.len() != width) {
            return Err(EngineError::MalformedMap {
                rows: height,
                width,
            });
        }
        Ok(Self {
            width,
            height,
            cells: rows.concat(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && (x as usize) < self.width && y >= 0 && (y as usize) < self.height
    }

    /// Occupancy query. Asking about a cell outside the grid is a hard
    /// error, never a clamp: a properly authored map is enclosed by solid
    /// cells, so nothing should ever reach the outside.
    #[inline]
    pub fn is_solid(&self, x: i32, y: i32) -> Result<bool> {
        if !self.in_bounds(x, y) {
            return Err(EngineError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self.cells[y as usize * self.width + x as usize] != 0)
    }
}

/// A world map plus the camera pose a session starts with.
#[derive(Debug, Clone)]
pub struct Level {
    pub map: WorldMap,
    pub spawn: Vec2,
    pub facing: Vec2,
}

/// On-disk level format (RON). `spawn` and `facing` are optional and
/// default to the built-in pose.
#[derive(Serialize, Deserialize)]
struct LevelFile {
    cells: Vec<Vec<u8>>,
    #[serde(default = "default_spawn")]
    spawn: Vec2,
    #[serde(default = "default_facing")]
    facing: Vec2,
}

fn default_spawn() -> Vec2 {
    Vec2::new(6.0, 12.0)
}

fn default_facing() -> Vec2 {
    Vec2::new(-1.0, 0.0)
}

impl Level {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| EngineError::FileRead {
            path: path.into(),
            source,
        })?;
        let file: LevelFile = ron::from_str(&text).map_err(|source| EngineError::FileParse {
            path: path.into(),
            source,
        })?;
        let level = Self {
            map: WorldMap::from_rows(&file.cells)?,
            spawn: file.spawn,
            facing: file.facing.normalize(),
        };
        level.check_spawn()?;
        Ok(level)
    }

    pub fn builtin() -> Self {
        Self {
            map: WorldMap {
                width: DEFAULT_SIZE,
                height: DEFAULT_SIZE,
                cells: DEFAULT_CELLS.iter().flatten().copied().collect(),
            },
            spawn: default_spawn(),
            facing: default_facing(),
        }
    }

    fn check_spawn(&self) -> Result<()> {
        let (x, y) = (self.spawn.x as i32, self.spawn.y as i32);
        if self.map.is_solid(x, y)? {
            return Err(EngineError::SpawnBlocked { x, y });
        }
        Ok(())
    }
}

const DEFAULT_SIZE: usize = 24;

#[rustfmt::skip]
const DEFAULT_CELLS: [[u8; DEFAULT_SIZE]; DEFAULT_SIZE] = [
    [1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1],
    [1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,2,2,2,2,2,0,1],
    [1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,2,0,0,0,2,0,1],
    [1,0,0,0,3,0,0,0,0,0,0,0,0,0,0,0,0,2,0,0,0,2,0,1],
    [1,0,0,0,0,0,0,0,2,2,2,2,2,0,0,0,0,2,2,0,2,2,0,1],
    [1,0,0,0,0,0,0,0,2,0,0,0,2,0,0,0,0,0,0,0,0,0,0,1],
    [1,0,0,0,3,0,0,0,2,0,0,0,2,0,0,0,0,0,0,0,0,0,0,1],
    [1,0,0,0,0,0,0,0,2,2,0,2,2,0,0,0,0,0,0,0,0,0,0,1],
    [1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1],
    [1,0,0,0,3,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1],
    [1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,4,0,4,0,1],
    [1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1],
    [1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,4,0,4,0,1],
    [1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1],
    [1,0,0,0,3,0,0,0,0,0,0,0,0,0,0,0,0,0,0,4,0,4,0,1],
    [1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1],
    [1,0,0,0,0,0,5,5,5,0,5,5,5,0,0,0,0,0,0,0,0,0,0,1],
    [1,0,0,0,0,0,5,0,0,0,0,0,5,0,0,0,0,0,0,0,0,0,0,1],
    [1,0,0,0,0,0,5,0,0,0,0,0,5,0,0,0,0,0,0,0,0,0,0,1],
    [1,0,0,0,0,0,5,5,5,5,5,5,5,0,0,0,0,0,0,0,0,0,0,1],
    [1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1],
    [1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1],
    [1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1],
    [1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1],
];
