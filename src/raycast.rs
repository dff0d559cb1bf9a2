use crate::error::{EngineError, Result};
use crate::math::Vec2;
use crate::world::WorldMap;

/// Longest ray walked before the cast is declared a miss. A logical bound
/// on the traversal, not a wall-clock one.
pub const MAX_RAY_DISTANCE: f32 = 128.0;

/// Unit-length tolerance for cast directions.
const UNIT_EPSILON: f32 = 1e-5;

/// Which grid-line family the ray crossed to enter the struck cell:
/// `Vertical` for x-boundaries, `Horizontal` for y-boundaries. Decides
/// which world coordinate varies along the visible wall face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Euclidean distance along the ray. Not perspective-corrected; that
    /// is the projector's job.
    pub distance: f32,
    pub side: Side,
    /// Grid cell struck.
    pub cell: (i32, i32),
    /// World-space point of contact.
    pub point: Vec2,
}

/// Outcome of a cast that stayed inside the map.
#[derive(Debug, Clone, Copy)]
pub enum Cast {
    Hit(RayHit),
    /// Nothing solid within `MAX_RAY_DISTANCE`.
    Miss,
}

/// Walks the grid one boundary crossing at a time (DDA), advancing along
/// whichever axis has accumulated the shorter ray length, until a solid
/// cell is struck. Leaving the grid is an error: an enclosed map never
/// lets a ray out, so escape means the map is broken.
pub fn cast(origin: Vec2, dir: Vec2, map: &WorldMap) -> Result<Cast> {
    let length = dir.length();
    if (length - 1.0).abs() > UNIT_EPSILON {
        return Err(EngineError::InvalidRayDirection { length });
    }

    let (mut cell_x, mut cell_y) = (origin.x as i32, origin.y as i32);

    // Ray length consumed by crossing one full grid unit on each axis. A
    // vanishing direction component divides out to +inf, which keeps that
    // axis from ever being picked.
    let unit_step_x = (1.0 + (dir.y / dir.x) * (dir.y / dir.x)).sqrt();
    let unit_step_y = ((dir.x / dir.y) * (dir.x / dir.y) + 1.0).sqrt();

    // Partial first steps out of the origin cell, signed per axis.
    let (step_x, mut ray_len_x) = if dir.x < 0.0 {
        (-1, (origin.x - cell_x as f32) * unit_step_x)
    } else {
        (1, (cell_x as f32 + 1.0 - origin.x) * unit_step_x)
    };
    let (step_y, mut ray_len_y) = if dir.y < 0.0 {
        (-1, (origin.y - cell_y as f32) * unit_step_y)
    } else {
        (1, (cell_y as f32 + 1.0 - origin.y) * unit_step_y)
    };

    let mut distance = 0.0;
    while distance < MAX_RAY_DISTANCE {
        // Ties go to the y-step, so a ray grazing a corner resolves the
        // same way every frame.
        let side = if ray_len_x < ray_len_y {
            cell_x += step_x;
            distance = ray_len_x;
            ray_len_x += unit_step_x;
            Side::Vertical
        } else {
            cell_y += step_y;
            distance = ray_len_y;
            ray_len_y += unit_step_y;
            Side::Horizontal
        };

        if map.is_solid(cell_x, cell_y)? {
            return Ok(Cast::Hit(RayHit {
                distance,
                side,
                cell: (cell_x, cell_y),
                point: origin + dir * distance,
            }));
        }
    }
    Ok(Cast::Miss)
}
