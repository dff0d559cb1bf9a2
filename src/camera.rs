use crate::error::{EngineError, Result};
use crate::math::Vec2;

/// Tolerated drift of `|dir|` from 1.0 after a rotation. Drift past this
/// is reported as an error rather than silently renormalized.
const DIR_EPSILON: f32 = 1e-4;

/// Ratio of the projection-plane half-width to the facing vector. 2/3
/// gives a horizontal field of view of roughly 67 degrees.
const PLANE_SCALE: f32 = 2.0 / 3.0;

pub struct Camera {
    /// World position; must lie inside an empty cell.
    pub pos: Vec2,
    /// Facing direction, unit length.
    pub dir: Vec2,
    /// Projection plane, perpendicular to `dir`; its magnitude sets the
    /// horizontal field of view.
    pub plane: Vec2,
    /// Vertical eye position between floor (0.0) and ceiling (1.0).
    pub eye_height: f32,
}

impl Camera {
    /// Builds a camera at `pos` looking along `facing` (normalized here),
    /// with the projection plane derived from the facing vector.
    pub fn new(pos: Vec2, facing: Vec2) -> Self {
        let dir = facing.normalize();
        Self {
            pos,
            dir,
            plane: dir.rotate(-std::f32::consts::FRAC_PI_2) * PLANE_SCALE,
            eye_height: 0.5,
        }
    }

    /// Rotates facing and projection plane together about the up axis.
    /// The facing vector must come back unit length; accumulated drift
    /// beyond epsilon is a defect the caller has to see.
    pub fn rotate(&mut self, angle: f32) -> Result<()> {
        self.dir = self.dir.rotate(angle);
        self.plane = self.plane.rotate(angle);

        let length = self.dir.length();
        if (length - 1.0).abs() > DIR_EPSILON {
            return Err(EngineError::InvalidRayDirection { length });
        }
        Ok(())
    }

    /// Commits a translation. The caller is responsible for testing the
    /// destination cell against the map first; this does no collision.
    pub fn translate(&mut self, delta: Vec2) {
        self.pos += delta;
    }

    /// Moves the eye vertically, kept away from the exact floor/ceiling
    /// planes so the floor-casting row distance stays finite.
    pub fn adjust_eye_height(&mut self, delta: f32) {
        self.eye_height = (self.eye_height + delta).clamp(0.05, 0.95);
    }
}
