use std::collections::HashSet;
use std::f32::consts::{FRAC_PI_2, PI};

use winit::keyboard::KeyCode;

use crate::camera::Camera;
use crate::error::Result;
use crate::math::Vec2;
use crate::world::WorldMap;

/// Boolean state of the logical actions, sampled once per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub strafe_left: bool,
    pub strafe_right: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub eye_up: bool,
    pub eye_down: bool,
}

impl InputState {
    /// Folds the window's held-key set into logical actions.
    pub fn from_keys(keys: &HashSet<KeyCode>) -> Self {
        Self {
            forward: keys.contains(&KeyCode::KeyW),
            backward: keys.contains(&KeyCode::KeyS),
            strafe_left: keys.contains(&KeyCode::KeyA),
            strafe_right: keys.contains(&KeyCode::KeyD),
            turn_left: keys.contains(&KeyCode::KeyQ),
            turn_right: keys.contains(&KeyCode::KeyE),
            eye_up: keys.contains(&KeyCode::KeyR),
            eye_down: keys.contains(&KeyCode::KeyF),
        }
    }
}

/// One frame's worth of camera change. Produced by `map_input`, applied
/// by `apply_delta`; nothing in between touches the camera.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraDelta {
    pub translation: Vec2,
    pub rotation: f32,
    pub eye_delta: f32,
}

/// Movement tuning, taken from the config at startup.
pub struct Motion {
    /// World units per second.
    pub move_speed: f32,
    /// Radians per second.
    pub turn_speed: f32,
    /// Eye-height units per second.
    pub eye_speed: f32,
}

/// Pure mapping from held actions and elapsed time to a camera delta.
/// Every movement direction is the facing vector rotated in place: 0 for
/// forward, 180 for backward, +-90 for the strafes. Within each opposing
/// pair the first action wins.
pub fn map_input(input: InputState, facing: Vec2, motion: &Motion, dt: f32) -> CameraDelta {
    let step = facing * (motion.move_speed * dt);

    let mut translation = Vec2::ZERO;
    if input.strafe_left {
        translation += step.rotate(FRAC_PI_2);
    } else if input.strafe_right {
        translation += step.rotate(-FRAC_PI_2);
    }
    if input.forward {
        translation += step;
    } else if input.backward {
        translation += step.rotate(PI);
    }

    let mut rotation = 0.0;
    if input.turn_left {
        rotation += motion.turn_speed * dt;
    } else if input.turn_right {
        rotation -= motion.turn_speed * dt;
    }

    let mut eye_delta = 0.0;
    if input.eye_up {
        eye_delta += motion.eye_speed * dt;
    } else if input.eye_down {
        eye_delta -= motion.eye_speed * dt;
    }

    CameraDelta {
        translation,
        rotation,
        eye_delta,
    }
}

/// Applies a frame's delta. The translation commits only when the whole
/// destination cell is empty: collision is grid-quantized, and the
/// fractional position inside the destination cell is deliberately
/// ignored, so grazing past a wall corner is allowed.
pub fn apply_delta(camera: &mut Camera, map: &WorldMap, delta: CameraDelta) -> Result<()> {
    let next = camera.pos + delta.translation;
    if !map.is_solid(next.x as i32, next.y as i32)? {
        camera.translate(delta.translation);
    }
    if delta.rotation != 0.0 {
        camera.rotate(delta.rotation)?;
    }
    if delta.eye_delta != 0.0 {
        camera.adjust_eye_height(delta.eye_delta);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CameraDelta, InputState, Motion, apply_delta, map_input};
    use crate::camera::Camera;
    use crate::math::Vec2;
    use crate::world::WorldMap;

    fn motion() -> Motion {
        Motion {
            move_speed: 2.0,
            turn_speed: 3.0,
            eye_speed: 1.0,
        }
    }

    fn room() -> WorldMap {
        WorldMap::from_rows(&[
            vec![1, 1, 1, 1],
            vec![1, 0, 0, 1],
            vec![1, 0, 0, 1],
            vec![1, 1, 1, 1],
        ])
        .unwrap()
    }

    #[test]
    fn idle_input_yields_no_delta() {
        let delta = map_input(InputState::default(), Vec2::new(1.0, 0.0), &motion(), 0.016);
        assert_eq!(delta, CameraDelta::default());
    }

    #[test]
    fn forward_moves_along_the_facing_vector() {
        let input = InputState {
            forward: true,
            ..Default::default()
        };
        let delta = map_input(input, Vec2::new(0.0, -1.0), &motion(), 0.5);
        assert!((delta.translation.x - 0.0).abs() < 1e-6);
        assert!((delta.translation.y + 1.0).abs() < 1e-6); // 2.0 units/s * 0.5 s
    }

    #[test]
    fn strafe_is_perpendicular_to_facing() {
        let input = InputState {
            strafe_left: true,
            ..Default::default()
        };
        let facing = Vec2::new(1.0, 0.0);
        let delta = map_input(input, facing, &motion(), 0.25);
        assert!(delta.translation.dot(facing).abs() < 1e-6);
        assert!((delta.translation.length() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn opposing_actions_first_wins() {
        let input = InputState {
            forward: true,
            backward: true,
            turn_left: true,
            turn_right: true,
            ..Default::default()
        };
        let delta = map_input(input, Vec2::new(1.0, 0.0), &motion(), 1.0);
        assert!(delta.translation.x > 0.0);
        assert!(delta.rotation > 0.0);
    }

    #[test]
    fn rotation_scales_with_elapsed_time() {
        let input = InputState {
            turn_right: true,
            ..Default::default()
        };
        let delta = map_input(input, Vec2::new(1.0, 0.0), &motion(), 0.1);
        assert!((delta.rotation + 0.3).abs() < 1e-6);
    }

    #[test]
    fn translation_into_a_wall_is_discarded() {
        let map = room();
        let mut camera = Camera::new(Vec2::new(1.5, 1.5), Vec2::new(1.0, 0.0));
        let delta = CameraDelta {
            translation: Vec2::new(2.0, 0.0), // destination cell (3, 1) is solid
            ..Default::default()
        };
        apply_delta(&mut camera, &map, delta).unwrap();
        assert_eq!(camera.pos, Vec2::new(1.5, 1.5));
    }

    #[test]
    fn translation_into_open_space_commits() {
        let map = room();
        let mut camera = Camera::new(Vec2::new(1.5, 1.5), Vec2::new(1.0, 0.0));
        let delta = CameraDelta {
            translation: Vec2::new(1.0, 0.0),
            ..Default::default()
        };
        apply_delta(&mut camera, &map, delta).unwrap();
        assert_eq!(camera.pos, Vec2::new(2.5, 1.5));
    }

    #[test]
    fn corner_grazing_is_allowed_by_the_cell_test() {
        let map = room();
        // hugging the corner of solid cell (3, 3); the destination cell
        // (2, 2) is empty, so the fractional proximity does not block
        let mut camera = Camera::new(Vec2::new(2.6, 2.6), Vec2::new(1.0, 0.0));
        let delta = CameraDelta {
            translation: Vec2::new(0.35, 0.35),
            ..Default::default()
        };
        apply_delta(&mut camera, &map, delta).unwrap();
        assert!((camera.pos.x - 2.95).abs() < 1e-6);
        assert!((camera.pos.y - 2.95).abs() < 1e-6);
    }

    #[test]
    fn rotation_and_eye_apply_with_translation_blocked() {
        let map = room();
        let mut camera = Camera::new(Vec2::new(1.5, 1.5), Vec2::new(1.0, 0.0));
        let delta = CameraDelta {
            translation: Vec2::new(2.0, 0.0),
            rotation: std::f32::consts::FRAC_PI_2,
            eye_delta: 0.25,
        };
        apply_delta(&mut camera, &map, delta).unwrap();
        assert_eq!(camera.pos, Vec2::new(1.5, 1.5));
        assert!((camera.dir.y - 1.0).abs() < 1e-5);
        assert!((camera.eye_height - 0.75).abs() < 1e-6);
    }
}
