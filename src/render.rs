use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;

use crate::camera::Camera;
use crate::error::{EngineError, Result};
use crate::math::Vec2;
use crate::raycast::{self, Cast, MAX_RAY_DISTANCE, Side};
use crate::texture::{Texture, TextureSet, pack_rgb};
use crate::world::WorldMap;

const CEILING_COLOR: u32 = pack_rgb(0, 255, 255);

/// Wall slice computed for one screen column.
#[derive(Debug, Clone, Copy)]
struct ColumnSpan {
    /// First wall row.
    top: usize,
    /// One past the last wall row; rows below are floor.
    bottom: usize,
    /// Unclamped projected wall height, kept for texture v mapping when
    /// the wall extends past the screen.
    full_height: f32,
    /// Texture coordinate along the struck face, in [0, 1).
    tex_u: f32,
}

/// Renders one frame into `buf` (row-major, `width * height` packed 0RGB
/// pixels). Casts are independent per column and run in parallel; the
/// pixel writes stay sequential.
pub fn render_frame(
    buf: &mut [u32],
    width: usize,
    height: usize,
    world: &WorldMap,
    camera: &Camera,
    textures: &TextureSet,
    textured_floor: bool,
) -> Result<()> {
    debug_assert_eq!(buf.len(), width * height);
    if width == 0 || height == 0 {
        return Ok(());
    }

    if textured_floor {
        draw_floor(buf, width, height, camera, &textures.floor);
    }

    let spans = (0..width)
        .into_par_iter()
        .map(|x| project_column(x, width, height, world, camera))
        .collect::<Result<Vec<_>>>()?;

    draw_columns(buf, width, height, &spans, &textures.wall, textured_floor);
    Ok(())
}

/// Casts the ray for screen column `x` and projects the hit into a wall
/// slice. A miss is fatal here: with an enclosed map every column must
/// strike a wall.
fn project_column(
    x: usize,
    width: usize,
    height: usize,
    world: &WorldMap,
    camera: &Camera,
) -> Result<ColumnSpan> {
    // -1 at the left edge of the screen, +1 at the right
    let camera_x = (x as f32 / width as f32) * 2.0 - 1.0;
    let ray_dir = (camera.dir + camera.plane * camera_x).normalize();

    let hit = match raycast::cast(camera.pos, ray_dir, world)? {
        Cast::Hit(hit) => hit,
        Cast::Miss => {
            return Err(EngineError::MissedRay {
                column: x,
                max_distance: MAX_RAY_DISTANCE,
            });
        }
    };

    // Fisheye correction: drop the component of the hit distance that
    // lies along the projection plane, leaving the distance along the
    // camera's forward axis. The clamp keeps float error at the screen
    // edges from producing a negative radicand.
    let plane_len = (camera.plane * camera_x).length().min(hit.distance);
    let perp = (hit.distance * hit.distance - plane_len * plane_len).sqrt();

    let h = height as f32;
    let full_height = h / perp;
    let wall_rows = (full_height.min(h).round() as usize).min(height);
    // remaining rows split between floor and ceiling by eye height
    let floor_rows =
        (((height - wall_rows) as f32) * (1.0 - camera.eye_height)).round() as usize;
    let top = height - wall_rows - floor_rows;

    let frac = hit.point.fract();
    let tex_u = match hit.side {
        Side::Horizontal => frac.x,
        Side::Vertical => frac.y,
    };

    Ok(ColumnSpan {
        top,
        bottom: top + wall_rows,
        full_height,
        tex_u,
    })
}

fn draw_columns(
    buf: &mut [u32],
    width: usize,
    height: usize,
    spans: &[ColumnSpan],
    wall: &Texture,
    textured_floor: bool,
) {
    let horizon = height / 2;
    // The floor pass already covered everything below the horizon; the
    // column pass only fills floor rows the caster cannot reach.
    let floor_fill_end = if textured_floor {
        (horizon + 1).min(height)
    } else {
        height
    };

    for (x, span) in spans.iter().enumerate() {
        for y in 0..span.top {
            buf[y * width + x] = CEILING_COLOR;
        }

        let tex_x = (span.tex_u * (wall.width() - 1) as f32) as u32;
        let wall_rows = span.bottom - span.top;
        // When the wall is taller than the screen, only the centered
        // visible slice is sampled, offset into the full column.
        let offscreen = ((span.full_height - wall_rows as f32) * 0.5).max(0.0);
        for i in 0..wall_rows {
            let v = ((i as f32 + offscreen) / span.full_height).clamp(0.0, 1.0);
            let tex_y = (v * (wall.height() - 1) as f32) as u32;
            buf[(span.top + i) * width + x] = wall.texel(tex_x, tex_y);
        }

        for y in span.bottom..floor_fill_end {
            buf[y * width + x] = floor_shade(y, horizon, height);
        }
    }
}

/// Flat floor fill for rows the textured caster does not handle, and the
/// whole floor when floor texturing is off. Darkest at the horizon.
fn floor_shade(y: usize, horizon: usize, height: usize) -> u32 {
    let t = if y > horizon && height > horizon + 1 {
        (y - horizon) as f32 / (height - 1 - horizon) as f32
    } else {
        0.0
    };
    let shade = (40.0 + 130.0 * t) as u8;
    pack_rgb(shade, shade, shade)
}

/// Floor casting: every row below the horizon maps to a fixed world-space
/// distance, so the world coordinate walks the row with one precomputed
/// step vector per row instead of per-pixel math. Rows are independent
/// and fill in parallel.
fn draw_floor(buf: &mut [u32], width: usize, height: usize, camera: &Camera, floor: &Texture) {
    let horizon = height / 2;
    let start = horizon + 1; // the horizon row itself has no finite distance
    if start >= height {
        return;
    }

    let pos_z = camera.eye_height * height as f32;
    let (tw, th) = (floor.width() as f32, floor.height() as f32);

    buf[start * width..]
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(i, row)| {
            let offset = (start + i - horizon) as f32;
            let (mut coord, step) = floor_row_span(camera, width, pos_z, offset);

            for px in row.iter_mut() {
                let tex_x = (coord.x.rem_euclid(1.0) * tw) as u32;
                let tex_y = (coord.y.rem_euclid(1.0) * th) as u32;
                *px = floor.texel(tex_x, tex_y);
                coord += step;
            }
        });
}

/// World coordinate of a floor row's leftmost column and the step that
/// advances it one column to the right.
fn floor_row_span(camera: &Camera, width: usize, pos_z: f32, horizon_offset: f32) -> (Vec2, Vec2) {
    let left = camera.dir - camera.plane;
    let right = camera.dir + camera.plane;
    let row_distance = pos_z / horizon_offset;
    let step = (right - left) * (row_distance / width as f32);
    (camera.pos + left * row_distance, step)
}

#[cfg(test)]
mod tests {
    use super::{floor_row_span, project_column, render_frame};
    use crate::camera::Camera;
    use crate::error::EngineError;
    use crate::math::Vec2;
    use crate::texture::TextureSet;
    use crate::world::{Level, WorldMap};

    const W: usize = 64;
    const H: usize = 64;

    /// Never produced by pack_rgb, whose top byte is always zero.
    const UNPAINTED: u32 = 0xFF00_0000;

    fn boxed_map(interior: usize) -> WorldMap {
        let size = interior + 2;
        let rows: Vec<Vec<u8>> = (0..size)
            .map(|y| {
                (0..size)
                    .map(|x| u8::from(x == 0 || y == 0 || x == size - 1 || y == size - 1))
                    .collect()
            })
            .collect();
        WorldMap::from_rows(&rows).unwrap()
    }

    fn procedural_textures() -> TextureSet {
        TextureSet::load(None).unwrap()
    }

    #[test]
    fn single_cell_map_renders_full_height_walls() {
        let map = boxed_map(1);
        let textures = procedural_textures();
        for facing in [
            Vec2::new(1.0, 0.0),
            Vec2::new(-1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, -1.0),
        ] {
            let camera = Camera::new(Vec2::new(1.5, 1.5), facing);
            let mut buf = vec![UNPAINTED; W * H];
            render_frame(&mut buf, W, H, &map, &camera, &textures, true).unwrap();

            for x in 0..W {
                let span = project_column(x, W, H, &map, &camera).unwrap();
                assert!(span.full_height.is_finite());
                let wall = span.bottom - span.top;
                let (ceiling, floor) = (span.top, H - span.bottom);
                assert_eq!(ceiling + wall + floor, H);
            }
        }
    }

    #[test]
    fn every_pixel_is_painted() {
        let level = Level::builtin();
        let textures = procedural_textures();
        for textured_floor in [true, false] {
            for eye in [0.05, 0.3, 0.5, 0.8, 0.95] {
                let mut camera = Camera::new(level.spawn, level.facing);
                camera.eye_height = eye;
                let mut buf = vec![UNPAINTED; W * H];
                render_frame(&mut buf, W, H, &level.map, &camera, &textures, textured_floor)
                    .unwrap();
                assert!(
                    buf.iter().all(|&px| px != UNPAINTED),
                    "unpainted pixels at eye {eye}, textured {textured_floor}"
                );
            }
        }
    }

    #[test]
    fn center_column_needs_no_fisheye_correction() {
        let map = boxed_map(1);
        let camera = Camera::new(Vec2::new(1.5, 1.5), Vec2::new(1.0, 0.0));
        // camera_x is exactly 0 at column W/2, so the perpendicular
        // distance equals the hit distance (0.5) and the projected
        // height is exactly H / 0.5
        let span = project_column(W / 2, W, H, &map, &camera).unwrap();
        assert_eq!(span.full_height, H as f32 / 0.5);
    }

    #[test]
    fn texture_u_stays_in_unit_range() {
        let level = Level::builtin();
        for i in 0..32 {
            let facing = Vec2::new(1.0, 0.0).rotate(i as f32 * 0.196);
            let camera = Camera::new(Vec2::new(6.3, 12.7), facing);
            for x in 0..W {
                let span = project_column(x, W, H, &level.map, &camera).unwrap();
                assert!(
                    (0.0..1.0).contains(&span.tex_u),
                    "u = {} at column {x}",
                    span.tex_u
                );
            }
        }
    }

    #[test]
    fn open_expanse_fails_the_column() {
        let map = boxed_map(300);
        let camera = Camera::new(Vec2::new(151.0, 151.0), Vec2::new(1.0, 0.0));
        let err = project_column(W / 2, W, H, &map, &camera).unwrap_err();
        assert!(matches!(err, EngineError::MissedRay { .. }));
    }

    #[test]
    fn floor_step_accumulation_does_not_drift() {
        let width = 4096;
        let camera = Camera::new(Vec2::new(6.0, 12.0), Vec2::new(-1.0, 0.0));
        let (start, step) = floor_row_span(&camera, width, 0.5 * H as f32, 3.0);

        let mut walked = start;
        for _ in 0..width {
            walked += step;
        }
        // direct computation of the rightmost column's coordinate
        let row_distance = 0.5 * H as f32 / 3.0;
        let direct = camera.pos + (camera.dir + camera.plane) * row_distance;

        assert!((walked.x - direct.x).abs() < 5e-3, "{walked:?} vs {direct:?}");
        assert!((walked.y - direct.y).abs() < 5e-3, "{walked:?} vs {direct:?}");
    }
}
