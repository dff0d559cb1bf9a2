use std::path::Path;

use image::GenericImageView;

use crate::error::{EngineError, Result};

/// Packs a color for the presentation surface: 0RGB in a `u32`, blue in
/// the low byte (BGRA8 in little-endian memory, alpha left at 0).
#[inline]
pub const fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    (b as u32) | ((g as u32) << 8) | ((r as u32) << 16)
}

/// CPU-side texture sampled by integer texel index, nearest-neighbor
/// only. Both dimensions must be powers of two so sampling can wrap with
/// a mask instead of a modulo.
#[derive(Debug)]
pub struct Texture {
    width: u32,
    height: u32,
    texels: Vec<u32>, // packed 0RGB, row-major
}

impl Texture {
    fn new(width: u32, height: u32, texels: Vec<u32>) -> Self {
        debug_assert!(width.is_power_of_two() && height.is_power_of_two());
        debug_assert_eq!(texels.len(), (width * height) as usize);
        Self {
            width,
            height,
            texels,
        }
    }

    /// Decodes a PNG into packed texels. Fails if the file is unreadable
    /// or its dimensions are not powers of two.
    pub fn load(path: &Path) -> Result<Self> {
        let img = image::open(path).map_err(|source| EngineError::MissingAsset {
            path: path.into(),
            source,
        })?;
        let (width, height) = img.dimensions();
        check_power_of_two(path, width, height)?;

        let texels = img
            .to_rgba8()
            .pixels()
            .map(|p| pack_rgb(p.0[0], p.0[1], p.0[2]))
            .collect();
        Ok(Self::new(width, height, texels))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Nearest-neighbor lookup; coordinates wrap at the texture edge.
    #[inline]
    pub fn texel(&self, x: u32, y: u32) -> u32 {
        let x = x & (self.width - 1);
        let y = y & (self.height - 1);
        self.texels[(y * self.width + x) as usize]
    }

    /// Procedural brick wall, used when no assets directory is set.
    pub fn brick() -> Self {
        const SIZE: u32 = 64;
        const COURSE: u32 = 16; // brick row height
        const MORTAR: u32 = pack_rgb(0x9a, 0x93, 0x8b);

        let mut texels = Vec::with_capacity((SIZE * SIZE) as usize);
        for y in 0..SIZE {
            let course = y / COURSE;
            // stagger every other course by half a brick
            let shift = if course % 2 == 0 { 0 } else { COURSE };
            for x in 0..SIZE {
                let in_mortar = y % COURSE < 2 || (x + shift) % (COURSE * 2) < 2;
                if in_mortar {
                    texels.push(MORTAR);
                } else {
                    let jitter = (hash2(x / 4, y / 4) % 24) as u8;
                    texels.push(pack_rgb(0xa8 + jitter, 0x46, 0x38));
                }
            }
        }
        Self::new(SIZE, SIZE, texels)
    }

    /// Procedural speckled grass floor.
    pub fn grass() -> Self {
        const SIZE: u32 = 64;

        let mut texels = Vec::with_capacity((SIZE * SIZE) as usize);
        for y in 0..SIZE {
            for x in 0..SIZE {
                let h = hash2(x, y);
                let g = 0x68 + (h % 40) as u8;
                let r = 0x28 + ((h >> 8) % 16) as u8;
                texels.push(pack_rgb(r, g, 0x2c));
            }
        }
        Self::new(SIZE, SIZE, texels)
    }
}

fn check_power_of_two(path: &Path, width: u32, height: u32) -> Result<()> {
    if width.is_power_of_two() && height.is_power_of_two() {
        Ok(())
    } else {
        Err(EngineError::TextureSize {
            path: path.into(),
            width,
            height,
        })
    }
}

/// Small integer hash for deterministic texel jitter.
fn hash2(x: u32, y: u32) -> u32 {
    let mut h = x
        .wrapping_mul(0x16a8_8e2d)
        .wrapping_add(y.wrapping_mul(0x27d4_eb2f));
    h ^= h >> 13;
    h = h.wrapping_mul(0x8504_ebcb);
    h ^ (h >> 16)
}

/// The two assets the renderer needs. Loaded from `wall.png` and
/// `floor.png` under the assets directory when one is configured,
/// procedural otherwise.
pub struct TextureSet {
    pub wall: Texture,
    pub floor: Texture,
}

impl TextureSet {
    pub fn load(assets_dir: Option<&Path>) -> Result<Self> {
        match assets_dir {
            Some(dir) => Ok(Self {
                wall: Texture::load(&dir.join("wall.png"))?,
                floor: Texture::load(&dir.join("floor.png"))?,
            }),
            None => Ok(Self {
                wall: Texture::brick(),
                floor: Texture::grass(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{Texture, check_power_of_two, pack_rgb};
    use crate::error::EngineError;

    #[test]
    fn pack_rgb_puts_blue_in_the_low_byte() {
        assert_eq!(pack_rgb(0x11, 0x22, 0x33), 0x0011_2233);
    }

    #[test]
    fn texel_lookup_wraps_at_the_edge() {
        let tex = Texture::brick();
        assert_eq!(tex.texel(64, 0), tex.texel(0, 0));
        assert_eq!(tex.texel(3, 64 + 7), tex.texel(3, 7));
    }

    #[test]
    fn procedural_textures_are_power_of_two() {
        for tex in [Texture::brick(), Texture::grass()] {
            assert!(tex.width().is_power_of_two());
            assert!(tex.height().is_power_of_two());
        }
    }

    #[test]
    fn non_power_of_two_dimensions_are_rejected() {
        let err = check_power_of_two(Path::new("tex.png"), 100, 64).unwrap_err();
        assert!(matches!(
            err,
            EngineError::TextureSize {
                width: 100,
                height: 64,
                ..
            }
        ));
        assert!(check_power_of_two(Path::new("tex.png"), 128, 32).is_ok());
    }

    #[test]
    fn missing_file_is_a_missing_asset_error() {
        let err = Texture::load(Path::new("does/not/exist.png")).unwrap_err();
        assert!(matches!(err, EngineError::MissingAsset { .. }));
    }
}
