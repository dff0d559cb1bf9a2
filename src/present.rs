use rayon::iter::{IndexedParallelIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;

/// Bilinear source pair and blend weight for one destination row or
/// column.
#[derive(Clone, Copy)]
struct Tap {
    lo: usize,
    hi: usize,
    t: f32,
}

/// Precomputed stretch from the internal framebuffer to the window
/// surface. Rebuilt whenever either size changes.
pub struct BlitMap {
    xs: Vec<Tap>,
    ys: Vec<Tap>,
    src_w: usize,
}

impl BlitMap {
    pub fn empty() -> Self {
        Self {
            xs: Vec::new(),
            ys: Vec::new(),
            src_w: 0,
        }
    }

    pub fn build(dst_w: usize, dst_h: usize, src_w: usize, src_h: usize) -> Self {
        Self {
            xs: axis_taps(dst_w, src_w),
            ys: axis_taps(dst_h, src_h),
            src_w,
        }
    }

    /// Stretches `src` over `dst` with bilinear filtering, one parallel
    /// job per destination row.
    pub fn stretch(&self, dst: &mut [u32], dst_w: usize, src: &[u32]) {
        if self.xs.len() != dst_w || self.src_w == 0 {
            return;
        }
        dst.par_chunks_mut(dst_w)
            .enumerate()
            .for_each(|(y, dst_row)| {
                let Some(&ty) = self.ys.get(y) else { return };
                let row_lo = ty.lo * self.src_w;
                let row_hi = ty.hi * self.src_w;

                for (x, out) in dst_row.iter_mut().enumerate() {
                    let tx = self.xs[x];
                    let top = lerp_rgb(src[row_lo + tx.lo], src[row_lo + tx.hi], tx.t);
                    let bottom = lerp_rgb(src[row_hi + tx.lo], src[row_hi + tx.hi], tx.t);
                    *out = lerp_rgb(top, bottom, ty.t);
                }
            });
    }
}

fn axis_taps(dst: usize, src: usize) -> Vec<Tap> {
    if src == 0 {
        return Vec::new();
    }
    let scale = src as f32 / dst as f32;
    (0..dst)
        .map(|i| {
            let pos = i as f32 * scale;
            let lo = (pos.floor() as usize).min(src - 1);
            Tap {
                lo,
                hi: (lo + 1).min(src - 1),
                t: pos - lo as f32,
            }
        })
        .collect()
}

/// Per-channel blend of two packed 0RGB pixels; the alpha byte stays 0.
fn lerp_rgb(a: u32, b: u32, t: f32) -> u32 {
    let ch = |shift: u32| {
        let av = ((a >> shift) & 0xFF) as f32;
        let bv = ((b >> shift) & 0xFF) as f32;
        (av + (bv - av) * t) as u32
    };
    (ch(16) << 16) | (ch(8) << 8) | ch(0)
}
