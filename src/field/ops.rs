//! Primitive grid operations: reset, random perturbation, image-driven
//! height loading, neighbor-average smoothing, and local steepness.

use glam::{Vec2, Vec3};
use rand::Rng;
use rayon::prelude::*;
use thiserror::Error;

use super::HeightField;

/// Errors from grid operation parameter validation.
#[derive(Error, Debug)]
pub enum OpsError {
    #[error("invalid perturbation range: lo ({0}) > hi ({1})")]
    InvalidRange(f32, f32),
    #[error("image sample ({x}, {y}) is outside the {width}x{height} source")]
    SampleOutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },
}

/// Image-sampling capability consumed by [`load_from_image`].
///
/// Decoding stays on the host side; the core only needs grayscale lookups.
pub trait GrayscaleSource {
    /// Source dimensions as `(width, height)`.
    fn dimensions(&self) -> (usize, usize);

    /// Grayscale intensity in [0, 1] at the given pixel.
    fn grayscale(&self, x: usize, y: usize) -> f32;
}

/// Policy for image sample coordinates that fall outside the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplePolicy {
    /// Clamp coordinates into the source dimensions.
    ClampToEdge,
    /// Reject the operation with [`OpsError::SampleOutOfBounds`].
    Strict,
}

/// Sets every cell to 0.
pub fn reset(field: &mut HeightField) {
    let buf = field.working_copy(true);
    field.commit(buf);
}

/// Adds an independent `uniform[lo, hi]` sample to every cell.
pub fn random_perturb<R: Rng + ?Sized>(
    field: &mut HeightField,
    lo: f32,
    hi: f32,
    reset: bool,
    rng: &mut R,
) -> Result<(), OpsError> {
    if lo > hi {
        return Err(OpsError::InvalidRange(lo, hi));
    }

    let mut buf = field.working_copy(reset);
    for cell in &mut buf {
        *cell += rng.random_range(lo..=hi);
    }
    field.commit(buf);
    Ok(())
}

/// Adds `source.grayscale(trunc(x * scale.x), trunc(y * scale.z)) * scale.y`
/// to every cell.
///
/// Sample coordinates outside the source are handled per `policy`;
/// [`SamplePolicy::Strict`] fails before the field is touched.
pub fn load_from_image<S: GrayscaleSource + ?Sized>(
    field: &mut HeightField,
    source: &S,
    scale: Vec3,
    policy: SamplePolicy,
    reset: bool,
) -> Result<(), OpsError> {
    let (w, h) = field.dimensions();
    let (iw, ih) = source.dimensions();

    let mut buf = field.working_copy(reset);
    for y in 0..h {
        for x in 0..w {
            let sx = (x as f32 * scale.x) as i64;
            let sy = (y as f32 * scale.z) as i64;
            let (sx, sy) = match policy {
                SamplePolicy::ClampToEdge => (
                    sx.clamp(0, iw as i64 - 1) as usize,
                    sy.clamp(0, ih as i64 - 1) as usize,
                ),
                SamplePolicy::Strict => {
                    if sx < 0 || sy < 0 || sx >= iw as i64 || sy >= ih as i64 {
                        return Err(OpsError::SampleOutOfBounds {
                            x: sx,
                            y: sy,
                            width: iw,
                            height: ih,
                        });
                    }
                    (sx as usize, sy as usize)
                }
            };
            buf[y * w + x] += source.grayscale(sx, sy) * scale.y;
        }
    }
    field.commit(buf);
    Ok(())
}

/// Collects the up-to-8 neighbors of a cell, clamping coordinates into range
/// and dropping duplicates so edge cells average over fewer samples instead
/// of double-counting clamped ones.
fn clamped_neighbors(
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    out: &mut [(usize, usize); 8],
) -> usize {
    let mut count = 0;
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = (x as i64 + dx).clamp(0, width as i64 - 1) as usize;
            let ny = (y as i64 + dy).clamp(0, height as i64 - 1) as usize;
            if !out[..count].contains(&(nx, ny)) {
                out[count] = (nx, ny);
                count += 1;
            }
        }
    }
    count
}

/// Iterated box blur over the clamped, de-duplicated 8-neighborhood.
///
/// Each pass reads a snapshot of the previous pass and writes a fresh
/// buffer, so results never depend on traversal order within a pass.
pub fn smooth_clamped(field: &mut HeightField, passes: u32) {
    smooth_clamped_with_progress(field, passes, |_, _| {});
}

/// [`smooth_clamped`] with a per-pass progress callback `(done, total)`.
pub fn smooth_clamped_with_progress<F: FnMut(u32, u32)>(
    field: &mut HeightField,
    passes: u32,
    mut on_pass: F,
) {
    let (w, h) = field.dimensions();
    let mut prev = field.working_copy(false);
    let mut next = vec![0.0f32; prev.len()];

    for pass in 0..passes {
        next.par_iter_mut().enumerate().for_each(|(i, cell)| {
            let x = i % w;
            let y = i / w;
            let mut neighbors = [(0usize, 0usize); 8];
            let count = clamped_neighbors(x, y, w, h, &mut neighbors);
            let mut sum = prev[i];
            for &(nx, ny) in &neighbors[..count] {
                sum += prev[ny * w + nx];
            }
            *cell = sum / (count as f32 + 1.0);
        });
        std::mem::swap(&mut prev, &mut next);
        on_pass(pass + 1, passes);
    }

    field.commit(prev);
}

/// Iterated mean over the in-bounds 3x3 window, snapshot-buffered per pass.
pub fn smooth_windowed(field: &mut HeightField, passes: u32) {
    let (w, h) = field.dimensions();
    let mut prev = field.working_copy(false);
    let mut next = vec![0.0f32; prev.len()];

    for _ in 0..passes {
        next.par_iter_mut().enumerate().for_each(|(i, cell)| {
            let x = (i % w) as i64;
            let y = (i / w) as i64;
            let mut sum = 0.0;
            let mut div = 0u32;
            for ny in (y - 1)..=(y + 1) {
                if ny < 0 || ny >= h as i64 {
                    continue;
                }
                for nx in (x - 1)..=(x + 1) {
                    if nx < 0 || nx >= w as i64 {
                        continue;
                    }
                    sum += prev[ny as usize * w + nx as usize];
                    div += 1;
                }
            }
            *cell = sum / div as f32;
        });
        std::mem::swap(&mut prev, &mut next);
    }

    field.commit(prev);
}

/// Local gradient magnitude from forward differences, falling back to the
/// -1 neighbor at the far edge.
pub fn steepness(field: &HeightField, x: usize, y: usize) -> f32 {
    let (w, h) = field.dimensions();
    let here = field.get(x, y);

    let nx = if x + 1 < w {
        x + 1
    } else if x > 0 {
        x - 1
    } else {
        x
    };
    let ny = if y + 1 < h {
        y + 1
    } else if y > 0 {
        y - 1
    } else {
        y
    };

    let dx = field.get(nx, y) - here;
    let dy = field.get(x, ny) - here;
    Vec2::new(dx, dy).length()
}
