//! Height field storage and primitive grid operations.

pub mod ops;

use serde::{Deserialize, Serialize};

/// A 2D grid of elevation samples stored in row-major order.
///
/// Generators mutate the field through a working-copy pattern:
/// [`working_copy`] hands out either a zeroed buffer or a snapshot of the
/// committed contents, the pass computes into it, and [`commit`] writes the
/// finished buffer back in one step. Nothing reads the committed data while
/// a buffer is being filled, so a pass never observes its own writes.
///
/// [`working_copy`]: HeightField::working_copy
/// [`commit`]: HeightField::commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeightField {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl HeightField {
    /// Creates a field of the given dimensions with every cell at 0.0.
    ///
    /// # Panics
    /// Panics if either dimension is zero.
    pub fn new(width: usize, height: usize) -> Self {
        assert!(
            width >= 1 && height >= 1,
            "height field dimensions must be at least 1x1 (got {}x{})",
            width,
            height
        );
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    /// Returns the height at the given cell.
    ///
    /// # Panics
    /// Panics if the coordinate is out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[self.index(x, y)]
    }

    /// Sets the height at the given cell.
    ///
    /// # Panics
    /// Panics if the coordinate is out of bounds.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        let i = self.index(x, y);
        self.data[i] = value;
    }

    /// Row-major view of all cells.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the `(min, max)` height values across the field.
    pub fn height_range(&self) -> (f32, f32) {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for &h in &self.data {
            min = min.min(h);
            max = max.max(h);
        }
        (min, max)
    }

    /// Hands out a buffer for a generator pass to fill.
    ///
    /// With `reset` the buffer starts zeroed, discarding the committed
    /// contents; otherwise it is a snapshot the pass accumulates onto.
    pub fn working_copy(&self, reset: bool) -> Vec<f32> {
        if reset {
            vec![0.0; self.data.len()]
        } else {
            self.data.clone()
        }
    }

    /// Replaces the committed contents with a fully-computed buffer.
    ///
    /// # Panics
    /// Panics if the buffer length does not match the field size.
    pub fn commit(&mut self, buf: Vec<f32>) {
        assert_eq!(
            buf.len(),
            self.data.len(),
            "committed buffer length mismatch"
        );
        self.data = buf;
    }
}
