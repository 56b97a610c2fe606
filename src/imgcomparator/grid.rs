//! Strided sampling of two images into a grid of ΔE cells.
//!
//! Cell `(row, col)` holds the distance measured at pixel
//! `(col * stride, row * stride)`. A cell is changed when that distance
//! reaches the detection threshold, after the configured noise policy ran.

use rayon::prelude::*;

use super::color::pixel_distance;
use super::Image;
use crate::config::{DiffConfig, NoisePolicy};

#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    rows: usize,
    cols: usize,
    stride: u32,
    width: u32,
    height: u32,
    distances: Vec<f64>,
    changed: Vec<bool>,
    changed_cells: usize,
    max_distance: f64,
}

#[inline]
fn cells(extent: u32, stride: u32) -> usize {
    extent.div_ceil(stride) as usize
}

/// Fills one grid row. `keep` decides per column whether the cell is sampled.
fn sample_row(
    before: &Image,
    after: &Image,
    row: usize,
    stride: u32,
    out: &mut [f64],
    keep: impl Fn(usize) -> bool,
) {
    let y = row as u32 * stride;
    for (col, cell) in out.iter_mut().enumerate() {
        *cell = if keep(col) {
            let x = col as u32 * stride;
            pixel_distance(before.pixel(x, y), after.pixel(x, y))
        } else {
            0.0
        };
    }
}

/// Coarse tiles holding a change, grown by one tile in every direction.
struct TileMask {
    rows: usize,
    cols: usize,
    factor: usize,
    hot: Vec<bool>,
}

impl TileMask {
    fn from_coarse(coarse: &SampleGrid, factor: u32) -> TileMask {
        let (rows, cols) = (coarse.rows, coarse.cols);
        let mut hot = vec![false; rows * cols];
        for r in 0..rows {
            for c in 0..cols {
                if !coarse.is_changed(r, c) {
                    continue;
                }
                for nr in r.saturating_sub(1)..=(r + 1).min(rows - 1) {
                    for nc in c.saturating_sub(1)..=(c + 1).min(cols - 1) {
                        hot[nr * cols + nc] = true;
                    }
                }
            }
        }
        TileMask {
            rows,
            cols,
            factor: factor as usize,
            hot,
        }
    }

    #[inline]
    fn contains(&self, row: usize, col: usize) -> bool {
        let (tr, tc) = (row / self.factor, col / self.factor);
        tr < self.rows && tc < self.cols && self.hot[tr * self.cols + tc]
    }

    fn any(&self) -> bool {
        self.hot.iter().any(|&h| h)
    }
}

impl SampleGrid {
    /// Samples the `width x height` intersection of both images at `stride`.
    /// A stride of 0 is treated as 1.
    ///
    /// Rows are processed in parallel; the result does not depend on how
    /// rayon splits the work.
    pub fn scan(
        before: &Image,
        after: &Image,
        width: u32,
        height: u32,
        stride: u32,
        config: &DiffConfig,
    ) -> SampleGrid {
        let stride = stride.max(1);
        let (rows, cols) = (cells(height, stride), cells(width, stride));
        let mut distances = vec![0.0; rows * cols];
        if cols > 0 {
            distances
                .par_chunks_mut(cols)
                .enumerate()
                .for_each(|(row, out)| sample_row(before, after, row, stride, out, |_| true));
        }
        SampleGrid::from_distances(rows, cols, stride, width, height, distances, config)
    }

    /// Coarse pass at `stride * factor`, then a full-stride pass restricted
    /// to the neighbourhood of coarse hits. Changes that fall between coarse
    /// samples can be missed.
    pub fn scan_coarse_to_fine(
        before: &Image,
        after: &Image,
        width: u32,
        height: u32,
        stride: u32,
        factor: u32,
        config: &DiffConfig,
    ) -> SampleGrid {
        let (stride, factor) = (stride.max(1), factor.max(1));
        let coarse_config = DiffConfig {
            noise: NoisePolicy::Off,
            ..config.clone()
        };
        let coarse = SampleGrid::scan(
            before,
            after,
            width,
            height,
            stride.saturating_mul(factor),
            &coarse_config,
        );
        let mask = TileMask::from_coarse(&coarse, factor);
        tracing::debug!(
            coarse_changed = coarse.changed_cells,
            coarse_total = coarse.total_cells(),
            "coarse pass done"
        );

        let (rows, cols) = (cells(height, stride), cells(width, stride));
        let mut distances = vec![0.0; rows * cols];
        if cols > 0 && mask.any() {
            distances
                .par_chunks_mut(cols)
                .enumerate()
                .for_each(|(row, out)| {
                    sample_row(before, after, row, stride, out, |col| mask.contains(row, col))
                });
        }
        SampleGrid::from_distances(rows, cols, stride, width, height, distances, config)
    }

    fn from_distances(
        rows: usize,
        cols: usize,
        stride: u32,
        width: u32,
        height: u32,
        distances: Vec<f64>,
        config: &DiffConfig,
    ) -> SampleGrid {
        let mut changed: Vec<bool> = distances
            .iter()
            .map(|&d| d >= config.detect_threshold)
            .collect();

        if config.noise == NoisePolicy::IsolatedCells {
            suppress_isolated(&mut changed, &distances, rows, cols, config.low_threshold);
        }

        let changed_cells = changed.iter().filter(|&&c| c).count();
        let max_distance = distances.iter().copied().fold(0.0, f64::max);

        SampleGrid {
            rows,
            cols,
            stride,
            width,
            height,
            distances,
            changed,
            changed_cells,
            max_distance,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn is_changed(&self, row: usize, col: usize) -> bool {
        self.changed[row * self.cols + col]
    }

    #[inline]
    pub fn distance(&self, row: usize, col: usize) -> f64 {
        self.distances[row * self.cols + col]
    }

    pub fn changed_cells(&self) -> usize {
        self.changed_cells
    }

    pub fn total_cells(&self) -> usize {
        self.rows * self.cols
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    /// Percentage of sampled cells marked changed.
    pub fn mismatch(&self) -> f64 {
        if self.total_cells() == 0 {
            return 0.0;
        }
        100.0 * self.changed_cells as f64 / self.total_cells() as f64
    }
}

fn suppress_isolated(changed: &mut [bool], distances: &[f64], rows: usize, cols: usize, low: f64) {
    let supported = |r: usize, c: usize| distances[r * cols + c] >= low;
    let mut cleared = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            if !changed[r * cols + c] {
                continue;
            }
            let has_neighbour = (r > 0 && supported(r - 1, c))
                || (r + 1 < rows && supported(r + 1, c))
                || (c > 0 && supported(r, c - 1))
                || (c + 1 < cols && supported(r, c + 1));
            if !has_neighbour {
                cleared.push(r * cols + c);
            }
        }
    }
    for idx in cleared {
        changed[idx] = false;
    }
}

/// Row-at-a-time scan for callers that must yield between slices of work.
///
/// Produces exactly the grid [`SampleGrid::scan`] would.
pub struct IncrementalScan<'a> {
    before: &'a Image,
    after: &'a Image,
    width: u32,
    height: u32,
    stride: u32,
    rows: usize,
    cols: usize,
    next_row: usize,
    distances: Vec<f64>,
}

impl<'a> IncrementalScan<'a> {
    pub fn new(before: &'a Image, after: &'a Image, width: u32, height: u32, stride: u32) -> Self {
        let stride = stride.max(1);
        let (rows, cols) = (cells(height, stride), cells(width, stride));
        IncrementalScan {
            before,
            after,
            width,
            height,
            stride,
            rows,
            cols,
            next_row: 0,
            distances: vec![0.0; rows * cols],
        }
    }

    /// Samples up to `max_rows` more rows. Returns `true` once every row is done.
    pub fn step(&mut self, max_rows: usize) -> bool {
        let end = (self.next_row + max_rows.max(1)).min(self.rows);
        for row in self.next_row..end {
            let out = &mut self.distances[row * self.cols..(row + 1) * self.cols];
            sample_row(self.before, self.after, row, self.stride, out, |_| true);
        }
        self.next_row = end;
        self.is_done()
    }

    pub fn is_done(&self) -> bool {
        self.next_row >= self.rows
    }

    /// Finishes any remaining rows and applies thresholds and noise policy.
    pub fn finish(mut self, config: &DiffConfig) -> SampleGrid {
        while !self.step(self.rows) {}
        SampleGrid::from_distances(
            self.rows,
            self.cols,
            self.stride,
            self.width,
            self.height,
            self.distances,
            config,
        )
    }
}
