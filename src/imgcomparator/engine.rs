//! Comparison entry point: sampling, grouping and result shaping.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::color::pixel_distance;
use super::grid::SampleGrid;
use super::regions::{extract_regions, merge_regions, ChangedRegion, Severity};
use super::{DiffError, Image};
use crate::config::{DiffConfig, MismatchMethod, ScanMode};

/// Outcome of one comparison. Built per call, owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Percentage of the canvas judged changed, in `[0, 100]`.
    pub mismatch: f64,
    pub regions: Vec<ChangedRegion>,
    pub width: u32,
    pub height: u32,
    /// Largest ΔE seen anywhere on the sample grid.
    pub max_distance: f64,
}

impl DiffResult {
    /// Severity of the comparison as a whole, judged on `mismatch` alone.
    pub fn overall_severity(&self, config: &DiffConfig) -> Severity {
        Severity::classify(self.mismatch, &config.mismatch_cuts)
    }

    pub fn has_changes(&self) -> bool {
        self.mismatch > 0.0 || !self.regions.is_empty()
    }
}

/// Compares two screenshots with the default configuration.
pub fn compare(before: &Image, after: &Image) -> Result<DiffResult, DiffError> {
    compare_with(before, after, &DiffConfig::default())
}

/// Decodes two encoded screenshots (PNG or anything `image` reads) and compares them.
pub fn compare_encoded(
    before: &[u8],
    after: &[u8],
    config: &DiffConfig,
) -> Result<DiffResult, DiffError> {
    let before = Image::decode_as(before, "before")?;
    let after = Image::decode_as(after, "after")?;
    compare_with(&before, &after, config)
}

/// Compares the overlapping `min(width) x min(height)` area of two images.
pub fn compare_with(
    before: &Image,
    after: &Image,
    config: &DiffConfig,
) -> Result<DiffResult, DiffError> {
    before.check_buffer("before")?;
    after.check_buffer("after")?;

    let width = before.width.min(after.width);
    let height = before.height.min(after.height);
    if width == 0 || height == 0 {
        return Err(DiffError::zero_area(width, height));
    }

    let span = tracing::debug_span!("compare", width, height);
    let _guard = span.enter();

    let stride = config.stride.max(1);
    let grid = match config.scan {
        ScanMode::Full => SampleGrid::scan(before, after, width, height, stride, config),
        ScanMode::CoarseToFine { factor } => SampleGrid::scan_coarse_to_fine(
            before,
            after,
            width,
            height,
            stride,
            factor.max(2),
            config,
        ),
    };

    let mut regions = extract_regions(&grid, config);
    let extracted = regions.len();
    if let Some(padding) = config.merge_padding {
        regions = merge_regions(regions, padding);
    }

    let mismatch = select_mismatch(before, after, &grid, config);
    tracing::debug!(
        changed = grid.changed_cells(),
        total = grid.total_cells(),
        extracted,
        merged = regions.len(),
        mismatch,
        "comparison done"
    );

    Ok(DiffResult {
        mismatch,
        regions,
        width,
        height,
        max_distance: grid.max_distance(),
    })
}

/// The configured primary method wins when it reports a non-zero value.
fn select_mismatch(before: &Image, after: &Image, grid: &SampleGrid, config: &DiffConfig) -> f64 {
    let strategy = config.mismatch;
    let primary = strategy
        .primary
        .map(|method| measure_mismatch(method, before, after, grid, config))
        .filter(|&value| value > 0.0);
    let value = match primary {
        Some(value) => value,
        None => measure_mismatch(strategy.fallback, before, after, grid, config),
    };
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn measure_mismatch(
    method: MismatchMethod,
    before: &Image,
    after: &Image,
    grid: &SampleGrid,
    config: &DiffConfig,
) -> f64 {
    match method {
        MismatchMethod::Sampled => grid.mismatch(),
        MismatchMethod::FullResolution => {
            full_resolution_mismatch(before, after, grid.width(), grid.height(), config)
        }
    }
}

/// Every pixel of the canvas, same threshold as the grid, no noise policy.
fn full_resolution_mismatch(
    before: &Image,
    after: &Image,
    width: u32,
    height: u32,
    config: &DiffConfig,
) -> f64 {
    let changed: u64 = (0..height)
        .into_par_iter()
        .map(|y| {
            (0..width)
                .filter(|&x| {
                    pixel_distance(before.pixel(x, y), after.pixel(x, y)) >= config.detect_threshold
                })
                .count() as u64
        })
        .sum();
    100.0 * changed as f64 / (width as f64 * height as f64)
}
