mod config_builder;

pub use config_builder::{load_config_file, parse_config, ConfigError};

use serde::{Deserialize, Serialize};

/// Two ordered cut points: values at or above `critical` are critical,
/// at or above `warning` are warnings, anything lower is minor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutPoints {
    pub critical: f64,
    pub warning: f64,
}

/// What to do with changed cells that stand alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoisePolicy {
    /// Keep every cell at or above the detection threshold.
    #[default]
    Off,
    /// Clear a changed cell when none of its 4-neighbours reaches `low_threshold`.
    IsolatedCells,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Sample every stride-th pixel of the whole canvas.
    #[default]
    Full,
    /// Sample at `stride * factor` first, then resample only the tiles
    /// around coarse hits at full stride.
    CoarseToFine { factor: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchMethod {
    /// Changed cells over sampled cells.
    Sampled,
    /// Changed pixels over all pixels, every pixel evaluated.
    ///
    /// Ignores [`NoisePolicy`]: a speck the policy clears from the grid is
    /// still counted here. Use `Sampled` as the only method when the policy
    /// should drive the percentage too.
    FullResolution,
}

/// Global mismatch selection: `primary` wins when it is configured and
/// reports a non-zero value, otherwise `fallback` is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MismatchStrategy {
    pub primary: Option<MismatchMethod>,
    pub fallback: MismatchMethod,
}

impl Default for MismatchStrategy {
    fn default() -> Self {
        MismatchStrategy {
            primary: Some(MismatchMethod::FullResolution),
            fallback: MismatchMethod::Sampled,
        }
    }
}

/// Every tunable of the diff engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Sampling interval in pixels, in both axes.
    pub stride: u32,
    /// ΔE at or above which a sampled cell counts as changed.
    pub detect_threshold: f64,
    /// Near-imperceptible ΔE; only consulted by `NoisePolicy::IsolatedCells`.
    pub low_threshold: f64,
    /// Regions smaller than this many pixels are dropped.
    pub min_region_area: u64,
    pub max_regions: Option<usize>,
    pub merge_padding: Option<u32>,
    /// Per-region severity, on the region's max ΔE.
    pub region_cuts: CutPoints,
    /// Overall severity, on the mismatch percentage.
    pub mismatch_cuts: CutPoints,
    pub noise: NoisePolicy,
    pub scan: ScanMode,
    pub mismatch: MismatchStrategy,
}

impl Default for DiffConfig {
    fn default() -> Self {
        DiffConfig {
            stride: 2,
            detect_threshold: 4.5,
            low_threshold: 2.2,
            min_region_area: 20 * 20,
            max_regions: Some(50),
            merge_padding: Some(4),
            region_cuts: CutPoints {
                critical: 28.0,
                warning: 12.0,
            },
            mismatch_cuts: CutPoints {
                critical: 35.0,
                warning: 15.0,
            },
            noise: NoisePolicy::Off,
            scan: ScanMode::Full,
            mismatch: MismatchStrategy::default(),
        }
    }
}
