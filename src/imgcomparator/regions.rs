use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::grid::SampleGrid;
use crate::config::{CutPoints, DiffConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[serde(alias = "low")]
    Minor,
    #[serde(alias = "medium")]
    Warning,
    #[serde(alias = "high")]
    Critical,
}

impl Severity {
    pub fn classify(value: f64, cuts: &CutPoints) -> Severity {
        if value >= cuts.critical {
            Severity::Critical
        } else if value >= cuts.warning {
            Severity::Warning
        } else {
            Severity::Minor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Bounding box of a group of adjacent changed cells, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangedRegion {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub level: Severity,
    pub max_distance: f64,
}

impl ChangedRegion {
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    /// True when the two boxes overlap or are at most `padding` pixels apart.
    pub fn is_near(&self, other: &ChangedRegion, padding: u32) -> bool {
        self.x <= other.right().saturating_add(padding)
            && other.x <= self.right().saturating_add(padding)
            && self.y <= other.bottom().saturating_add(padding)
            && other.y <= self.bottom().saturating_add(padding)
    }

    fn union(&self, other: &ChangedRegion) -> ChangedRegion {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        ChangedRegion {
            x,
            y,
            w: self.right().max(other.right()) - x,
            h: self.bottom().max(other.bottom()) - y,
            level: self.level.max(other.level),
            max_distance: self.max_distance.max(other.max_distance),
        }
    }
}

struct Component {
    min_row: usize,
    max_row: usize,
    min_col: usize,
    max_col: usize,
    max_distance: f64,
}

/// 4-connected flood fill from `(row, col)`; marks every reached cell visited.
fn flood_fill(grid: &SampleGrid, visited: &mut [bool], row: usize, col: usize) -> Component {
    let cols = grid.cols();
    let mut component = Component {
        min_row: row,
        max_row: row,
        min_col: col,
        max_col: col,
        max_distance: 0.0,
    };
    let mut queue = VecDeque::new();
    visited[row * cols + col] = true;
    queue.push_back((row, col));

    while let Some((r, c)) = queue.pop_front() {
        component.min_row = component.min_row.min(r);
        component.max_row = component.max_row.max(r);
        component.min_col = component.min_col.min(c);
        component.max_col = component.max_col.max(c);
        component.max_distance = component.max_distance.max(grid.distance(r, c));

        let mut visit = |nr: usize, nc: usize| {
            let idx = nr * cols + nc;
            if !visited[idx] && grid.is_changed(nr, nc) {
                visited[idx] = true;
                queue.push_back((nr, nc));
            }
        };
        if r > 0 {
            visit(r - 1, c);
        }
        if r + 1 < grid.rows() {
            visit(r + 1, c);
        }
        if c > 0 {
            visit(r, c - 1);
        }
        if c + 1 < cols {
            visit(r, c + 1);
        }
    }
    component
}

fn to_region(grid: &SampleGrid, component: &Component, cuts: &CutPoints) -> ChangedRegion {
    let stride = grid.stride();
    let x = component.min_col as u32 * stride;
    let y = component.min_row as u32 * stride;
    // the last cell of a row or column may hang past the canvas edge
    let right = ((component.max_col as u32 + 1) * stride).min(grid.width());
    let bottom = ((component.max_row as u32 + 1) * stride).min(grid.height());
    ChangedRegion {
        x,
        y,
        w: right - x,
        h: bottom - y,
        level: Severity::classify(component.max_distance, cuts),
        max_distance: component.max_distance,
    }
}

/// Groups changed cells into regions in row-major discovery order.
///
/// Regions under `min_region_area` are dropped, and extraction stops once
/// `max_regions` regions were emitted.
pub fn extract_regions(grid: &SampleGrid, config: &DiffConfig) -> Vec<ChangedRegion> {
    let mut regions = Vec::new();
    let mut visited = vec![false; grid.total_cells()];

    'scan: for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            if visited[row * grid.cols() + col] || !grid.is_changed(row, col) {
                continue;
            }
            let component = flood_fill(grid, &mut visited, row, col);
            let region = to_region(grid, &component, &config.region_cuts);
            if region.area() < config.min_region_area {
                continue;
            }
            if config.max_regions.is_some_and(|cap| regions.len() >= cap) {
                tracing::debug!(cap = regions.len(), "region cap reached");
                break 'scan;
            }
            regions.push(region);
        }
    }
    regions
}

/// Repeatedly merges regions lying within `padding` pixels of each other
/// until no pair is left to merge. The merged box keeps the slot of the
/// earlier region.
pub fn merge_regions(mut regions: Vec<ChangedRegion>, padding: u32) -> Vec<ChangedRegion> {
    loop {
        let mut pair = None;
        'search: for i in 0..regions.len() {
            for j in (i + 1)..regions.len() {
                if regions[i].is_near(&regions[j], padding) {
                    pair = Some((i, j));
                    break 'search;
                }
            }
        }
        let Some((i, j)) = pair else {
            return regions;
        };
        let absorbed = regions.remove(j);
        regions[i] = regions[i].union(&absorbed);
    }
}
