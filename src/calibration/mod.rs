//! Layout calibration.
//!
//! Discovers the pixel rectangle of every board cell from exact-color masks,
//! and persists that geometry per screen resolution and board size so the
//! online path only needs a lookup.

pub mod bounds;
pub mod generate;
pub mod preset;

pub use bounds::{find_cell_bounds, resolve_stat, AcceptAll, RegionClassifier, SkipLeading};
pub use generate::generate_preset;
pub use preset::{JsonPresetStore, Preset, PresetData, PresetStore};

use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::FatalError;
use crate::vision::Region;

/// Screen resolution, keyed as `"<height>x<width>"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct Resolution {
    pub height: u32,
    pub width: u32,
}

impl Resolution {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    pub fn of(img: &RgbImage) -> Self {
        Self::new(img.height(), img.width())
    }

    pub fn key(&self) -> String {
        format!("{}x{}", self.height, self.width)
    }
}

impl From<[u32; 2]> for Resolution {
    fn from([height, width]: [u32; 2]) -> Self {
        Self::new(height, width)
    }
}

impl From<Resolution> for [u32; 2] {
    fn from(r: Resolution) -> Self {
        [r.height, r.width]
    }
}

/// Board size key, `"<size>x<size>"`.
pub fn size_key(size: usize) -> String {
    format!("{}x{}", size, size)
}

/// Resolved pixel ranges of every row and column of one board.
///
/// Each range is inclusive `(lo, hi)`. Ranges are increasing and do not
/// overlap, and both sequences have one entry per board line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellBounds {
    pub row_bounds: Vec<(u32, u32)>,
    pub col_bounds: Vec<(u32, u32)>,
}

impl CellBounds {
    pub fn size(&self) -> usize {
        self.row_bounds.len()
    }

    /// Pixel rectangle of the cell at row `r`, column `c`.
    pub fn cell_rect(&self, r: usize, c: usize) -> Region {
        let (row_lo, row_hi) = self.row_bounds[r];
        let (col_lo, col_hi) = self.col_bounds[c];
        Region {
            x: col_lo,
            y: row_lo,
            w: col_hi - col_lo + 1,
            h: row_hi - row_lo + 1,
        }
    }

    /// Rounded center `(x, y)` of a cell, where a tap should land.
    pub fn center(&self, r: usize, c: usize) -> (u32, u32) {
        let (row_lo, row_hi) = self.row_bounds[r];
        let (col_lo, col_hi) = self.col_bounds[c];
        let mid = |lo: u32, hi: u32| ((lo + hi) as f64 / 2.0).round() as u32;
        (mid(col_lo, col_hi), mid(row_lo, row_hi))
    }

    /// Widths of every column, in column order.
    pub fn column_widths(&self) -> impl Iterator<Item = u32> + '_ {
        self.col_bounds.iter().map(|&(lo, hi)| hi - lo + 1)
    }

    /// Fails with [`FatalError::InvalidCellBounds`] unless both axes hold
    /// `size` inclusive ranges that increase without overlapping.
    ///
    /// Every other method indexes and subtracts on the assumption that this
    /// holds.
    pub fn validate(&self, resolution: &str, size: usize) -> Result<()> {
        let reason = if size == 0 {
            Some("a board needs at least one line".to_string())
        } else {
            axis_problem("row", &self.row_bounds, size)
                .or_else(|| axis_problem("column", &self.col_bounds, size))
        };

        match reason {
            Some(reason) => Err(FatalError::InvalidCellBounds {
                resolution: resolution.to_string(),
                size,
                reason,
            }
            .into()),
            None => Ok(()),
        }
    }
}

fn axis_problem(axis: &str, ranges: &[(u32, u32)], size: usize) -> Option<String> {
    if ranges.len() != size {
        return Some(format!("{} {} ranges", ranges.len(), axis));
    }
    for (i, &(lo, hi)) in ranges.iter().enumerate() {
        if lo > hi {
            return Some(format!("{} {} is reversed ({}, {})", axis, i, lo, hi));
        }
        if i > 0 && ranges[i - 1].1 >= lo {
            return Some(format!("{} {} overlaps the previous one", axis, i));
        }
    }
    None
}
