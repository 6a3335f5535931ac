//! Statistical resolution of grid lines from noisy cell edges.
//!
//! Edge coordinates of nominally aligned cells jitter by a few pixels. Every
//! cell contributes its top/left (begin) and bottom/right (end) edge to a
//! histogram; nearby coordinates are clustered and each cluster is reduced to
//! its occurrence-weighted mean.

use anyhow::Result;
use image::RgbImage;
use std::collections::BTreeMap;

use super::{CellBounds, Resolution};
use crate::error::FatalError;
use crate::vision::{exact_color_mask, ComponentExtractor, Region, ScanOrder};

/// Decides which same-colored regions are board cells.
///
/// `index` is the position of the region in scan order.
pub trait RegionClassifier {
    fn is_grid_cell(&mut self, index: usize, region: &Region) -> bool;
}

impl<F: FnMut(usize, &Region) -> bool> RegionClassifier for F {
    fn is_grid_cell(&mut self, index: usize, region: &Region) -> bool {
        self(index, region)
    }
}

/// Rejects the first `n` regions in scan order.
///
/// On the reference layout the first blank-colored region in forward order is
/// the difficulty box in the top corner, not a cell.
#[derive(Clone, Copy, Debug)]
pub struct SkipLeading(pub usize);

impl RegionClassifier for SkipLeading {
    fn is_grid_cell(&mut self, index: usize, _region: &Region) -> bool {
        index >= self.0
    }
}

/// Accepts every region.
#[derive(Clone, Copy, Debug)]
pub struct AcceptAll;

impl RegionClassifier for AcceptAll {
    fn is_grid_cell(&mut self, _index: usize, _region: &Region) -> bool {
        true
    }
}

/// Clusters a coordinate histogram into one coordinate per grid line.
///
/// Coordinates are visited in ascending order; a gap of at least `gap` from
/// the previous coordinate starts a new cluster. Each cluster resolves to
/// `round(Σ coord·count / Σ count)`. When `expected` is given the number of
/// clusters must match it exactly.
pub fn resolve_stat(
    histogram: &BTreeMap<u32, u32>,
    expected: Option<usize>,
    gap: u32,
) -> Result<Vec<u32>> {
    let mut clusters: Vec<Vec<(u32, u32)>> = Vec::new();
    let mut prev: Option<u32> = None;

    for (&coord, &count) in histogram {
        match (prev, clusters.last_mut()) {
            (Some(p), Some(current)) if coord - p < gap => current.push((coord, count)),
            _ => clusters.push(vec![(coord, count)]),
        }
        prev = Some(coord);
    }

    if let Some(expected) = expected {
        if clusters.len() != expected {
            return Err(FatalError::ClusterCountMismatch {
                expected,
                actual: clusters.len(),
            }
            .into());
        }
    }

    Ok(clusters
        .iter()
        .map(|cluster| {
            let numer: f64 = cluster.iter().map(|&(k, v)| k as f64 * v as f64).sum();
            let denom: f64 = cluster.iter().map(|&(_, v)| v as f64).sum();
            (numer / denom).round() as u32
        })
        .collect())
}

#[derive(Default)]
struct EdgeStats {
    begins: BTreeMap<u32, u32>,
    ends: BTreeMap<u32, u32>,
}

impl EdgeStats {
    fn add(&mut self, begin: u32, end: u32) {
        *self.begins.entry(begin).or_insert(0) += 1;
        *self.ends.entry(end).or_insert(0) += 1;
    }

    fn resolve(&self, expected: Option<usize>, gap: u32) -> Result<Vec<(u32, u32)>> {
        let begins = resolve_stat(&self.begins, expected, gap)?;
        let ends = resolve_stat(&self.ends, expected, gap)?;
        if begins.len() != ends.len() {
            return Err(FatalError::BoundCountMismatch {
                begins: begins.len(),
                ends: ends.len(),
            }
            .into());
        }
        Ok(begins.into_iter().zip(ends).collect())
    }
}

/// Resolves the cell geometry of a board screenshot.
///
/// Every region of `blank_color` accepted by `classifier` is treated as one
/// cell. `expected_size`, when known, is enforced on both axes; without it
/// the two axes must at least agree with each other.
pub fn find_cell_bounds(
    img: &RgbImage,
    blank_color: [u8; 3],
    expected_size: Option<usize>,
    classifier: &mut impl RegionClassifier,
    gap: u32,
) -> Result<CellBounds> {
    let mask = exact_color_mask(img, blank_color);

    let mut rows = EdgeStats::default();
    let mut cols = EdgeStats::default();
    let mut accepted = 0usize;

    for (index, region) in ComponentExtractor::new(mask, ScanOrder::Forward).enumerate() {
        if !classifier.is_grid_cell(index, &region) {
            continue;
        }
        rows.add(region.y, region.bottom());
        cols.add(region.x, region.right());
        accepted += 1;
    }

    crate::log(&format!("Collected edges from {} cell regions", accepted));

    let row_bounds = rows.resolve(expected_size, gap)?;
    let col_bounds = cols.resolve(expected_size, gap)?;

    if row_bounds.len() != col_bounds.len() {
        return Err(FatalError::AxisCountMismatch {
            rows: row_bounds.len(),
            cols: col_bounds.len(),
        }
        .into());
    }

    let bounds = CellBounds {
        row_bounds,
        col_bounds,
    };
    bounds.validate(&Resolution::of(img).key(), bounds.size())?;
    Ok(bounds)
}
