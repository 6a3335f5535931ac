//! Offline preset generation.
//!
//! Run once per target resolution: every configured board size needs one
//! calibration screenshot `samples/<h>x<w>/sample-<n>x<n>.png` showing an
//! unplayed board. Most of the cost of recognition is the flood fill over the
//! blank-cell mask, which is why its result is stored rather than recomputed.

use anyhow::{Context, Result};
use std::collections::BTreeMap;

use super::bounds::{find_cell_bounds, SkipLeading};
use super::{size_key, CellBounds, Resolution};
use crate::config::Config;
use crate::error::FatalError;
use crate::paths;

/// Computes the cell geometry of every configured size at `resolution`.
pub fn generate_preset(
    config: &Config,
    resolution: Resolution,
) -> Result<BTreeMap<String, CellBounds>> {
    let mut mapping = BTreeMap::new();

    for &size in &config.puzzle_sizes {
        crate::log(&format!("Processing {}x{} ...", size, size));

        let path = paths::calibration_sample_path(&config.data_dir, resolution, size);
        let img = image::open(&path)
            .with_context(|| format!("Failed to load calibration sample: {}", path.display()))?
            .to_rgb8();

        let actual = Resolution::of(&img);
        if actual != resolution {
            return Err(FatalError::ScreenshotDimensionMismatch {
                expected: resolution.key(),
                actual: actual.key(),
            }
            .into());
        }

        let bounds = find_cell_bounds(
            &img,
            config.colors.cell_blank,
            Some(size),
            &mut SkipLeading(1),
            config.cluster_gap,
        )
        .with_context(|| format!("Calibration failed for {}", path.display()))?;

        mapping.insert(size_key(size), bounds);
    }

    Ok(mapping)
}
