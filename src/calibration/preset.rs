//! Preset repository: cell geometry per screen resolution and board size.
//!
//! Schema of the calibration store:
//! ```text
//! {"2880x1440": {"16x16": {"row_bounds": [[lo, hi], ...], "col_bounds": [[lo, hi], ...]}}}
//! ```
//! Every `register` rewrites the whole store before returning.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::bounds::RegionClassifier;
use super::{size_key, CellBounds, Resolution};
use crate::error::FatalError;
use crate::vision::{exact_color_mask, ComponentExtractor, ScanOrder};

/// Resolution key -> size key -> geometry.
pub type PresetData = BTreeMap<String, BTreeMap<String, CellBounds>>;

/// Stable storage behind a [`Preset`].
pub trait PresetStore {
    /// Returns an empty map when nothing has been stored yet.
    fn load(&self) -> Result<PresetData>;
    fn save(&self, data: &PresetData) -> Result<()>;
}

/// Stores the preset as one compact JSON file.
pub struct JsonPresetStore {
    path: PathBuf,
}

impl JsonPresetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PresetStore for JsonPresetStore {
    fn load(&self) -> Result<PresetData> {
        if !self.path.exists() {
            return Ok(PresetData::new());
        }
        crate::log(&format!("Loading preset from {}", self.path.display()));
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read preset: {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse preset: {}", self.path.display()))
    }

    fn save(&self, data: &PresetData) -> Result<()> {
        crate::log(&format!("Saving preset to {}", self.path.display()));
        let json = serde_json::to_string(data).context("Failed to serialize preset")?;
        write_atomically(&self.path, json.as_bytes())
    }
}

/// Writes `bytes` to a temporary file next to `path`, then renames it over
/// `path`, so a reader never observes a partially written file.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir).context("Failed to create temporary file")?;
    tmp.write_all(bytes).context("Failed to write temporary file")?;
    tmp.persist(path)
        .map_err(|e| anyhow!("Failed to replace {}: {}", path.display(), e.error))?;
    Ok(())
}

/// In-memory view of the calibration store with write-through mutation.
pub struct Preset<S: PresetStore> {
    store: S,
    data: PresetData,
}

impl<S: PresetStore> Preset<S> {
    /// Loads and validates every stored entry; a malformed entry is fatal.
    pub fn load(store: S) -> Result<Self> {
        let data = store.load()?;
        for (resolution, mapping) in &data {
            validate_mapping(resolution, mapping)?;
        }
        crate::log(&format!("Preset has {} resolution(s)", data.len()));
        Ok(Self { store, data })
    }

    /// Inserts or replaces the whole entry for `resolution` and persists.
    pub fn register(
        &mut self,
        resolution: Resolution,
        mapping: BTreeMap<String, CellBounds>,
    ) -> Result<()> {
        validate_mapping(&resolution.key(), &mapping)?;
        self.data.insert(resolution.key(), mapping);
        self.store.save(&self.data)
    }

    pub fn get(&self, resolution: Resolution) -> Option<&BTreeMap<String, CellBounds>> {
        self.data.get(&resolution.key())
    }

    fn entry(&self, resolution: Resolution) -> Result<&BTreeMap<String, CellBounds>> {
        self.get(resolution).ok_or_else(|| {
            FatalError::MissingPreset {
                resolution: resolution.key(),
                size: None,
            }
            .into()
        })
    }

    /// Geometry of one board size; a missing entry is fatal.
    pub fn cell_bounds(&self, size: usize, resolution: Resolution) -> Result<&CellBounds> {
        self.entry(resolution)?.get(&size_key(size)).ok_or_else(|| {
            FatalError::MissingPreset {
                resolution: resolution.key(),
                size: Some(size),
            }
            .into()
        })
    }

    /// Maps the side length of a blank cell to the board size it implies.
    ///
    /// Every distinct column width of a size maps to that size. Two sizes
    /// claiming the same width is fatal.
    pub fn side_length_map(&self, resolution: Resolution) -> Result<BTreeMap<u32, usize>> {
        let mut map = BTreeMap::new();

        for (key, bounds) in self.entry(resolution)? {
            let size = parse_size_key(key)?;
            for side in bounds.column_widths() {
                match map.insert(side, size) {
                    Some(first) if first != size => {
                        return Err(FatalError::DuplicateSideLength {
                            side,
                            first,
                            second: size,
                        }
                        .into());
                    }
                    _ => {}
                }
            }
        }

        Ok(map)
    }

    /// Infers the board size from the width of one blank cell.
    ///
    /// Regions are scanned in reverse row-major order so the first candidate
    /// is the bottom-right cell of the board rather than a same-colored
    /// decoration above it; `classifier` may reject further regions.
    /// `None` means this frame cannot be calibrated.
    pub fn find_board_size(
        &self,
        img: &RgbImage,
        resolution: Resolution,
        blank_color: [u8; 3],
        classifier: &mut impl RegionClassifier,
    ) -> Result<Option<usize>> {
        let side_map = self.side_length_map(resolution)?;
        let mask = exact_color_mask(img, blank_color);

        let region = ComponentExtractor::new(mask, ScanOrder::Reverse)
            .enumerate()
            .find(|(index, region)| classifier.is_grid_cell(*index, region))
            .map(|(_, region)| region);

        let Some(region) = region else {
            crate::log("No blank cell found");
            return Ok(None);
        };

        let size = side_map.get(&region.w).copied();
        match size {
            Some(size) => crate::log(&format!(
                "Blank cell width {} -> board size {}x{}",
                region.w, size, size
            )),
            None => crate::log(&format!("Blank cell width {} matches no size", region.w)),
        }
        Ok(size)
    }
}

fn validate_mapping(resolution: &str, mapping: &BTreeMap<String, CellBounds>) -> Result<()> {
    for (key, bounds) in mapping {
        bounds.validate(resolution, parse_size_key(key)?)?;
    }
    Ok(())
}

fn parse_size_key(key: &str) -> Result<usize> {
    key.split('x')
        .next()
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| anyhow!("Malformed size key in preset: {}", key))
}
