//! Configuration types for recognition.
//!
//! Loaded from config.json at startup and passed explicitly to every
//! component that needs it. Provides the data directory, matching thresholds,
//! and the exact colors the game paints cells and clues with.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calibration::Resolution;

/// Exact RGB colors used by the game.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Color of a blank (empty) board cell
    pub cell_blank: [u8; 3],
    /// A sample color of the shade on a tree
    pub tree_shade: [u8; 3],
    /// An unsatisfied clue digit
    pub digit_unsatisfied: [u8; 3],
    /// A satisfied clue digit
    pub digit_satisfied: [u8; 3],
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            cell_blank: [0x34, 0x31, 0x31],
            tree_shade: [0x87, 0xc8, 0x55],
            digit_unsatisfied: [0x7e, 0x4e, 0x41],
            digit_satisfied: [0xc8, 0xa7, 0x97],
        }
    }
}

/// Complete recognizer configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root for preset.json, digits/ and samples/
    pub data_dir: PathBuf,
    /// Minimum match score for a glyph to be recognized.
    ///
    /// On the reference corpus the worst in-tag match was ~0.66 and the best
    /// cross-tag match ~0.76; 0.85 sits above every cross-tag match.
    /// Rerun `analyze` after the corpus grows to re-derive it.
    pub recognition_threshold: f64,
    /// Minimum match score for a glyph to be considered already covered by
    /// the corpus, both when collecting and when retiring provisional samples.
    /// Stricter than recognition so retirement stays conservative.
    pub sampling_threshold: f64,
    /// Constant border added around a target before template matching
    pub match_padding: u32,
    /// Minimum gap (pixels) between two edge coordinates of different grid lines
    pub cluster_gap: u32,
    /// Maximum provisional samples written per invocation
    pub store_quota: usize,
    /// Board sizes a preset is generated for
    pub puzzle_sizes: Vec<usize>,
    /// Resolution calibration screenshots are taken at
    pub reference_resolution: Resolution,
    pub colors: ColorConfig,
    /// External solver; falls back to TENTS_DEMO_BIN
    pub solver_bin: Option<PathBuf>,
    /// Append-only record of recognized puzzles; falls back to PUZZLE_RECORDS
    pub puzzle_records: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: crate::paths::default_data_dir(),
            recognition_threshold: 0.85,
            sampling_threshold: 0.9,
            match_padding: 5,
            cluster_gap: 3,
            store_quota: 100,
            puzzle_sizes: (5..=22).collect(),
            reference_resolution: Resolution::new(2880, 1440),
            colors: ColorConfig::default(),
            solver_bin: None,
            puzzle_records: None,
        }
    }
}

impl Config {
    /// Loads configuration from the given path or returns defaults.
    pub fn load(config_path: &Path) -> Self {
        crate::log(&format!("Looking for config at: {}", config_path.display()));

        if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(config) => {
                        crate::log("Config loaded");
                        return config;
                    }
                    Err(e) => {
                        crate::log(&format!(
                            "Failed to parse {}: {}. Using defaults.",
                            config_path.display(),
                            e
                        ));
                    }
                },
                Err(e) => {
                    crate::log(&format!(
                        "Failed to read {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    ));
                }
            }
        } else {
            crate::log("Config not found. Using defaults.");
        }

        Self::default()
    }

    pub fn solver_bin(&self) -> Option<PathBuf> {
        self.solver_bin
            .clone()
            .or_else(|| std::env::var_os("TENTS_DEMO_BIN").map(PathBuf::from))
    }

    pub fn puzzle_records(&self) -> Option<PathBuf> {
        self.puzzle_records
            .clone()
            .or_else(|| std::env::var_os("PUZZLE_RECORDS").map(PathBuf::from))
    }
}
