//! Provisional sample capture.
//!
//! Glyphs the corpus does not cover yet are stored as `UNTAGGED` samples for
//! later manual tagging. A per-run quota bounds how many files one run may
//! write.

use anyhow::Result;
use image::{GrayImage, RgbImage};

use super::classifier::DigitClassifier;
use super::store::SampleStore;
use crate::board::extract::{crop_digit_cell, digit_cells, digit_mask};
use crate::calibration::{AcceptAll, Preset, PresetStore, Resolution};
use crate::config::Config;

/// Remaining number of provisional samples this run may write.
#[derive(Clone, Copy, Debug)]
pub struct StoreQuota {
    remaining: usize,
}

impl StoreQuota {
    pub fn new(limit: usize) -> Self {
        Self { remaining: limit }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Consumes one unit; `false` once exhausted.
    pub fn try_take(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub visited: usize,
    pub covered: usize,
    pub saved: usize,
    pub skipped: usize,
}

impl CollectStats {
    fn merge(&mut self, other: CollectStats) {
        self.visited += other.visited;
        self.covered += other.covered;
        self.saved += other.saved;
        self.skipped += other.skipped;
    }
}

/// A digit glyph candidate: the uncropped cell mask used for matching and
/// the tight crop that gets stored.
pub struct GlyphCandidate {
    pub cell: GrayImage,
    pub cropped: GrayImage,
}

/// Stores every candidate the corpus does not cover, while the quota lasts.
/// With `dry_run` nothing is written but the quota is still consumed.
pub fn collect_provisional<S: SampleStore>(
    classifier: &mut DigitClassifier<S>,
    glyphs: &[GlyphCandidate],
    quota: &mut StoreQuota,
    dry_run: bool,
) -> Result<CollectStats> {
    let mut stats = CollectStats::default();

    for glyph in glyphs {
        stats.visited += 1;
        if classifier.covers(&glyph.cell)? {
            stats.covered += 1;
            continue;
        }

        if !quota.try_take() {
            stats.skipped += 1;
            continue;
        }

        let guess = classifier.best_guess(&glyph.cell).map(|(tag, score)| {
            crate::log(&format!("New sample, best guess {} ({:.4})", tag, score));
            tag
        });
        if guess.is_none() {
            crate::log("New sample with no guess");
        }

        if dry_run {
            crate::log(&format!(
                "(Dry run) Would save a {}x{} sample",
                glyph.cropped.width(),
                glyph.cropped.height()
            ));
        } else {
            classifier.save_provisional(&glyph.cropped, guess.as_deref())?;
        }
        stats.saved += 1;
    }

    Ok(stats)
}

/// Digit candidates of one screenshot, or `None` when the board size is not
/// recognized. Clues without an unsatisfied-color digit are left out.
pub fn glyph_candidates<P: PresetStore>(
    img: &RgbImage,
    preset: &Preset<P>,
    config: &Config,
) -> Result<Option<Vec<GlyphCandidate>>> {
    let resolution = Resolution::of(img);
    let Some(size) = preset.find_board_size(img, resolution, config.colors.cell_blank, &mut AcceptAll)?
    else {
        return Ok(None);
    };
    let bounds = preset.cell_bounds(size, resolution)?;

    let candidates = digit_cells(bounds)
        .iter()
        .filter_map(|digit| {
            let cell = digit_mask(img, &digit.region, config.colors.digit_unsatisfied);
            crop_digit_cell(&cell).map(|cropped| GlyphCandidate { cell, cropped })
        })
        .collect();
    Ok(Some(candidates))
}

/// Runs provisional capture over screenshots until the quota runs out.
pub fn collect_from_screenshots<P: PresetStore, S: SampleStore>(
    screenshots: &[(String, RgbImage)],
    preset: &Preset<P>,
    classifier: &mut DigitClassifier<S>,
    config: &Config,
    quota: &mut StoreQuota,
    dry_run: bool,
) -> Result<CollectStats> {
    let mut stats = CollectStats::default();

    for (name, img) in screenshots {
        if quota.is_exhausted() {
            break;
        }
        crate::log(&format!("Processing {} ...", name));

        let Some(glyphs) = glyph_candidates(img, preset, config)? else {
            crate::log(&format!("Board size of {} not recognized, skipping", name));
            continue;
        };
        stats.merge(collect_provisional(classifier, &glyphs, quota, dry_run)?);
    }

    crate::log(&format!(
        "Visited {} glyph(s), {} covered, {} saved, {} skipped; quota left {}",
        stats.visited,
        stats.covered,
        stats.saved,
        stats.skipped,
        quota.remaining()
    ));
    Ok(stats)
}
