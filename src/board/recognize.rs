//! Screenshot to board description.

use anyhow::{Context, Result};
use image::RgbImage;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use super::description::{BoardDescription, Cell};
use super::extract::{crop_digit_cell, digit_cells, digit_mask, has_tree, ClueAxis};
use crate::calibration::{AcceptAll, CellBounds, Preset, PresetStore, Resolution};
use crate::config::Config;
use crate::digits::{DigitClassifier, SampleStore, StoreQuota};

/// Result of reading one screenshot.
#[derive(Debug)]
pub enum Recognition {
    /// No blank cell matched a known side length.
    UnknownSize,
    /// Some clue could not be read reliably. Each doubtful glyph was saved
    /// as a provisional sample while the quota allowed.
    NotConfident { issues: Vec<String>, saved: usize },
    Board {
        description: BoardDescription,
        bounds: CellBounds,
    },
}

/// Reads the board in `img`.
///
/// A resolution missing from the preset is fatal; an unknown board size is
/// reported as [`Recognition::UnknownSize`].
pub fn recognize<P: PresetStore, S: SampleStore>(
    img: &RgbImage,
    preset: &Preset<P>,
    classifier: &mut DigitClassifier<S>,
    config: &Config,
    quota: &mut StoreQuota,
) -> Result<Recognition> {
    let resolution = Resolution::of(img);
    let colors = &config.colors;

    let Some(size) = preset.find_board_size(img, resolution, colors.cell_blank, &mut AcceptAll)? else {
        return Ok(Recognition::UnknownSize);
    };
    crate::log(&format!("Board size: {}x{}", size, size));
    let bounds = preset.cell_bounds(size, resolution)?.clone();

    let cells = (0..size)
        .map(|r| {
            (0..size)
                .map(|c| {
                    if has_tree(img, &bounds.cell_rect(r, c), colors.tree_shade) {
                        Cell::Tree
                    } else {
                        Cell::Unknown
                    }
                })
                .collect()
        })
        .collect();

    let mut row_clues = vec![String::new(); size];
    let mut col_clues = vec![String::new(); size];
    let mut issues = Vec::new();
    let mut saved = 0;

    for digit in digit_cells(&bounds) {
        let (label, slot) = match digit.axis {
            ClueAxis::Row => ("Row", &mut row_clues[digit.index]),
            ClueAxis::Column => ("Col", &mut col_clues[digit.index]),
        };

        let mask = digit_mask(img, &digit.region, colors.digit_unsatisfied);
        let Some(cropped) = crop_digit_cell(&mask) else {
            // Zero clues are drawn satisfied from the start; a nonzero one
            // turns satisfied once its tents are placed and keeps its value.
            let satisfied = digit_mask(img, &digit.region, colors.digit_satisfied);
            match classifier.classify(&satisfied)? {
                Some(c) if c.is_confident() => {
                    crate::log(&format!("{} {}: satisfied clue {}", label, digit.index, c.tag));
                    *slot = c.tag;
                }
                Some(c) => {
                    let issue = format!(
                        "{} {}: satisfied clue {} competes within {:.4}",
                        label,
                        digit.index,
                        c.tag,
                        c.competing.unwrap_or_default()
                    );
                    crate::log(&format!("Warning: {}", issue));
                    issues.push(issue);
                }
                None => *slot = "0".to_string(),
            }
            continue;
        };

        let issue = match classifier.classify(&mask)? {
            Some(c) if c.is_confident() => {
                *slot = c.tag;
                continue;
            }
            Some(c) => format!(
                "{} {}: {} competes within {:.4}",
                label,
                digit.index,
                c.tag,
                c.competing.unwrap_or_default()
            ),
            None => format!("{} {}: no match above threshold", label, digit.index),
        };
        crate::log(&format!("Warning: {}", issue));
        issues.push(issue);

        if quota.try_take() {
            let guess = classifier.best_guess(&mask).map(|(tag, _)| tag);
            classifier.save_provisional(&cropped, guess.as_deref())?;
            saved += 1;
        }
    }

    if !issues.is_empty() {
        return Ok(Recognition::NotConfident { issues, saved });
    }

    Ok(Recognition::Board {
        description: BoardDescription {
            cells,
            row_clues,
            col_clues,
        },
        bounds,
    })
}

/// Appends a `# <uuid>` header and the description to the puzzle-record file.
pub fn append_record(path: &Path, description: &BoardDescription) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open puzzle records: {}", path.display()))?;
    write!(file, "# {}\n{}", uuid::Uuid::new_v4(), description)
        .with_context(|| format!("Failed to write puzzle records: {}", path.display()))?;
    crate::log(&format!("Recorded to {}", path.display()));
    Ok(())
}
