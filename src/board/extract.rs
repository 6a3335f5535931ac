//! Cutting a screenshot into clue digits and grid cells.

use image::{GrayImage, RgbImage};

use crate::calibration::CellBounds;
use crate::vision::{bounding_rect, crop, exact_color_mask, Region};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClueAxis {
    Row,
    Column,
}

/// Where the clue digit for one row or column is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DigitCell {
    pub axis: ClueAxis,
    pub index: usize,
    pub region: Region,
}

/// Clue cells for every row, then every column.
///
/// A row clue occupies the slot one grid step left of column 0, a column
/// clue the slot one grid step above row 0, each with the size of the
/// neighbouring grid cell.
pub fn digit_cells(bounds: &CellBounds) -> Vec<DigitCell> {
    let (Some(&first_col), Some(&first_row)) = (bounds.col_bounds.first(), bounds.row_bounds.first())
    else {
        return Vec::new();
    };
    let col_pitch = pitch(&bounds.col_bounds);
    let row_pitch = pitch(&bounds.row_bounds);

    let rows = bounds.row_bounds.iter().enumerate().map(|(index, &(lo, hi))| DigitCell {
        axis: ClueAxis::Row,
        index,
        region: Region {
            x: first_col.0.saturating_sub(col_pitch),
            y: lo,
            w: first_col.1 - first_col.0 + 1,
            h: hi - lo + 1,
        },
    });
    let cols = bounds.col_bounds.iter().enumerate().map(|(index, &(lo, hi))| DigitCell {
        axis: ClueAxis::Column,
        index,
        region: Region {
            x: lo,
            y: first_row.0.saturating_sub(row_pitch),
            w: hi - lo + 1,
            h: first_row.1 - first_row.0 + 1,
        },
    });

    rows.chain(cols).collect()
}

/// Distance between the starts of the first two cells, or the first cell's
/// extent for a single-cell axis.
fn pitch(axis: &[(u32, u32)]) -> u32 {
    match axis {
        [a, b, ..] => b.0 - a.0,
        [a] => a.1 - a.0 + 1,
        [] => 0,
    }
}

/// Mask of `digit_color` pixels in one screenshot region.
pub fn digit_mask(img: &RgbImage, region: &Region, digit_color: [u8; 3]) -> GrayImage {
    exact_color_mask(&crop(img, region), digit_color)
}

/// Tight crop of the digit in `mask`. `None` means the cell shows no digit
/// in the matched color, which on an unplayed board means the clue is 0.
pub fn crop_digit_cell(mask: &GrayImage) -> Option<GrayImage> {
    bounding_rect(mask).map(|rect| crop(mask, &rect))
}

/// Whether any pixel of the cell has the tree shade.
pub fn has_tree(img: &RgbImage, region: &Region, tree_color: [u8; 3]) -> bool {
    bounding_rect(&exact_color_mask(&crop(img, region), tree_color)).is_some()
}
