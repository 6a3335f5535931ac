//! Pixel-level building blocks shared by calibration and digit recognition.
//!
//! This module provides:
//! - Exact-color masks, bounding rectangles, cropping and padding
//! - Connected-component extraction by flood fill
//! - Width-locked template matching with zero-mean normalized cross-correlation

pub mod components;
pub mod mask;
pub mod matcher;

pub use components::{ComponentExtractor, ScanOrder};
pub use mask::{bounding_rect, crop, exact_color_mask, pad};
pub use matcher::TemplateMatcher;

/// An axis-aligned rectangle in pixel coordinates.
///
/// Every region handed out by this crate has `w > 0` and `h > 0`; an empty
/// result is expressed as `Option::None` instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Region {
    /// Last column covered by the region (inclusive).
    pub fn right(&self) -> u32 {
        self.x + self.w - 1
    }

    /// Last row covered by the region (inclusive).
    pub fn bottom(&self) -> u32 {
        self.y + self.h - 1
    }
}
