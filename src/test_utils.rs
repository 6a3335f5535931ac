//! Synthetic screenshots for tests.
//!
//! Renders a board the way the game lays it out: a blank-colored decoration
//! box near the top, column clues above the first row, row clues left of the
//! first column, and square cells separated by a background-colored gap.

use anyhow::{anyhow, Result};
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::collections::HashMap;

use crate::calibration::{CellBounds, Resolution};
use crate::config::ColorConfig;
use crate::digits::{IndexEntry, SampleStore};
use crate::vision::{bounding_rect, crop, exact_color_mask};

pub const BLANK: [u8; 3] = [0x34, 0x31, 0x31];
pub const BACKGROUND: [u8; 3] = [0x10, 0x10, 0x10];

pub const WIDTH: u32 = 360;
pub const HEIGHT: u32 = 480;

const BOARD_SPAN: u32 = 270;
const GAP: u32 = 2;
const ORIGIN: (u32, u32) = (60, 130);

const FONT: [(&str, [&str; 5]); 10] = [
    ("0", ["###", "#.#", "#.#", "#.#", "###"]),
    ("1", [".#.", "##.", ".#.", ".#.", "###"]),
    ("2", ["###", "..#", "###", "#..", "###"]),
    ("3", ["###", "..#", ".##", "..#", "###"]),
    ("4", ["#.#", "#.#", "###", "..#", "..#"]),
    ("5", ["###", "#..", "###", "..#", "###"]),
    ("6", ["###", "#..", "###", "#.#", "###"]),
    ("7", ["###", "..#", ".#.", ".#.", ".#."]),
    ("8", ["###", "#.#", "###", "#.#", "###"]),
    ("9", ["###", "#.#", "###", "..#", "###"]),
];

pub fn resolution() -> Resolution {
    Resolution::new(HEIGHT, WIDTH)
}

/// Binary glyph of a single digit at `scale` pixels per font dot.
pub fn glyph(digit: &str, scale: u32) -> GrayImage {
    let rows = FONT
        .iter()
        .find(|(d, _)| *d == digit)
        .map(|(_, rows)| rows)
        .unwrap_or_else(|| panic!("no glyph for {}", digit));
    GrayImage::from_fn(3 * scale, 5 * scale, |x, y| {
        let on = rows[(y / scale) as usize].as_bytes()[(x / scale) as usize] == b'#';
        Luma([if on { 255 } else { 0 }])
    })
}

/// Layout of one synthetic board; cell side shrinks as the size grows.
pub struct BoardSpec {
    pub size: usize,
    pub cell: u32,
}

impl BoardSpec {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cell: BOARD_SPAN / size as u32 - GAP,
        }
    }

    pub fn glyph_scale(&self) -> u32 {
        self.cell / 7
    }

    fn lo(&self, i: usize, origin: u32) -> u32 {
        origin + i as u32 * (self.cell + GAP)
    }

    pub fn cell_bounds(&self) -> CellBounds {
        let axis = |origin: u32| {
            (0..self.size)
                .map(|i| (self.lo(i, origin), self.lo(i, origin) + self.cell - 1))
                .collect()
        };
        CellBounds {
            row_bounds: axis(ORIGIN.1),
            col_bounds: axis(ORIGIN.0),
        }
    }

    /// All cells blank, no clues.
    pub fn render_blank(&self) -> RgbImage {
        self.render(&[], &[], &[])
    }

    /// Renders trees (as a shaded square inside the cell) and clue digits.
    /// A `"0"` clue is drawn in the satisfied color, like the game does.
    pub fn render(&self, trees: &[(usize, usize)], row_digits: &[&str], col_digits: &[&str]) -> RgbImage {
        let colors = ColorConfig::default();
        let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb(BACKGROUND));

        // Difficulty box, top right.
        fill(&mut img, 300, 20, 40, 20, BLANK);

        let bounds = self.cell_bounds();
        for r in 0..self.size {
            for c in 0..self.size {
                let rect = bounds.cell_rect(r, c);
                fill(&mut img, rect.x, rect.y, rect.w, rect.h, BLANK);
                if trees.contains(&(r, c)) {
                    let inset = self.cell / 4;
                    fill(
                        &mut img,
                        rect.x + inset,
                        rect.y + inset,
                        rect.w - 2 * inset,
                        rect.h - 2 * inset,
                        colors.tree_shade,
                    );
                }
            }
        }

        let scale = self.glyph_scale();
        let offset_x = (self.cell - 3 * scale) / 2;
        let offset_y = (self.cell - 5 * scale) / 2;
        let color_for = |d: &str| {
            if d == "0" {
                colors.digit_satisfied
            } else {
                colors.digit_unsatisfied
            }
        };

        for (r, d) in row_digits.iter().enumerate() {
            let (row_lo, _) = bounds.row_bounds[r];
            let x = ORIGIN.0 - self.cell - GAP;
            stamp(&mut img, &glyph(d, scale), x + offset_x, row_lo + offset_y, color_for(d));
        }
        for (c, d) in col_digits.iter().enumerate() {
            let (col_lo, _) = bounds.col_bounds[c];
            let y = ORIGIN.1 - self.cell - GAP;
            stamp(&mut img, &glyph(d, scale), col_lo + offset_x, y + offset_y, color_for(d));
        }

        img
    }
}

/// The tight unsatisfied-color glyph of a rendered digit, as stored in the corpus.
pub fn corpus_glyph(digit: &str, scale: u32) -> GrayImage {
    let colors = ColorConfig::default();
    let g = glyph(digit, scale);
    let mut img = RgbImage::from_pixel(g.width() + 8, g.height() + 8, Rgb(BACKGROUND));
    stamp(&mut img, &g, 4, 4, colors.digit_unsatisfied);
    let mask = exact_color_mask(&img, colors.digit_unsatisfied);
    let rect = bounding_rect(&mask).unwrap_or_else(|| panic!("empty glyph {}", digit));
    crop(&mask, &rect)
}

fn fill(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
    for yy in y..y + h {
        for xx in x..x + w {
            img.put_pixel(xx, yy, Rgb(color));
        }
    }
}

fn stamp(img: &mut RgbImage, glyph: &GrayImage, x: u32, y: u32, color: [u8; 3]) {
    for (gx, gy, p) in glyph.enumerate_pixels() {
        if p[0] != 0 {
            img.put_pixel(x + gx, y + gy, Rgb(color));
        }
    }
}

/// In-memory corpus. Entries added with `insert_broken` have no readable image.
#[derive(Default)]
pub struct MemorySampleStore {
    pub entries: Vec<IndexEntry>,
    pub images: HashMap<String, GrayImage>,
}

impl MemorySampleStore {
    pub fn with_tagged(samples: &[(&str, GrayImage)]) -> Self {
        let mut store = Self::default();
        for (i, (tag, img)) in samples.iter().enumerate() {
            store.insert(&format!("s{}", i), tag, None, img).unwrap();
        }
        store
    }

    pub fn insert_broken(&mut self, id: &str, tag: &str) {
        self.entries.push(IndexEntry {
            id: id.to_string(),
            tag: tag.to_string(),
            guess: None,
            file: format!("{}.png", id),
        });
    }

    pub fn tags(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.tag.as_str()).collect()
    }
}

impl SampleStore for MemorySampleStore {
    fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    fn load_image(&self, entry: &IndexEntry) -> Result<GrayImage> {
        self.images
            .get(&entry.id)
            .cloned()
            .ok_or_else(|| anyhow!("unreadable sample {}", entry.id))
    }

    fn insert(
        &mut self,
        id: &str,
        tag: &str,
        guess: Option<&str>,
        img: &GrayImage,
    ) -> Result<IndexEntry> {
        let entry = IndexEntry {
            id: id.to_string(),
            tag: tag.to_string(),
            guess: guess.map(str::to_string),
            file: format!("{}.png", id),
        };
        self.entries.push(entry.clone());
        self.images.insert(id.to_string(), img.clone());
        Ok(entry)
    }

    fn retag(&mut self, id: &str, tag: &str) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| anyhow!("no sample {}", id))?;
        entry.tag = tag.to_string();
        entry.guess = None;
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<()> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| anyhow!("no sample {}", id))?;
        self.entries.remove(pos);
        self.images.remove(id);
        Ok(())
    }
}
