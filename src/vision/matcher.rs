//! Width-locked template matching.
//!
//! A reference glyph is rescaled so its width equals the width of the
//! foreground in the target, then slid over the padded target computing
//! zero-mean normalized cross-correlation (ZNCC). Digits differ more in
//! width than in height, so locking the width rejects more wrong candidates
//! than locking the height or searching over uniform scales.

use image::imageops::{self, FilterType};
use image::GrayImage;

use super::mask::{bounding_rect, pad};

/// Scores a glyph template against a target mask.
#[derive(Clone, Copy, Debug)]
pub struct TemplateMatcher {
    padding: u32,
}

impl TemplateMatcher {
    pub fn new(padding: u32) -> Self {
        Self { padding }
    }

    /// Returns the best ZNCC score of `template` anywhere inside `target`.
    ///
    /// The score is at most 1.0 (pixel-identical). `None` means no match:
    /// the target has no foreground, or the rescaled template is taller than
    /// the target's foreground.
    pub fn score(&self, target: &GrayImage, template: &GrayImage) -> Option<f64> {
        if template.width() == 0 || template.height() == 0 {
            return None;
        }

        let padded = pad(target, self.padding);
        let bbox = bounding_rect(&padded)?;

        let scale = bbox.w as f64 / template.width() as f64;
        let scaled_h = ((template.height() as f64 * scale).round() as u32).max(1);
        if scaled_h > bbox.h {
            return None;
        }

        let scaled = if (bbox.w, scaled_h) == template.dimensions() {
            template.clone()
        } else {
            imageops::resize(template, bbox.w, scaled_h, FilterType::Triangle)
        };

        max_zncc(&padded, &scaled)
    }
}

/// Summed-area tables of pixel values and squared pixel values, so the
/// statistics of any window cost four lookups.
struct Integral {
    stride: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl Integral {
    fn new(image: &GrayImage) -> Self {
        let (w, h) = (image.width() as usize, image.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut sum_sq = vec![0u64; stride * (h + 1)];
        let raw = image.as_raw();

        for y in 0..h {
            let mut row = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w {
                let v = raw[y * w + x] as u64;
                row += v;
                row_sq += v * v;
                sum[(y + 1) * stride + x + 1] = row + sum[y * stride + x + 1];
                sum_sq[(y + 1) * stride + x + 1] = row_sq + sum_sq[y * stride + x + 1];
            }
        }

        Self { stride, sum, sum_sq }
    }

    /// `(Σv, Σv²)` over the `w`×`h` window whose top-left corner is `(x, y)`.
    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (f64, f64) {
        let at = |table: &[u64]| {
            let (top, bottom) = (y * self.stride, (y + h) * self.stride);
            (table[bottom + x + w] + table[top + x]) - (table[top + x + w] + table[bottom + x])
        };
        (at(&self.sum) as f64, at(&self.sum_sq) as f64)
    }
}

/// Maximum ZNCC of `template` over every placement fully inside `image`.
///
/// Placements where either side has zero variance score 0.
fn max_zncc(image: &GrayImage, template: &GrayImage) -> Option<f64> {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return None;
    }
    let (tw, th) = (tw as usize, th as usize);

    let n = (tw * th) as f64;
    let t_mean = template.pixels().map(|p| p[0] as f64).sum::<f64>() / n;
    let t_centered: Vec<f64> = template.pixels().map(|p| p[0] as f64 - t_mean).collect();
    let t_energy: f64 = t_centered.iter().map(|v| v * v).sum();
    if t_energy <= f64::EPSILON {
        return Some(0.0);
    }

    let integral = Integral::new(image);
    let raw = image.as_raw();
    let stride = iw as usize;
    let mut best = f64::NEG_INFINITY;

    for oy in 0..=ih as usize - th {
        for ox in 0..=iw as usize - tw {
            let (sum, sum_sq) = integral.window(ox, oy, tw, th);
            let i_energy = sum_sq - sum * sum / n;
            let denom = (t_energy * i_energy).sqrt();
            if denom <= f64::EPSILON {
                best = best.max(0.0);
                continue;
            }

            let mut cross = 0.0;
            for (ty, t_row) in t_centered.chunks_exact(tw).enumerate() {
                let row = &raw[(oy + ty) * stride + ox..][..tw];
                cross += t_row.iter().zip(row).map(|(t, &v)| t * v as f64).sum::<f64>();
            }
            best = best.max(cross / denom);
        }
    }

    Some(best.min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::mask::MASK_ON;
    use image::Luma;

    /// A crude "7": top bar plus a diagonal stroke.
    fn seven(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let top = y < h / 5;
            let stroke_x = (w - 1) as f64 * (1.0 - y as f64 / h as f64);
            let diag = (x as f64 - stroke_x).abs() < w as f64 / 5.0;
            Luma([if top || diag { MASK_ON } else { 0 }])
        })
    }

    /// A crude "1": a vertical bar with a foot.
    fn one(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let bar = x >= w / 3 && x < 2 * w / 3;
            let foot = y >= h - h / 6;
            Luma([if bar || foot { MASK_ON } else { 0 }])
        })
    }

    #[test]
    fn test_identical_pair_scores_maximum() {
        let matcher = TemplateMatcher::new(5);
        let glyph = seven(12, 20);

        let score = matcher.score(&glyph, &glyph).unwrap();
        assert!((score - 1.0).abs() < 1e-9, "score was {}", score);
    }

    #[test]
    fn test_identical_pair_beats_other_glyph() {
        let matcher = TemplateMatcher::new(5);
        let target = seven(12, 20);

        let same = matcher.score(&target, &seven(12, 20)).unwrap();
        let other = matcher.score(&target, &one(12, 20)).unwrap();
        assert!(same > other, "same {} vs other {}", same, other);
    }

    #[test]
    fn test_template_is_rescaled_to_target_width() {
        let matcher = TemplateMatcher::new(5);
        let target = seven(12, 20);
        // Same glyph at double scale still matches strongly.
        let score = matcher.score(&target, &seven(24, 40)).unwrap();
        assert!(score > 0.7, "score was {}", score);
    }

    #[test]
    fn test_too_tall_after_rescale_is_no_match() {
        let matcher = TemplateMatcher::new(5);
        let target = seven(12, 20);
        // Width 12 -> height 40 after rescale, taller than 20.
        let tall = GrayImage::from_pixel(6, 20, Luma([MASK_ON]));
        assert_eq!(matcher.score(&target, &tall), None);
    }

    #[test]
    fn test_empty_target_is_no_match() {
        let matcher = TemplateMatcher::new(5);
        assert_eq!(matcher.score(&GrayImage::new(12, 20), &seven(12, 20)), None);
    }

    /// Window statistics summed pixel by pixel.
    fn naive_zncc(image: &GrayImage, template: &GrayImage) -> f64 {
        let (tw, th) = template.dimensions();
        let n = (tw * th) as f64;
        let t_mean = template.pixels().map(|p| p[0] as f64).sum::<f64>() / n;
        let mut best = f64::NEG_INFINITY;
        for oy in 0..=image.height() - th {
            for ox in 0..=image.width() - tw {
                let i_mean = (0..th)
                    .flat_map(|y| (0..tw).map(move |x| (x, y)))
                    .map(|(x, y)| image.get_pixel(ox + x, oy + y)[0] as f64)
                    .sum::<f64>()
                    / n;
                let (mut cross, mut t_energy, mut i_energy) = (0.0, 0.0, 0.0);
                for y in 0..th {
                    for x in 0..tw {
                        let t = template.get_pixel(x, y)[0] as f64 - t_mean;
                        let v = image.get_pixel(ox + x, oy + y)[0] as f64 - i_mean;
                        cross += t * v;
                        t_energy += t * t;
                        i_energy += v * v;
                    }
                }
                let denom = (t_energy * i_energy).sqrt();
                best = best.max(if denom > f64::EPSILON { cross / denom } else { 0.0 });
            }
        }
        best.min(1.0)
    }

    #[test]
    fn test_window_sums_match_pixel_sums() {
        let image = GrayImage::from_fn(23, 17, |x, y| Luma([((x * 53 + y * 29 + x * y) % 256) as u8]));
        let integral = Integral::new(&image);

        for (x, y, w, h) in [(0, 0, 23, 17), (4, 3, 7, 9), (22, 16, 1, 1), (10, 0, 5, 17)] {
            let pixels: Vec<f64> = (y..y + h)
                .flat_map(|py| (x..x + w).map(move |px| (px, py)))
                .map(|(px, py)| image.get_pixel(px, py)[0] as f64)
                .collect();
            let expected: (f64, f64) = (pixels.iter().sum(), pixels.iter().map(|v| v * v).sum());
            assert_eq!(
                integral.window(x as usize, y as usize, w as usize, h as usize),
                expected
            );
        }
    }

    #[test]
    fn test_max_zncc_matches_direct_computation() {
        let image = GrayImage::from_fn(30, 26, |x, y| Luma([((x * 31 + y * 17 + x * y * 3) % 251) as u8]));
        let templates = [
            seven(12, 20),
            one(9, 14),
            GrayImage::from_fn(6, 5, |x, y| Luma([((x + 2 * y) * 20) as u8])),
        ];

        for template in &templates {
            let fast = max_zncc(&image, template).unwrap();
            let direct = naive_zncc(&image, template);
            assert!((fast - direct).abs() < 1e-9, "fast {} vs direct {}", fast, direct);
        }

        // A flat image has zero variance at every placement.
        let flat = GrayImage::from_pixel(20, 20, Luma([MASK_ON]));
        assert_eq!(max_zncc(&flat, &seven(12, 20)), Some(0.0));
    }

    #[test]
    fn test_target_context_is_searched() {
        let matcher = TemplateMatcher::new(5);
        let glyph = seven(12, 20);
        // Glyph placed off-center inside a larger, mostly empty cell.
        let mut cell = GrayImage::new(40, 40);
        imageops::replace(&mut cell, &glyph, 21, 3);

        let score = matcher.score(&cell, &glyph).unwrap();
        assert!((score - 1.0).abs() < 1e-9, "score was {}", score);
    }
}
