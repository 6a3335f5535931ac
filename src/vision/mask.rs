use image::{GrayImage, ImageBuffer, Luma, RgbImage};

use super::Region;

/// Foreground value written into masks.
pub const MASK_ON: u8 = 255;

/// Builds a binary mask of the pixels that equal `color` exactly.
///
/// Matching pixels become 255, everything else 0. No tolerance is applied,
/// so anti-aliased edges never match.
pub fn exact_color_mask(img: &RgbImage, color: [u8; 3]) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        if pixel.0 == color {
            output.put_pixel(x, y, Luma([MASK_ON]));
        }
    }

    output
}

/// Returns the tight bounding rectangle of all non-zero pixels, if any.
pub fn bounding_rect(mask: &GrayImage) -> Option<Region> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;

    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    bounds.map(|(x0, y0, x1, y1)| Region {
        x: x0,
        y: y0,
        w: x1 - x0 + 1,
        h: y1 - y0 + 1,
    })
}

/// Copies a region out of an image. The region is clamped to the image bounds.
pub fn crop<P>(
    img: &ImageBuffer<P, Vec<P::Subpixel>>,
    region: &Region,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: image::Pixel + 'static,
{
    let (w, h) = img.dimensions();
    let x0 = region.x.min(w);
    let y0 = region.y.min(h);
    let rw = region.w.min(w - x0);
    let rh = region.h.min(h - y0);

    image::imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}

/// Surrounds a mask with a constant 0 border of `margin` pixels on all sides.
pub fn pad(mask: &GrayImage, margin: u32) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut output = GrayImage::new(width + 2 * margin, height + 2 * margin);
    image::imageops::replace(&mut output, mask, margin as i64, margin as i64);
    output
}
