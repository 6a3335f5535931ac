//! Connected-component extraction by flood fill.
//!
//! The extractor owns its mask and clears every pixel it visits, so each
//! component is reported exactly once. Components are discovered in a fixed
//! row-major order (or its reverse), which makes "the first region" and "the
//! last region" well defined for callers that filter by position.

use image::{GrayImage, Luma};

use super::Region;

/// Order in which still-set pixels are searched for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanOrder {
    /// Top-left to bottom-right, row by row.
    Forward,
    /// Bottom-right to top-left, row by row.
    Reverse,
}

/// Iterator over the 4-connected components of a binary mask.
pub struct ComponentExtractor {
    mask: GrayImage,
    order: ScanOrder,
    /// Number of pixels already scanned in `order`; all of them are clear.
    scanned: usize,
}

impl ComponentExtractor {
    /// Takes ownership of the mask; any non-zero pixel is foreground.
    pub fn new(mask: GrayImage, order: ScanOrder) -> Self {
        Self {
            mask,
            order,
            scanned: 0,
        }
    }

    fn next_seed(&mut self) -> Option<(u32, u32)> {
        let width = self.mask.width() as usize;
        let total = width * self.mask.height() as usize;
        let raw = self.mask.as_raw();

        while self.scanned < total {
            let idx = match self.order {
                ScanOrder::Forward => self.scanned,
                ScanOrder::Reverse => total - 1 - self.scanned,
            };
            if raw[idx] != 0 {
                return Some(((idx % width) as u32, (idx / width) as u32));
            }
            self.scanned += 1;
        }

        None
    }

    /// Clears the component containing `(x, y)` and returns its bounding box.
    fn flood_clear(&mut self, x: u32, y: u32) -> Region {
        let (width, height) = self.mask.dimensions();
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);

        let mut stack = vec![(x, y)];
        self.mask.put_pixel(x, y, Luma([0]));

        while let Some((cx, cy)) = stack.pop() {
            min_x = min_x.min(cx);
            min_y = min_y.min(cy);
            max_x = max_x.max(cx);
            max_y = max_y.max(cy);

            let neighbours = [
                (cx > 0).then(|| (cx - 1, cy)),
                (cx + 1 < width).then(|| (cx + 1, cy)),
                (cy > 0).then(|| (cx, cy - 1)),
                (cy + 1 < height).then(|| (cx, cy + 1)),
            ];
            for (nx, ny) in neighbours.into_iter().flatten() {
                if self.mask.get_pixel(nx, ny)[0] != 0 {
                    self.mask.put_pixel(nx, ny, Luma([0]));
                    stack.push((nx, ny));
                }
            }
        }

        Region {
            x: min_x,
            y: min_y,
            w: max_x - min_x + 1,
            h: max_y - min_y + 1,
        }
    }
}

impl Iterator for ComponentExtractor {
    type Item = Region;

    fn next(&mut self) -> Option<Region> {
        let (x, y) = self.next_seed()?;
        Some(self.flood_clear(x, y))
    }
}
