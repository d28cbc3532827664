use crate::layout::GridGeometry;
use image::imageops::replace;
use image::math::Rect;
use image::{GenericImageView, ImageBuffer, Rgba, RgbaImage};

/// A card icon cut from the screenshot
#[derive(Debug, Clone)]
pub struct Cell {
    /// Position in segmentation order (columns outer, rows inner)
    pub index: usize,
    /// The cell rectangle in screenshot coordinates
    pub rect: Rect,
    /// The square cell image, in the colors of the screenshot
    pub image: RgbaImage,
}

/// Cut one square image of side `geometry.cell_size` per grid cell from the original screenshot.
///
/// Cells are returned columns outer, rows inner. Parts of a cell outside the screenshot are white.
pub fn segment(original: &RgbaImage, geometry: &GridGeometry) -> Vec<Cell> {
    geometry
        .cells()
        .into_iter()
        .enumerate()
        .map(|(index, rect)| Cell {
            index,
            rect,
            image: crop(original, rect),
        })
        .collect()
}

/// Copy `rect` out of `img`, padding with white where it extends past the image.
pub fn crop(img: &RgbaImage, rect: Rect) -> RgbaImage {
    let mut out: RgbaImage =
        ImageBuffer::from_pixel(rect.width, rect.height, Rgba([255, 255, 255, 255]));
    let (w, h) = img.dimensions();
    if rect.x >= w || rect.y >= h {
        return out;
    }
    let width = rect.width.min(w - rect.x);
    let height = rect.height.min(h - rect.y);
    replace(&mut out, &img.view(rect.x, rect.y, width, height), 0, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        ImageBuffer::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn test_crop_inside() {
        let img = gradient(100, 80);
        let cell = crop(&img, Rect { x: 10, y: 20, width: 30, height: 30 });
        assert_eq!(cell.dimensions(), (30, 30));
        assert_eq!(cell.get_pixel(0, 0), &Rgba([10, 20, 0, 255]));
        assert_eq!(cell.get_pixel(29, 29), &Rgba([39, 49, 0, 255]));
    }

    #[test]
    fn test_crop_pads_with_white() {
        let img = gradient(100, 80);
        let cell = crop(&img, Rect { x: 90, y: 70, width: 20, height: 20 });
        assert_eq!(cell.dimensions(), (20, 20));
        assert_eq!(cell.get_pixel(9, 9), &Rgba([99, 79, 0, 255]));
        assert_eq!(cell.get_pixel(10, 10), &Rgba([255, 255, 255, 255]));
        let outside = crop(&img, Rect { x: 200, y: 0, width: 5, height: 5 });
        assert_eq!(outside.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_segment_order() {
        let img = gradient(200, 200);
        let geometry = GridGeometry {
            content_box: Rect { x: 0, y: 0, width: 200, height: 200 },
            cell_size: 40,
            row_offsets: vec![0, 50],
            column_offsets: vec![0, 50, 100],
        };
        let cells = segment(&img, &geometry);
        assert_eq!(cells.len(), 6);
        let origins: Vec<_> = cells.iter().map(|c| (c.rect.x, c.rect.y)).collect();
        assert_eq!(origins, vec![(0, 0), (0, 50), (50, 0), (50, 50), (100, 0), (100, 50)]);
        assert!(cells.iter().all(|c| c.image.dimensions() == (40, 40)));
        assert_eq!(cells[3].index, 3);
        assert_eq!(cells[3].image.get_pixel(0, 0), &Rgba([50, 50, 0, 255]));
    }
}
