use image::imageops::{replace, resize, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};

/// Create a collage from card thumbnails, for a quick visual check of the segmentation.
///
/// The collage is about square, with at most `maxrows` rows. Thumbnails that differ in size from the
/// first one are resized to match it.
pub fn collage(thumbnails: &[&RgbaImage], maxrows: Option<u32>) -> RgbaImage {
    if thumbnails.is_empty() {
        return RgbaImage::new(0, 0);
    }
    let nimages = thumbnails.len();
    let mut nrows = ((nimages as f64).sqrt().floor() as u32).max(1); // size of collage square
    if let Some(maxrows) = maxrows {
        nrows = nrows.min(maxrows.max(1));
    }
    let ncols = (nimages as f64 / nrows as f64).ceil() as u32;
    let (w, h) = thumbnails[0].dimensions();
    let mut collage: RgbaImage =
        ImageBuffer::from_pixel(w * ncols, h * nrows, Rgba([255, 255, 255, 255]));
    for (i, &thumbnail) in thumbnails.iter().enumerate() {
        let (row, col) = ((i as u32 / ncols), (i as u32 % ncols));
        if thumbnail.dimensions() != (w, h) {
            let resized = resize(thumbnail, w, h, FilterType::Lanczos3);
            replace(&mut collage, &resized, col * w, row * h);
        } else {
            replace(&mut collage, thumbnail, col * w, row * h);
        }
    }
    collage
}
