use crate::error::Error;
use image::imageops::grayscale;
use image::{math::Rect, GrayImage, ImageBuffer, Luma, RgbaImage};
use imageproc::contrast::threshold;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Pixel value of the background after binarization
pub const WHITE: u8 = 255;

type IntegralImage = ImageBuffer<Luma<u64>, Vec<u64>>;

/// The phase of grid location that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// No white margin around the card grid
    ContentBox,
    /// Fewer than two card rows
    Rows,
    /// No card columns
    Columns,
}

/// Tunables for [Layout]. The defaults are tuned for the card list screen of the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Gray values above this become white after binarization
    pub white_threshold: u8,
    /// Fraction of white pixels that makes a row a top or bottom boundary
    pub row_white_fraction: f64,
    /// Fraction of white pixels that makes a column a left or right boundary
    pub column_white_fraction: f64,
    /// A run taller than this is a header ribbon, not a card
    pub header_run_height: u32,
    /// Extra rows skipped below a header ribbon
    pub header_skip: u32,
    /// Maximum height difference between consecutive accepted rows
    pub height_tolerance: u32,
    /// The first row is dropped if its height deviates more than this from the mean
    pub first_row_drop: u32,
    /// The first row is shifted up if its height deviates at least this much from the mean
    pub first_row_shift: u32,
    /// Column discovery starts this many pixels above the second row
    pub column_scan_lead: u32,
    /// Added to the measured card size to avoid clipping
    pub cell_margin: u32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        LocatorConfig {
            white_threshold: 250,
            row_white_fraction: 0.75,
            column_white_fraction: 0.95,
            header_run_height: 30,
            header_skip: 20,
            height_tolerance: 10,
            first_row_drop: 10,
            first_row_shift: 4,
            column_scan_lead: 20,
            cell_margin: 4,
        }
    }
}

/// The located card grid.
///
/// Row and column offsets are relative to `content_box`. All cells are squares of `cell_size`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    /// The area of the screenshot that holds the card grid
    pub content_box: Rect,
    /// Side length of every cell
    pub cell_size: u32,
    /// The top `y` coordinate of each card row
    pub row_offsets: Vec<u32>,
    /// The left `x` coordinate of each card column
    pub column_offsets: Vec<u32>,
}

impl GridGeometry {
    /// Cell bounding rectangles in screenshot coordinates.
    ///
    /// Iterates columns outer, rows inner: all rows of column 0, then all rows of column 1, ...
    pub fn cells(&self) -> Vec<Rect> {
        let mut cells = Vec::with_capacity(self.row_offsets.len() * self.column_offsets.len());
        for &x in self.column_offsets.iter() {
            for &y in self.row_offsets.iter() {
                cells.push(Rect {
                    x: self.content_box.x + x,
                    y: self.content_box.y + y,
                    width: self.cell_size,
                    height: self.cell_size,
                });
            }
        }
        cells
    }
}

/// Card rows found by the vertical scan
#[derive(Debug)]
struct Rows {
    /// Rows sliced off the top of the content box
    top: u32,
    offsets: Vec<u32>,
    heights: Vec<u32>,
}

/// White to non-white and non-white to white transitions along a scan line
#[derive(Debug, Default)]
struct Edges {
    points: Vec<u32>,
    in_card: bool,
}

impl Edges {
    fn feed(&mut self, pos: u32, white: bool) {
        if !white && !self.in_card {
            self.points.push(pos);
            self.in_card = true;
        } else if white && self.in_card {
            self.points.push(pos);
            self.in_card = false;
        }
    }

    /// Length of the first two runs of a complete group of four edges
    fn span(&self) -> u32 {
        let p = &self.points;
        p[1] - p[0] + p[3] - p[2]
    }

    fn clear(&mut self) {
        self.points.clear();
        self.in_card = false;
    }
}

fn close(a: u32, b: u32, tol: u32) -> bool {
    (a as i64 - b as i64).abs() <= tol as i64
}

fn rounded_mean(values: &[u32]) -> u32 {
    let sum: u64 = values.iter().map(|&v| v as u64).sum();
    (sum as f64 / values.len() as f64).round() as u32
}

/// Apply the first row correction and return the row offsets with the canonical row height.
///
/// The first row is usually taller because it is partly hidden under the screen header.
fn correct_first_row(
    mut offsets: Vec<u32>,
    heights: &[u32],
    config: &LocatorConfig,
) -> Result<(Vec<u32>, u32), Error> {
    if heights.len() < 2 {
        return Err(Error::GeometryNotFound(Stage::Rows));
    }
    let height = rounded_mean(&heights[1..]);
    let deviation = (heights[0] as i64 - height as i64).abs() as u32;
    if deviation > config.first_row_drop {
        debug!("drop first row: height {} mean {}", heights[0], height);
        offsets.remove(0);
    } else if deviation >= config.first_row_shift {
        debug!("shift first row up by {}", deviation);
        offsets[0] = offsets[0].saturating_sub(deviation);
    }
    if offsets.len() < 2 {
        return Err(Error::GeometryNotFound(Stage::Rows));
    }
    Ok((offsets, height))
}

/// Locates the card grid in a screenshot.
///
/// The screenshot is converted to a binary image where the background is white. Cards are the only
/// non-white content inside the grid area.
pub struct Layout {
    bw: GrayImage,
    integral: IntegralImage,
    config: LocatorConfig,
}

impl Layout {
    /// Return a new Layout for `img`, binarized with `config.white_threshold`.
    pub fn new(img: &RgbaImage, config: &LocatorConfig) -> Layout {
        let gray = grayscale(img);
        let bw = threshold(&gray, config.white_threshold);
        let integral: IntegralImage = integral_image::<_, u64>(&bw);
        Layout {
            bw,
            integral,
            config: config.clone(),
        }
    }

    /// Locate the grid:
    /// - find the content box inside the white margin
    /// - find the card rows with a vertical scan, the card columns with a horizontal scan
    /// - derive the uniform cell size
    ///
    /// # Errors
    /// [Error::GeometryNotFound] if the content box, at least two rows or at least one column can not be found.
    pub fn locate(&self) -> Result<GridGeometry, Error> {
        let bounds = self.content_box()?;
        debug!("content box {:?}", bounds);
        let rows = self.segment_rows(bounds)?;
        let area = Rect {
            x: bounds.x,
            y: bounds.y + rows.top,
            width: bounds.width,
            height: bounds.height.saturating_sub(rows.top),
        };
        debug!("row offsets {:?} heights {:?}", rows.offsets, rows.heights);
        let (row_offsets, height) = correct_first_row(rows.offsets, &rows.heights, &self.config)?;
        let start = row_offsets[1].saturating_sub(self.config.column_scan_lead);
        let (column_offsets, width) = self.segment_columns(area, start)?;
        let cell_size = width.max(height) + self.config.cell_margin;
        info!(
            "located {} columns x {} rows, cell size {}",
            column_offsets.len(),
            row_offsets.len(),
            cell_size
        );
        Ok(GridGeometry {
            content_box: area,
            cell_size,
            row_offsets,
            column_offsets,
        })
    }

    fn is_white(&self, x: u32, y: u32) -> bool {
        self.bw.get_pixel(x, y)[0] == WHITE
    }

    /// Number of white pixels in the inclusive rectangle
    fn white_count(&self, left: u32, top: u32, right: u32, bottom: u32) -> u64 {
        sum_image_pixels(&self.integral, left, top, right, bottom)[0] / WHITE as u64
    }

    fn content_box(&self) -> Result<Rect, Error> {
        let (w, h) = self.bw.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::GeometryNotFound(Stage::ContentBox));
        }
        let row_is_margin = |y: u32| {
            self.white_count(0, y, w - 1, y) as f64 / w as f64 >= self.config.row_white_fraction
        };
        let top = (0..h).find(|&y| row_is_margin(y));
        let bottom = (0..h).rev().find(|&y| row_is_margin(y));
        let (top, bottom) = match (top, bottom) {
            (Some(top), Some(bottom)) if bottom > top => (top, bottom),
            _ => return Err(Error::GeometryNotFound(Stage::ContentBox)),
        };
        let span = bottom - top;
        let column_is_margin = |x: u32| {
            self.white_count(x, top, x, bottom - 1) as f64 / span as f64
                >= self.config.column_white_fraction
        };
        let left = (0..w).find(|&x| column_is_margin(x));
        let right = (0..w).rev().find(|&x| column_is_margin(x));
        match (left, right) {
            (Some(left), Some(right)) if right > left => Ok(Rect {
                x: left,
                y: top,
                width: right - left,
                height: span,
            }),
            _ => Err(Error::GeometryNotFound(Stage::ContentBox)),
        }
    }

    /// Walk down the columns of `area` until one of them crosses at least one pair of card rows.
    ///
    /// Every card shows up as two runs of non-white pixels. A run taller than the header limit is a
    /// ribbon above the first row: it is sliced off and the column is scanned again below it.
    fn segment_rows(&self, area: Rect) -> Result<Rows, Error> {
        let config = &self.config;
        let mut top = 0;
        for x in 0..area.width {
            let mut offsets = Vec::new();
            let mut heights: Vec<u32> = Vec::new();
            let mut edges = Edges::default();
            let mut y = 0;
            while top + y < area.height {
                edges.feed(y, self.is_white(area.x + x, area.y + top + y));
                let p = &edges.points;
                if p.len() == 2 && p[1] - p[0] > config.header_run_height {
                    top += p[1] + config.header_skip;
                    debug!("column {}: slice header, content starts {} lower", x, top);
                    offsets.clear();
                    heights.clear();
                    edges.clear();
                    y = 0;
                    continue;
                }
                if edges.points.len() == 4 {
                    let height = edges.span();
                    match heights.last() {
                        Some(&last) if !close(height, last, config.height_tolerance) => {
                            debug!("column {}: discard row at {} height {}", x, p[0], height);
                        }
                        _ => {
                            offsets.push(edges.points[0]);
                            heights.push(height);
                        }
                    }
                    edges.clear();
                }
                y += 1;
            }
            if !heights.is_empty() {
                debug!("rows found in column {}", x);
                return Ok(Rows {
                    top,
                    offsets,
                    heights,
                });
            }
        }
        Err(Error::GeometryNotFound(Stage::Rows))
    }

    /// Walk along the rows of `area`, starting at `start`, until one of them crosses a card column.
    ///
    /// Returns the column offsets and the mean card width.
    fn segment_columns(&self, area: Rect, start: u32) -> Result<(Vec<u32>, u32), Error> {
        for y in start..area.height {
            let mut offsets = Vec::new();
            let mut widths = Vec::new();
            let mut edges = Edges::default();
            for x in 0..area.width {
                edges.feed(x, self.is_white(area.x + x, area.y + y));
                if edges.points.len() == 4 {
                    offsets.push(edges.points[0]);
                    widths.push(edges.span());
                    edges.clear();
                }
            }
            if !widths.is_empty() {
                debug!("columns found in row {}: widths {:?}", y, widths);
                return Ok((offsets, rounded_mean(&widths)));
            }
        }
        Err(Error::GeometryNotFound(Stage::Columns))
    }
}
