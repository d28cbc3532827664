//! Synthetic card list screenshots.
//!
//! A card is a dark square with two small white notches, so that both the left edge of the card and the
//! lower part of the card cross two non-white runs, like the level and rank overlays do on real icons.
//! Solid squares would be paired two cards at a time by the locator.
#![allow(dead_code)]

use image::{ImageBuffer, Rgba, RgbaImage};
use std::f64::consts::PI;

pub const FRAME: u8 = 40;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A grid of cards on a white background
pub struct Grid {
    pub columns: u32,
    pub rows: u32,
    /// Side of a card
    pub square: u32,
    /// Distance between the top left corners of neighbouring cards
    pub pitch: u32,
    pub margin: u32,
    /// Top of the first card row
    pub top: u32,
}

impl Grid {
    pub fn new(columns: u32, rows: u32, square: u32, pitch: u32) -> Grid {
        Grid {
            columns,
            rows,
            square,
            pitch,
            margin: 10,
            top: 10,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (
            2 * self.margin + (self.columns - 1) * self.pitch + self.square,
            self.top + self.margin + (self.rows - 1) * self.pitch + self.square,
        )
    }

    pub fn origin(&self, col: u32, row: u32) -> (u32, u32) {
        (self.margin + col * self.pitch, self.top + row * self.pitch)
    }

    /// Draw all cards
    pub fn draw(&self) -> RgbaImage {
        let (w, h) = self.size();
        let mut img = ImageBuffer::from_pixel(w, h, Rgba([255, 255, 255, 255]));
        for col in 0..self.columns {
            for row in 0..self.rows {
                let (x, y) = self.origin(col, row);
                draw_card(&mut img, x, y, self.square);
            }
        }
        img
    }
}

pub fn fill(img: &mut RgbaImage, x: u32, y: u32, width: u32, height: u32, value: u8) {
    for yy in y..y + height {
        for xx in x..x + width {
            img.put_pixel(xx, yy, Rgba([value, value, value, 255]));
        }
    }
}

pub fn draw_card(img: &mut RgbaImage, x: u32, y: u32, square: u32) {
    let half = (square - 2) / 2;
    fill(img, x, y, square, square, FRAME);
    // notch on the left edge
    fill(img, x, y + half, 2, 2, 255);
    // notch through the lower part
    let lower = square * 5 / 8;
    fill(img, x + half, y + lower, 2, square - lower, 255);
}

/// Sign of Walsh function `code` at `n`
fn walsh(code: usize, n: usize) -> f64 {
    if (code & n).count_ones() % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// Paint a 32x32 icon at `(x, y)` whose low frequency cosine coefficients have the signs of Walsh
/// function `code`. Icons with different codes differ in about half of their fingerprint bits.
pub fn draw_icon(img: &mut RgbaImage, x: u32, y: u32, code: usize) {
    let basis = |k: usize, u: usize| ((2 * k + 1) as f64 * u as f64 * PI / 64.0).cos();
    for i in 0..32 {
        for j in 0..32 {
            let mut value = 128.0;
            for u in 1..=8 {
                for v in 1..=8 {
                    value += 1.5 * walsh(code, (u - 1) * 8 + v - 1) * basis(i, u) * basis(j, v);
                }
            }
            let value = value.round().max(0.0).min(255.0) as u8;
            img.put_pixel(x + j as u32, y + i as u32, Rgba([value, value, value, 255]));
        }
    }
}
