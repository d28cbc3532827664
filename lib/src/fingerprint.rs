//! Perceptual hash of a card icon.
//!
//! The hash is computed from the low frequencies of a 2-D discrete cosine transform of a 32x32 luminance
//! patch. Each of the 64 coefficients in the 8x8 window next to the DC term becomes a `1` bit when it is
//! larger than the median of the window. Uniform brightness or contrast changes do not move coefficients
//! across the median, so icons cropped from screenshots with different color management hash alike.
use crate::error::Error;
use crate::segmenter::crop;
use image::imageops::{resize, FilterType};
use image::math::Rect;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

/// Side of the square luminance patch
pub const PATCH_SIZE: usize = 32;
/// Number of bits in a fingerprint
pub const HASH_BITS: u32 = 64;
/// Side of the coefficient window
const WINDOW: usize = 8;

/// A 64 bit perceptual hash.
///
/// The text form is a string of 64 `0` and `1` digits, most significant bit first. Bit `k` of the string
/// is the coefficient at row `k / 8 + 1` and column `k % 8 + 1` of the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn from_bits(bits: u64) -> Fingerprint {
        Fingerprint(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    /// The number of differing bits
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:064b}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HASH_BITS as usize || !s.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(Error::InvalidFingerprint(s.to_string()));
        }
        u64::from_str_radix(s, 2)
            .map(Fingerprint)
            .map_err(|_| Error::InvalidFingerprint(s.to_string()))
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> String {
        fp.to_string()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Precomputed `cos(i / 2N * PI)` for `i` in `0 .. 2N(N-1)`.
///
/// Every basis value `cos((2x + 1) u PI / 2N)` of an N point transform is an entry of this table.
#[derive(Debug, Clone)]
pub struct CosineTable(Vec<f64>);

impl CosineTable {
    pub fn new(n: usize) -> CosineTable {
        let entries = 2 * n * (n - 1);
        CosineTable(
            (0..entries)
                .map(|i| (i as f64 / (2 * n) as f64 * std::f64::consts::PI).cos())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn get(&self, i: usize) -> f64 {
        self.0[i]
    }
}

/// Where the icon sits inside a cell, as fractions of the cell side.
///
/// The default window skips the card frame and rarity border, which look the same on many cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    pub inset: f64,
    pub extent: f64,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        FingerprintConfig {
            inset: 0.165,
            extent: 0.445,
        }
    }
}

/// Computes fingerprints of cell images. Holds the cosine table, so create it once per run.
#[derive(Debug, Clone)]
pub struct Hasher {
    cos: CosineTable,
    config: FingerprintConfig,
}

impl Default for Hasher {
    fn default() -> Self {
        Hasher::new(&FingerprintConfig::default())
    }
}

impl Hasher {
    pub fn new(config: &FingerprintConfig) -> Hasher {
        Hasher {
            cos: CosineTable::new(PATCH_SIZE),
            config: config.clone(),
        }
    }

    /// Fingerprint of a cell image
    pub fn fingerprint(&self, cell: &RgbaImage) -> Fingerprint {
        self.hash_luma(&luminance(&self.patch(cell)))
    }

    /// Cut the icon window out of `cell` and resample it to a 32x32 patch.
    pub fn patch(&self, cell: &RgbaImage) -> RgbaImage {
        let (w, h) = cell.dimensions();
        let window = Rect {
            x: (w as f64 * self.config.inset).floor() as u32,
            y: (h as f64 * self.config.inset).floor() as u32,
            width: ((w as f64 * self.config.extent).floor() as u32).max(1),
            height: ((h as f64 * self.config.extent).floor() as u32).max(1),
        };
        let icon = crop(cell, window);
        let size = PATCH_SIZE as u32;
        if icon.dimensions() == (size, size) {
            icon
        } else {
            resize(&icon, size, size, FilterType::Nearest)
        }
    }

    /// Fingerprint of a 32x32 luminance patch in row-major order.
    ///
    /// # Panics
    /// If `patch` does not hold exactly 32 * 32 values.
    pub fn hash_luma(&self, patch: &[f64]) -> Fingerprint {
        assert_eq!(patch.len(), PATCH_SIZE * PATCH_SIZE, "patch must be 32x32");
        let mut window = Vec::with_capacity(WINDOW * WINDOW);
        for u in 1..=WINDOW {
            for v in 1..=WINDOW {
                window.push(self.coefficient(patch, u, v));
            }
        }
        let mut sorted = window.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let median = sorted[sorted.len() / 2];
        let bits = window
            .iter()
            .fold(0u64, |acc, &value| (acc << 1) | (value > median) as u64);
        Fingerprint(bits)
    }

    /// DCT-II coefficient `F[u][v]`, `u` along the rows of the patch.
    fn coefficient(&self, patch: &[f64], u: usize, v: usize) -> f64 {
        let n = PATCH_SIZE;
        let mut sum = 0.0;
        for i in 0..n {
            for j in 0..n {
                sum += self.cos.get((2 * i + 1) * u) * self.cos.get((2 * j + 1) * v) * patch[n * i + j];
            }
        }
        sum * scale(u) * scale(v) / 4.0
    }
}

fn scale(k: usize) -> f64 {
    if k == 0 {
        1.0 / 2f64.sqrt()
    } else {
        1.0
    }
}

/// Luminance of each pixel in row-major order
pub fn luminance(img: &RgbaImage) -> Vec<f64> {
    img.pixels()
        .map(|p| 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64)
        .collect()
}
