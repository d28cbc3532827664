use crate::error::Error;
use crate::fingerprint::{Fingerprint, FingerprintConfig, Hasher};
use crate::layout::{GridGeometry, Layout, LocatorConfig};
use crate::matcher::{CandidateMatch, MatchConfig, Matcher, ReferenceTable};
use crate::overlay::{OverlayConfig, OverlayReader, OverlayText, TextRecognizer};
use crate::segmenter::{segment, Cell};
use image::RgbaImage;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// What to do with cells that do not resemble any reference icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoMatchPolicy {
    /// Leave them out of the results, they are usually empty grid positions
    Drop,
    /// Report them with the no-match candidate
    Keep,
}

impl Default for NoMatchPolicy {
    fn default() -> Self {
        NoMatchPolicy::Drop
    }
}

/// All tunables of the import pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locator: LocatorConfig,
    pub fingerprint: FingerprintConfig,
    pub matcher: MatchConfig,
    pub overlay: OverlayConfig,
    pub no_match: NoMatchPolicy,
}

impl Config {
    /// Parse a JSON config. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Config, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Config, Error> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// An identified card
#[derive(Debug, Clone, Serialize)]
pub struct CellResult {
    /// Position in segmentation order (columns outer, rows inner)
    pub index: usize,
    /// The cropped cell
    #[serde(skip)]
    pub image: RgbaImage,
    pub fingerprint: Fingerprint,
    /// Candidate cards, closest first. Never empty.
    pub candidates: Vec<CandidateMatch>,
    pub level: u32,
    pub master_rank: u32,
    #[serde(rename = "selected_candidate_index")]
    selected: usize,
}

impl CellResult {
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// The candidate the user settled on, the best match unless changed with [CellResult::select].
    pub fn selected_candidate(&self) -> &CandidateMatch {
        &self.candidates[self.selected]
    }

    /// Pick another candidate. Returns false and keeps the selection if `index` is out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.candidates.len() {
            self.selected = index;
            true
        } else {
            false
        }
    }

    pub fn is_no_match(&self) -> bool {
        self.candidates.first().map_or(true, |c| c.is_no_match())
    }
}

/// Merge the per-cell results into [CellResult]s, in cell order.
///
/// `matches` and `texts` hold one entry per cell, at the same position as the cell in `cells`. Cells
/// without a match entry are left out. An empty candidate list counts as no match. Without overlay texts
/// every cell gets level 1 and master rank 0.
pub fn assemble(
    cells: Vec<Cell>,
    matches: Vec<(Fingerprint, Vec<CandidateMatch>)>,
    texts: Option<&[OverlayText]>,
    policy: NoMatchPolicy,
) -> Vec<CellResult> {
    let ncells = cells.len();
    if matches.len() != ncells {
        warn!("{} cells but {} match entries", ncells, matches.len());
    }
    let results: Vec<CellResult> = cells
        .into_iter()
        .zip(matches)
        .enumerate()
        .map(|(i, (cell, (fingerprint, mut candidates)))| {
            if candidates.is_empty() {
                candidates.push(CandidateMatch::no_match());
            }
            let text = texts
                .and_then(|texts| texts.get(i))
                .copied()
                .unwrap_or_default();
            CellResult {
                index: cell.index,
                image: cell.image,
                fingerprint,
                candidates,
                level: text.level,
                master_rank: text.master_rank,
                selected: 0,
            }
        })
        .filter(|res| policy == NoMatchPolicy::Keep || !res.is_no_match())
        .collect();
    info!("{} of {} cells identified", results.len(), ncells);
    results
}

/// Read and decode a screenshot file
pub fn load_screenshot(screenshot_filename: &str) -> Result<RgbaImage, Error> {
    let img = image::open(screenshot_filename).map_err(|source| Error::ImageFile {
        path: screenshot_filename.to_string(),
        source,
    })?;
    Ok(img.into_rgba8())
}

/// Decode an encoded screenshot
pub fn load_screenshot_from_memory(screenshot: &[u8]) -> Result<RgbaImage, Error> {
    Ok(image::load_from_memory(screenshot)?.into_rgba8())
}

/// Identifies the cards in a screenshot of the card list.
pub struct Importer {
    config: Config,
    hasher: Hasher,
    matcher: Matcher,
}

impl Default for Importer {
    fn default() -> Self {
        Importer::new(Config::default())
    }
}

impl Importer {
    pub fn new(config: Config) -> Importer {
        let hasher = Hasher::new(&config.fingerprint);
        let matcher = Matcher::new(&config.matcher);
        Importer {
            config,
            hasher,
            matcher,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    /// Locate the card grid in `screenshot`.
    pub fn locate(&self, screenshot: &RgbaImage) -> Result<GridGeometry, Error> {
        Layout::new(screenshot, &self.config.locator).locate()
    }

    /// Locate the grid and cut out the cells.
    pub fn segment(&self, screenshot: &RgbaImage) -> Result<Vec<Cell>, Error> {
        let geometry = self.locate(screenshot)?;
        Ok(segment(screenshot, &geometry))
    }

    /// Identify the cards in a screenshot without reading the level and master rank overlays.
    ///
    /// The recognition process consists of these phases:
    /// 1. Locate the card grid and cut out one square image per cell
    /// 2. Fingerprint each cell and look up the closest reference icons
    /// 3. Merge into results, leaving out unidentified cells unless configured otherwise
    ///
    /// # Errors
    /// * The card grid can not be located
    pub fn import_screenshot(
        &self,
        screenshot: &RgbaImage,
        table: &ReferenceTable,
    ) -> Result<Vec<CellResult>, Error> {
        let cells = self.segment(screenshot)?;
        let matches = self.match_cells(&cells, table);
        Ok(assemble(cells, matches, None, self.config.no_match))
    }

    /// Identify the cards and read their overlays with recognizers created by `factory`.
    ///
    /// # Errors
    /// * The card grid can not be located
    /// * A recognizer can not be created
    pub fn import_screenshot_with_ocr<R, F>(
        &self,
        screenshot: &RgbaImage,
        table: &ReferenceTable,
        factory: F,
    ) -> Result<Vec<CellResult>, Error>
    where
        R: TextRecognizer,
        F: Fn() -> Result<R, Error> + Sync,
    {
        let cells = self.segment(screenshot)?;
        let matches = self.match_cells(&cells, table);
        let texts = OverlayReader::new(&self.config.overlay).read_all(&cells, factory)?;
        Ok(assemble(cells, matches, Some(texts.as_slice()), self.config.no_match))
    }

    pub fn import_screenshot_from_file(
        &self,
        screenshot_filename: &str,
        table: &ReferenceTable,
    ) -> Result<Vec<CellResult>, Error> {
        self.import_screenshot(&load_screenshot(screenshot_filename)?, table)
    }

    pub fn import_screenshot_from_memory(
        &self,
        screenshot: &[u8],
        table: &ReferenceTable,
    ) -> Result<Vec<CellResult>, Error> {
        self.import_screenshot(&load_screenshot_from_memory(screenshot)?, table)
    }

    /// Fingerprint every cell and rank its candidates
    pub fn match_cells(
        &self,
        cells: &[Cell],
        table: &ReferenceTable,
    ) -> Vec<(Fingerprint, Vec<CandidateMatch>)> {
        let match_cell = |cell: &Cell| {
            let fp = self.hasher.fingerprint(&cell.image);
            (fp, self.matcher.find_candidates(&fp, table))
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            cells.par_iter().map(match_cell).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            cells.iter().map(match_cell).collect()
        }
    }
}
