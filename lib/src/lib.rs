//! A library that identifies the cards in a screenshot of a mobile game's card collection
//!
//! The card list screen shows the owned cards as a grid of square icons on a white background. This
//! library locates that grid, cuts out every icon, and identifies it by comparing a perceptual hash of the
//! icon with the hashes of all known card icons. Optionally it reads the level and master rank shown on
//! top of each icon with an OCR engine.
//!
//! # Basic usage
//! ```no_run
//! # use card_import_ocr::{Error, Importer, ReferenceTable};
//! let table = ReferenceTable::from_reader(std::fs::File::open("chara_hash.json")?)?;
//! let importer = Importer::default();
//! let results = importer.import_screenshot_from_file("screenshot.png", &table)?;
//! for res in results.iter() {
//!     let best = res.selected_candidate();
//!     println!("{}: {} ({:.1}%)", res.index, best.reference_id, best.similarity());
//! }
//! # Ok::<(), Error>(())
//! ```
//! Cells with more than one candidate could not be identified with certainty. The candidates are sorted
//! by distance; a user can pick another one with [CellResult::select].

mod error;
mod fingerprint;
mod importer;
mod layout;
mod matcher;
mod overlay;
mod segmenter;
mod submission;
mod tesseract;
mod utils;

pub use error::Error;
pub use fingerprint::{luminance, CosineTable, Fingerprint, FingerprintConfig, Hasher, PATCH_SIZE};
pub use importer::{
    assemble, load_screenshot, load_screenshot_from_memory, CellResult, Config, Importer,
    NoMatchPolicy,
};
pub use layout::{GridGeometry, Layout, LocatorConfig, Stage};
pub use matcher::{CandidateMatch, MatchConfig, Matcher, ReferenceEntry, ReferenceTable};
pub use overlay::{
    parse_level, parse_master_rank, region_image, OverlayConfig, OverlayReader, OverlayText, Region,
    TextRecognizer,
};
pub use segmenter::{crop, segment, Cell};
pub use submission::{card_list, CardCatalog, CardEntry, CatalogCard};
pub use tesseract::TesseractCli;
pub use utils::collage;
