use crate::layout::Stage;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The card grid could not be located in the screenshot
    #[error("Card grid not found: {0:?} could not be established")]
    GeometryNotFound(Stage),
    /// A single text recognition call failed
    #[error("Text recognition failed: {0}")]
    Recognition(String),
    /// The text recognizer could not be started
    #[error("Text recognizer unavailable: {0}")]
    RecognizerUnavailable(String),
    /// A reference fingerprint is not a string of 64 binary digits
    #[error("Invalid fingerprint {0:?}")]
    InvalidFingerprint(String),
    /// The reference table could not be parsed
    #[error("Reference table could not be parsed")]
    ReferenceTable(#[from] serde_json::Error),
    #[error("I/O error")]
    Io(#[from] io::Error),
    #[error("Image could not be processed")]
    Image(#[from] image::error::ImageError),
    /// Error decoding image
    #[error("Image {path} could not be decoded")]
    ImageFile {
        path: String,
        source: image::error::ImageError,
    },
}
