use crate::error::Error;
use crate::overlay::TextRecognizer;
use image::{DynamicImage, GrayImage, ImageOutputFormat};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Recognizes text by piping each region as a PNG through the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    executable: PathBuf,
    lang: String,
    /// Page segmentation mode, 7 treats the image as a single text line
    psm: u8,
}

impl TesseractCli {
    /// Use `tesseract` from the `PATH`.
    pub fn new() -> Result<TesseractCli, Error> {
        TesseractCli::with_executable("tesseract")
    }

    /// Use the executable at `path`. Fails if it can not be run.
    pub fn with_executable(path: impl Into<PathBuf>) -> Result<TesseractCli, Error> {
        let executable = path.into();
        let status = Command::new(&executable)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                Error::RecognizerUnavailable(format!("{}: {}", executable.display(), e))
            })?;
        if !status.success() {
            return Err(Error::RecognizerUnavailable(format!(
                "{} exited with {}",
                executable.display(),
                status
            )));
        }
        Ok(TesseractCli {
            executable,
            lang: String::from("eng"),
            psm: 7,
        })
    }

    fn args(&self) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.lang.clone(),
            "--psm".to_string(),
            self.psm.to_string(),
        ]
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(&mut self, img: &GrayImage) -> Result<String, Error> {
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(img.clone())
            .write_to(&mut png, ImageOutputFormat::Png)
            .map_err(|e| Error::Recognition(e.to_string()))?;

        let mut child = Command::new(&self.executable)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Recognition(e.to_string()))?;
        // stdin is closed at the end of the match, the child is always waited for
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&png),
            None => Ok(()),
        };
        let output = child
            .wait_with_output()
            .map_err(|e| Error::Recognition(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Recognition(format!("tesseract failed: {}", stderr)));
        }
        written.map_err(|e| Error::Recognition(e.to_string()))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
