use crate::error::Error;
use crate::segmenter::{crop, Cell};
use image::imageops::{grayscale, invert};
use image::math::Rect;
use image::{GrayImage, RgbaImage};
use imageproc::contrast::threshold;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{mpsc, Mutex, OnceLock};
use std::thread;

static LEVEL_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Reads text from an image. Implemented by an OCR engine outside this crate.
pub trait TextRecognizer {
    fn recognize(&mut self, img: &GrayImage) -> Result<String, Error>;
}

/// The text overlays of a card icon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Strip along the bottom left with the card level
    Level,
    /// Badge in the bottom right corner with the master rank
    MasterRank,
}

impl Region {
    /// The region inside a cell of side `cell_size`, None if the cell is too small to hold it.
    pub fn rect(self, cell_size: u32) -> Option<Rect> {
        match self {
            Region::Level if cell_size > 50 => Some(Rect {
                x: 3,
                y: cell_size - 27,
                width: cell_size - 50,
                height: 27,
            }),
            Region::MasterRank if cell_size >= 36 => Some(Rect {
                x: cell_size - 36,
                y: cell_size - 36,
                width: 26,
                height: 26,
            }),
            _ => None,
        }
    }
}

/// Binarized and inverted overlay region, ready for the recognizer.
pub fn region_image(cell: &RgbaImage, region: Region, text_threshold: u8) -> Option<GrayImage> {
    let rect = region.rect(cell.width())?;
    let mut bw = threshold(&grayscale(&crop(cell, rect)), text_threshold);
    invert(&mut bw);
    Some(bw)
}

/// Level and master rank read from a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayText {
    pub level: u32,
    pub master_rank: u32,
}

impl Default for OverlayText {
    fn default() -> Self {
        OverlayText {
            level: 1,
            master_rank: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Number of recognizers running at the same time
    pub workers: usize,
    /// Gray values above this become white before inverting
    pub text_threshold: u8,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        OverlayConfig {
            workers: 4,
            text_threshold: 127,
        }
    }
}

struct Job {
    cell: usize,
    region: Region,
    image: GrayImage,
}

type JobResult = (usize, Region, Result<String, Error>);

/// Reads the level and master rank overlays with a fixed pool of recognizers.
pub struct OverlayReader {
    config: OverlayConfig,
}

impl OverlayReader {
    pub fn new(config: &OverlayConfig) -> OverlayReader {
        OverlayReader {
            config: config.clone(),
        }
    }

    /// Read the overlays of all `cells`. The result has one entry per cell, in the same order.
    ///
    /// Each worker thread creates one recognizer with `factory` and takes jobs from a shared queue until it
    /// is empty. A failed recognition falls back to level 1 or master rank 0.
    ///
    /// # Errors
    /// If `factory` fails or a worker panics. The run can not continue without a recognizer.
    pub fn read_all<R, F>(&self, cells: &[Cell], factory: F) -> Result<Vec<OverlayText>, Error>
    where
        R: TextRecognizer,
        F: Fn() -> Result<R, Error> + Sync,
    {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let mut njobs = 0;
        for (i, cell) in cells.iter().enumerate() {
            for &region in &[Region::Level, Region::MasterRank] {
                if let Some(image) = region_image(&cell.image, region, self.config.text_threshold) {
                    // the receiver is alive until the workers are done
                    let _ = job_tx.send(Job {
                        cell: i,
                        region,
                        image,
                    });
                    njobs += 1;
                }
            }
        }
        drop(job_tx);

        let mut texts = vec![OverlayText::default(); cells.len()];
        if njobs == 0 {
            return Ok(texts);
        }
        let workers = self.config.workers.max(1).min(njobs);
        debug!("recognize {} regions with {} workers", njobs, workers);

        let job_rx = Mutex::new(job_rx);
        let (result_tx, result_rx) = mpsc::channel::<JobResult>();
        let outcome = thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let result_tx = result_tx.clone();
                    let job_rx = &job_rx;
                    let factory = &factory;
                    s.spawn(move || run_worker(factory, job_rx, result_tx))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(Error::RecognizerUnavailable("worker panicked".to_string()))
                    })
                })
                .collect::<Vec<_>>()
        });
        drop(result_tx);
        outcome.into_iter().collect::<Result<(), Error>>()?;

        for (i, region, text) in result_rx.iter() {
            let text = match text {
                Ok(text) => text,
                Err(err) => {
                    warn!("cell {}: {:?} not recognized: {}", i, region, err);
                    continue;
                }
            };
            match region {
                Region::Level => texts[i].level = parse_level(&text),
                Region::MasterRank => texts[i].master_rank = parse_master_rank(&text),
            }
        }
        Ok(texts)
    }
}

/// The first one or two digit number in `text`, 1 if there is none.
pub fn parse_level(text: &str) -> u32 {
    // can not fail, the pattern is a constant
    let pattern = LEVEL_PATTERN.get_or_init(|| Regex::new("[0-9]{1,2}").unwrap());
    pattern
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .filter(|&level| level > 0)
        .unwrap_or(1)
}

/// The number in `text`, 0 if it is not a number.
pub fn parse_master_rank(text: &str) -> u32 {
    text.trim().parse().unwrap_or(0)
}

fn run_worker<R, F>(
    factory: &F,
    jobs: &Mutex<mpsc::Receiver<Job>>,
    results: mpsc::Sender<JobResult>,
) -> Result<(), Error>
where
    R: TextRecognizer,
    F: Fn() -> Result<R, Error>,
{
    let mut recognizer = factory()?;
    loop {
        let job = match jobs.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => break,
        };
        let job = match job {
            Ok(job) => job,
            // queue is empty
            Err(_) => break,
        };
        let text = recognizer.recognize(&job.image);
        if results.send((job.cell, job.region, text)).is_err() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cells(n: usize, size: u32) -> Vec<Cell> {
        (0..n)
            .map(|index| Cell {
                index,
                rect: Rect { x: 0, y: 0, width: size, height: size },
                image: ImageBuffer::from_pixel(size, size, Rgba([255, 255, 255, 255])),
            })
            .collect()
    }

    /// Answers by region size: the level strip of a 72 pixel cell is 22 wide, the rank badge 26.
    struct Fake {
        fail_rank: bool,
    }

    impl TextRecognizer for Fake {
        fn recognize(&mut self, img: &GrayImage) -> Result<String, Error> {
            match img.width() {
                22 => Ok("Lv.45\n".to_string()),
                26 if self.fail_rank => Err(Error::Recognition("engine error".to_string())),
                26 => Ok(" 3\n".to_string()),
                w => Err(Error::Recognition(format!("unexpected width {}", w))),
            }
        }
    }

    #[test]
    fn test_region_rects() {
        assert_eq!(
            Region::Level.rect(72),
            Some(Rect { x: 3, y: 45, width: 22, height: 27 })
        );
        assert_eq!(
            Region::MasterRank.rect(72),
            Some(Rect { x: 36, y: 36, width: 26, height: 26 })
        );
        assert_eq!(Region::Level.rect(50), None);
        assert_eq!(Region::MasterRank.rect(35), None);
    }

    #[test]
    fn test_region_image_inverted() {
        let mut cell: RgbaImage = ImageBuffer::from_pixel(72, 72, Rgba([255, 255, 255, 255]));
        cell.put_pixel(40, 40, Rgba([10, 10, 10, 255]));
        let img = region_image(&cell, Region::MasterRank, 127).unwrap();
        assert_eq!(img.dimensions(), (26, 26));
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(4, 4)[0], 255);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("Lv.45"), 45);
        assert_eq!(parse_level("Lv. 7 "), 7);
        assert_eq!(parse_level("Lv.123"), 12);
        assert_eq!(parse_level("Lv."), 1);
        assert_eq!(parse_level("Lv.0"), 1);
        assert_eq!(parse_level(""), 1);
    }

    #[test]
    fn test_parse_master_rank() {
        assert_eq!(parse_master_rank("3\n"), 3);
        assert_eq!(parse_master_rank(" 5 "), 5);
        assert_eq!(parse_master_rank("S"), 0);
        assert_eq!(parse_master_rank(""), 0);
    }

    #[test]
    fn test_read_all() {
        let created = AtomicUsize::new(0);
        let reader = OverlayReader::new(&OverlayConfig::default());
        let texts = reader
            .read_all(&cells(9, 72), || {
                created.fetch_add(1, Ordering::SeqCst);
                Ok(Fake { fail_rank: false })
            })
            .unwrap();
        assert_eq!(texts.len(), 9);
        assert!(texts.iter().all(|t| *t == OverlayText { level: 45, master_rank: 3 }));
        assert!(created.load(Ordering::SeqCst) <= 4);
    }

    #[test]
    fn test_recognition_failure_falls_back() {
        let reader = OverlayReader::new(&OverlayConfig {
            workers: 2,
            ..OverlayConfig::default()
        });
        let texts = reader
            .read_all(&cells(3, 72), || Ok(Fake { fail_rank: true }))
            .unwrap();
        assert!(texts.iter().all(|t| *t == OverlayText { level: 45, master_rank: 0 }));
    }

    #[test]
    fn test_small_cells_keep_defaults() {
        let reader = OverlayReader::new(&OverlayConfig::default());
        let texts = reader
            .read_all(&cells(2, 30), || -> Result<Fake, Error> {
                panic!("no region fits, no recognizer needed")
            })
            .unwrap();
        assert_eq!(texts, vec![OverlayText::default(); 2]);
    }

    #[test]
    fn test_recognizer_unavailable() {
        let reader = OverlayReader::new(&OverlayConfig::default());
        let res = reader.read_all(&cells(2, 72), || -> Result<Fake, Error> {
            Err(Error::RecognizerUnavailable("not installed".to_string()))
        });
        assert!(matches!(res, Err(Error::RecognizerUnavailable(_))));
    }
}
