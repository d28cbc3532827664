use anyhow::{Context, Result};
use std::fs::File;
use std::time::Instant;
use card_import_ocr::{Config, Importer, ReferenceTable, TesseractCli};

const USAGE: &str = "Usage: import SCREENSHOT REFERENCE_JSON [CONFIG_JSON] [--ocr]";

fn run() -> Result<()> {
    env_logger::init();
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let ocr = match args.iter().position(|arg| arg == "--ocr") {
        Some(i) => {
            args.remove(i);
            true
        }
        None => false,
    };
    let path = args.get(0).expect(USAGE);
    let reference = args.get(1).expect(USAGE);

    let table = ReferenceTable::from_reader(
        File::open(reference).with_context(|| format!("Failed to open {}", reference))?,
    )?;
    eprintln!("{} reference icons", table.len());
    let config = match args.get(2) {
        Some(config) => Config::from_reader(
            File::open(config).with_context(|| format!("Failed to open {}", config))?,
        )?,
        None => Config::default(),
    };
    let importer = Importer::new(config);

    let t0 = Instant::now();
    let img = image::open(path)
        .with_context(|| format!("Failed to open {}", path))?
        .into_rgba8();
    let results = if ocr {
        importer.import_screenshot_with_ocr(&img, &table, TesseractCli::new)?
    } else {
        importer.import_screenshot(&img, &table)?
    };
    eprintln!("import screenshot took {:?}", t0.elapsed());

    for res in results.iter().filter(|res| res.candidates.len() > 1) {
        eprintln!(
            "cell {}: {} candidates, best {}",
            res.index,
            res.candidates.len(),
            res.selected_candidate().reference_id
        );
    }
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:?}", err);
    }
}
