use anyhow::{Context, Result};
use card_import_ocr::{collage, Importer};

fn run() -> Result<()> {
    env_logger::init();
    let path = std::env::args().nth(1).expect("Usage: collage SCREENSHOT");

    let img = image::open(&path)
        .with_context(|| format!("Failed to open {}", path))?
        .into_rgba8();
    eprintln!("read image from {}", path);
    let cells = Importer::default().segment(&img)?;
    eprintln!("{} cells", cells.len());
    let thumbnails: Vec<_> = cells.iter().map(|cell| &cell.image).collect();

    let collage = collage(&thumbnails, None);
    collage.save("collage.png")?;

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:?}", err);
    }
}
