use anyhow::{Context, Result};
use imageproc::drawing::draw_antialiased_line_segment_mut;
use imageproc::pixelops::interpolate;
use card_import_ocr::{Layout, LocatorConfig};

fn run() -> Result<()> {
    env_logger::init();
    let path = std::env::args().nth(1).expect("Usage: grid SCREENSHOT");
    eprintln!("read image from {}", path);
    let mut img = image::open(&path)
        .with_context(|| format!("Failed to open {}", path))?
        .into_rgba8();

    let geometry = Layout::new(&img, &LocatorConfig::default()).locate()?;
    eprintln!("content box: {:?}", geometry.content_box);
    eprintln!("cell size: {}", geometry.cell_size);
    for (i, y) in geometry.row_offsets.iter().enumerate() {
        eprintln!("  Row {}: {}", i, y);
    }
    for (i, x) in geometry.column_offsets.iter().enumerate() {
        eprintln!("  Col {}: {}", i, x);
    }

    // outline every cell, top left edges red, bottom right edges blue
    let red = image::Rgba([255, 0, 0, 255]);
    let blue = image::Rgba([0, 0, 255, 255]);
    for r in geometry.cells() {
        let (x0, y0) = (r.x as i32, r.y as i32);
        let (x1, y1) = ((r.x + r.width) as i32, (r.y + r.height) as i32);
        draw_antialiased_line_segment_mut(&mut img, (x0, y0), (x1, y0), red, interpolate);
        draw_antialiased_line_segment_mut(&mut img, (x0, y0), (x0, y1), red, interpolate);
        draw_antialiased_line_segment_mut(&mut img, (x0, y1), (x1, y1), blue, interpolate);
        draw_antialiased_line_segment_mut(&mut img, (x1, y0), (x1, y1), blue, interpolate);
    }
    img.save("grid.png")?;
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
    }
}
