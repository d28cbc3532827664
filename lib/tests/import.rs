mod common;

use anyhow::Result;
use card_import_ocr::{
    Config, Error, Fingerprint, Importer, LocatorConfig, NoMatchPolicy, ReferenceTable,
    TextRecognizer,
};
use common::{draw_icon, Grid};
use image::{GrayImage, RgbaImage};

/// Six cards of 70 pixels in three columns and two rows, each with its own icon
fn screenshot() -> RgbaImage {
    let grid = Grid::new(3, 2, 70, 80);
    let mut img = grid.draw();
    let mut code = 1;
    for col in 0..3 {
        for row in 0..2 {
            let (x, y) = grid.origin(col, row);
            draw_icon(&mut img, x + 11, y + 11, code);
            code += 1;
        }
    }
    img
}

fn importer() -> Importer {
    let config = Config {
        // the notches split the cards in runs of 34 pixels
        locator: LocatorConfig {
            header_run_height: 40,
            ..LocatorConfig::default()
        },
        ..Config::default()
    };
    Importer::new(config)
}

fn fingerprints(importer: &Importer, img: &RgbaImage) -> Result<Vec<Fingerprint>> {
    let cells = importer.segment(img)?;
    Ok(cells
        .iter()
        .map(|cell| importer.hasher().fingerprint(&cell.image))
        .collect())
}

#[test]
fn test_icons_are_distinct() -> Result<()> {
    common::init_logging();
    let img = screenshot();
    let importer = importer();
    let geometry = importer.locate(&img)?;
    assert_eq!(geometry.cell_size, 72);
    let fps = fingerprints(&importer, &img)?;
    assert_eq!(fps.len(), 6);
    for i in 0..fps.len() {
        for j in i + 1..fps.len() {
            assert!(fps[i].distance(&fps[j]) > 16, "cells {} and {}", i, j);
        }
    }
    Ok(())
}

#[test]
fn test_import_exact_references() -> Result<()> {
    common::init_logging();
    let img = screenshot();
    let importer = importer();
    let fps = fingerprints(&importer, &img)?;
    let mut table = ReferenceTable::default();
    table.push("res002_no001_normal.webp", fps[1]);
    table.push("res005_no003_normal.webp", fps[4]);

    let results = importer.import_screenshot(&img, &table)?;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].index, 1);
    assert_eq!(results[1].index, 4);
    for res in results.iter() {
        assert_eq!(res.candidates.len(), 1);
        assert_eq!(res.candidates[0].distance, 0);
        assert_eq!((res.level, res.master_rank), (1, 0));
        assert_eq!(res.image.dimensions(), (72, 72));
    }
    assert_eq!(
        results[1].selected_candidate().reference_id,
        "res005_no003_normal.webp"
    );
    Ok(())
}

#[test]
fn test_import_ambiguous_match() -> Result<()> {
    common::init_logging();
    let img = screenshot();
    let importer = importer();
    let fps = fingerprints(&importer, &img)?;
    let fp = fps[2].bits();
    let mut table = ReferenceTable::default();
    table.push("far", Fingerprint::from_bits(fp ^ (((1 << 13) - 1) << 20)));
    table.push("near", Fingerprint::from_bits(fp ^ ((1 << 12) - 1)));

    let results = importer.import_screenshot(&img, &table)?;
    assert_eq!(results.len(), 1);
    let res = &results[0];
    assert_eq!(res.index, 2);
    let candidates: Vec<_> = res
        .candidates
        .iter()
        .map(|c| (c.reference_id.as_str(), c.distance))
        .collect();
    assert_eq!(candidates, vec![("near", 12), ("far", 13)]);
    Ok(())
}

#[test]
fn test_import_keeps_unidentified() -> Result<()> {
    common::init_logging();
    let img = screenshot();
    let mut config = importer().config().clone();
    config.no_match = NoMatchPolicy::Keep;
    let importer = Importer::new(config);

    let results = importer.import_screenshot(&img, &ReferenceTable::default())?;
    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|res| res.is_no_match()));
    assert!(results.iter().all(|res| res.candidates[0].distance == 64));
    Ok(())
}

/// Reads a level and a rank from the size of the region
struct Fake;

impl TextRecognizer for Fake {
    fn recognize(&mut self, img: &GrayImage) -> Result<String, Error> {
        match img.width() {
            22 => Ok("Lv.52".to_string()),
            26 => Ok("4".to_string()),
            _ => Err(Error::Recognition("unexpected region".to_string())),
        }
    }
}

#[test]
fn test_import_with_ocr() -> Result<()> {
    common::init_logging();
    let img = screenshot();
    let importer = importer();
    let fps = fingerprints(&importer, &img)?;
    let mut table = ReferenceTable::default();
    table.push("res001_no002", fps[0]);

    let results = importer.import_screenshot_with_ocr(&img, &table, || Ok(Fake))?;
    assert_eq!(results.len(), 1);
    assert_eq!((results[0].level, results[0].master_rank), (52, 4));

    let res = importer.import_screenshot_with_ocr(&img, &table, || -> Result<Fake, Error> {
        Err(Error::RecognizerUnavailable("no engine".to_string()))
    });
    assert!(matches!(res, Err(Error::RecognizerUnavailable(_))));
    Ok(())
}

#[test]
fn test_import_from_memory() -> Result<()> {
    common::init_logging();
    let img = screenshot();
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(img.clone()).write_to(&mut png, image::ImageOutputFormat::Png)?;
    let importer = importer();
    let fps = fingerprints(&importer, &img)?;
    let mut table = ReferenceTable::default();
    table.push("res003_no001", fps[5]);

    let results = importer.import_screenshot_from_memory(&png, &table)?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].index, 5);

    let res = importer.import_screenshot_from_memory(b"not an image", &table);
    assert!(matches!(res, Err(Error::Image(_))));
    Ok(())
}
