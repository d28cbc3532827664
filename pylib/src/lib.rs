use card_import_ocr::{CellResult, Importer, ReferenceTable, TesseractCli};
use image::RgbaImage;
use pyo3::{
    create_exception, exceptions::PyException, prelude::*, types::PyDict, wrap_pyfunction, PyErr,
};

create_exception!(pycard_import_ocr, CardImportOcrException, PyException);

fn process_result(res: &CellResult, py: Python) -> PyResult<PyObject> {
    let candidates: Vec<(String, u32, f64)> = res
        .candidates
        .iter()
        .map(|c| (c.reference_id.clone(), c.distance, c.similarity()))
        .collect();
    let dict = PyDict::new(py);
    dict.set_item("index", res.index)?;
    dict.set_item("fingerprint", res.fingerprint.to_string())?;
    dict.set_item("candidates", candidates)?;
    dict.set_item("level", res.level)?;
    dict.set_item("master_rank", res.master_rank)?;
    dict.set_item("selected_candidate_index", res.selected_index())?;
    Ok(dict.into())
}

fn import_cards(
    screenshot: &RgbaImage,
    reference: Vec<(String, String)>,
    ocr: bool,
    py: Python,
) -> PyResult<Vec<PyObject>> {
    let table = ReferenceTable::from_pairs(reference).map_err(CardImportOcrError::from)?;
    let importer = Importer::default();
    let results = if ocr {
        importer.import_screenshot_with_ocr(screenshot, &table, TesseractCli::new)
    } else {
        importer.import_screenshot(screenshot, &table)
    }
    .map_err(CardImportOcrError::from)?;
    results.iter().map(|res| process_result(res, py)).collect()
}

/// Identify the cards in a screenshot file.
///
/// `reference` is a list of `(identifier, fingerprint)` pairs. With `ocr` the level and master rank are
/// read with the tesseract executable.
#[pyfunction]
fn import_cards_from_file(
    screenshot_filename: String,
    reference: Vec<(String, String)>,
    ocr: bool,
    py: Python,
) -> PyResult<Vec<PyObject>> {
    let img = card_import_ocr::load_screenshot(&screenshot_filename)
        .map_err(CardImportOcrError::from)?;
    import_cards(&img, reference, ocr, py)
}

/// Identify the cards in an encoded screenshot.
#[pyfunction]
fn import_cards_from_memory(
    screenshot: &[u8],
    reference: Vec<(String, String)>,
    ocr: bool,
    py: Python,
) -> PyResult<Vec<PyObject>> {
    let img = card_import_ocr::load_screenshot_from_memory(screenshot)
        .map_err(CardImportOcrError::from)?;
    import_cards(&img, reference, ocr, py)
}

/// Wrapper around card_import_ocr::Error so we convert to PyErr
struct CardImportOcrError(card_import_ocr::Error);

impl From<card_import_ocr::Error> for CardImportOcrError {
    fn from(err: card_import_ocr::Error) -> CardImportOcrError {
        CardImportOcrError(err)
    }
}

impl From<CardImportOcrError> for PyErr {
    fn from(err: CardImportOcrError) -> PyErr {
        PyErr::new::<CardImportOcrException, String>(err.0.to_string())
    }
}

#[pymodule]
fn pycard_import_ocr(py: Python, m: &PyModule) -> PyResult<()> {
    m.add("CardImportOcrException", py.get_type::<CardImportOcrException>())?;
    m.add_function(wrap_pyfunction!(import_cards_from_file, m)?)?;
    m.add_function(wrap_pyfunction!(import_cards_from_memory, m)?)?;
    Ok(())
}
