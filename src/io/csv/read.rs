//! CSV reading operations.

use std::{fs::File, io::Cursor, path::Path};

use polars::{frame::DataFrame, io::SerReader, prelude::{CsvReadOptions, CsvReader}};

use crate::{common, error::GridResult};

/// Reads a CSV file from `path` into a Polars DataFrame.
///
/// Date parsing is left off, so date-like columns arrive as strings.
pub(crate) fn read_csv(path: &Path) -> GridResult<DataFrame> {
    common::require_file_exists(path)?;
    let file = File::open(path)?;
    Ok(CsvReader::new(file)
        .with_options(CsvReadOptions::default())
        .finish()?)
}

/// Read DataFrame from CSV bytes.
pub(crate) fn read_csv_bytes(bytes: &[u8]) -> GridResult<DataFrame> {
    Ok(CsvReader::new(Cursor::new(bytes))
        .with_options(CsvReadOptions::default())
        .finish()?)
}
