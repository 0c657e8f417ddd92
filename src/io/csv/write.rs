//! CSV writing operations.

use std::path::Path;

use polars::{frame::DataFrame, io::SerWriter, prelude::CsvWriter};

use crate::{common, error::GridResult};

/// Write a DataFrame to CSV bytes.
pub(crate) fn write_csv_bytes(df: &DataFrame) -> GridResult<Vec<u8>> {
    let mut out = Vec::new();
    CsvWriter::new(&mut out)
        .finish(&mut df.clone())?;
    Ok(out)
}

/// Write a DataFrame to a CSV file at `path`, replacing it atomically.
pub(crate) fn write_csv(df: &DataFrame, path: &Path) -> GridResult<()> {
    common::write_atomic(path, &write_csv_bytes(df)?)
}
