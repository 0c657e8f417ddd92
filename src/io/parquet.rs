//! Parquet reading operations.
//!
//! This module is only available when the `parquet` feature is enabled.

use std::{fs::File, path::Path};

use polars::{frame::DataFrame, io::SerReader, prelude::ParquetReader};

use crate::{common, error::GridResult};

/// Reads a Parquet file from `path` into a Polars DataFrame.
pub(crate) fn read_parquet(path: &Path) -> GridResult<DataFrame> {
    common::require_file_exists(path)?;
    let file = File::open(path)?;
    Ok(ParquetReader::new(file).finish()?)
}
