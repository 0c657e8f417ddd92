//! Error types shared by every stage of the grid pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for grid pipeline operations.
pub type GridResult<T> = Result<T, GridError>;

/// Error kinds raised while building, joining, persisting and querying the grid.
#[derive(Error, Debug)]
pub enum GridError {
    /// Grid spacing is not positive or does not evenly divide 180 and 360
    #[error("invalid grid spacing {0}: must be positive and evenly divide both 180 and 360")]
    InvalidSpacing(f64),

    /// An input file or directory does not exist
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// An input exists but lacks the expected attributes, columns or shape
    #[error("schema mismatch in {origin}: {detail}")]
    SchemaMismatch { origin: String, detail: String },

    /// A place name or id has no match in the catalog
    #[error("not found: {0}")]
    NotFound(String),

    /// A place name matched several rows under the strict name policy
    #[error("ambiguous name {name:?}: {count} rows match")]
    AmbiguousName { name: String, count: usize },

    /// A point matches no grid cell
    #[error("point ({lon}, {lat}) lies outside the grid")]
    PointOutsideGrid { lon: f64, lat: f64 },

    /// Too few gridded observations landed on a cell center
    #[error("coordinate mismatch: only {matched} of {total} coordinates match a cell center")]
    CoordinateMismatch { matched: usize, total: usize },

    /// A persisted grid or relation file failed validation on load
    #[error("persisted file {} is corrupt: {detail}", .path.display())]
    PersistenceCorrupt { path: PathBuf, detail: String },

    /// A data provider could not produce a local file for a variable
    #[error("data for variable {variable:?} is unavailable: {reason}")]
    DataUnavailable { variable: String, reason: String, retryable: bool },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tabular data error
    #[error("dataframe error: {0}")]
    Frame(#[from] polars::error::PolarsError),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GridError {
    /// Build a `SchemaMismatch` for the given origin (usually a file path).
    pub(crate) fn schema(origin: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch { origin: origin.into(), detail: detail.into() }
    }

    /// Build a `PersistenceCorrupt` for the given file.
    pub(crate) fn corrupt(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::PersistenceCorrupt { path: path.into(), detail: detail.into() }
    }

    /// True when the input was well formed but named nothing in the catalog or grid.
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::AmbiguousName { .. } | Self::PointOutsideGrid { .. })
    }

    /// True when the underlying data could not be read or trusted.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound(_)
                | Self::SchemaMismatch { .. }
                | Self::PersistenceCorrupt { .. }
                | Self::Io(_)
                | Self::Frame(_)
                | Self::Json(_)
        )
    }

    /// True when retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DataUnavailable { retryable: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_misses_and_data_errors_are_disjoint() {
        let misses = [
            GridError::NotFound("Atlantis".into()),
            GridError::PointOutsideGrid { lon: 200.0, lat: 0.0 },
            GridError::AmbiguousName { name: "Springfield".into(), count: 3 },
        ];
        for err in &misses {
            assert!(err.is_lookup_miss());
            assert!(!err.is_data_error());
        }

        let data = [
            GridError::SourceNotFound("missing.shp".into()),
            GridError::schema("countries.shp", "missing column COUNTRY"),
            GridError::corrupt("grid.geojson", "hash mismatch"),
        ];
        for err in &data {
            assert!(err.is_data_error());
            assert!(!err.is_lookup_miss());
        }
    }

    #[test]
    fn only_unavailable_data_is_retryable() {
        let err = GridError::DataUnavailable { variable: "air".into(), reason: "offline".into(), retryable: true };
        assert!(err.is_retryable());
        assert!(!GridError::NotFound("x".into()).is_retryable());
    }
}
