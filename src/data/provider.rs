use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{GridError, GridResult};
use super::variable::{variable, VariableSpec};

/// Produces a local file for a gridded variable.
///
/// Implementations that download data own their retry policy; the core only
/// sees the resulting path or a `DataUnavailable` error.
pub trait DatasetProvider {
    fn fetch(&self, key: &str) -> GridResult<PathBuf>;
}

/// Resolves variables to `<stem>.nc`, `<stem>.csv` or `<stem>.parquet` under a directory.
///
/// NetCDF and Parquet are only considered with their features enabled, and
/// are preferred over CSV in that order.
#[derive(Debug, Clone)]
pub struct LocalDirProvider {
    dir: PathBuf,
}

impl LocalDirProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    #[inline] pub fn dir(&self) -> &Path { &self.dir }

    fn candidates(&self, spec: &VariableSpec) -> Vec<PathBuf> {
        let mut extensions = Vec::new();
        if cfg!(feature = "netcdf") {
            extensions.push("nc");
        }
        if cfg!(feature = "parquet") {
            extensions.push("parquet");
        }
        extensions.push("csv");
        extensions.into_iter()
            .map(|ext| self.dir.join(format!("{}.{ext}", spec.stem)))
            .collect()
    }
}

impl DatasetProvider for LocalDirProvider {
    fn fetch(&self, key: &str) -> GridResult<PathBuf> {
        let spec = variable(key).ok_or_else(|| GridError::DataUnavailable {
            variable: key.to_string(),
            reason: "not a registered variable".into(),
            retryable: false,
        })?;

        let candidates = self.candidates(spec);
        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => {
                debug!(variable = key, path = %path.display(), "resolved local dataset");
                Ok(path.clone())
            }
            None => Err(GridError::DataUnavailable {
                variable: key.to_string(),
                reason: format!("no file at {}", candidates.iter()
                    .map(|path| path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" or ")),
                retryable: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_csv_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("air.mon.mean.csv"), "time,lat,lon,air\n").unwrap();

        let provider = LocalDirProvider::new(dir.path());
        assert_eq!(provider.fetch("air").unwrap(), dir.path().join("air.mon.mean.csv"));
    }

    #[test]
    fn netcdf_is_only_resolved_with_its_feature() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("omega.sig995.mon.mean.nc"), b"CDF\x01").unwrap();

        let fetched = LocalDirProvider::new(dir.path()).fetch("omega.sig995");
        if cfg!(feature = "netcdf") {
            assert_eq!(fetched.unwrap(), dir.path().join("omega.sig995.mon.mean.nc"));
        } else {
            assert!(fetched.unwrap_err().is_retryable());
        }
    }

    #[test]
    fn absent_file_is_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalDirProvider::new(dir.path()).fetch("slp").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn unknown_variable_is_not_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalDirProvider::new(dir.path()).fetch("snow").unwrap_err();
        assert!(matches!(err, GridError::DataUnavailable { retryable: false, .. }));
    }
}
