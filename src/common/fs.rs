use std::fs;
use std::io::Write;
use std::path::Path;

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::{GridError, GridResult};

/// Create the directory if it doesn’t exist; error if a non-directory exists there.
pub(crate) fn ensure_dir_exists(path: &Path) -> GridResult<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(GridError::schema(path.display().to_string(), "path exists but is not a directory"));
        }
    } else {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Error with `SourceNotFound` unless the file exists.
pub(crate) fn require_file_exists(path: &Path) -> GridResult<()> {
    if !path.exists() {
        return Err(GridError::SourceNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(GridError::schema(path.display().to_string(), "path exists but is not a file"));
    }
    Ok(())
}

/// Replace the file at `path` with `bytes` so readers see either the old or the new contents.
///
/// The bytes are written and synced to a temporary file in the same directory,
/// which is then renamed over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> GridResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir_exists(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Hex-encoded SHA-256 digest of `bytes`.
pub(crate) fn sha256_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
