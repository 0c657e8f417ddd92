use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{common, error::{GridError, GridResult}};

/// Integrity record of one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct FileEntry {
    pub sha256: String,
    pub rows: usize,
}

/// Per-spacing index of stored files and their hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Manifest {
    version: String,
    crs: String,
    spacing: f64,
    #[serde(default)]
    files: BTreeMap<String, FileEntry>,
}

impl Manifest {
    pub(crate) fn new(spacing: f64) -> Self {
        Self {
            version: "1".into(),
            crs: "EPSG:4326".into(),
            spacing,
            files: BTreeMap::new(),
        }
    }

    #[inline] pub(crate) fn spacing(&self) -> f64 { self.spacing }

    #[inline] pub(crate) fn entry(&self, name: &str) -> Option<&FileEntry> { self.files.get(name) }

    /// Record the hash and row count of `bytes` under `name`.
    pub(crate) fn record(&mut self, name: &str, bytes: &[u8], rows: usize) {
        self.files.insert(name.to_string(), FileEntry { sha256: common::sha256_bytes(bytes), rows });
    }

    /// Drop the entry for `name`, if any.
    pub(crate) fn forget(&mut self, name: &str) {
        self.files.remove(name);
    }

    /// Check `bytes` against the recorded hash for `name`.
    pub(crate) fn verify(&self, name: &str, bytes: &[u8], path: &Path) -> GridResult<&FileEntry> {
        let entry = self.entry(name)
            .ok_or_else(|| GridError::corrupt(path, "file is not recorded in manifest.json (incomplete write?)"))?;
        let actual = common::sha256_bytes(bytes);
        if actual != entry.sha256 {
            return Err(GridError::corrupt(path, format!("sha256 {actual} does not match manifest {}", entry.sha256)));
        }
        Ok(entry)
    }

    /// Read a manifest file.
    pub(crate) fn read(path: &Path) -> GridResult<Self> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| GridError::corrupt(path, format!("unparseable manifest: {e}")))
    }

    /// Write the manifest atomically.
    pub(crate) fn write(&self, path: &Path) -> GridResult<()> {
        common::write_atomic(path, &serde_json::to_vec_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_detects_tampering() {
        let mut manifest = Manifest::new(2.5);
        manifest.record("grid.geojson", b"cells", 10);

        let path = Path::new("grid.geojson");
        assert_eq!(manifest.verify("grid.geojson", b"cells", path).unwrap().rows, 10);
        assert!(matches!(manifest.verify("grid.geojson", b"cellz", path), Err(GridError::PersistenceCorrupt { .. })));
        assert!(matches!(manifest.verify("other.csv", b"cells", path), Err(GridError::PersistenceCorrupt { .. })));

        manifest.forget("grid.geojson");
        assert!(manifest.entry("grid.geojson").is_none());
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");

        let mut manifest = Manifest::new(10.0);
        manifest.record("grid_city_sjoin.csv", b"grid_id,city_id\n", 0);
        manifest.write(&path).unwrap();

        let loaded = Manifest::read(&path).unwrap();
        assert_eq!(loaded.spacing(), 10.0);
        assert_eq!(loaded.entry("grid_city_sjoin.csv"), manifest.entry("grid_city_sjoin.csv"));
    }
}
