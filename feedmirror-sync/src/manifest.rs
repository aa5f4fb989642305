//! Run manifest at `<root>/data/manifest.json`.

use std::io::ErrorKind;
use std::path::Path;

use feedmirror_core::Manifest;

use crate::error::{io_err, SyncError};

/// Write the manifest atomically, replacing the previous run's.
pub fn write_at(path: &Path, manifest: &Manifest) -> Result<(), SyncError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid manifest path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(manifest)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Read the last manifest, if one has been written.
pub fn load_at(path: &Path) -> Result<Option<Manifest>, SyncError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(path, err)),
    };
    Ok(Some(serde_json::from_str(&contents)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use feedmirror_core::{ChangeReason, ManifestEntry, ManifestStatus, ResourceUrl};
    use tempfile::TempDir;

    #[test]
    fn missing_manifest_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(load_at(&tmp.path().join("manifest.json")).unwrap().is_none());
    }

    #[test]
    fn write_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data").join("manifest.json");
        let now = Utc::now();
        let manifest = Manifest::from_entries(
            now,
            vec![ManifestEntry {
                name: "a.csv".into(),
                url: ResourceUrl::from("https://example.com/a.csv"),
                status: ManifestStatus::Skipped,
                reason: Some(ChangeReason::NoChangeDetected),
                error: None,
                checked_at: now,
                downloaded_at: None,
            }],
            false,
        );

        write_at(&path, &manifest).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(load_at(&path).unwrap(), Some(manifest));
    }

    #[test]
    fn corrupt_manifest_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        std::fs::write(&path, "[").unwrap();
        assert!(matches!(load_at(&path), Err(SyncError::Json(_))));
    }
}
