//! Diff cache: last known remote signals and content hash per resource.
//!
//! Persists a JSON object keyed by resource URL at
//! `<root>/state/diff-cache.json`. Writes use the atomic `.tmp` + rename
//! pattern, so a crash mid-write leaves the previous cache intact.
//!
//! A cache that exists but cannot be read or parsed is not fatal: the run
//! logs a warning and starts from an empty cache, which at worst costs one
//! redundant download per resource.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use feedmirror_core::CacheEntry;

use crate::error::{io_err, CacheCorruptionError, SyncError};

/// In-memory diff cache. Sorted by URL so the persisted file diffs cleanly.
pub type DiffCache = BTreeMap<String, CacheEntry>;

/// Load the cache at `path`, reporting corruption to the caller.
///
/// A missing file is an empty cache.
pub fn try_load_at(path: &Path) -> Result<DiffCache, CacheCorruptionError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(DiffCache::new()),
        Err(source) => {
            return Err(CacheCorruptionError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if contents.trim().is_empty() {
        return Ok(DiffCache::new());
    }
    serde_json::from_str(&contents).map_err(|source| CacheCorruptionError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the cache at `path`, treating corruption as an empty cache.
pub fn load_at(path: &Path) -> DiffCache {
    match try_load_at(path) {
        Ok(cache) => cache,
        Err(err) => {
            tracing::warn!("{err}; starting from an empty diff cache");
            DiffCache::new()
        }
    }
}

/// Save the cache to `path` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(path: &Path, cache: &DiffCache) -> Result<(), SyncError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("invalid diff cache path"),
        ));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(cache)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Delete the persisted cache. Deleting a cache that does not exist is fine.
pub fn clear_at(path: &Path) -> Result<bool, SyncError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(io_err(path, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn entry(hash: &str) -> CacheEntry {
        CacheEntry {
            entity_tag: Some("\"v1\"".to_string()),
            last_modified: None,
            byte_length: Some(12),
            stored_length: Some(12),
            content_hash: Some(hash.to_string()),
            last_downloaded_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_cache_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let cache = try_load_at(&tmp.path().join("state/diff-cache.json")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn roundtrip_save_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state").join("diff-cache.json");
        let mut cache = DiffCache::new();
        cache.insert("https://example.com/b.csv".to_string(), entry("bbbb"));
        cache.insert("https://example.com/a.csv".to_string(), entry("aaaa"));

        save_at(&path, &cache).unwrap();
        let loaded = try_load_at(&path).unwrap();
        assert_eq!(loaded, cache);
    }

    #[test]
    fn tmp_file_cleaned_up_after_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("diff-cache.json");
        save_at(&path, &DiffCache::new()).unwrap();
        assert!(
            !path.with_extension("json.tmp").exists(),
            "tmp file should be removed after atomic rename"
        );
    }

    #[test]
    fn persisted_keys_are_urls() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("diff-cache.json");
        let mut cache = DiffCache::new();
        cache.insert("https://example.com/a.csv".to_string(), entry("aaaa"));
        save_at(&path, &cache).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let record = &raw["https://example.com/a.csv"];
        assert_eq!(record["entityTag"], "\"v1\"");
        assert_eq!(record["contentHash"], "aaaa");
        assert!(record["lastDownloadedAt"].is_string());
    }

    #[test]
    fn corrupt_cache_is_reported_then_treated_as_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("diff-cache.json");
        std::fs::write(&path, "{ this is not json").unwrap();

        assert!(matches!(
            try_load_at(&path),
            Err(CacheCorruptionError::Json { .. })
        ));
        assert!(load_at(&path).is_empty());
    }

    #[test]
    fn blank_file_is_empty_cache() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("diff-cache.json");
        std::fs::write(&path, "\n").unwrap();
        assert!(try_load_at(&path).unwrap().is_empty());
    }

    #[test]
    fn clear_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("diff-cache.json");
        save_at(&path, &DiffCache::new()).unwrap();

        assert!(clear_at(&path).unwrap());
        assert!(!path.exists());
        assert!(!clear_at(&path).unwrap());
    }
}
