//! Resource list: one absolute URL per line.
//!
//! Blank lines and `#` comments are ignored. Each URL is mirrored into
//! `<data_dir>/<last path segment>`; the list is rejected outright if two
//! different URLs would share a local file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{io_err, ConfigError};
use crate::paths::MANIFEST_FILE;
use crate::types::{ResourceDescriptor, ResourceUrl};

/// Read and parse the resource list at `path`.
///
/// Returns `ConfigError::NotFound` when the file is absent; any error here
/// aborts the run before a single resource is touched.
pub fn load_resource_list_at(
    path: &Path,
    data_dir: &Path,
) -> Result<Vec<ResourceDescriptor>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    parse_resource_list(&contents, data_dir)
}

/// Parse resource list text. Order of first appearance is preserved.
pub fn parse_resource_list(
    contents: &str,
    data_dir: &Path,
) -> Result<Vec<ResourceDescriptor>, ConfigError> {
    let mut resources: Vec<ResourceDescriptor> = Vec::new();
    let mut by_path: HashMap<PathBuf, ResourceUrl> = HashMap::new();

    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !is_absolute_http_url(line) {
            return Err(ConfigError::InvalidUrl {
                line: idx + 1,
                url: line.to_string(),
            });
        }

        let url = ResourceUrl::from(line);
        let name = file_name_from_url(line).ok_or_else(|| ConfigError::NoFileName {
            url: line.to_string(),
        })?;
        if name == MANIFEST_FILE {
            return Err(ConfigError::ReservedName { url: url.0 });
        }
        let local_path = data_dir.join(&name);

        match by_path.get(&local_path) {
            Some(existing) if *existing == url => continue,
            Some(existing) => {
                return Err(ConfigError::DuplicateLocalPath {
                    path: local_path,
                    first: existing.0.clone(),
                    second: url.0,
                });
            }
            None => {}
        }

        by_path.insert(local_path.clone(), url.clone());
        resources.push(ResourceDescriptor {
            url,
            name,
            local_path,
        });
    }

    Ok(resources)
}

fn split_scheme(url: &str) -> Option<&str> {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    if lower.starts_with("https://") {
        Some(&url[8..])
    } else if lower.starts_with("http://") {
        Some(&url[7..])
    } else {
        None
    }
}

fn is_absolute_http_url(url: &str) -> bool {
    if url.chars().any(char::is_whitespace) {
        return false;
    }
    match split_scheme(url) {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            !host.is_empty()
        }
        None => false,
    }
}

/// Last non-empty path segment of `url`, with query and fragment removed and
/// characters outside `[A-Za-z0-9._-]` replaced by `_`.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let rest = split_scheme(url)?;
    let without_query = rest.split(['?', '#']).next().unwrap_or_default();
    let (_host, path) = without_query.split_once('/')?;
    let segment = path.split('/').rfind(|s| !s.is_empty())?;
    if segment == "." || segment == ".." {
        return None;
    }
    let name: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    Some(name)
}
