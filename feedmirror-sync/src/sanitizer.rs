//! Sanitizer: raw payload to canonical stored CSV.
//!
//! The payload is parsed as a headed CSV table and every disallowed column
//! is dropped from the header and every row. Output goes to a fresh temp
//! file beside the destination and is renamed over it only after the whole
//! payload has been written, so a malformed payload never touches the
//! canonical copy.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use tempfile::NamedTempFile;

use feedmirror_core::SyncSettings;

use crate::error::SanitizeError;

/// Counts reported after a successful sanitize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeStats {
    /// Data rows written, excluding the header.
    pub rows: u64,
    /// Header names that were present and removed.
    pub removed_columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Sanitizer {
    disallowed_fields: Vec<String>,
    delimiter: u8,
}

impl Sanitizer {
    pub fn new(disallowed_fields: &[String], delimiter: u8) -> Self {
        Self {
            disallowed_fields: disallowed_fields
                .iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect(),
            delimiter,
        }
    }

    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self::new(&settings.disallowed_fields, settings.delimiter_byte())
    }

    /// Sanitize `raw` into `destination`, replacing any previous file there.
    pub fn sanitize(&self, raw: &Path, destination: &Path) -> Result<SanitizeStats, SanitizeError> {
        let io = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| SanitizeError::Io { path, source }
        };

        let file = File::open(raw).map_err(io(raw))?;
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(BufReader::new(file));

        let headers = reader.byte_headers()?.clone();
        if headers.is_empty() {
            return Err(SanitizeError::Empty);
        }

        let mut keep = Vec::with_capacity(headers.len());
        let mut removed_columns = Vec::new();
        for (idx, name) in headers.iter().enumerate() {
            let name = String::from_utf8_lossy(name);
            let name = name.trim();
            if self.disallowed_fields.iter().any(|f| f == name) {
                removed_columns.push(name.to_string());
            } else {
                keep.push(idx);
            }
        }

        let dir = match destination.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io(dir))?;
        let mut staged = NamedTempFile::new_in(dir).map_err(io(dir))?;
        let staged_path = staged.path().to_path_buf();

        let mut rows = 0u64;
        {
            let mut writer = WriterBuilder::new()
                .delimiter(self.delimiter)
                .quote_style(QuoteStyle::Necessary)
                .terminator(Terminator::Any(b'\n'))
                .from_writer(staged.as_file_mut());

            writer.write_record(keep.iter().filter_map(|&i| headers.get(i)))?;
            for record in reader.byte_records() {
                let record = record?;
                writer.write_record(keep.iter().filter_map(|&i| record.get(i)))?;
                rows += 1;
            }
            writer.flush().map_err(io(&staged_path))?;
        }

        staged
            .persist(destination)
            .map_err(|e| SanitizeError::Io {
                path: destination.to_path_buf(),
                source: e.error,
            })?;

        Ok(SanitizeStats {
            rows,
            removed_columns,
        })
    }
}
