use std::fs::File;
use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{KinshipError, Result};

use super::io::{csv_reader, find_column, strip_comment};

/// Mapping from internal (herd-book, ear-tag, ...) identifiers to the
/// canonical identifiers used as pedigree keys.
#[derive(Debug, Clone, Default)]
pub struct IdMapping {
    map: IndexMap<String, String>,
}

impl IdMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Add or replace a mapping, returning the previous canonical ID.
    pub fn insert(&mut self, internal: &str, standard: &str) -> Option<String> {
        self.map.insert(internal.to_string(), standard.to_string())
    }

    /// The canonical ID for `id`, or `id` itself when it is not mapped.
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.map.get(id).map(String::as_str).unwrap_or(id)
    }

    /// Read a mapping from a CSV file.
    ///
    /// Expected columns (header required): `internal_id` and `standard_id`
    /// (or `internal` / `standard`); other columns are ignored. Lines
    /// starting with `#` are skipped and trailing `#` comments are stripped.
    /// Rows with an empty field are skipped; a repeated internal ID replaces
    /// the earlier mapping. Both cases are logged as warnings.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a column is missing.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Read a mapping from any CSV source. See [`IdMapping::from_csv`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv_reader(reader);
        let headers = reader.headers()?.clone();
        let internal_col = find_column(&headers, &["internal_id", "internal"])?;
        let standard_col = find_column(&headers, &["standard_id", "standard"])?;

        let mut mapping = Self::new();

        for result in reader.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line());

            let internal = record.get(internal_col).map(strip_comment);
            let standard = record.get(standard_col).map(strip_comment);

            match (internal, standard) {
                (Some(internal), Some(standard)) if !internal.is_empty() && !standard.is_empty() => {
                    if let Some(previous) = mapping.insert(internal, standard) {
                        log::warn!(
                            "Line {}: duplicate internal ID '{}' (was '{}', now '{}')",
                            line,
                            internal,
                            previous,
                            standard
                        );
                    }
                }
                (Some(_), Some(_)) => {
                    log::warn!("Line {}: empty internal or standard ID, row skipped", line);
                }
                _ => {
                    return Err(KinshipError::Data(format!(
                        "Line {}: mapping row has too few fields",
                        line
                    )));
                }
            }
        }

        log::debug!("Loaded {} ID mappings", mapping.len());
        Ok(mapping)
    }
}
