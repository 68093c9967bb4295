use std::fs::File;
use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{KinshipError, Result};
use crate::genetics::{ParentCodes, Pedigree};

use super::idmap::IdMapping;

/// How raw pedigree rows are turned into animal records.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Mapping applied to sire and dam identifiers.
    pub id_mapping: Option<IdMapping>,
    /// Tokens meaning "no recorded parent".
    pub parent_codes: ParentCodes,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id_mapping(mut self, mapping: IdMapping) -> Self {
        self.id_mapping = Some(mapping);
        self
    }

    pub fn parent_codes(mut self, codes: ParentCodes) -> Self {
        self.parent_codes = codes;
        self
    }

    /// Normalize a raw parent field and map it to its canonical ID.
    fn parent(&self, raw: &str) -> Option<String> {
        let id = self.parent_codes.parse(strip_comment(raw))?;
        match &self.id_mapping {
            Some(mapping) => Some(mapping.resolve(&id).to_string()),
            None => Some(id),
        }
    }
}

impl Pedigree {
    /// Read a pedigree from a CSV file.
    ///
    /// Expected columns (header required, case-insensitive): `animal` (or
    /// `id` / `standard_id`), `sire` (or `sire_id`), `dam` (or `dam_id`).
    /// Other columns are ignored. Unknown parents are coded as `"0"`, `""`,
    /// or `"NA"`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, columns are missing, or a
    /// row is too short.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_csv_with(path, &LoadOptions::default())
    }

    /// Read a pedigree from a CSV file with custom [`LoadOptions`].
    pub fn from_csv_with<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let ped = Self::from_reader(file, options)?;
        log::info!(
            "Loaded {} animals from '{}'",
            ped.n_animals(),
            path.display()
        );
        Ok(ped)
    }

    /// Read a pedigree from any CSV source.
    ///
    /// Lines starting with `#` are skipped and anything after a `#` inside a
    /// field is dropped. Rows with an empty animal ID are skipped, and a
    /// repeated animal ID replaces the earlier row; both are logged as
    /// warnings.
    pub fn from_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<Self> {
        let mut reader = csv_reader(reader);
        let headers = reader.headers()?.clone();
        let animal_col = find_column(&headers, &["animal", "id", "standard_id"])?;
        let sire_col = find_column(&headers, &["sire", "sire_id"])?;
        let dam_col = find_column(&headers, &["dam", "dam_id"])?;

        let mut rows: IndexMap<String, (Option<String>, Option<String>)> = IndexMap::new();

        for result in reader.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line());

            let field = |col: usize, name: &'static str| {
                record.get(col).ok_or_else(|| {
                    KinshipError::Data(format!("Line {}: missing {} field", line, name))
                })
            };

            let animal = strip_comment(field(animal_col, "animal")?);
            let sire = options.parent(field(sire_col, "sire")?);
            let dam = options.parent(field(dam_col, "dam")?);

            if animal.is_empty() {
                log::warn!("Line {}: empty animal ID, row skipped", line);
                continue;
            }

            if rows.insert(animal.to_string(), (sire, dam)).is_some() {
                log::warn!(
                    "Line {}: duplicate animal ID '{}', replacing earlier row",
                    line,
                    animal
                );
            }
        }

        let mut ped = Pedigree::new();
        for (id, (sire, dam)) in &rows {
            ped.add_animal(id, sire.as_deref(), dam.as_deref())?;
        }

        let dangling = ped.dangling_parents();
        if !dangling.is_empty() {
            log::debug!(
                "{} parent IDs are not animals of the pedigree and count as unknown",
                dangling.len()
            );
        }

        Ok(ped)
    }
}

pub(crate) fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader)
}

/// Position of the first header matching one of `names` (case-insensitive).
pub(crate) fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Result<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        .ok_or_else(|| KinshipError::ColumnNotFound(names[0].to_string()))
}

/// Drop everything from the first `#` on, then trim.
pub(crate) fn strip_comment(field: &str) -> &str {
    match field.find('#') {
        Some(pos) => field[..pos].trim(),
        None => field.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    /// Helper: write CSV content to a temporary file and return the path.
    fn write_temp_csv(content: &str) -> String {
        let dir = std::env::temp_dir();
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        let file_name = format!("test_kinship_io_{}_{}.csv", std::process::id(), id);
        let path = dir.join(file_name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_from_csv_basic() {
        let csv = "animal,sire,dam\n1,0,0\n2,0,0\n3,1,2\n";
        let path = write_temp_csv(csv);
        let ped = Pedigree::from_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(ped.n_animals(), 3);
        assert_eq!(ped.sire(2), Some(0));
        assert_eq!(ped.dam(2), Some(1));
        assert_eq!(ped.sire(0), None);
    }

    #[test]
    fn test_from_csv_empty_and_na_parents() {
        let csv = "animal,sire,dam\nA,,\nB,A,NA\nC,A,B\n";
        let path = write_temp_csv(csv);
        let ped = Pedigree::from_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(ped.n_animals(), 3);
        assert_eq!(ped.sire(0), None);
        assert_eq!(ped.dam(0), None);
        assert_eq!(ped.sire(1), Some(0)); // B's sire is A
        assert_eq!(ped.dam(1), None);
        assert_eq!(ped.dam(2), Some(1)); // C's dam is B
    }

    #[test]
    fn test_from_reader_alternate_headers_and_extra_columns() {
        let csv = "Standard_ID,birth_date,Sire_ID,Dam_ID\n\
                   P1,2019-03-01,0,0\n\
                   P2,2019-04-11,0,0\n\
                   Y,2021-02-20,P1,P2\n";
        let ped = Pedigree::from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap();
        let y = ped.animal_index("Y").unwrap();
        assert_eq!(ped.sire_id(y), Some("P1"));
        assert_eq!(ped.dam_id(y), Some("P2"));
    }

    #[test]
    fn test_comments_stripped() {
        let csv = "animal,sire,dam\n\
                   # founders\n\
                   S,0,0\n\
                   D,0,0 # bought in\n\
                   X,S # checked,D\n";
        let ped = Pedigree::from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(ped.n_animals(), 3);
        let x = ped.animal_index("X").unwrap();
        assert_eq!(ped.sire_id(x), Some("S"));
        assert_eq!(ped.dam_id(x), Some("D"));
        assert_eq!(ped.dam_id(ped.animal_index("D").unwrap()), None);
    }

    #[test]
    fn test_duplicate_row_replaces_and_empty_id_skipped() {
        let csv = "animal,sire,dam\nA,0,0\n,A,0\nB,0,0\nA,B,0\n";
        let ped = Pedigree::from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(ped.n_animals(), 2);
        let a = ped.animal_index("A").unwrap();
        assert_eq!(ped.sire(a), ped.animal_index("B"));
    }

    #[test]
    fn test_id_mapping_applied_to_parents() {
        let mut mapping = IdMapping::new();
        mapping.insert("c-1", "S");
        mapping.insert("c-2", "D");
        let options = LoadOptions::new()
            .id_mapping(mapping)
            .parent_codes(ParentCodes::new().with_code("-"));

        let csv = "animal,sire,dam\nS,-,-\nD,-,-\nX,c-1,c-2\n";
        let ped = Pedigree::from_reader(csv.as_bytes(), &options).unwrap();
        let x = ped.animal_index("X").unwrap();
        assert_eq!(ped.sire(x), ped.animal_index("S"));
        assert_eq!(ped.dam(x), ped.animal_index("D"));
        assert!(ped.dangling_parents().is_empty());
    }

    #[test]
    fn test_missing_column_errors() {
        let csv = "animal,sire\nA,0\n";
        let err = Pedigree::from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("'dam'"), "Error was: {}", msg);
    }

    #[test]
    fn test_short_row_errors() {
        let csv = "animal,sire,dam\nA,0\n";
        let result = Pedigree::from_reader(csv.as_bytes(), &LoadOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment(" A1 # note"), "A1");
        assert_eq!(strip_comment("#all"), "");
        assert_eq!(strip_comment(" B "), "B");
    }
}
