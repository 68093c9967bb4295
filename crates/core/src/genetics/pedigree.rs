use std::collections::{HashMap, VecDeque};

use crate::error::{KinshipError, Result};

/// A single pedigree record: animal with optional sire and dam.
#[derive(Debug, Clone)]
struct PedigreeRecord {
    /// Animal identifier string.
    id: String,
    /// Normalized sire identifier as recorded, whether or not it is a key.
    sire_id: Option<String>,
    /// Normalized dam identifier as recorded, whether or not it is a key.
    dam_id: Option<String>,
    /// Index of sire in the records vector, or `None` if unknown to the pedigree.
    sire: Option<usize>,
    /// Index of dam in the records vector, or `None` if unknown to the pedigree.
    dam: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    Sire,
    Dam,
}

/// Pedigree mapping each animal to its recorded sire and dam.
///
/// Animals are stored in insertion order and addressed by contiguous 0-based
/// indices. A parent identifier does not have to be an animal of the
/// pedigree itself: such references are kept as recorded (see
/// [`Pedigree::sire_id`]) but resolve to no index, which the coefficient
/// engine treats as an unknown individual.
///
/// Parents may be added before or after their offspring; references are
/// resolved as soon as the referenced animal is added.
#[derive(Debug, Clone, Default)]
pub struct Pedigree {
    /// Ordered list of pedigree records.
    records: Vec<PedigreeRecord>,
    /// Mapping from animal ID string to its 0-based index.
    id_to_index: HashMap<String, usize>,
    /// Parent references not (yet) matching any animal, by parent ID.
    unresolved: HashMap<String, Vec<(usize, Parent)>>,
}

impl Pedigree {
    /// Create an empty pedigree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of animals in the pedigree.
    pub fn n_animals(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up the 0-based index of an animal by its ID string.
    pub fn animal_index(&self, id: &str) -> Option<usize> {
        self.id_to_index.get(id).copied()
    }

    /// Whether `id` is an animal of this pedigree.
    pub fn contains(&self, id: &str) -> bool {
        self.id_to_index.contains_key(id)
    }

    /// Look up the ID string of an animal by its 0-based index.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn animal_id(&self, index: usize) -> &str {
        &self.records[index].id
    }

    /// Return the sire index for animal at `index`, or `None` if unknown.
    pub fn sire(&self, index: usize) -> Option<usize> {
        self.records[index].sire
    }

    /// Return the dam index for animal at `index`, or `None` if unknown.
    pub fn dam(&self, index: usize) -> Option<usize> {
        self.records[index].dam
    }

    /// Recorded sire identifier of the animal at `index`.
    pub fn sire_id(&self, index: usize) -> Option<&str> {
        self.records[index].sire_id.as_deref()
    }

    /// Recorded dam identifier of the animal at `index`.
    pub fn dam_id(&self, index: usize) -> Option<&str> {
        self.records[index].dam_id.as_deref()
    }

    /// Animal IDs in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(|r| r.id.as_str())
    }

    /// Parent identifiers referenced by some record but absent as animals,
    /// sorted.
    pub fn dangling_parents(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.unresolved.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Add an animal to the pedigree.
    ///
    /// `sire` and `dam` are optional parent ID strings and are normalized
    /// with [`parse_parent`]. A parent that has not been added yet is linked
    /// once it is.
    ///
    /// # Errors
    /// Returns an error if the animal ID is empty or already exists.
    pub fn add_animal(&mut self, id: &str, sire: Option<&str>, dam: Option<&str>) -> Result<()> {
        let id = id.trim();
        if id.is_empty() {
            return Err(KinshipError::Pedigree("Empty animal ID".to_string()));
        }
        if self.id_to_index.contains_key(id) {
            return Err(KinshipError::Pedigree(format!(
                "Duplicate animal ID: '{}'",
                id
            )));
        }

        let index = self.records.len();
        let sire_id = sire.and_then(parse_parent);
        let dam_id = dam.and_then(parse_parent);

        self.records.push(PedigreeRecord {
            id: id.to_string(),
            sire_id: None,
            dam_id: None,
            sire: None,
            dam: None,
        });
        self.id_to_index.insert(id.to_string(), index);

        // Offspring added earlier may be waiting for this animal.
        if let Some(waiting) = self.unresolved.remove(id) {
            for (child, role) in waiting {
                self.link(child, role, index);
            }
        }

        self.set_parent(index, Parent::Sire, sire_id);
        self.set_parent(index, Parent::Dam, dam_id);

        Ok(())
    }

    /// Build a pedigree from (animal, sire, dam) triples.
    ///
    /// Parent values of `None` indicate unknown parents. Input order does not
    /// matter.
    ///
    /// # Errors
    /// Returns an error if duplicate or empty animal IDs are found.
    pub fn from_triples(triples: &[(String, Option<String>, Option<String>)]) -> Result<Self> {
        let mut ped = Self::new();
        for (id, sire, dam) in triples {
            ped.add_animal(id, sire.as_deref(), dam.as_deref())?;
        }
        Ok(ped)
    }

    /// Generation number of every animal, by index.
    ///
    /// Animals without known parents are generation 0; any other animal is
    /// one generation after its latest known parent. Animals on a parent
    /// cycle, or descending from one, have no generation (`None`).
    pub fn generations(&self) -> Vec<Option<u32>> {
        let n = self.records.len();

        // Kahn's algorithm over parent -> offspring edges.
        let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0u32; n];

        for (i, rec) in self.records.iter().enumerate() {
            for parent in [rec.sire, rec.dam].into_iter().flatten() {
                children_of[parent].push(i);
                in_degree[i] += 1;
            }
        }

        let mut generation: Vec<Option<u32>> = vec![None; n];
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        for &founder in &queue {
            generation[founder] = Some(0);
        }

        while let Some(node) = queue.pop_front() {
            let next = generation[node].unwrap_or(0) + 1;
            for &child in &children_of[node] {
                generation[child] = Some(generation[child].map_or(next, |g| g.max(next)));
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    queue.push_back(child);
                }
            }
        }

        for (g, &remaining) in generation.iter_mut().zip(&in_degree) {
            if remaining > 0 {
                *g = None;
            }
        }

        generation
    }

    fn set_parent(&mut self, child: usize, role: Parent, parent_id: Option<String>) {
        let Some(parent_id) = parent_id else {
            return;
        };
        match self.id_to_index.get(&parent_id).copied() {
            Some(parent) => self.link(child, role, parent),
            None => self
                .unresolved
                .entry(parent_id.clone())
                .or_default()
                .push((child, role)),
        }
        let rec = &mut self.records[child];
        match role {
            Parent::Sire => rec.sire_id = Some(parent_id),
            Parent::Dam => rec.dam_id = Some(parent_id),
        }
    }

    fn link(&mut self, child: usize, role: Parent, parent: usize) {
        let rec = &mut self.records[child];
        match role {
            Parent::Sire => rec.sire = Some(parent),
            Parent::Dam => rec.dam = Some(parent),
        }
    }
}

/// Tokens that mark an unrecorded parent in source data.
///
/// Matching is done on the trimmed value; `"0"` and `"NA"` (ASCII
/// case-insensitive) are always recognised, and so is the empty string.
#[derive(Debug, Clone, Default)]
pub struct ParentCodes {
    extra: Vec<String>,
}

impl ParentCodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also treat `code` as "no recorded parent".
    pub fn with_code(mut self, code: &str) -> Self {
        let code = code.trim();
        if !code.is_empty() {
            self.extra.push(code.to_string());
        }
        self
    }

    pub fn is_unknown(&self, trimmed: &str) -> bool {
        trimmed.is_empty()
            || trimmed == "0"
            || trimmed.eq_ignore_ascii_case("na")
            || self.extra.iter().any(|c| c == trimmed)
    }

    /// Normalize a raw parent field, returning `None` for unknown parents.
    pub fn parse(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if self.is_unknown(trimmed) {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Parse a parent string, returning `None` for unknown parents.
///
/// Unknown parents are coded as `"0"`, `""` (or whitespace), `"NA"`, or `"na"`.
pub fn parse_parent(s: &str) -> Option<String> {
    ParentCodes::default().parse(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(id: &str, sire: Option<&str>, dam: Option<&str>) -> (String, Option<String>, Option<String>) {
        (
            id.to_string(),
            sire.map(str::to_string),
            dam.map(str::to_string),
        )
    }

    #[test]
    fn test_simple_3_animal_pedigree() {
        let triples = vec![
            triple("1", None, None),
            triple("2", None, None),
            triple("3", Some("1"), Some("2")),
        ];
        let ped = Pedigree::from_triples(&triples).unwrap();
        assert_eq!(ped.n_animals(), 3);

        assert_eq!(ped.animal_index("1"), Some(0));
        assert_eq!(ped.animal_index("2"), Some(1));
        assert_eq!(ped.animal_index("3"), Some(2));

        assert_eq!(ped.sire(2), Some(0));
        assert_eq!(ped.dam(2), Some(1));
        assert_eq!(ped.sire(0), None);
        assert_eq!(ped.dam(0), None);
        assert!(ped.dangling_parents().is_empty());
    }

    #[test]
    fn test_offspring_before_parents() {
        let triples = vec![
            triple("3", Some("1"), Some("2")),
            triple("1", None, None),
            triple("2", None, None),
        ];
        let ped = Pedigree::from_triples(&triples).unwrap();

        let idx_3 = ped.animal_index("3").unwrap();
        assert_eq!(ped.sire(idx_3), ped.animal_index("1"));
        assert_eq!(ped.dam(idx_3), ped.animal_index("2"));
        assert!(ped.dangling_parents().is_empty());
    }

    #[test]
    fn test_dangling_parent_kept_as_recorded() {
        let triples = vec![triple("A", Some("GHOST"), Some("B")), triple("B", None, None)];
        let ped = Pedigree::from_triples(&triples).unwrap();

        let a = ped.animal_index("A").unwrap();
        assert_eq!(ped.sire(a), None);
        assert_eq!(ped.sire_id(a), Some("GHOST"));
        assert_eq!(ped.dam(a), ped.animal_index("B"));
        assert_eq!(ped.dangling_parents(), vec!["GHOST"]);
    }

    #[test]
    fn test_parent_sentinels_normalized_on_add() {
        let mut ped = Pedigree::new();
        ped.add_animal("X", Some("0"), Some("   ")).unwrap();
        assert_eq!(ped.sire_id(0), None);
        assert_eq!(ped.dam_id(0), None);
        assert!(ped.dangling_parents().is_empty());
    }

    #[test]
    fn test_self_parent_is_linked() {
        // Malformed but accepted: the engine bounds the recursion.
        let mut ped = Pedigree::new();
        ped.add_animal("A", Some("A"), None).unwrap();
        assert_eq!(ped.sire(0), Some(0));
    }

    #[test]
    fn test_generations_deep_chain() {
        // Chain: 4 -> 3 -> 2 -> 1, given in reverse order.
        let triples = vec![
            triple("4", Some("3"), None),
            triple("3", Some("2"), Some("1")),
            triple("2", Some("1"), None),
            triple("1", None, None),
        ];
        let ped = Pedigree::from_triples(&triples).unwrap();
        let gen = ped.generations();

        assert_eq!(gen[ped.animal_index("1").unwrap()], Some(0));
        assert_eq!(gen[ped.animal_index("2").unwrap()], Some(1));
        // Latest parent wins.
        assert_eq!(gen[ped.animal_index("3").unwrap()], Some(2));
        assert_eq!(gen[ped.animal_index("4").unwrap()], Some(3));
    }

    #[test]
    fn test_generations_cycle_has_none() {
        let triples = vec![
            triple("F", None, None),
            triple("A", Some("B"), Some("F")),
            triple("B", Some("A"), None),
            triple("C", Some("A"), Some("F")),
        ];
        let ped = Pedigree::from_triples(&triples).unwrap();
        let gen = ped.generations();

        assert_eq!(gen[ped.animal_index("F").unwrap()], Some(0));
        assert_eq!(gen[ped.animal_index("A").unwrap()], None);
        assert_eq!(gen[ped.animal_index("B").unwrap()], None);
        assert_eq!(gen[ped.animal_index("C").unwrap()], None);
    }

    #[test]
    fn test_duplicate_animal_id() {
        let triples = vec![triple("1", None, None), triple("1", None, None)];
        let result = Pedigree::from_triples(&triples);
        assert!(result.is_err());
        let msg = format!("{}", result.unwrap_err());
        assert!(msg.contains("Duplicate"), "Error was: {}", msg);
    }

    #[test]
    fn test_empty_animal_id_rejected() {
        let mut ped = Pedigree::new();
        assert!(ped.add_animal("  ", None, None).is_err());
        assert!(ped.is_empty());
    }

    #[test]
    fn test_ids_in_insertion_order() {
        let triples = vec![triple("Beta", None, None), triple("Alpha", None, None)];
        let ped = Pedigree::from_triples(&triples).unwrap();
        let ids: Vec<&str> = ped.ids().collect();
        assert_eq!(ids, vec!["Beta", "Alpha"]);
        assert!(ped.contains("Alpha"));
        assert!(!ped.contains("Gamma"));
    }

    #[test]
    fn test_parse_parent_variants() {
        assert_eq!(parse_parent("0"), None);
        assert_eq!(parse_parent(""), None);
        assert_eq!(parse_parent("  "), None);
        assert_eq!(parse_parent("NA"), None);
        assert_eq!(parse_parent("na"), None);
        assert_eq!(parse_parent("Na"), None);
        assert_eq!(parse_parent("1"), Some("1".to_string()));
        assert_eq!(parse_parent(" SireA "), Some("SireA".to_string()));
    }

    #[test]
    fn test_extra_parent_codes() {
        let codes = ParentCodes::new().with_code("-").with_code("UNKNOWN");
        assert_eq!(codes.parse("-"), None);
        assert_eq!(codes.parse(" UNKNOWN "), None);
        assert_eq!(codes.parse("unknown"), Some("unknown".to_string()));
        assert_eq!(codes.parse("0"), None);
    }
}
