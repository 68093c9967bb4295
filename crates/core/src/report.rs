use indexmap::IndexMap;

use crate::types::{Coefficient, Scalar};

/// Inbreeding coefficients for a set of animals, in query order.
#[derive(Debug, Clone, Default)]
pub struct InbreedingReport {
    entries: IndexMap<String, Coefficient>,
}

impl InbreedingReport {
    pub fn new(entries: IndexMap<String, Coefficient>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Coefficient> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Coefficient)> + '_ {
        self.entries.iter().map(|(id, c)| (id.as_str(), c))
    }

    /// Number of animals with a coefficient.
    pub fn computed(&self) -> usize {
        self.entries.values().filter(|c| c.is_available()).count()
    }

    /// Number of animals whose query was aborted.
    pub fn failed(&self) -> usize {
        self.len() - self.computed()
    }

    /// Mean F over computed animals, `None` if there are none.
    pub fn mean_inbreeding(&self) -> Option<Scalar> {
        let values: Vec<Scalar> = self.entries.values().filter_map(Coefficient::value).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<Scalar>() / values.len() as Scalar)
        }
    }

    /// Number of computed animals with F > 0.
    pub fn n_inbred(&self) -> usize {
        self.entries
            .values()
            .filter_map(Coefficient::value)
            .filter(|&f| f > 0.0)
            .count()
    }

    /// One value per animal, with failures as [`crate::FAILURE_SENTINEL`].
    pub fn values_or_sentinel(&self) -> Vec<Scalar> {
        self.entries.values().map(Coefficient::or_sentinel).collect()
    }

    /// Format the per-animal coefficients followed by summary counts.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str("=== Inbreeding Coefficients ===\n\n");
        for (id, coefficient) in &self.entries {
            match coefficient {
                Coefficient::Value(f) => s.push_str(&format!("{:<20} F = {:.6}\n", id, f)),
                Coefficient::Unavailable { .. } => {
                    s.push_str(&format!("{:<20} F = unavailable\n", id))
                }
            }
        }

        s.push_str(&format!(
            "\nComputed: {}   Failed: {}   Inbred (F > 0): {}\n",
            self.computed(),
            self.failed(),
            self.n_inbred()
        ));
        if let Some(mean) = self.mean_inbreeding() {
            s.push_str(&format!("Mean F: {:.6}\n", mean));
        }

        s
    }
}
