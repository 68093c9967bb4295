use std::collections::HashMap;

use indexmap::IndexMap;
use log::Level;

use crate::error::{KinshipError, Result};
use crate::report::InbreedingReport;
use crate::types::{Coefficient, Scalar};

use super::diagnostics::{DiagnosticSink, LogSink};
use super::pedigree::Pedigree;

/// Limits applied while evaluating a single top-level query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Recursion depth past which a branch contributes 0 (with a warning).
    pub max_depth: usize,
    /// Capacity of the evaluation frame stack. Exceeding it aborts the query.
    pub max_frames: usize,
    /// Evaluation steps allowed per query. Exceeding it aborts the query.
    pub max_steps: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 50,
            max_frames: 4096,
            max_steps: 50_000_000,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn max_frames(mut self, frames: usize) -> Self {
        self.max_frames = frames;
        self
    }

    pub fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = steps;
        self
    }

    /// # Errors
    /// Returns an error if any limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(KinshipError::InvalidParameter(
                "max_depth must be positive".to_string(),
            ));
        }
        if self.max_frames == 0 {
            return Err(KinshipError::InvalidParameter(
                "max_frames must be positive".to_string(),
            ));
        }
        if self.max_steps == 0 {
            return Err(KinshipError::InvalidParameter(
                "max_steps must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Unordered pair of animal indices, earlier animal first.
type PairKey = (usize, usize);

#[derive(Debug, Clone, Copy)]
enum Goal {
    Inbreeding(usize),
    Coancestry(usize, usize),
}

/// Continuation waiting for the value of a sub-goal.
#[derive(Debug)]
enum Frame {
    /// F(animal) = f(sire, dam).
    Inbreeding { animal: usize },
    /// f(a, a) = 0.5 * (1 + F(a)).
    SelfCoancestry { animal: usize },
    /// f(a, b) = 0.5 * (f(other, sire) + f(other, dam)), tracing the later
    /// animal of the pair. `dam` is still to be visited.
    Trace {
        key: PairKey,
        other: usize,
        depth: usize,
        dam: Option<usize>,
        sum: Scalar,
    },
}

enum Eval {
    Call(Goal, usize),
    Value(Scalar),
}

/// Recursive tabular-method evaluator for inbreeding and coancestry
/// coefficients over a fixed pedigree.
///
/// Results are memoized for the lifetime of the engine: one table keyed by
/// animal for inbreeding, one keyed by the unordered pair of animals for
/// coancestry. Unknown identifiers and missing parents are base cases worth
/// 0 and are never cached.
///
/// For two distinct animals the later one is expanded through its parents,
/// where "later" is the larger (generation, identifier); animals on a parent
/// cycle sort after every other animal and among themselves by identifier.
///
/// The recurrence runs on an explicit frame stack, so the limits in
/// [`EngineConfig`] are the only bounds on evaluation:
///
/// - a branch deeper than `max_depth` contributes 0 and a warning is emitted;
/// - a query that needs more than `max_frames` frames or `max_steps` steps is
///   aborted with [`KinshipError::RecursionExhausted`] and an error is
///   emitted. Entries cached before the abort stay valid.
pub struct CoefficientEngine<'a> {
    pedigree: &'a Pedigree,
    config: EngineConfig,
    sink: Box<dyn DiagnosticSink + 'a>,
    /// Generation per animal index, `u32::MAX` for animals on a cycle.
    generation: Vec<u32>,
    inbreeding_cache: HashMap<usize, Scalar>,
    coancestry_cache: HashMap<PairKey, Scalar>,
}

impl<'a> CoefficientEngine<'a> {
    /// Create an engine with default limits that logs through `log`.
    pub fn new(pedigree: &'a Pedigree) -> Self {
        Self {
            pedigree,
            config: EngineConfig::default(),
            sink: Box::new(LogSink),
            generation: pedigree
                .generations()
                .into_iter()
                .map(|g| g.unwrap_or(u32::MAX))
                .collect(),
            inbreeding_cache: HashMap::new(),
            coancestry_cache: HashMap::new(),
        }
    }

    /// # Errors
    /// Returns an error if `config` fails [`EngineConfig::validate`].
    pub fn with_config(mut self, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Route warnings and errors to `sink` instead of the `log` facade.
    pub fn with_sink<S: DiagnosticSink + 'a>(mut self, sink: S) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pedigree(&self) -> &'a Pedigree {
        self.pedigree
    }

    /// Number of animals with a cached inbreeding coefficient.
    pub fn cached_inbreeding(&self) -> usize {
        self.inbreeding_cache.len()
    }

    /// Number of animal pairs with a cached coancestry coefficient.
    pub fn cached_pairs(&self) -> usize {
        self.coancestry_cache.len()
    }

    /// Inbreeding coefficient F of `id`.
    ///
    /// Animals unknown to the pedigree, and animals missing either parent,
    /// have F = 0.
    ///
    /// # Errors
    /// Returns [`KinshipError::RecursionExhausted`] if the evaluation budget
    /// is exceeded; other queries are unaffected.
    pub fn inbreeding_of(&mut self, id: &str) -> Result<Scalar> {
        match self.pedigree.animal_index(id) {
            Some(animal) => self.evaluate(Goal::Inbreeding(animal), id),
            None => Ok(0.0),
        }
    }

    /// Coancestry (kinship) coefficient f between `a` and `b`.
    ///
    /// Symmetric in its arguments; 0 if either animal is unknown.
    ///
    /// # Errors
    /// Same as [`CoefficientEngine::inbreeding_of`].
    pub fn coancestry_of(&mut self, a: &str, b: &str) -> Result<Scalar> {
        match (self.pedigree.animal_index(a), self.pedigree.animal_index(b)) {
            (Some(ia), Some(ib)) => {
                let label = format!("{}, {}", a, b);
                self.evaluate(Goal::Coancestry(ia, ib), &label)
            }
            _ => Ok(0.0),
        }
    }

    /// Additive genetic relationship a = 2f between `a` and `b`.
    pub fn relationship_of(&mut self, a: &str, b: &str) -> Result<Scalar> {
        Ok(2.0 * self.coancestry_of(a, b)?)
    }

    /// Query every animal of the pedigree in insertion order.
    pub fn inbreeding_all(&mut self) -> InbreedingReport {
        let pedigree = self.pedigree;
        let mut entries = IndexMap::with_capacity(pedigree.n_animals());
        for id in pedigree.ids() {
            let coefficient = Coefficient::from(self.inbreeding_of(id));
            entries.insert(id.to_string(), coefficient);
        }
        InbreedingReport::new(entries)
    }

    fn evaluate(&mut self, goal: Goal, label: &str) -> Result<Scalar> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut steps: u64 = 0;
        let mut eval = Eval::Call(goal, 0);

        loop {
            eval = match eval {
                Eval::Call(goal, depth) => {
                    steps += 1;
                    if stack.len() > self.config.max_frames || steps > self.config.max_steps {
                        return Err(self.exhausted(label, stack.len(), steps));
                    }
                    self.enter(goal, depth, &mut stack)
                }
                Eval::Value(value) => match stack.pop() {
                    Some(frame) => self.resume(frame, value, &mut stack),
                    None => return Ok(value),
                },
            };
        }
    }

    fn enter(&mut self, goal: Goal, depth: usize, stack: &mut Vec<Frame>) -> Eval {
        match goal {
            Goal::Inbreeding(animal) => {
                if depth > self.config.max_depth {
                    self.warn_depth(&format!(
                        "inbreeding of '{}'",
                        self.pedigree.animal_id(animal)
                    ));
                    return Eval::Value(0.0);
                }
                if let Some(&f) = self.inbreeding_cache.get(&animal) {
                    return Eval::Value(f);
                }
                match (self.pedigree.sire(animal), self.pedigree.dam(animal)) {
                    (Some(s), Some(d)) => {
                        stack.push(Frame::Inbreeding { animal });
                        Eval::Call(Goal::Coancestry(s, d), depth + 1)
                    }
                    _ => {
                        self.inbreeding_cache.insert(animal, 0.0);
                        Eval::Value(0.0)
                    }
                }
            }
            Goal::Coancestry(a, b) => {
                if depth > self.config.max_depth {
                    self.warn_depth(&format!(
                        "coancestry of '{}' and '{}'",
                        self.pedigree.animal_id(a),
                        self.pedigree.animal_id(b)
                    ));
                    return Eval::Value(0.0);
                }
                let key = self.pair_key(a, b);
                if let Some(&f) = self.coancestry_cache.get(&key) {
                    return Eval::Value(f);
                }
                if a == b {
                    stack.push(Frame::SelfCoancestry { animal: a });
                    return Eval::Call(Goal::Inbreeding(a), depth + 1);
                }

                let (other, traced) = key;
                match (self.pedigree.sire(traced), self.pedigree.dam(traced)) {
                    (None, None) => {
                        self.coancestry_cache.insert(key, 0.0);
                        Eval::Value(0.0)
                    }
                    (Some(s), dam) => {
                        stack.push(Frame::Trace {
                            key,
                            other,
                            depth,
                            dam,
                            sum: 0.0,
                        });
                        Eval::Call(Goal::Coancestry(other, s), depth + 1)
                    }
                    (None, Some(d)) => {
                        stack.push(Frame::Trace {
                            key,
                            other,
                            depth,
                            dam: None,
                            sum: 0.0,
                        });
                        Eval::Call(Goal::Coancestry(other, d), depth + 1)
                    }
                }
            }
        }
    }

    fn resume(&mut self, frame: Frame, value: Scalar, stack: &mut Vec<Frame>) -> Eval {
        match frame {
            Frame::Inbreeding { animal } => {
                self.inbreeding_cache.insert(animal, value);
                Eval::Value(value)
            }
            Frame::SelfCoancestry { animal } => {
                let f = 0.5 * (1.0 + value);
                self.coancestry_cache.insert((animal, animal), f);
                Eval::Value(f)
            }
            Frame::Trace {
                key,
                other,
                depth,
                dam,
                sum,
            } => {
                let sum = sum + value;
                match dam {
                    Some(d) => {
                        stack.push(Frame::Trace {
                            key,
                            other,
                            depth,
                            dam: None,
                            sum,
                        });
                        Eval::Call(Goal::Coancestry(other, d), depth + 1)
                    }
                    None => {
                        let f = 0.5 * sum;
                        self.coancestry_cache.insert(key, f);
                        Eval::Value(f)
                    }
                }
            }
        }
    }

    /// Order a pair by (generation, identifier) so (a, b) and (b, a) share
    /// one entry. The second member is the one traced through its parents,
    /// so an ancestor is never traced towards its own descendant.
    fn pair_key(&self, a: usize, b: usize) -> PairKey {
        let rank_a = (self.generation[a], self.pedigree.animal_id(a));
        let rank_b = (self.generation[b], self.pedigree.animal_id(b));
        if rank_a <= rank_b {
            (a, b)
        } else {
            (b, a)
        }
    }

    fn warn_depth(&self, what: &str) {
        self.sink.emit(
            Level::Warn,
            &format!(
                "Maximum recursion depth ({}) exceeded computing {}; assuming 0",
                self.config.max_depth, what
            ),
        );
    }

    fn exhausted(&self, label: &str, frames: usize, steps: u64) -> KinshipError {
        let err = KinshipError::RecursionExhausted {
            id: label.to_string(),
            frames,
            steps,
        };
        self.sink.emit(
            Level::Error,
            &format!(
                "{} (limits: max_depth={}, max_frames={}, max_steps={}; cached: {} animals, {} pairs)",
                err,
                self.config.max_depth,
                self.config.max_frames,
                self.config.max_steps,
                self.inbreeding_cache.len(),
                self.coancestry_cache.len()
            ),
        );
        err
    }
}
