// Genetics module
// Pedigree, coancestry and inbreeding coefficients

pub mod coancestry;
pub mod diagnostics;
pub mod pedigree;

pub use coancestry::{CoefficientEngine, EngineConfig};
pub use diagnostics::{DiagnosticSink, LogSink, MemorySink};
pub use pedigree::{parse_parent, ParentCodes, Pedigree};
