pub mod data;
pub mod error;
pub mod genetics;
pub mod report;
pub mod types;

pub use error::{KinshipError, Result};
pub use genetics::{CoefficientEngine, EngineConfig, Pedigree};
pub use report::InbreedingReport;
pub use types::{Coefficient, FAILURE_SENTINEL};
