use thiserror::Error;

#[derive(Error, Debug)]
pub enum KinshipError {
    #[error("Pedigree error: {0}")]
    Pedigree(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Column '{0}' not found in CSV header")]
    ColumnNotFound(String),

    #[error("Invalid engine parameter: {0}")]
    InvalidParameter(String),

    #[error(
        "Evaluation budget exhausted for '{id}' ({frames} frames, {steps} steps); \
         the pedigree may contain a cycle or be pathologically deep"
    )]
    RecursionExhausted { id: String, frames: usize, steps: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, KinshipError>;
