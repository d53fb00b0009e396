use crate::optimizer::SearchError;
use crate::oracle::OracleError;
use crate::tree::{DecodeError, ParseError, PermutationError, TaxaError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeClimbError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decode Error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Notation Error: {0}")]
    Parse(#[from] ParseError),

    #[error("Permutation Error: {0}")]
    Permutation(#[from] PermutationError),

    #[error("Taxa Error: {0}")]
    Taxa(#[from] TaxaError),

    #[error("Oracle Error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Search Error: {0}")]
    Search(#[from] SearchError),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Alignment Error: {0}")]
    Alignment(String),
}

pub type TcResult<T> = Result<T, TreeClimbError>;
