pub mod runner;
pub mod sweep;
pub mod tolerance;
pub mod trajectory;

pub use self::runner::{
    ClimbOptions, ClimbResult, HillClimber, IterationReport, ProgressCallback, Silent,
};
pub use self::sweep::{adjust, PassOutcome};
pub use self::tolerance::Tolerance;
pub use self::trajectory::{LossTrajectory, TrajectoryFormat};

use crate::oracle::OracleError;
use crate::tree::{DecodeError, ParseError, PermutationError};
use std::fmt;
use thiserror::Error;

/// Which evaluation of a pass failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Baseline,
    Candidate { coordinate: usize, value: usize },
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Baseline => write!(f, "baseline"),
            Stage::Candidate { coordinate, value } => {
                write!(f, "candidate v[{}] = {}", coordinate, value)
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Notation(#[from] ParseError),

    #[error(transparent)]
    Permutation(#[from] PermutationError),
}

#[derive(Error, Debug)]
#[error("{stage} evaluation of {v:?} failed: {source}")]
pub struct EvaluationFailure {
    pub stage: Stage,
    pub v: Vec<usize>,
    #[source]
    pub source: EvaluationError,
}

#[derive(Error, Debug)]
pub enum SearchError {
    /// The starting tree could not be scored; no iteration ran.
    #[error("initial tree could not be scored: {0}")]
    Initial(#[source] EvaluationFailure),

    /// A later evaluation failed. `partial` is the best state reached before the failure.
    #[error("search interrupted after {} iterations: {failure}", partial.iterations)]
    Interrupted {
        #[source]
        failure: EvaluationFailure,
        partial: Box<ClimbResult>,
    },

    #[error("search setup failed: {0}")]
    Setup(String),
}
