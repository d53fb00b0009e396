pub mod raxml;

pub use self::raxml::RaxmlOracle;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Names the scratch file of one oracle invocation.
///
/// Concurrent invocations never share an identity: the session is unique per optimizer and
/// `(coordinate, candidate)` is unique within a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScratchId {
    pub session: String,
    pub coordinate: Option<usize>,
    pub candidate: Option<usize>,
}

impl ScratchId {
    pub fn baseline(session: &str) -> Self {
        Self {
            session: session.to_string(),
            coordinate: None,
            candidate: None,
        }
    }

    pub fn candidate(session: &str, coordinate: usize, candidate: usize) -> Self {
        Self {
            session: session.to_string(),
            coordinate: Some(coordinate),
            candidate: Some(candidate),
        }
    }

    pub fn file_name(&self) -> String {
        match (self.coordinate, self.candidate) {
            (Some(c), Some(j)) => format!("{}-c{}-j{}.tree", self.session, c, j),
            _ => format!("{}-baseline.tree", self.session),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoreRequest {
    /// Bracket notation with taxon names and no branch lengths.
    pub newick: String,
    pub scratch: ScratchId,
}

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("scratch file {path:?}: {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lost track of the oracle process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("oracle exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("no log-likelihood in oracle output: {output}")]
    Unparsable { output: String },

    #[error("oracle did not answer within {0:?}")]
    Timeout(Duration),

    #[error("oracle returned a non-finite loss ({0})")]
    NonFinite(f64),

    #[error("{0}")]
    Other(String),
}

/// Scores one tree; lower is better.
///
/// Implementations are called concurrently from the sweep's worker pool.
pub trait Oracle: Send + Sync {
    fn score(&self, request: &ScoreRequest) -> Result<f64, OracleError>;
}

impl<F> Oracle for F
where
    F: Fn(&ScoreRequest) -> Result<f64, OracleError> + Send + Sync,
{
    fn score(&self, request: &ScoreRequest) -> Result<f64, OracleError> {
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_names_are_distinct() {
        let base = ScratchId::baseline("s");
        let a = ScratchId::candidate("s", 3, 0);
        let b = ScratchId::candidate("s", 0, 3);
        assert_eq!(base.file_name(), "s-baseline.tree");
        assert_eq!(a.file_name(), "s-c3-j0.tree");
        assert_ne!(a.file_name(), b.file_name());
    }
}
