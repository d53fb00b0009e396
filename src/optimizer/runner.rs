use super::sweep::{self, Evaluator, PassFailure, PassOutcome};
use super::{EvaluationFailure, LossTrajectory, SearchError, Stage, Tolerance};
use crate::config::Config;
use crate::error::TcResult;
use crate::oracle::{Oracle, ScratchId};
use crate::tree::{self, equivalence, vector, TaxaMap};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

pub struct ClimbOptions {
    pub patience: usize,
    pub rooted: bool,
    pub num_threads: usize,
    pub tolerance: Tolerance,
}

impl Default for ClimbOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ClimbOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            patience: cfg.search.patience,
            rooted: cfg.search.rooted,
            num_threads: cfg.search.worker_count(),
            tolerance: Tolerance::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClimbResult {
    pub v: Vec<usize>,
    /// Leaf identifiers of `v` to taxon names.
    pub taxa: TaxaMap,
    /// Best loss accepted by the outer loop; equals the last trajectory entry.
    pub loss: f64,
    pub trajectory: LossTrajectory,
    pub iterations: usize,
}

impl ClimbResult {
    /// Notation of the result with taxon names at the leaves.
    pub fn labeled_newick(&self, rooted: bool) -> TcResult<String> {
        let notation = vector::decode_newick(&self.v, rooted)?;
        Ok(tree::relabel(&notation, &self.taxa)?)
    }
}

#[derive(Debug, Clone)]
pub struct IterationReport {
    pub iteration: usize,
    pub loss: f64,
    pub improved: bool,
    pub wait: usize,
    pub patience: usize,
}

/// A trait for receiving updates after every outer iteration.
/// Boolean return value indicates if the search should continue (true) or abort (false).
pub trait ProgressCallback {
    fn on_iteration(&self, report: &IterationReport) -> bool;
}

pub struct Silent;

impl ProgressCallback for Silent {
    fn on_iteration(&self, _report: &IterationReport) -> bool {
        true
    }
}

/// Coordinate-wise hill climbing over v-vectors.
pub struct HillClimber<O: Oracle> {
    oracle: O,
    options: ClimbOptions,
    pool: ThreadPool,
    rng: fastrand::Rng,
    session: String,
}

impl<O: Oracle> HillClimber<O> {
    pub fn new(oracle: O, options: ClimbOptions, seed: u64) -> TcResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(options.num_threads.max(1))
            .thread_name(|i| format!("oracle-{}", i))
            .build()
            .map_err(|e| SearchError::Setup(e.to_string()))?;

        Ok(Self {
            oracle,
            options,
            pool,
            rng: fastrand::Rng::with_seed(seed),
            session: uuid::Uuid::new_v4().simple().to_string(),
        })
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// A random starting vector for `k + 1` taxa, drawn from the climber's own stream.
    pub fn sample_start(&mut self, k: usize) -> Vec<usize> {
        vector::sample(k, &mut self.rng)
    }

    /// One canonicalize-then-sweep pass, as run by every outer iteration.
    pub fn optimise_single(
        &self,
        v: &[usize],
        taxa: &TaxaMap,
    ) -> Result<PassOutcome, EvaluationFailure> {
        self.pass(v, taxa).map_err(|f| f.failure)
    }

    fn pass(&self, v: &[usize], taxa: &TaxaMap) -> Result<PassOutcome, PassFailure> {
        sweep::optimise_single(
            &self.oracle,
            &self.pool,
            &self.session,
            self.options.rooted,
            self.options.tolerance,
            v,
            taxa,
        )
    }

    fn check_inputs(&self, v: &[usize], taxa: &TaxaMap) -> Result<(), SearchError> {
        vector::validate(v).map_err(|e| {
            SearchError::Initial(EvaluationFailure {
                stage: Stage::Baseline,
                v: v.to_vec(),
                source: e.into(),
            })
        })?;
        if taxa.len() != v.len() + 1 {
            return Err(SearchError::Setup(format!(
                "vector of length {} needs {} taxa, mapping has {}",
                v.len(),
                v.len() + 1,
                taxa.len()
            )));
        }
        Ok(())
    }

    pub fn run<CB: ProgressCallback>(
        &mut self,
        v: Vec<usize>,
        taxa: TaxaMap,
        callback: CB,
    ) -> Result<ClimbResult, SearchError> {
        self.check_inputs(&v, &taxa)?;

        let initial = Evaluator {
            oracle: &self.oracle,
            taxa: &taxa,
            rooted: self.options.rooted,
            session: &self.session,
        }
        .score(&v, ScratchId::baseline(&self.session))
        .map_err(|source| {
            SearchError::Initial(EvaluationFailure {
                stage: Stage::Baseline,
                v: v.clone(),
                source,
            })
        })?;

        info!("Initial loss: {:.3}", initial);

        let patience = self.options.patience;
        let mut current_v = v;
        let mut current_taxa = taxa;
        let mut current_loss = initial;
        let mut trajectory = LossTrajectory::starting_at(initial);
        let mut wait = 0;
        let mut iterations = 0;

        loop {
            // The drawn equivalent is only logged; the pass below starts from current_v.
            match equivalence::sample_equivalent(&current_v, self.options.rooted, &mut self.rng) {
                Ok(Some(proposal)) => debug!("Equivalent proposal {:?} (unused)", proposal.v),
                Ok(None) => debug!("No equivalent encoding for {:?}", current_v),
                Err(e) => warn!("Equivalence sampling failed: {}", e),
            }

            let outcome = match self.pass(&current_v, &current_taxa) {
                Ok(outcome) => outcome,
                Err(PassFailure { failure, progress }) => {
                    let tolerance = self.options.tolerance;
                    let partial = match progress {
                        Some(p) if tolerance.improves(current_loss, p.loss) => {
                            // The unfinished pass closes the trajectory.
                            trajectory.push(p.loss);
                            ClimbResult {
                                v: p.v,
                                taxa: p.taxa,
                                loss: p.loss,
                                trajectory,
                                iterations,
                            }
                        }
                        _ => ClimbResult {
                            v: current_v,
                            taxa: current_taxa,
                            loss: current_loss,
                            trajectory,
                            iterations,
                        },
                    };
                    return Err(SearchError::Interrupted {
                        failure,
                        partial: Box::new(partial),
                    });
                }
            };

            iterations += 1;
            current_v = outcome.v;
            current_taxa = outcome.taxa;

            let improved = self.options.tolerance.improves(current_loss, outcome.loss);
            if improved {
                current_loss = outcome.loss;
                wait = 0;
                info!(
                    "Iter {:3} | Loss: {:.3} | {} moves",
                    iterations, current_loss, outcome.moves
                );
            } else {
                wait += 1;
                info!(
                    "Iter {:3} | No significantly better loss found {}/{}",
                    iterations, wait, patience
                );
            }
            trajectory.push(current_loss);

            let report = IterationReport {
                iteration: iterations,
                loss: current_loss,
                improved,
                wait,
                patience,
            };
            if !callback.on_iteration(&report) {
                info!("Stopped by caller after {} iterations", iterations);
                break;
            }
            if wait >= patience {
                break;
            }
        }

        info!("Optimization terminated. Final loss: {:.3}", current_loss);

        Ok(ClimbResult {
            v: current_v,
            taxa: current_taxa,
            loss: current_loss,
            trajectory,
            iterations,
        })
    }
}
