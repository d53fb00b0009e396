//! One coordinate-wise descent pass over a v-vector.

use super::{EvaluationError, EvaluationFailure, Stage, Tolerance};
use crate::oracle::{Oracle, OracleError, ScoreRequest, ScratchId};
use crate::tree::{self, vector, TaxaMap};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::debug;

/// Maps a candidate index to the value it stands for once the current value is skipped.
#[inline]
pub fn adjust(index: usize, original: usize) -> usize {
    if index >= original {
        index + 1
    } else {
        index
    }
}

/// Scores vectors against one taxa mapping.
pub(crate) struct Evaluator<'a, O: Oracle> {
    pub oracle: &'a O,
    pub taxa: &'a TaxaMap,
    pub rooted: bool,
    pub session: &'a str,
}

impl<O: Oracle> Evaluator<'_, O> {
    pub fn score(&self, v: &[usize], scratch: ScratchId) -> Result<f64, EvaluationError> {
        let notation = vector::decode_newick(v, self.rooted)?;
        let newick = tree::relabel(&notation, self.taxa)?;
        let loss = self.oracle.score(&ScoreRequest { newick, scratch })?;
        if !loss.is_finite() {
            return Err(OracleError::NonFinite(loss).into());
        }
        Ok(loss)
    }

    fn baseline(&self, v: &[usize]) -> Result<f64, EvaluationFailure> {
        self.score(v, ScratchId::baseline(self.session))
            .map_err(|source| EvaluationFailure {
                stage: Stage::Baseline,
                v: v.to_vec(),
                source,
            })
    }

    /// Scores every alternative value at `position`, in candidate-index order. All
    /// evaluations finish before this returns; the first failure in index order is reported.
    fn neighbours(
        &self,
        pool: &ThreadPool,
        v: &[usize],
        position: usize,
    ) -> Result<Vec<f64>, EvaluationFailure> {
        let original = v[position];
        let count = vector::max_value(position);

        let results: Vec<(usize, Result<f64, EvaluationError>)> = pool.install(|| {
            (0..count)
                .into_par_iter()
                .map(|index| {
                    let value = adjust(index, original);
                    let mut candidate = v.to_vec();
                    candidate[position] = value;
                    let scratch = ScratchId::candidate(self.session, position, value);
                    (value, self.score(&candidate, scratch))
                })
                .collect()
        });

        let mut losses = Vec::with_capacity(count);
        for (value, result) in results {
            match result {
                Ok(loss) => losses.push(loss),
                Err(source) => {
                    let mut failed = v.to_vec();
                    failed[position] = value;
                    return Err(EvaluationFailure {
                        stage: Stage::Candidate {
                            coordinate: position,
                            value,
                        },
                        v: failed,
                        source,
                    });
                }
            }
        }
        Ok(losses)
    }
}

/// Index and gain of the largest `baseline - loss`; the earliest index wins ties.
pub(crate) fn best_candidate(baseline: f64, losses: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, &loss) in losses.iter().enumerate() {
        let gain = baseline - loss;
        match best {
            Some((_, top)) if gain <= top => {}
            _ => best = Some((index, gain)),
        }
    }
    best
}

/// Where a pass ended.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub v: Vec<usize>,
    pub taxa: TaxaMap,
    pub loss: f64,
    pub moves: usize,
}

#[derive(Debug)]
pub(crate) struct PassFailure {
    pub failure: EvaluationFailure,
    /// State after the last completed coordinate; `None` if the baseline failed.
    pub progress: Option<PassOutcome>,
}

impl From<EvaluationFailure> for PassFailure {
    fn from(failure: EvaluationFailure) -> Self {
        Self {
            failure,
            progress: None,
        }
    }
}

pub(crate) fn optimise_single<O: Oracle>(
    oracle: &O,
    pool: &ThreadPool,
    session: &str,
    rooted: bool,
    tolerance: Tolerance,
    v: &[usize],
    taxa: &TaxaMap,
) -> Result<PassOutcome, PassFailure> {
    let reject = |source: EvaluationError| EvaluationFailure {
        stage: Stage::Baseline,
        v: v.to_vec(),
        source,
    };

    let (mut current, permutation) = vector::canonicalize(v).map_err(|e| reject(e.into()))?;
    let taxa = taxa.reorder(&permutation).map_err(|e| reject(e.into()))?;

    let evaluator = Evaluator {
        oracle,
        taxa: &taxa,
        rooted,
        session,
    };

    let mut baseline = evaluator.baseline(&current)?;
    debug!("Pass start: {:.3}", baseline);

    let mut moves = 0;
    for position in (1..current.len()).rev() {
        let losses = match evaluator.neighbours(pool, &current, position) {
            Ok(losses) => losses,
            Err(failure) => {
                return Err(PassFailure {
                    failure,
                    progress: Some(PassOutcome {
                        v: current,
                        taxa: taxa.clone(),
                        loss: baseline,
                        moves,
                    }),
                })
            }
        };

        let Some((index, gain)) = best_candidate(baseline, &losses) else {
            continue;
        };
        let loss = losses[index];
        if tolerance.improves(baseline, loss) {
            let value = adjust(index, current[position]);
            debug!(
                "v[{}]: {} -> {} | loss {:.3} (gain {:.3})",
                position, current[position], value, loss, gain
            );
            current[position] = value;
            baseline = loss;
            moves += 1;
        }
    }

    debug!("Pass end: {:.3} after {} moves", baseline, moves);
    Ok(PassOutcome {
        v: current,
        taxa,
        loss: baseline,
        moves,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_candidate_prefers_first_maximum() {
        assert_eq!(best_candidate(10.0, &[9.0, 8.0, 8.0]), Some((1, 2.0)));
        assert_eq!(best_candidate(10.0, &[]), None);
        assert_eq!(best_candidate(10.0, &[11.0, 12.0]), Some((0, -1.0)));
    }
}
