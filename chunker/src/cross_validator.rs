//! Parameter tuning by grid search, and k-fold cross validation.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::errors::{ChunkerError, Result};
use crate::evaluator::{EvaluationReport, Evaluator, ReportMode};
use crate::model::Chunker;
use crate::params::TrainingParameters;
use crate::sample::Corpus;
use crate::trainer::{Learner, Trainer, TrainingResult};

/// Default file the grid search appends its results to.
pub const DEFAULT_RESULTS_LOG: &str = "chunk-results.txt";

/// One trial of the grid search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridPoint {
    pub iterations: u32,
    pub cutoff: u32,
    pub f_measure: f64,
}

/// Enumerates the `(iterations, cutoff)` pairs of the sweep in order.
///
/// The cutoff runs over `0..=params.cutoff` in the outer loop. For each cutoff, iterations run from
/// `2 * start` while smaller than `params.iterations + start`, stepping by `step`. A zero
/// iteration count cannot be trained and is skipped.
///
/// # Errors
///
/// [`ChunkerError::Config`] if `CrossEval` is missing or the sweep is empty.
pub fn grid_points(params: &TrainingParameters) -> Result<Vec<(u32, u32)>> {
    let range = params
        .cross_eval
        .ok_or_else(|| ChunkerError::config("CrossEval must be specified for grid search"))?;
    let first = range.start.saturating_mul(2);
    let limit = params.iterations.saturating_add(range.start);
    let mut iterations = vec![];
    for i in (first..limit).step_by(usize::try_from(range.step)?) {
        if i == 0 {
            tracing::warn!("skipping 0 iterations in the grid");
            continue;
        }
        iterations.push(i);
    }
    let mut points = vec![];
    for c in 0..=params.cutoff {
        for &i in &iterations {
            points.push((i, c));
        }
    }
    if points.is_empty() {
        return Err(ChunkerError::config(format!(
            "empty grid: CrossEval {}:{} with Iterations={}",
            range.start, range.step, params.iterations
        )));
    }
    Ok(points)
}

/// Returns the point with the highest F-measure; the earliest one wins ties.
pub fn select_best(results: &[GridPoint]) -> Option<GridPoint> {
    let mut best: Option<GridPoint> = None;
    for &point in results {
        if best.map_or(true, |b| point.f_measure > b.f_measure) {
            best = Some(point);
        }
    }
    best
}

/// Result of [`GridSearch::run()`].
pub struct GridSearchOutcome {
    /// Every trial in sweep order.
    pub results: Vec<GridPoint>,
    pub best: GridPoint,
    /// Model retrained with the best parameters, evaluated on `TestSet`.
    pub result: TrainingResult,
}

/// Grid search over iterations and cutoff, scored on `DevSet`.
pub struct GridSearch<'a, L> {
    trainer: &'a Trainer<L>,
    results_log: PathBuf,
}

impl<'a, L> GridSearch<'a, L>
where
    L: Learner,
{
    pub fn new(trainer: &'a Trainer<L>) -> Self {
        Self {
            trainer,
            results_log: PathBuf::from(DEFAULT_RESULTS_LOG),
        }
    }

    /// Sets the file trial lines are appended to.
    pub fn results_log<P>(mut self, path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        self.results_log = path.into();
        self
    }

    /// Runs every trial, then trains the final model with the best one.
    ///
    /// # Errors
    ///
    /// Configuration errors are raised before the first trial. Any other error aborts the run.
    pub fn run(&self, params: &TrainingParameters) -> Result<GridSearchOutcome> {
        params.language()?;
        params.algorithm()?;
        let train_set = Corpus::from_path(params.train_set()?);
        let dev_set = Corpus::from_path(params.dev_set()?);
        params.test_set()?;
        let points = grid_points(params)?;

        let mut log = BufWriter::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.results_log)?,
        );
        let mut results = Vec::with_capacity(points.len());
        for (n, &(iterations, cutoff)) in points.iter().enumerate() {
            tracing::info!(
                trial = n + 1,
                trials = points.len(),
                iterations,
                cutoff,
                "grid search trial"
            );
            let trial = params.with_trial(iterations, cutoff);
            let model = self.trainer.train_model(&trial, train_set.samples()?)?;
            let chunker = Chunker::new(model);
            let report = Evaluator::new(&chunker).evaluate(dev_set.samples()?, ReportMode::Brief)?;
            let f_measure = report.overall.value();
            tracing::info!(iterations, cutoff, f_measure, "trial finished");
            writeln!(log, "Iterations: {iterations} cutoff: {cutoff} Accuracy: {f_measure}")?;
            log.flush()?;
            results.push(GridPoint {
                iterations,
                cutoff,
                f_measure,
            });
        }

        let best = select_best(&results)
            .ok_or_else(|| ChunkerError::config("the grid search produced no results"))?;
        tracing::info!(
            iterations = best.iterations,
            cutoff = best.cutoff,
            f_measure = best.f_measure,
            "best parameters"
        );
        let result = self
            .trainer
            .train(&params.with_trial(best.iterations, best.cutoff))?;
        Ok(GridSearchOutcome {
            results,
            best,
            result,
        })
    }

    pub fn results_log_path(&self) -> &Path {
        &self.results_log
    }
}

/// K-fold cross validation over `TrainSet`.
pub struct KFoldValidator<'a, L> {
    trainer: &'a Trainer<L>,
}

impl<'a, L> KFoldValidator<'a, L>
where
    L: Learner,
{
    pub fn new(trainer: &'a Trainer<L>) -> Self {
        Self { trainer }
    }

    /// Sample `i` is held out in fold `i % Folds`. Reports of all folds are merged; sentence
    /// indices of token errors refer to `TrainSet`.
    ///
    /// # Errors
    ///
    /// [`ChunkerError::Config`] if `Folds` is smaller than 2 or larger than the number of samples.
    pub fn run(&self, params: &TrainingParameters) -> Result<EvaluationReport> {
        params.language()?;
        params.algorithm()?;
        let samples = Corpus::from_path(params.train_set()?).read_all()?;
        let folds = params.folds;
        if folds < 2 || folds > samples.len() {
            return Err(ChunkerError::config(format!(
                "Folds must be between 2 and the number of samples ({}), got {folds}",
                samples.len()
            )));
        }

        let mut merged = EvaluationReport::new(params.evaluation_type);
        for k in 0..folds {
            tracing::info!(fold = k + 1, folds, "cross validation");
            let train = samples
                .iter()
                .enumerate()
                .filter(|(i, _)| i % folds != k)
                .map(|(_, s)| Ok(s.clone()));
            let model = self.trainer.train_model(params, train)?;
            let chunker = Chunker::new(model);
            let test = samples.iter().skip(k).step_by(folds).map(|s| Ok(s.clone()));
            let mut report = Evaluator::new(&chunker).evaluate(test, params.evaluation_type)?;
            for e in &mut report.errors {
                e.sentence = e.sentence * folds + k;
            }
            merged.merge(report);
        }
        Ok(merged)
    }
}
