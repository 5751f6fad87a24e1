use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use liblinear::LibLinearModel;

use crate::errors::{ChunkerError, Result};
use crate::evaluator::{Evaluator, FMeasure, ReportMode};
use crate::feature::FeatureSet;
use crate::model::{Chunker, Model};
use crate::params::TrainingParameters;
use crate::sample::{Corpus, Sample};

const EPSILON: f64 = 1e-6;

pub(crate) struct Indexer<K> {
    ids: HashMap<K, usize>,
    keys: Vec<K>,
}

impl<K> Indexer<K>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            keys: vec![],
        }
    }

    pub fn get_id<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + ToOwned<Owned = K> + Eq + Hash,
    {
        if let Some(&id) = self.ids.get(key) {
            id
        } else {
            let id = self.ids.len();
            self.keys.push(key.to_owned());
            self.ids.insert(key.to_owned(), id);
            id
        }
    }

    pub fn into_keys(self) -> Vec<K> {
        self.keys
    }
}

/// Training events: one per token, holding the ids of its context features and of its gold tag.
pub struct EventSet {
    features: Vec<String>,
    outcomes: Vec<String>,
    xs: Vec<Vec<usize>>,
    ys: Vec<usize>,
}

impl EventSet {
    /// Generates events from samples.
    ///
    /// Previous tags in each context are the gold ones. Features occurring fewer than `cutoff`
    /// times are dropped. Feature and outcome ids follow first-seen order.
    ///
    /// # Errors
    ///
    /// Errors of the sample stream are returned as is.
    pub fn build<I>(samples: I, feature_set: FeatureSet, cutoff: u32) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Sample>>,
    {
        let mut feature_ids = Indexer::new();
        let mut outcome_ids = Indexer::new();
        let mut counts: Vec<u32> = vec![];
        let mut xs = vec![];
        let mut ys = vec![];
        for sample in samples {
            let sample = sample?;
            let tags = sample.chunk_tags();
            for i in 0..sample.len() {
                let context = feature_set.context(i, sample.tokens(), sample.pos_tags(), &tags[..i]);
                let mut x = Vec::with_capacity(context.len());
                for f in &context {
                    let fid = feature_ids.get_id(f.as_str());
                    if fid == counts.len() {
                        counts.push(0);
                    }
                    counts[fid] += 1;
                    x.push(fid);
                }
                xs.push(x);
                ys.push(outcome_ids.get_id(tags[i].as_str()));
            }
        }

        let mut remap = vec![None; counts.len()];
        let mut features = vec![];
        for (fid, f) in feature_ids.into_keys().into_iter().enumerate() {
            if counts[fid] >= cutoff {
                remap[fid] = Some(features.len());
                features.push(f);
            }
        }
        for x in &mut xs {
            let mut kept: Vec<usize> = x.iter().filter_map(|&fid| remap[fid]).collect();
            kept.sort_unstable();
            kept.dedup();
            *x = kept;
        }
        Ok(Self {
            features,
            outcomes: outcome_ids.into_keys(),
            xs,
            ys,
        })
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn outcomes(&self) -> &[String] {
        &self.outcomes
    }

    /// Feature ids of each event, sorted.
    pub fn xs(&self) -> &[Vec<usize>] {
        &self.xs
    }

    /// Outcome id of each event.
    pub fn ys(&self) -> &[usize] {
        &self.ys
    }

    pub fn len(&self) -> usize {
        self.ys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ys.is_empty()
    }
}

/// Output of a learner: `coefficients[feature][outcome]` and `bias[outcome]`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearWeights {
    pub bias: Vec<f64>,
    pub coefficients: Vec<Vec<f64>>,
}

impl LinearWeights {
    pub fn zeros(n_features: usize, n_outcomes: usize) -> Self {
        Self {
            bias: vec![0.0; n_outcomes],
            coefficients: vec![vec![0.0; n_outcomes]; n_features],
        }
    }
}

/// A maximum entropy learner.
pub trait Learner {
    /// Estimates weights of the events.
    fn learn(&self, events: &EventSet, params: &TrainingParameters) -> Result<LinearWeights>;
}

/// Learner backed by LIBLINEAR logistic regression.
#[derive(Clone, Copy, Debug, Default)]
pub struct LiblinearLearner;

impl Learner for LiblinearLearner {
    fn learn(&self, events: &EventSet, params: &TrainingParameters) -> Result<LinearWeights> {
        let n_outcomes = events.outcomes.len();
        let mut weights = LinearWeights::zeros(events.features.len(), n_outcomes);
        if n_outcomes < 2 {
            tracing::warn!("only {n_outcomes} outcome in the training data, skipping the learner");
            return Ok(weights);
        }

        let mut xs: Vec<Vec<(u32, f64)>> = Vec::with_capacity(events.len());
        for x in &events.xs {
            let mut row: BTreeMap<u32, f64> = BTreeMap::new();
            for &fid in x {
                row.insert(u32::try_from(fid + 1)?, 1.0);
            }
            xs.push(row.into_iter().collect());
        }
        let mut ys = Vec::with_capacity(events.len());
        for &y in &events.ys {
            ys.push(f64::from(u32::try_from(y)?));
        }

        let mut builder = liblinear::Builder::new();
        let training_input = liblinear::util::TrainingInput::from_sparse_features(ys, xs)
            .map_err(|e| ChunkerError::Learner(format!("liblinear error: {e:?}")))?;
        builder.problem().input_data(training_input).bias(1.0);
        builder
            .parameters()
            .solver_type(params.algorithm()?.into())
            .stopping_criterion(params.stopping_criterion())
            .constraints_violation_cost(params.cost);
        liblinear::toggle_liblinear_stdout_output(false);
        let model = builder
            .build_model()
            .map_err(|e| ChunkerError::Learner(e.to_string()));
        liblinear::toggle_liblinear_stdout_output(true);
        let model = model?;

        // Two-class models hold one decision function shared by both outcomes.
        let scale = if model.labels().len() == 2 { 0.5 } else { 1.0 };
        for (i, &label) in model.labels().iter().enumerate() {
            let label_idx = i32::try_from(i)?;
            let o = usize::try_from(label)?;
            weights.bias[o] = model.label_bias(label_idx) * scale;
            for (fid, row) in weights.coefficients.iter_mut().enumerate() {
                row[o] = model.feature_coefficient(i32::try_from(fid + 1)?, label_idx) * scale;
            }
        }
        Ok(weights)
    }
}

/// Result of [`Trainer::train()`].
pub struct TrainingResult {
    pub model: Model,
    pub fmeasure: FMeasure,
}

/// Trainer.
///
/// # Examples
///
/// ```no_run
/// use chunker::{Trainer, TrainingParameters};
///
/// let params = TrainingParameters::load("en-chunk.properties").unwrap();
/// let result = Trainer::default().train(&params).unwrap();
/// println!("{}", result.fmeasure);
/// ```
pub struct Trainer<L = LiblinearLearner> {
    learner: L,
}

impl Default for Trainer<LiblinearLearner> {
    fn default() -> Self {
        Self::new(LiblinearLearner)
    }
}

impl<L> Trainer<L>
where
    L: Learner,
{
    pub fn new(learner: L) -> Self {
        Self { learner }
    }

    pub fn learner(&self) -> &L {
        &self.learner
    }

    /// Trains a model over `samples`.
    ///
    /// # Errors
    ///
    /// [`ChunkerError::Config`] if the language or the algorithm is missing; errors of the sample
    /// stream and of the learner are returned as is.
    pub fn train_model<I>(&self, params: &TrainingParameters, samples: I) -> Result<Model>
    where
        I: IntoIterator<Item = Result<Sample>>,
    {
        let language = params.language()?.to_string();
        params.algorithm()?;

        let events = EventSet::build(samples, params.feature_set, params.cutoff)?;
        tracing::info!(
            events = events.len(),
            features = events.features.len(),
            outcomes = events.outcomes.len(),
            iterations = params.iterations,
            cutoff = params.cutoff,
            "training"
        );
        if events.is_empty() {
            return Err(ChunkerError::invalid_argument("samples", "no training events"));
        }
        let weights = self.learner.learn(&events, params)?;

        let mut features = vec![];
        let mut table = vec![];
        for (f, mut row) in events.features.into_iter().zip(weights.coefficients) {
            let mut zero = true;
            for w in &mut row {
                if w.abs() < EPSILON {
                    *w = 0.0;
                } else {
                    zero = false;
                }
            }
            if !zero {
                features.push(f);
                table.push(row);
            }
        }
        Model::new(
            language,
            params.feature_set,
            params.beam_size,
            events.outcomes,
            features,
            table,
            weights.bias,
        )
    }

    /// Trains over `TrainSet` and evaluates the model against `TestSet`.
    ///
    /// # Errors
    ///
    /// Missing `Language`, `Algorithm`, `TrainSet` or `TestSet` give [`ChunkerError::Config`]
    /// before anything is read.
    pub fn train(&self, params: &TrainingParameters) -> Result<TrainingResult> {
        params.language()?;
        params.algorithm()?;
        let train_set = Corpus::from_path(params.train_set()?);
        let test_set = Corpus::from_path(params.test_set()?);

        let model = self.train_model(params, train_set.samples()?)?;
        let chunker = Chunker::new(model);
        let report = Evaluator::new(&chunker).evaluate(test_set.samples()?, ReportMode::Brief)?;
        tracing::info!("Final result: {}", report.overall.value());
        Ok(TrainingResult {
            model: chunker.into_model(),
            fmeasure: report.overall,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::params::Algorithm;
    use crate::test_utils::{params_for, strings, write_corpus, MemorizingLearner, FIXTURE};

    #[test]
    fn test_event_set() {
        let corpus = Corpus::from_text("He PRP B-NP\nran VBD B-VP\n\nShe PRP B-NP\n");
        let events = EventSet::build(corpus.samples().unwrap(), FeatureSet::Baseline, 0).unwrap();

        assert_eq!(3, events.len());
        assert_eq!(strings(&["B-NP", "B-VP"]), events.outcomes());
        assert_eq!(&[0, 1, 0], events.ys());
        assert_eq!("p_1=bos|t0=PRP", events.features()[0]);
        assert!(events.xs().iter().all(|x| x.windows(2).all(|w| w[0] < w[1])));
    }

    #[test]
    fn test_event_set_cutoff() {
        let corpus = Corpus::from_text("He PRP B-NP\nran VBD B-VP\n\nShe PRP B-NP\n");
        let all = EventSet::build(corpus.samples().unwrap(), FeatureSet::Baseline, 1).unwrap();
        let cut = EventSet::build(corpus.samples().unwrap(), FeatureSet::Baseline, 2).unwrap();

        assert!(cut.features().len() < all.features().len());
        assert!(cut.features().contains(&"t0=PRP".to_string()));
        assert!(!cut.features().contains(&"w0=ran".to_string()));
        assert_eq!(all.len(), cut.len());
    }

    #[test]
    fn test_train_model_with_memorizing_learner() {
        let trainer = Trainer::new(MemorizingLearner);
        let params = params_for("en");
        let model = trainer
            .train_model(&params, Corpus::from_text(FIXTURE).samples().unwrap())
            .unwrap();
        let chunker = Chunker::new(model);

        for sample in Corpus::from_text(FIXTURE).read_all().unwrap() {
            assert_eq!(
                sample.chunk_tags(),
                chunker.chunk(sample.tokens(), sample.pos_tags()).unwrap()
            );
        }
    }

    #[test]
    fn test_train_model_drops_zero_weights() {
        let trainer = Trainer::new(MemorizingLearner);
        let model = trainer
            .train_model(&params_for("en"), Corpus::from_text(FIXTURE).samples().unwrap())
            .unwrap();

        assert!(model.features.iter().all(|f| f.starts_with("w0=")));
    }

    #[test]
    fn test_train_model_requires_language() {
        let trainer = Trainer::new(MemorizingLearner);
        let params = TrainingParameters {
            algorithm: Some(Algorithm::Maxent),
            ..Default::default()
        };
        let r = trainer.train_model(&params, Corpus::from_text(FIXTURE).samples().unwrap());

        assert!(matches!(r, Err(ChunkerError::Config(_))));
    }

    #[test]
    fn test_train_model_empty_corpus() {
        let trainer = Trainer::new(MemorizingLearner);
        let r = trainer.train_model(&params_for("en"), Corpus::from_text("").samples().unwrap());

        assert!(matches!(r, Err(ChunkerError::InvalidArgument { .. })));
    }

    #[test]
    fn test_train_fails_fast_without_test_set() {
        let trainer = Trainer::new(MemorizingLearner);
        let params = TrainingParameters {
            train_set: Some("/nonexistent/train.txt".into()),
            ..params_for("en")
        };

        assert!(matches!(trainer.train(&params), Err(ChunkerError::Config(_))));
    }

    #[test]
    fn test_train_and_evaluate() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_corpus(dir.path(), "train.txt", FIXTURE);
        let params = TrainingParameters {
            train_set: Some(path.clone()),
            test_set: Some(path),
            ..params_for("en")
        };
        let result = Trainer::new(MemorizingLearner).train(&params).unwrap();

        assert_eq!("en", result.model.language());
        assert!((result.fmeasure.value() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_liblinear_learner() {
        let text = FIXTURE.repeat(5);
        let params = TrainingParameters {
            cost: 100.0,
            cutoff: 0,
            ..params_for("en")
        };
        let model = Trainer::default()
            .train_model(&params, Corpus::from_text(&text).samples().unwrap())
            .unwrap();
        let chunker = Chunker::new(model);

        for sample in Corpus::from_text(FIXTURE).read_all().unwrap() {
            assert_eq!(
                sample.chunk_tags(),
                chunker.chunk(sample.tokens(), sample.pos_tags()).unwrap()
            );
        }
    }

    #[test]
    fn test_liblinear_single_outcome() {
        let corpus = Corpus::from_text("a DT O\nb DT O\n");
        let model = Trainer::default()
            .train_model(&params_for("en"), corpus.samples().unwrap())
            .unwrap();

        assert_eq!(strings(&["O"]), model.outcomes());
        assert_eq!(0, model.n_features());
    }
}
