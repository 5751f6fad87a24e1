use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::errors::Result;
use crate::feature::FeatureSet;
use crate::model::Model;
use crate::params::{Algorithm, TrainingParameters};
use crate::trainer::{EventSet, Learner, LinearWeights};

pub const FIXTURE: &str = "\
Rockwell NNP B-NP
International NNP I-NP
Corp. NNP I-NP
's POS B-NP
Tulsa NNP I-NP
unit NN I-NP
said VBD B-VP
it PRP B-NP
signed VBD B-VP
a DT B-NP
tentative JJ I-NP
agreement NN I-NP
. . O

Confidence NN B-NP
in IN B-PP
the DT B-NP
pound NN I-NP
is VBZ B-VP
widely RB I-VP
expected VBN I-VP
to TO I-VP
take VB I-VP
another DT B-NP
sharp JJ I-NP
dive NN I-NP
. . O

";

pub fn strings(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|x| x.to_string()).collect()
}

pub fn params_for(language: &str) -> TrainingParameters {
    TrainingParameters {
        language: Some(language.to_string()),
        algorithm: Some(Algorithm::Maxent),
        cutoff: 0,
        ..Default::default()
    }
}

pub fn write_corpus(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

/// Tags `the` as B-NP, `dog` as I-NP and `barks` as B-VP.
pub fn toy_model(language: &str) -> Model {
    Model::new(
        language.to_string(),
        FeatureSet::Baseline,
        3,
        strings(&["B-NP", "I-NP", "B-VP", "O"]),
        strings(&["w0=the", "w0=dog", "w0=barks"]),
        vec![
            vec![5.0, 0.0, 0.0, 0.0],
            vec![0.0, 5.0, 0.0, 0.0],
            vec![0.0, 0.0, 5.0, 0.0],
        ],
        vec![0.0; 4],
    )
    .unwrap()
}

/// Gives every current-word feature a weight of 1 for each outcome it co-occurs with.
pub struct MemorizingLearner;

impl Learner for MemorizingLearner {
    fn learn(&self, events: &EventSet, _params: &TrainingParameters) -> Result<LinearWeights> {
        let mut weights = LinearWeights::zeros(events.features().len(), events.outcomes().len());
        for (x, &y) in events.xs().iter().zip(events.ys()) {
            for &fid in x {
                if events.features()[fid].starts_with("w0=") {
                    weights.coefficients[fid][y] += 1.0;
                }
            }
        }
        Ok(weights)
    }
}

/// Records every `(iterations, cutoff)` it is called with, and only memorizes at `good`.
///
/// Everywhere else it returns zero weights.
pub struct RecordingLearner {
    pub good: Option<(u32, u32)>,
    pub calls: Mutex<Vec<(u32, u32)>>,
}

impl RecordingLearner {
    pub fn new(good: Option<(u32, u32)>) -> Self {
        Self {
            good,
            calls: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> Vec<(u32, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Learner for RecordingLearner {
    fn learn(&self, events: &EventSet, params: &TrainingParameters) -> Result<LinearWeights> {
        let point = (params.iterations, params.cutoff);
        self.calls.lock().unwrap().push(point);
        if self.good.map_or(true, |good| good == point) {
            MemorizingLearner.learn(events, params)
        } else {
            Ok(LinearWeights::zeros(
                events.features().len(),
                events.outcomes().len(),
            ))
        }
    }
}
