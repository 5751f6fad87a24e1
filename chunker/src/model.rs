use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use bincode::{Decode, Encode};

use crate::errors::{ChunkerError, Result};
use crate::feature::FeatureSet;
use crate::span::{is_valid_transition, spans_from_tags, Span};

/// Model data.
///
/// `weights[f][o]` is the weight of feature `features[f]` for outcome `outcomes[o]`.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct Model {
    pub(crate) language: String,
    pub(crate) feature_set: FeatureSet,
    pub(crate) beam_size: u32,
    pub(crate) outcomes: Vec<String>,
    pub(crate) features: Vec<String>,
    pub(crate) weights: Vec<Vec<f64>>,
    pub(crate) bias: Vec<f64>,
}

impl Model {
    /// Creates a model.
    ///
    /// # Errors
    ///
    /// [`ChunkerError::InvalidModel`] will be returned if the weight table does not match the
    /// features and outcomes.
    pub fn new(
        language: String,
        feature_set: FeatureSet,
        beam_size: u32,
        outcomes: Vec<String>,
        features: Vec<String>,
        weights: Vec<Vec<f64>>,
        bias: Vec<f64>,
    ) -> Result<Self> {
        let model = Self {
            language,
            feature_set,
            beam_size,
            outcomes,
            features,
            weights,
            bias,
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.outcomes.is_empty() {
            return Err(ChunkerError::invalid_model("the model has no outcomes"));
        }
        if self.beam_size == 0 {
            return Err(ChunkerError::invalid_model("beam size must be at least 1"));
        }
        if self.bias.len() != self.outcomes.len() {
            return Err(ChunkerError::invalid_model(
                "bias size does not match the number of outcomes",
            ));
        }
        if self.weights.len() != self.features.len() {
            return Err(ChunkerError::invalid_model(
                "weight table size does not match the number of features",
            ));
        }
        if self.weights.iter().any(|w| w.len() != self.outcomes.len()) {
            return Err(ChunkerError::invalid_model(
                "weight row size does not match the number of outcomes",
            ));
        }
        Ok(())
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn feature_set(&self) -> FeatureSet {
        self.feature_set
    }

    pub fn beam_size(&self) -> u32 {
        self.beam_size
    }

    pub fn outcomes(&self) -> &[String] {
        &self.outcomes
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Exports the model data.
    ///
    /// # Errors
    ///
    /// When `wtr` generates an error, it will be returned as is.
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        bincode::encode_into_std_write(self, wtr, bincode::config::standard())?;
        Ok(())
    }

    /// Creates a model from a reader.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is. A decoded model with inconsistent
    /// tables gives [`ChunkerError::InvalidModel`].
    pub fn read<R>(rdr: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let model: Self = bincode::decode_from_std_read(rdr, bincode::config::standard())?;
        model.validate()?;
        Ok(model)
    }

    /// Reads a zstd-compressed model file.
    pub fn read_file<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let mut f = zstd::Decoder::new(File::open(path)?)?;
        Self::read(&mut f)
    }
}

#[derive(Clone)]
struct Hypothesis {
    tags: Vec<usize>,
    score: f64,
}

/// Beam-search chunk tagger.
pub struct Chunker {
    model: Model,
    feature_ids: HashMap<String, usize>,
}

impl Chunker {
    /// Creates a new chunker.
    pub fn new(model: Model) -> Self {
        let feature_ids = model
            .features
            .iter()
            .enumerate()
            .map(|(i, f)| (f.clone(), i))
            .collect();
        Self { model, feature_ids }
    }

    pub fn language(&self) -> &str {
        &self.model.language
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    fn log_probs(&self, features: &[String]) -> Vec<f64> {
        let mut ys = self.model.bias.clone();
        for f in features {
            if let Some(&fid) = self.feature_ids.get(f) {
                for (y, w) in ys.iter_mut().zip(&self.model.weights[fid]) {
                    *y += w;
                }
            }
        }
        let max = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let norm = ys.iter().map(|y| (y - max).exp()).sum::<f64>().ln() + max;
        for y in &mut ys {
            *y -= norm;
        }
        ys
    }

    fn expand(
        &self,
        beam: &[Hypothesis],
        i: usize,
        tokens: &[String],
        pos_tags: &[String],
        validate: bool,
    ) -> Vec<Hypothesis> {
        let outcomes = &self.model.outcomes;
        let mut candidates = vec![];
        for hyp in beam {
            let prior: Vec<&str> = hyp.tags.iter().map(|&o| outcomes[o].as_str()).collect();
            let features = self.model.feature_set.context(i, tokens, pos_tags, &prior);
            let prev = prior.last().copied();
            for (o, lp) in self.log_probs(&features).into_iter().enumerate() {
                if validate && !is_valid_transition(prev, &outcomes[o]) {
                    continue;
                }
                let mut tags = hyp.tags.clone();
                tags.push(o);
                candidates.push(Hypothesis {
                    tags,
                    score: hyp.score + lp,
                });
            }
        }
        candidates
    }

    /// Predicts chunk tags.
    ///
    /// # Errors
    ///
    /// [`ChunkerError::InvalidArgument`] will be returned if `tokens` and `pos_tags` differ in
    /// length.
    pub fn chunk(&self, tokens: &[String], pos_tags: &[String]) -> Result<Vec<String>> {
        if tokens.len() != pos_tags.len() {
            return Err(ChunkerError::invalid_argument(
                "pos_tags",
                format!("{} POS tags for {} tokens", pos_tags.len(), tokens.len()),
            ));
        }
        let beam_size = usize::try_from(self.model.beam_size)?;
        let mut beam = vec![Hypothesis {
            tags: vec![],
            score: 0.0,
        }];
        for i in 0..tokens.len() {
            let mut candidates = self.expand(&beam, i, tokens, pos_tags, true);
            if candidates.is_empty() {
                // Every outcome is an I- tag that cannot continue the sequence.
                candidates = self.expand(&beam, i, tokens, pos_tags, false);
            }
            candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
            candidates.truncate(beam_size);
            beam = candidates;
        }
        Ok(beam
            .into_iter()
            .next()
            .map_or_else(Vec::new, |best| {
                best.tags
                    .into_iter()
                    .map(|o| self.model.outcomes[o].clone())
                    .collect()
            }))
    }

    /// Predicts chunks as spans.
    pub fn chunk_as_spans(&self, tokens: &[String], pos_tags: &[String]) -> Result<Vec<Span>> {
        Ok(spans_from_tags(&self.chunk(tokens, pos_tags)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::{strings, toy_model};

    #[test]
    fn test_new_rejects_bad_tables() {
        let r = Model::new(
            "en".into(),
            FeatureSet::Baseline,
            3,
            strings(&["B-NP", "O"]),
            strings(&["w0=a"]),
            vec![vec![1.0]],
            vec![0.0, 0.0],
        );

        assert!(matches!(r, Err(ChunkerError::InvalidModel { .. })));
    }

    #[test]
    fn test_write_read() {
        let model = toy_model("en");
        let mut buf = vec![];
        model.write(&mut buf).unwrap();
        let decoded = Model::read(&mut buf.as_slice()).unwrap();

        assert_eq!(model, decoded);
    }

    #[test]
    fn test_read_garbage() {
        let mut data: &[u8] = &[0xff, 0x01, 0x02];

        assert!(Model::read(&mut data).is_err());
    }

    #[test]
    fn test_read_file() {
        let model = toy_model("en");
        let f = tempfile::NamedTempFile::new().unwrap();
        let mut enc = zstd::Encoder::new(f.reopen().unwrap(), 3).unwrap();
        model.write(&mut enc).unwrap();
        enc.finish().unwrap();

        assert_eq!(model, Model::read_file(f.path()).unwrap());
    }

    #[test]
    fn test_chunk() {
        let chunker = Chunker::new(toy_model("en"));
        let tokens = strings(&["the", "dog", "barks"]);
        let pos = strings(&["DT", "NN", "VBZ"]);

        assert_eq!(
            strings(&["B-NP", "I-NP", "B-VP"]),
            chunker.chunk(&tokens, &pos).unwrap()
        );
        assert_eq!(
            vec![Span::new(0, 2, "NP"), Span::new(2, 3, "VP")],
            chunker.chunk_as_spans(&tokens, &pos).unwrap()
        );
    }

    #[test]
    fn test_chunk_never_starts_with_inside() {
        // "dog" alone strongly prefers I-NP, which is invalid at the start.
        let chunker = Chunker::new(toy_model("en"));
        let tags = chunker
            .chunk(&strings(&["dog"]), &strings(&["NN"]))
            .unwrap();

        assert_ne!("I-NP", tags[0]);
    }

    #[test]
    fn test_chunk_empty() {
        let chunker = Chunker::new(toy_model("en"));

        assert!(chunker.chunk(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_chunk_length_mismatch() {
        let chunker = Chunker::new(toy_model("en"));
        let r = chunker.chunk(&strings(&["the", "dog"]), &strings(&["DT"]));

        assert!(matches!(
            r,
            Err(ChunkerError::InvalidArgument { arg: "pos_tags", .. })
        ));
    }

    #[test]
    fn test_inside_only_model_falls_back() {
        let model = Model::new(
            "en".into(),
            FeatureSet::Baseline,
            2,
            strings(&["I-NP"]),
            vec![],
            vec![],
            vec![0.0],
        )
        .unwrap();
        let chunker = Chunker::new(model);

        assert_eq!(
            strings(&["I-NP", "I-NP"]),
            chunker
                .chunk(&strings(&["a", "b"]), &strings(&["DT", "NN"]))
                .unwrap()
        );
    }
}
