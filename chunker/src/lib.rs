#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Chunker
//!
//! Chunker is a maximum entropy phrase chunker. It assigns BIO chunk tags such as `B-NP`, `I-NP`
//! and `O` to tokenized, POS-tagged sentences.
//!
//! ## Examples
//!
//! ```no_run
//! use chunker::{FileModelLoader, ModelCache, ModelSource};
//!
//! let source = ModelSource::from_arg("en-chunk.bin", "models");
//! let cache = ModelCache::new(FileModelLoader::new(source));
//! let chunker = cache.get("en").unwrap();
//!
//! let tokens = vec!["Rockwell".to_string(), "said".to_string()];
//! let pos_tags = vec!["NNP".to_string(), "VBD".to_string()];
//! println!("{:?}", chunker.chunk(&tokens, &pos_tags).unwrap());
//! ```
//!
//! Models are trained with [`Trainer`], tuned with [`GridSearch`] and scored with [`Evaluator`].
//! The TCP service requires **crate feature** `server`.

pub mod errors;

mod annotate;
mod cache;
mod cross_validator;
mod evaluator;
mod feature;
mod model;
mod params;
mod sample;
mod span;
mod trainer;

#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
mod test_utils;

pub use annotate::{
    resolve_language, AnnotateConfig, Annotator, ChunkAnnotation, Document, InputFormat,
    OutputFormat, ProcessorRecord, Term, CHUNK_LAYER,
};
pub use cache::{FileModelLoader, ModelCache, ModelLoader, ModelSource, BASELINE, MODEL_DIR_ENV};
pub use cross_validator::{
    grid_points, select_best, GridPoint, GridSearch, GridSearchOutcome, KFoldValidator,
    DEFAULT_RESULTS_LOG,
};
pub use errors::{ChunkerError, Result};
pub use evaluator::{EvaluationReport, Evaluator, FMeasure, ReportMode, TokenError};
pub use feature::FeatureSet;
pub use model::{Chunker, Model};
pub use params::{Algorithm, IterationRange, TrainingParameters};
pub use sample::{Corpus, Sample, SampleReader};
pub use span::{is_valid_transition, spans_from_tags, Span, OUTSIDE};
pub use trainer::{EventSet, Learner, LiblinearLearner, LinearWeights, Trainer, TrainingResult};
