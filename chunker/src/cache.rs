//! Shared, lazily populated models keyed by language.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use crate::errors::{ChunkerError, Result};
use crate::model::{Chunker, Model};

/// Environment variable naming the directory of bundled models.
pub const MODEL_DIR_ENV: &str = "CHUNKER_MODEL_DIR";

/// Reserved model name selecting the bundled model of a language.
pub const BASELINE: &str = "baseline";

/// Loads the model of a language.
pub trait ModelLoader: Send + Sync {
    fn load(&self, language: &str) -> Result<Model>;
}

/// Where a model is read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelSource {
    Path(PathBuf),
    /// `<model_dir>/<language>-chunk.bin`
    Bundled { model_dir: PathBuf },
}

impl ModelSource {
    /// Parses a user-supplied model value. `baseline` selects the bundled model under
    /// `model_dir`.
    pub fn from_arg<P>(value: &str, model_dir: P) -> Self
    where
        P: Into<PathBuf>,
    {
        if value.eq_ignore_ascii_case(BASELINE) {
            Self::Bundled {
                model_dir: model_dir.into(),
            }
        } else {
            Self::Path(PathBuf::from(value))
        }
    }

    pub fn resolve(&self, language: &str) -> PathBuf {
        match self {
            Self::Path(path) => path.clone(),
            Self::Bundled { model_dir } => model_dir.join(format!("{language}-chunk.bin")),
        }
    }
}

/// Reads zstd-compressed model files.
pub struct FileModelLoader {
    source: ModelSource,
}

impl FileModelLoader {
    pub fn new(source: ModelSource) -> Self {
        Self { source }
    }
}

impl ModelLoader for FileModelLoader {
    fn load(&self, language: &str) -> Result<Model> {
        if matches!(self.source, ModelSource::Bundled { .. }) {
            tracing::info!("backing off to the bundled {language} model");
        }
        let path = self.source.resolve(language);
        let model = read_model(&path)?;
        if !model.language().eq_ignore_ascii_case(language) {
            return Err(ChunkerError::invalid_model(format!(
                "{} is a {} model, but {language} was requested",
                path.display(),
                model.language()
            )));
        }
        Ok(model)
    }
}

fn read_model(path: &Path) -> Result<Model> {
    let start = Instant::now();
    let model = Model::read_file(path)?;
    tracing::info!(
        path = %path.display(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "model loaded"
    );
    Ok(model)
}

/// Chunkers shared across threads, loaded at most once per language.
///
/// Entries are never evicted. A failed load is reported to the caller and retried by the next
/// request.
pub struct ModelCache {
    loader: Box<dyn ModelLoader>,
    chunkers: RwLock<HashMap<String, Arc<Chunker>>>,
    insert_lock: Mutex<()>,
}

impl ModelCache {
    pub fn new<L>(loader: L) -> Self
    where
        L: ModelLoader + 'static,
    {
        Self {
            loader: Box::new(loader),
            chunkers: RwLock::new(HashMap::new()),
            insert_lock: Mutex::new(()),
        }
    }

    fn lookup(&self, language: &str) -> Option<Arc<Chunker>> {
        self.chunkers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(language)
            .cloned()
    }

    /// Returns the chunker of `language`, loading its model on first use.
    ///
    /// Language codes are case-insensitive. Concurrent first calls for the same language load
    /// the model once and receive the same [`Arc`].
    pub fn get(&self, language: &str) -> Result<Arc<Chunker>> {
        let language = language.to_ascii_lowercase();
        if let Some(chunker) = self.lookup(&language) {
            return Ok(chunker);
        }
        let _guard = self.insert_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(chunker) = self.lookup(&language) {
            return Ok(chunker);
        }
        let chunker = Arc::new(Chunker::new(self.loader.load(&language)?));
        self.chunkers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(language, Arc::clone(&chunker));
        Ok(chunker)
    }

    pub fn len(&self) -> usize {
        self.chunkers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
