//! Chunk annotation of documents.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::ModelCache;
use crate::errors::{ChunkerError, Result};
use crate::span::Span;

/// Name of the annotation layer written by [`Annotator`].
pub const CHUNK_LAYER: &str = "chunks";

/// A tokenized and POS-tagged term.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: String,
    pub form: String,
    pub pos: String,
}

/// A chunk over consecutive terms of one sentence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkAnnotation {
    pub id: String,
    /// Phrase type, e.g. `NP`.
    pub phrase: String,
    /// Id of the head term.
    pub head: String,
    /// Ids of the covered terms.
    pub terms: Vec<String>,
}

/// Provenance of an annotation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorRecord {
    pub layer: String,
    pub name: String,
    pub version: String,
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Minimal linguistic document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub sentences: Vec<Vec<Term>>,
    #[serde(default)]
    pub chunks: Vec<ChunkAnnotation>,
    #[serde(default)]
    pub processors: Vec<ProcessorRecord>,
}

impl Document {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// [`ChunkerError::InvalidArgument`] if a term fails [`Document::validate`].
    pub fn from_json(text: &str) -> Result<Self> {
        let doc: Self = serde_json::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Checks that every form and POS tag is a single non-empty field of the tabular format.
    ///
    /// # Errors
    ///
    /// [`ChunkerError::InvalidArgument`] naming the first offending term.
    pub fn validate(&self) -> Result<()> {
        let is_field = |s: &str| !s.is_empty() && !s.contains(char::is_whitespace);
        for term in self.sentences.iter().flatten() {
            if !is_field(&term.form) || !is_field(&term.pos) {
                return Err(ChunkerError::invalid_argument(
                    "document",
                    format!(
                        "term {:?}: form and pos must be non-empty and contain no whitespace, got {:?} {:?}",
                        term.id, term.form, term.pos
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Reads `token pos` lines, optionally followed by a chunk column which is ignored. Blank
    /// lines separate sentences. Term ids are `t1`, `t2`, ... over the whole document.
    ///
    /// # Errors
    ///
    /// [`ChunkerError::InvalidArgument`] if a line has fewer than 2 or more than 3 columns.
    pub fn from_conll(text: &str) -> Result<Self> {
        let mut doc = Self::default();
        let mut sentence = vec![];
        let mut n_terms = 0;
        for (i, line) in text.lines().enumerate() {
            let fields: Vec<_> = line.split_whitespace().collect();
            match fields[..] {
                [] => {
                    if !sentence.is_empty() {
                        doc.sentences.push(std::mem::take(&mut sentence));
                    }
                }
                [form, pos] | [form, pos, _] => {
                    n_terms += 1;
                    sentence.push(Term {
                        id: format!("t{n_terms}"),
                        form: form.to_string(),
                        pos: pos.to_string(),
                    });
                }
                _ => {
                    return Err(ChunkerError::invalid_argument(
                        "input",
                        format!("line {}: expected `token pos [chunk]`, got {line:?}", i + 1),
                    ))
                }
            }
        }
        if !sentence.is_empty() {
            doc.sentences.push(sentence);
        }
        Ok(doc)
    }
}

fn split_terms(terms: &[Term]) -> (Vec<String>, Vec<String>) {
    terms
        .iter()
        .map(|t| (t.form.clone(), t.pos.clone()))
        .unzip()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputFormat {
    /// JSON [`Document`].
    #[default]
    Document,
    /// `token pos [chunk]` lines.
    Conll,
}

impl FromStr for InputFormat {
    type Err = ChunkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "document" | "json" => Ok(Self::Document),
            "conll" => Ok(Self::Conll),
            _ => Err(ChunkerError::config(format!("unknown input format: {s}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON [`Document`] with the chunk layer.
    #[default]
    Document,
    /// `token<TAB>pos<TAB>chunk` lines.
    Conll,
}

impl FromStr for OutputFormat {
    type Err = ChunkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "document" | "json" => Ok(Self::Document),
            "conll" => Ok(Self::Conll),
            _ => Err(ChunkerError::config(format!("unknown output format: {s}"))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotateConfig {
    pub language: Option<String>,
    pub input_format: InputFormat,
    pub output_format: OutputFormat,
}

/// Picks the language of a document.
///
/// # Errors
///
/// [`ChunkerError::LanguageMismatch`] if both are given and differ; [`ChunkerError::Config`] if
/// neither is given.
pub fn resolve_language(document: Option<&str>, configured: Option<&str>) -> Result<String> {
    match (document, configured) {
        (Some(d), Some(c)) if !d.eq_ignore_ascii_case(c) => Err(ChunkerError::LanguageMismatch {
            document: d.to_string(),
            configured: c.to_string(),
        }),
        (_, Some(lang)) | (Some(lang), None) => Ok(lang.to_string()),
        (None, None) => Err(ChunkerError::config(
            "no language: the document does not declare one and none was configured",
        )),
    }
}

/// Adds chunks to documents with models from a shared cache.
pub struct Annotator {
    cache: Arc<ModelCache>,
    config: AnnotateConfig,
}

impl Annotator {
    pub fn new(cache: Arc<ModelCache>, config: AnnotateConfig) -> Self {
        Self { cache, config }
    }

    pub fn config(&self) -> &AnnotateConfig {
        &self.config
    }

    pub fn to_tag_sequence(
        &self,
        language: &str,
        tokens: &[String],
        pos_tags: &[String],
    ) -> Result<Vec<String>> {
        self.cache.get(language)?.chunk(tokens, pos_tags)
    }

    pub fn to_spans(&self, language: &str, tokens: &[String], pos_tags: &[String]) -> Result<Vec<Span>> {
        self.cache.get(language)?.chunk_as_spans(tokens, pos_tags)
    }

    fn language_of(&self, doc: &Document) -> Result<String> {
        resolve_language(doc.language.as_deref(), self.config.language.as_deref())
    }

    /// Appends a chunk layer to `doc`.
    ///
    /// The head of each chunk is its last term. Chunk ids continue from the existing ones.
    pub fn annotate_document(&self, doc: &mut Document) -> Result<()> {
        let language = self.language_of(doc)?;
        let chunker = self.cache.get(&language)?;
        let begin = Utc::now();
        let mut chunks = vec![];
        for sentence in &doc.sentences {
            let (tokens, pos_tags) = split_terms(sentence);
            for span in chunker.chunk_as_spans(&tokens, &pos_tags)? {
                let terms: Vec<String> = sentence[span.start()..span.end()]
                    .iter()
                    .map(|t| t.id.clone())
                    .collect();
                let Some(head) = terms.last().cloned() else {
                    continue;
                };
                chunks.push(ChunkAnnotation {
                    id: format!("c{}", doc.chunks.len() + chunks.len() + 1),
                    phrase: span.kind().to_string(),
                    head,
                    terms,
                });
            }
        }
        doc.chunks.extend(chunks);
        doc.language.get_or_insert(language.clone());
        doc.processors.push(ProcessorRecord {
            layer: CHUNK_LAYER.to_string(),
            name: format!("{}-{language}", env!("CARGO_PKG_NAME")),
            version: env!("CARGO_PKG_VERSION").to_string(),
            begin,
            end: Utc::now(),
        });
        Ok(())
    }

    /// Renders `token<TAB>pos<TAB>chunk` lines with a blank line after each sentence.
    ///
    /// # Errors
    ///
    /// [`ChunkerError::InvalidArgument`] if a term cannot be written as one tabular line.
    pub fn to_conll(&self, doc: &Document) -> Result<String> {
        doc.validate()?;
        let language = self.language_of(doc)?;
        let chunker = self.cache.get(&language)?;
        let mut out = String::new();
        for sentence in &doc.sentences {
            let (tokens, pos_tags) = split_terms(sentence);
            let tags = chunker.chunk(&tokens, &pos_tags)?;
            for ((token, pos), tag) in tokens.iter().zip(&pos_tags).zip(&tags) {
                out.push_str(&format!("{token}\t{pos}\t{tag}\n"));
            }
            out.push('\n');
        }
        Ok(out)
    }

    /// Parses `input`, chunks it and renders the result in the configured formats.
    pub fn annotate_text(&self, input: &str) -> Result<String> {
        let mut doc = match self.config.input_format {
            InputFormat::Document => Document::from_json(input)?,
            InputFormat::Conll => Document::from_conll(input)?,
        };
        match self.config.output_format {
            OutputFormat::Document => {
                self.annotate_document(&mut doc)?;
                doc.to_json()
            }
            OutputFormat::Conll => self.to_conll(&doc),
        }
    }
}
