//! Chunk samples and the restartable corpus reader.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{ChunkerError, Result};
use crate::span::{spans_from_tags, Span};

/// One sentence of the corpus: aligned tokens, part-of-speech tags and chunk tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    tokens: Vec<String>,
    pos_tags: Vec<String>,
    chunk_tags: Vec<String>,
}

impl Sample {
    /// Creates a new sample.
    ///
    /// # Errors
    ///
    /// [`ChunkerError::InvalidArgument`] will be returned if the three sequences differ in length.
    pub fn new(tokens: Vec<String>, pos_tags: Vec<String>, chunk_tags: Vec<String>) -> Result<Self> {
        if tokens.len() != pos_tags.len() || tokens.len() != chunk_tags.len() {
            return Err(ChunkerError::invalid_argument(
                "sample",
                format!(
                    "length mismatch: {} tokens, {} POS tags, {} chunk tags",
                    tokens.len(),
                    pos_tags.len(),
                    chunk_tags.len()
                ),
            ));
        }
        Ok(Self {
            tokens,
            pos_tags,
            chunk_tags,
        })
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn pos_tags(&self) -> &[String] {
        &self.pos_tags
    }

    pub fn chunk_tags(&self) -> &[String] {
        &self.chunk_tags
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Gold chunks of this sample.
    pub fn phrases_as_spans(&self) -> Vec<Span> {
        spans_from_tags(&self.chunk_tags)
    }
}

/// Tabular form: one `token<TAB>pos<TAB>chunk` line per token, no trailing blank line.
impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for ((token, pos), chunk) in self.tokens.iter().zip(&self.pos_tags).zip(&self.chunk_tags) {
            writeln!(f, "{token}\t{pos}\t{chunk}")?;
        }
        Ok(())
    }
}

/// A corpus that can be streamed any number of times.
///
/// File corpora are reopened on every call to [`Corpus::samples()`]; in-memory corpora replay a
/// shared buffer.
#[derive(Clone, Debug)]
pub enum Corpus {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

impl Corpus {
    pub fn from_path<P>(path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self::File(path.into())
    }

    pub fn from_text<S>(text: S) -> Self
    where
        S: AsRef<str>,
    {
        Self::Memory(Arc::from(text.as_ref().as_bytes()))
    }

    /// Starts a fresh pass over the corpus.
    ///
    /// # Errors
    ///
    /// [`ChunkerError::Io`] if the file cannot be opened.
    pub fn samples(&self) -> Result<SampleReader<Box<dyn BufRead>>> {
        let rdr: Box<dyn BufRead> = match self {
            Self::File(path) => {
                tracing::debug!(path = %path.display(), "opening corpus");
                Box::new(BufReader::new(File::open(path)?))
            }
            Self::Memory(buf) => Box::new(Cursor::new(Arc::clone(buf))),
        };
        Ok(SampleReader::new(rdr))
    }

    /// Reads every sample into memory.
    pub fn read_all(&self) -> Result<Vec<Sample>> {
        self.samples()?.collect()
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Memory(_) => None,
        }
    }
}

/// Lazy reader turning corpus lines into [`Sample`]s.
///
/// Blank lines separate sentences; every other line must hold exactly `token pos chunk`
/// separated by tabs or spaces. Lines with a different number of fields are skipped.
pub struct SampleReader<R> {
    lines: io::Lines<R>,
    line_no: usize,
}

impl<R> SampleReader<R>
where
    R: BufRead,
{
    pub fn new(rdr: R) -> Self {
        Self {
            lines: rdr.lines(),
            line_no: 0,
        }
    }
}

impl<R> Iterator for SampleReader<R>
where
    R: BufRead,
{
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut tokens = vec![];
        let mut pos_tags = vec![];
        let mut chunk_tags = vec![];
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return Some(Err(e.into())),
                None => break,
            };
            self.line_no += 1;
            let mut fields = line.split_whitespace();
            let (Some(token), Some(pos), Some(chunk), None) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                if line.trim().is_empty() {
                    if tokens.is_empty() {
                        continue;
                    }
                    break;
                }
                tracing::warn!(line = self.line_no, "skipping corrupt corpus line: {line:?}");
                continue;
            };
            tokens.push(token.to_string());
            pos_tags.push(pos.to_string());
            chunk_tags.push(chunk.to_string());
        }
        if tokens.is_empty() {
            return None;
        }
        Some(Sample::new(tokens, pos_tags, chunk_tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    fn strings(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_read_rockwell() {
        let corpus = Corpus::from_text("Rockwell NNP B-NP\nInternational NNP I-NP\nsaid VBD B-VP\n\n");
        let samples = corpus.read_all().unwrap();

        assert_eq!(1, samples.len());
        assert_eq!(strings(&["Rockwell", "International", "said"]), samples[0].tokens());
        assert_eq!(strings(&["NNP", "NNP", "VBD"]), samples[0].pos_tags());
        assert_eq!(strings(&["B-NP", "I-NP", "B-VP"]), samples[0].chunk_tags());
    }

    #[test]
    fn test_blocks_and_blank_runs() {
        let corpus = Corpus::from_text(
            "\n\nHe PRP B-NP\nran VBD B-VP\n\n\n\nIt PRP B-NP\n \nThey PRP B-NP\nwon VBD B-VP",
        );
        let samples = corpus.read_all().unwrap();

        assert_eq!(3, samples.len());
        assert_eq!(vec![2, 1, 2], samples.iter().map(Sample::len).collect::<Vec<_>>());
        for s in &samples {
            assert_eq!(s.tokens().len(), s.pos_tags().len());
            assert_eq!(s.tokens().len(), s.chunk_tags().len());
        }
    }

    #[test]
    fn test_tabs_and_spaces() {
        let corpus = Corpus::from_text("Rockwell\tNNP\tB-NP\nsaid  VBD \t B-VP\n");
        let samples = corpus.read_all().unwrap();

        assert_eq!(strings(&["Rockwell", "said"]), samples[0].tokens());
        assert_eq!(strings(&["B-NP", "B-VP"]), samples[0].chunk_tags());
    }

    #[test]
    fn test_corrupt_line_skipped() {
        let corpus = Corpus::from_text("Rockwell NNP B-NP\nbroken NN\nsaid VBD B-VP extra\nit PRP B-NP\n");
        let samples = corpus.read_all().unwrap();

        assert_eq!(1, samples.len());
        assert_eq!(strings(&["Rockwell", "it"]), samples[0].tokens());
    }

    #[test]
    fn test_empty_corpus() {
        assert!(Corpus::from_text("").read_all().unwrap().is_empty());
        assert!(Corpus::from_text("\n\n  \n").read_all().unwrap().is_empty());
    }

    #[test]
    fn test_restartable() {
        let corpus = Corpus::from_text("a DT B-NP\n\nb DT B-NP\n");
        let first: Vec<_> = corpus.samples().unwrap().collect::<Result<_>>().unwrap();
        let second: Vec<_> = corpus.samples().unwrap().collect::<Result<_>>().unwrap();

        assert_eq!(2, first.len());
        assert_eq!(first, second);
    }

    #[test]
    fn test_file_corpus_restartable() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "Rockwell NNP B-NP\nsaid VBD B-VP\n\nIt PRP B-NP\n").unwrap();
        let corpus = Corpus::from_path(f.path());

        assert_eq!(2, corpus.read_all().unwrap().len());
        assert_eq!(2, corpus.samples().unwrap().count());
    }

    #[test]
    fn test_missing_file() {
        let corpus = Corpus::from_path("/nonexistent/corpus.txt");

        assert!(matches!(corpus.samples(), Err(ChunkerError::Io(_))));
    }

    #[test]
    fn test_length_mismatch() {
        let s = Sample::new(strings(&["a", "b"]), strings(&["DT"]), strings(&["B-NP", "I-NP"]));

        assert!(matches!(
            s,
            Err(ChunkerError::InvalidArgument { arg: "sample", .. })
        ));
    }

    #[test]
    fn test_tabular_reparse() {
        let text = "Confidence NN B-NP\nin IN B-PP\nthe DT B-NP\npound NN I-NP\n\n\
                    is VBZ B-VP\nwidely RB I-VP\nexpected VBN I-VP\n. . O\n";
        let samples = Corpus::from_text(text).read_all().unwrap();
        let rendered: String = samples.iter().map(|s| format!("{s}\n")).collect();
        let reparsed = Corpus::from_text(rendered).read_all().unwrap();

        assert_eq!(samples, reparsed);
    }
}
