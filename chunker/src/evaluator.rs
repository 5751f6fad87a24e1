//! Chunk-level evaluation.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::errors::{ChunkerError, Result};
use crate::model::Chunker;
use crate::sample::Sample;
use crate::span::Span;

/// Kind of evaluation report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportMode {
    /// Precision, recall and F-measure.
    Brief,

    /// Scores for every chunk type.
    #[default]
    Detailed,

    /// Every mistagged token, followed by the brief scores.
    Error,
}

impl FromStr for ReportMode {
    type Err = ChunkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "brief" => Ok(Self::Brief),
            "detailed" => Ok(Self::Detailed),
            "error" => Ok(Self::Error),
            _ => Err(ChunkerError::config(format!(
                "unknown evaluation type {s:?} (brief, detailed or error)"
            ))),
        }
    }
}

/// Span-level precision, recall and F-measure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FMeasure {
    /// Number of predicted spans.
    pub selected: usize,
    /// Number of gold spans.
    pub target: usize,
    pub true_positive: usize,
}

fn ratio(x: usize, y: usize) -> f64 {
    if y == 0 {
        0.0
    } else {
        x as f64 / y as f64
    }
}

impl FMeasure {
    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.selected)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.target)
    }

    pub fn value(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Adds the counts of one sentence.
    pub fn update(&mut self, gold: &[Span], predicted: &[Span]) {
        let gold_set: HashSet<_> = gold.iter().collect();
        self.true_positive += predicted.iter().filter(|s| gold_set.contains(s)).count();
        self.selected += predicted.len();
        self.target += gold.len();
    }

    pub fn merge(&mut self, other: &Self) {
        self.selected += other.selected;
        self.target += other.target;
        self.true_positive += other.true_positive;
    }
}

impl fmt::Display for FMeasure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Precision: {}", self.precision())?;
        writeln!(f, "Recall: {}", self.recall())?;
        write!(f, "F-Measure: {}", self.value())
    }
}

/// A token whose predicted tag differs from the gold one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenError {
    pub sentence: usize,
    pub index: usize,
    pub token: String,
    pub pos: String,
    pub expected: String,
    pub predicted: String,
    /// Tokens in a ±2 window around the mistake.
    pub context: String,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{}\t{}\t{}\texpected: {}\tpredicted: {}\t[{}]",
            self.sentence,
            self.index,
            self.token,
            self.pos,
            self.expected,
            self.predicted,
            self.context
        )
    }
}

/// Result of an evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationReport {
    pub mode: ReportMode,
    pub overall: FMeasure,
    /// Filled in detailed mode.
    pub per_type: BTreeMap<String, FMeasure>,
    /// Filled in error mode, in corpus order.
    pub errors: Vec<TokenError>,
}

impl EvaluationReport {
    pub fn new(mode: ReportMode) -> Self {
        Self {
            mode,
            overall: FMeasure::default(),
            per_type: BTreeMap::new(),
            errors: vec![],
        }
    }

    /// Adds the counts of `other` to this report.
    ///
    /// Sentence indices of `other`'s errors are kept as they are.
    pub fn merge(&mut self, other: Self) {
        self.overall.merge(&other.overall);
        for (kind, fm) in other.per_type {
            self.per_type.entry(kind).or_default().merge(&fm);
        }
        self.errors.extend(other.errors);
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.mode {
            ReportMode::Brief => writeln!(f, "{}", self.overall),
            ReportMode::Detailed => {
                writeln!(
                    f,
                    "{:>10} {:>8} {:>8} {:>10} {:>10} {:>10}",
                    "type", "gold", "pred", "precision", "recall", "F-measure"
                )?;
                let rows = std::iter::once(("TOTAL", &self.overall))
                    .chain(self.per_type.iter().map(|(k, v)| (k.as_str(), v)));
                for (kind, fm) in rows {
                    writeln!(
                        f,
                        "{:>10} {:>8} {:>8} {:>10.4} {:>10.4} {:>10.4}",
                        kind,
                        fm.target,
                        fm.selected,
                        fm.precision(),
                        fm.recall(),
                        fm.value()
                    )?;
                }
                Ok(())
            }
            ReportMode::Error => {
                for e in &self.errors {
                    writeln!(f, "{e}")?;
                }
                writeln!(f, "{}", self.overall)
            }
        }
    }
}

fn window(tokens: &[String], i: usize) -> String {
    let start = i.saturating_sub(2);
    let end = (i + 3).min(tokens.len());
    tokens[start..end].join(" ")
}

/// Evaluates a chunker against gold samples.
pub struct Evaluator<'a> {
    chunker: &'a Chunker,
}

impl<'a> Evaluator<'a> {
    pub fn new(chunker: &'a Chunker) -> Self {
        Self { chunker }
    }

    /// Consumes `samples` and scores the predicted chunks.
    ///
    /// # Errors
    ///
    /// Errors of the sample stream are returned as is.
    pub fn evaluate<I>(&self, samples: I, mode: ReportMode) -> Result<EvaluationReport>
    where
        I: IntoIterator<Item = Result<Sample>>,
    {
        let mut report = EvaluationReport::new(mode);
        for (sent_idx, sample) in samples.into_iter().enumerate() {
            let sample = sample?;
            let predicted_tags = self.chunker.chunk(sample.tokens(), sample.pos_tags())?;
            let gold = sample.phrases_as_spans();
            let predicted = crate::span::spans_from_tags(&predicted_tags);
            report.overall.update(&gold, &predicted);

            match mode {
                ReportMode::Brief => {}
                ReportMode::Detailed => {
                    let mut kinds: Vec<&str> = gold.iter().map(Span::kind).collect();
                    kinds.extend(predicted.iter().map(Span::kind));
                    kinds.sort_unstable();
                    kinds.dedup();
                    for kind in kinds {
                        let g: Vec<_> = gold.iter().filter(|s| s.kind() == kind).cloned().collect();
                        let p: Vec<_> = predicted
                            .iter()
                            .filter(|s| s.kind() == kind)
                            .cloned()
                            .collect();
                        report
                            .per_type
                            .entry(kind.to_string())
                            .or_default()
                            .update(&g, &p);
                    }
                }
                ReportMode::Error => {
                    for (i, (expected, predicted)) in
                        sample.chunk_tags().iter().zip(&predicted_tags).enumerate()
                    {
                        if expected != predicted {
                            report.errors.push(TokenError {
                                sentence: sent_idx,
                                index: i,
                                token: sample.tokens()[i].clone(),
                                pos: sample.pos_tags()[i].clone(),
                                expected: expected.clone(),
                                predicted: predicted.clone(),
                                context: window(sample.tokens(), i),
                            });
                        }
                    }
                }
            }
        }
        Ok(report)
    }
}
