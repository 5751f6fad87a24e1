//! Training parameters.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{ChunkerError, Result};
use crate::evaluator::ReportMode;
use crate::feature::FeatureSet;

/// Maximum entropy solver.
///
/// Every variant is a logistic regression solver of LIBLINEAR, i.e., a maximum entropy classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    /// L2-regularized logistic regression (primal).
    Maxent = 0,

    /// L1-regularized logistic regression.
    MaxentL1 = 6,

    /// L2-regularized logistic regression (dual).
    MaxentDual = 7,
}

impl FromStr for Algorithm {
    type Err = ChunkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MAXENT" | "0" => Ok(Self::Maxent),
            "L1_MAXENT" | "6" => Ok(Self::MaxentL1),
            "MAXENT_DUAL" | "7" => Ok(Self::MaxentDual),
            _ => Err(ChunkerError::config(format!("unsupported algorithm: {s}"))),
        }
    }
}

impl From<Algorithm> for liblinear::SolverType {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Maxent => Self::L2R_LR,
            Algorithm::MaxentL1 => Self::L1R_LR,
            Algorithm::MaxentDual => Self::L2R_LR_DUAL,
        }
    }
}

/// Iteration sweep of the grid search, written `start:step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IterationRange {
    pub start: u32,
    pub step: u32,
}

impl FromStr for IterationRange {
    type Err = ChunkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<_> = s
            .trim()
            .split([' ', ':', '-'])
            .filter(|f| !f.is_empty())
            .collect();
        let [start, step] = fields[..] else {
            return Err(ChunkerError::config(format!(
                "CrossEval must be two integers such as 1:5, got {s:?}"
            )));
        };
        let parse = |x: &str| {
            x.parse::<u32>()
                .map_err(|_| ChunkerError::config(format!("CrossEval: not a non-negative integer: {x:?}")))
        };
        let range = Self {
            start: parse(start)?,
            step: parse(step)?,
        };
        if range.step == 0 {
            return Err(ChunkerError::config("CrossEval step must be at least 1"));
        }
        Ok(range)
    }
}

/// Settings of one training run.
///
/// Settings are read from a properties file with [`TrainingParameters::load()`]. The grid search
/// reads `cutoff` and `iterations` as the upper bounds of its sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingParameters {
    pub language: Option<String>,
    pub algorithm: Option<Algorithm>,
    pub iterations: u32,
    pub cutoff: u32,
    pub cost: f64,
    pub beam_size: u32,
    pub feature_set: FeatureSet,
    pub train_set: Option<PathBuf>,
    pub test_set: Option<PathBuf>,
    pub dev_set: Option<PathBuf>,
    pub cross_eval: Option<IterationRange>,
    pub folds: usize,
    pub evaluation_type: ReportMode,
    pub output_model: Option<PathBuf>,
}

impl Default for TrainingParameters {
    fn default() -> Self {
        Self {
            language: None,
            algorithm: None,
            iterations: 100,
            cutoff: 5,
            cost: 1.0,
            beam_size: 3,
            feature_set: FeatureSet::default(),
            train_set: None,
            test_set: None,
            dev_set: None,
            cross_eval: None,
            folds: 10,
            evaluation_type: ReportMode::default(),
            output_model: None,
        }
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
{
    value
        .parse()
        .map_err(|_| ChunkerError::config(format!("{key}: invalid value {value:?}")))
}

impl TrainingParameters {
    /// Parses properties text.
    ///
    /// Lines are `key=value` (or `key:value`); lines starting with `#` or `!` are comments.
    ///
    /// # Errors
    ///
    /// [`ChunkerError::Config`] is returned if a value cannot be parsed.
    pub fn from_properties(text: &str) -> Result<Self> {
        let mut params = Self::default();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((key, value)) = line.split_once(['=', ':']) else {
                return Err(ChunkerError::config(format!(
                    "line {}: expected key=value, got {line:?}",
                    i + 1
                )));
            };
            let key = key.trim();
            let value = value.trim();
            match key {
                "Language" => params.language = Some(value.to_string()),
                "Algorithm" => params.algorithm = Some(value.parse()?),
                "Iterations" => params.iterations = parse_value(key, value)?,
                "Cutoff" => params.cutoff = parse_value(key, value)?,
                "Cost" => params.cost = parse_value(key, value)?,
                "Beamsize" => params.beam_size = parse_value(key, value)?,
                "Features" => params.feature_set = value.parse()?,
                "TrainSet" => params.train_set = Some(value.into()),
                "TestSet" => params.test_set = Some(value.into()),
                "DevSet" => params.dev_set = Some(value.into()),
                "CrossEval" => params.cross_eval = Some(value.parse()?),
                "Folds" => params.folds = parse_value(key, value)?,
                "EvaluationType" => params.evaluation_type = value.parse()?,
                "OutputModel" => params.output_model = Some(value.into()),
                _ => tracing::warn!("ignoring unknown parameter {key:?}"),
            }
        }
        if params.beam_size == 0 {
            return Err(ChunkerError::config("Beamsize must be at least 1"));
        }
        Ok(params)
    }

    /// Loads a properties file.
    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "loading training parameters");
        Self::from_properties(&fs::read_to_string(path)?)
    }

    pub fn language(&self) -> Result<&str> {
        self.language
            .as_deref()
            .ok_or_else(|| ChunkerError::config("Language must be specified in the parameters file"))
    }

    pub fn algorithm(&self) -> Result<Algorithm> {
        self.algorithm
            .ok_or_else(|| ChunkerError::config("Algorithm must be specified in the parameters file"))
    }

    pub fn train_set(&self) -> Result<&Path> {
        Self::required_path(&self.train_set, "TrainSet")
    }

    pub fn test_set(&self) -> Result<&Path> {
        Self::required_path(&self.test_set, "TestSet")
    }

    pub fn dev_set(&self) -> Result<&Path> {
        Self::required_path(&self.dev_set, "DevSet")
    }

    fn required_path<'a>(path: &'a Option<PathBuf>, key: &str) -> Result<&'a Path> {
        path.as_deref()
            .ok_or_else(|| ChunkerError::config(format!("{key} must be specified in the parameters file")))
    }

    /// Returns a copy with the trial's iteration count and cutoff.
    pub fn with_trial(&self, iterations: u32, cutoff: u32) -> Self {
        Self {
            iterations,
            cutoff,
            ..self.clone()
        }
    }

    /// LIBLINEAR has no iteration cap, so the iteration budget sets the stopping tolerance.
    pub fn stopping_criterion(&self) -> f64 {
        1.0 / f64::from(self.iterations.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_range() {
        assert_eq!(
            IterationRange { start: 1, step: 5 },
            "1:5".parse::<IterationRange>().unwrap()
        );
        assert_eq!(
            IterationRange { start: 10, step: 20 },
            "10-20".parse::<IterationRange>().unwrap()
        );
        assert_eq!(
            IterationRange { start: 0, step: 3 },
            " 0 3 ".parse::<IterationRange>().unwrap()
        );
    }

    #[test]
    fn test_iteration_range_errors() {
        for s in ["", "5", "1:2:3", "a:5", "1:0", "1.5:2"] {
            assert!(
                matches!(s.parse::<IterationRange>(), Err(ChunkerError::Config(_))),
                "{s:?} was accepted"
            );
        }
    }

    #[test]
    fn test_properties() {
        let params = TrainingParameters::from_properties(
            "# chunker\n\
             Language=en\n\
             Algorithm = MAXENT\n\
             Iterations=10\n\
             ! another comment\n\
             \n\
             Cutoff=1\n\
             CrossEval=1:5\n\
             TrainSet=train.txt\n\
             DevSet=dev.txt\n\
             EvaluationType=error\n\
             Features=baseline\n",
        )
        .unwrap();

        assert_eq!("en", params.language().unwrap());
        assert_eq!(Algorithm::Maxent, params.algorithm().unwrap());
        assert_eq!(10, params.iterations);
        assert_eq!(1, params.cutoff);
        assert_eq!(Some(IterationRange { start: 1, step: 5 }), params.cross_eval);
        assert_eq!(Path::new("train.txt"), params.train_set().unwrap());
        assert_eq!(Path::new("dev.txt"), params.dev_set().unwrap());
        assert_eq!(ReportMode::Error, params.evaluation_type);
        assert_eq!(FeatureSet::Baseline, params.feature_set);
        assert!(params.test_set().is_err());
    }

    #[test]
    fn test_defaults() {
        let params = TrainingParameters::from_properties("UnknownKey=1\n").unwrap();

        assert_eq!(100, params.iterations);
        assert_eq!(5, params.cutoff);
        assert_eq!(3, params.beam_size);
        assert_eq!(10, params.folds);
        assert_eq!(ReportMode::Detailed, params.evaluation_type);
        assert!(matches!(params.language(), Err(ChunkerError::Config(_))));
        assert!(matches!(params.algorithm(), Err(ChunkerError::Config(_))));
    }

    #[test]
    fn test_malformed_values() {
        for text in [
            "Iterations=many",
            "Cutoff=-1",
            "Algorithm=PERCEPTRON",
            "CrossEval=5",
            "Beamsize=0",
            "just a line",
        ] {
            assert!(
                matches!(TrainingParameters::from_properties(text), Err(ChunkerError::Config(_))),
                "{text:?} was accepted"
            );
        }
    }

    #[test]
    fn test_with_trial() {
        let params = TrainingParameters {
            language: Some("en".into()),
            ..Default::default()
        };
        let trial = params.with_trial(7, 1);

        assert_eq!(7, trial.iterations);
        assert_eq!(1, trial.cutoff);
        assert_eq!(Some("en".into()), trial.language);
        assert_eq!(100, params.iterations);
        assert_eq!(5, params.cutoff);
    }

    #[test]
    fn test_stopping_criterion() {
        assert!((TrainingParameters::default().stopping_criterion() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_liblinear_solver() {
        assert!(matches!(
            liblinear::SolverType::from(Algorithm::MaxentDual),
            liblinear::SolverType::L2R_LR_DUAL
        ));
    }
}
