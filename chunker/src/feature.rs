//! Context features for chunk tag prediction.

use std::fmt;
use std::str::FromStr;

use bincode::{Decode, Encode};

use crate::errors::ChunkerError;

const BOS: &str = "bos";
const EOS: &str = "eos";

/// Feature template set used to describe a token position.
///
/// The set is stored in the model so that decoding always uses the templates the model was
/// trained with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Decode, Encode)]
pub enum FeatureSet {
    /// Words and POS tags in a ±2 window, the two previous chunk tags, and their conjunctions.
    #[default]
    Opennlp,

    /// Words and POS tags in a ±1 window and the previous chunk tag.
    Baseline,
}

impl FromStr for FeatureSet {
    type Err = ChunkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "opennlp" | "default" => Ok(Self::Opennlp),
            "baseline" => Ok(Self::Baseline),
            _ => Err(ChunkerError::config(format!("unknown feature set: {s}"))),
        }
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Opennlp => write!(f, "opennlp"),
            Self::Baseline => write!(f, "baseline"),
        }
    }
}

struct Window<'a, S> {
    items: &'a [S],
    center: usize,
}

impl<'a, S> Window<'a, S>
where
    S: AsRef<str>,
{
    fn at(&self, offset: isize) -> &'a str {
        let idx = self.center as isize + offset;
        if idx < 0 {
            BOS
        } else if idx as usize >= self.items.len() {
            EOS
        } else {
            self.items[idx as usize].as_ref()
        }
    }
}

impl FeatureSet {
    /// Generates the features of position `i`.
    ///
    /// `prior_tags` holds the chunk tags already assigned to positions `0..i`; only its last two
    /// entries are used.
    pub fn context<S, T>(self, i: usize, tokens: &[S], pos_tags: &[S], prior_tags: &[T]) -> Vec<String>
    where
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let w = Window {
            items: tokens,
            center: i,
        };
        let t = Window {
            items: pos_tags,
            center: i,
        };
        let p = |back: usize| {
            prior_tags
                .len()
                .checked_sub(back)
                .map_or(BOS, |idx| prior_tags[idx].as_ref())
        };

        let w_2 = format!("w_2={}", w.at(-2));
        let w_1 = format!("w_1={}", w.at(-1));
        let w0 = format!("w0={}", w.at(0));
        let w1 = format!("w1={}", w.at(1));
        let w2 = format!("w2={}", w.at(2));
        let t_2 = format!("t_2={}", t.at(-2));
        let t_1 = format!("t_1={}", t.at(-1));
        let t0 = format!("t0={}", t.at(0));
        let t1 = format!("t1={}", t.at(1));
        let t2 = format!("t2={}", t.at(2));
        let p_2 = format!("p_2={}", p(2));
        let p_1 = format!("p_1={}", p(1));

        match self {
            Self::Baseline => vec![
                format!("{p_1}|{t0}"),
                w_1,
                w0,
                w1,
                t_1,
                t0,
                t1,
                p_1,
            ],
            Self::Opennlp => {
                let mut features = vec![
                    format!("{w_1}|{w0}"),
                    format!("{w0}|{w1}"),
                    format!("{t_2}|{t_1}"),
                    format!("{t_1}|{t0}"),
                    format!("{t0}|{t1}"),
                    format!("{t1}|{t2}"),
                    format!("{t_2}|{t_1}|{t0}"),
                    format!("{t_1}|{t0}|{t1}"),
                    format!("{t0}|{t1}|{t2}"),
                    format!("{p_2}|{p_1}"),
                ];
                for x in [
                    &t_2,
                    &t_1,
                    &t0,
                    &t1,
                    &t2,
                    &w_2,
                    &w_1,
                    &w0,
                    &w1,
                    &w2,
                ] {
                    features.push(format!("{p_1}|{x}"));
                }
                features.push(format!("{p_1}|{t_2}|{t_1}"));
                features.push(format!("{p_1}|{t_1}|{t0}"));
                features.push(format!("{p_1}|{t0}|{t1}"));
                features.push(format!("{p_1}|{t1}|{t2}"));
                features.push(format!("{p_1}|{w_1}|{w0}"));
                features.push(format!("{p_1}|{w0}|{w1}"));
                features.extend([w_2, w_1, w0, w1, w2, t_2, t_1, t0, t1, t2, p_2, p_1]);
                features
            }
        }
    }
}
