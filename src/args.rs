use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::error::TrainError;
use crate::real;

/// Which inputs feed the model and how context is assembled from a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum ModelKind {
    /// Train word embedding with the skip-gram model
    Skipgram,
    /// Train word embedding with the continuous bag of words model
    Cbow,
    /// Train word embedding from character n-grams (fastText skip-gram)
    Subword,
    /// Train Chinese word embedding from stroke n-grams (cw2vec)
    Substoke,
}

impl ModelKind {
    /// True for the variants whose inputs are n-gram features rather than
    /// whole words.
    pub fn uses_features(self) -> bool {
        matches!(self, ModelKind::Subword | ModelKind::Substoke)
    }
}

#[derive(Clone, Debug, Parser, Serialize, Deserialize)]
#[command(about = "Train word, subword and stroke embeddings", long_about = None, version)]
pub struct Args {
    /// Model to train
    #[arg(value_enum)]
    pub model: ModelKind,

    /// Training file path
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Character-to-stroke feature file, required by substoke
    #[arg(long, value_name = "FILE")]
    pub infeature: Option<PathBuf>,

    /// Output path prefix; suffixes are added per model
    #[arg(long, value_name = "PREFIX")]
    pub output: PathBuf,

    /// Learning rate
    #[arg(long, default_value_t = 0.05)]
    pub lr: real,

    /// Number of tokens each thread reads between learning rate updates
    #[arg(long, default_value_t = 100)]
    pub lr_update_rate: u64,

    /// Size of word vectors
    #[arg(long, default_value_t = 100)]
    pub dim: usize,

    /// Size of the context window
    #[arg(long, default_value_t = 5)]
    pub ws: usize,

    /// Number of epochs
    #[arg(long, default_value_t = 5)]
    pub epoch: u64,

    /// Minimal number of word occurrences
    #[arg(long, default_value_t = 10)]
    pub min_count: u64,

    /// Number of negatives sampled
    #[arg(long, default_value_t = 5)]
    pub neg: usize,

    /// Number of buckets (accepted for compatibility; features get their own ids)
    #[arg(long, default_value_t = 2_000_000)]
    pub bucket: usize,

    /// Min length of char ngram
    #[arg(long, default_value_t = 3)]
    pub minn: usize,

    /// Max length of char ngram
    #[arg(long, default_value_t = 6)]
    pub maxn: usize,

    /// Number of threads
    #[arg(long, default_value_t = 1)]
    pub thread: usize,

    /// Sampling threshold
    #[arg(short = 't', default_value_t = 1e-3)]
    pub t: real,

    /// Verbosity level: 0 warnings, 1 info, 2 progress
    #[arg(long, default_value_t = 2)]
    pub verbose: u8,

    /// Also save a binary checkpoint with the vocabulary and both matrices
    #[arg(long)]
    pub save_model: bool,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            model: ModelKind::Skipgram,
            input: PathBuf::new(),
            infeature: None,
            output: PathBuf::new(),
            lr: 0.05,
            lr_update_rate: 100,
            dim: 100,
            ws: 5,
            epoch: 5,
            min_count: 10,
            neg: 5,
            bucket: 2_000_000,
            minn: 3,
            maxn: 6,
            thread: 1,
            t: 1e-3,
            verbose: 2,
            save_model: false,
        }
    }
}

impl Args {
    /// Reject configurations that cannot train.
    pub fn validate(&self) -> Result<(), TrainError> {
        let invalid = |msg: &str| Err(TrainError::InvalidArgument(msg.to_string()));
        if self.input.as_os_str() == "-" {
            return invalid("cannot use stdin for training");
        }
        if self.dim == 0 {
            return invalid("--dim must be positive");
        }
        if self.ws == 0 {
            return invalid("--ws must be positive");
        }
        if self.epoch == 0 {
            return invalid("--epoch must be positive");
        }
        if self.thread == 0 {
            return invalid("--thread must be positive");
        }
        if self.model.uses_features() && self.minn == 0 {
            return invalid("--minn must be positive");
        }
        if self.model.uses_features() && self.minn > self.maxn {
            return invalid("--minn must not exceed --maxn");
        }
        if self.model == ModelKind::Substoke && self.infeature.is_none() {
            return invalid("substoke needs a feature file (--infeature)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_command_line() {
        let parsed = Args::parse_from(["subword2vec", "cbow", "--input", "in.txt", "--output", "out"]);
        let defaults = Args::default();
        assert_eq!(parsed.model, ModelKind::Cbow);
        assert_eq!(parsed.input, PathBuf::from("in.txt"));
        assert_eq!(parsed.lr, defaults.lr);
        assert_eq!(parsed.lr_update_rate, defaults.lr_update_rate);
        assert_eq!(parsed.dim, defaults.dim);
        assert_eq!(parsed.ws, defaults.ws);
        assert_eq!(parsed.epoch, defaults.epoch);
        assert_eq!(parsed.min_count, defaults.min_count);
        assert_eq!(parsed.neg, defaults.neg);
        assert_eq!((parsed.minn, parsed.maxn), (defaults.minn, defaults.maxn));
        assert_eq!(parsed.t, defaults.t);
        assert_eq!(parsed.verbose, defaults.verbose);
        assert!(!parsed.save_model);
    }

    #[test]
    fn parses_options() {
        let parsed = Args::parse_from([
            "subword2vec", "substoke", "--input", "zh.txt", "--infeature", "strokes.txt",
            "--output", "vec", "--dim", "8", "--min-count", "1", "-t", "1e-4", "--thread", "4",
            "--lr-update-rate", "50", "--save-model",
        ]);
        assert_eq!(parsed.model, ModelKind::Substoke);
        assert_eq!(parsed.infeature, Some(PathBuf::from("strokes.txt")));
        assert_eq!(parsed.dim, 8);
        assert_eq!(parsed.min_count, 1);
        assert_eq!(parsed.t, 1e-4);
        assert_eq!(parsed.thread, 4);
        assert_eq!(parsed.lr_update_rate, 50);
        assert!(parsed.save_model);
        parsed.validate().unwrap();
    }

    #[test]
    fn validation() {
        let ok = Args {
            input: "corpus.txt".into(),
            ..Args::default()
        };
        ok.validate().unwrap();

        let bad = [
            Args { input: "-".into(), ..ok.clone() },
            Args { dim: 0, ..ok.clone() },
            Args { ws: 0, ..ok.clone() },
            Args { thread: 0, ..ok.clone() },
            Args { model: ModelKind::Subword, minn: 4, maxn: 3, ..ok.clone() },
            Args { model: ModelKind::Subword, minn: 0, maxn: 1, ..ok.clone() },
            Args { model: ModelKind::Substoke, infeature: Some("s.txt".into()), minn: 0, ..ok.clone() },
            Args { model: ModelKind::Substoke, ..ok.clone() },
        ];
        // Whole-word models ignore the n-gram bounds.
        Args { minn: 0, ..ok.clone() }.validate().unwrap();

        for args in bad {
            assert!(matches!(args.validate(), Err(TrainError::InvalidArgument(_))));
        }
    }
}
