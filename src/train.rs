//! Multi-threaded training driver and output files.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::{panic, thread};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::args::{Args, ModelKind};
use crate::dictionary::{Dictionary, Line};
use crate::matrix::{Matrix, Real, Vector};
use crate::model::Model;
use crate::real;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Counters shared by the workers and the supervisor.
struct Progress {
    token_count: AtomicU64,
    /// Average loss of thread 0, or -1 before it first reports.
    loss: Real,
    /// `epoch * ntokens`
    total: u64,
    start: Instant,
}

pub struct Trainer {
    args: Args,
    dict: Dictionary,
    input: Arc<Matrix>,
    output: Arc<Matrix>,
    loss: real,
}

impl fmt::Debug for Trainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trainer")
            .field("args", &self.args)
            .field("nwords", &self.dict.nwords())
            .field("nfeatures", &self.dict.nfeatures())
            .field("input", &self.input)
            .field("output", &self.output)
            .field("loss", &self.loss)
            .finish()
    }
}

fn open(path: &Path, what: &str) -> Result<BufReader<File>> {
    let file = File::open(path)
        .with_context(|| format!("error opening {what} {}", path.display()))?;
    Ok(BufReader::new(file))
}

impl Trainer {
    /// Build the dictionary from `args.input`, then train.
    pub fn train(args: Args) -> Result<Trainer> {
        args.validate()?;

        let mut dict = Dictionary::new(&args);
        let corpus = open(&args.input, "training file")?;
        match &args.infeature {
            Some(path) if args.model == ModelKind::Substoke => {
                let features = open(path, "feature file")?;
                dict.ingest_with_features(corpus, features)?;
            }
            _ => dict.ingest(corpus)?,
        }

        let input = Matrix::new(dict.nwords() + dict.nfeatures(), args.dim)?;
        input.uniform(1.0 / args.dim as real);
        let output = Matrix::new(dict.nwords(), args.dim)?;

        let mut trainer = Trainer {
            args,
            dict,
            input: Arc::new(input),
            output: Arc::new(output),
            loss: 0.0,
        };
        trainer.loss = trainer.run()?;
        Ok(trainer)
    }

    fn run(&self) -> Result<real> {
        let file_size = fs::metadata(&self.args.input)
            .with_context(|| format!("error reading metadata of {}", self.args.input.display()))?
            .len();
        let progress = Progress {
            token_count: AtomicU64::new(0),
            loss: Real::new(-1.0),
            total: self.args.epoch * self.dict.ntokens(),
            start: Instant::now(),
        };

        let bar = if self.args.verbose > 1 {
            ProgressBar::new(progress.total)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(ProgressStyle::with_template("{percent:>3}% [{bar:40}] {msg}")?);

        info!(
            model = ?self.args.model,
            threads = self.args.thread,
            tokens = progress.total,
            "starting training"
        );
        thread::scope(|s| -> Result<()> {
            let progress = &progress;
            let workers = (0..self.args.thread)
                .map(|id| s.spawn(move || self.train_thread(id, file_size, progress)))
                .collect::<Vec<_>>();

            while !workers.iter().all(|w| w.is_finished()) {
                thread::sleep(POLL_INTERVAL);
                self.report(&bar, progress);
            }
            self.report(&bar, progress);
            bar.finish();

            let mut result = Ok(());
            for (id, worker) in workers.into_iter().enumerate() {
                let outcome = worker
                    .join()
                    .unwrap_or_else(|payload| panic::resume_unwind(payload));
                if let Err(err) = outcome {
                    let err = err.context(format!("error in worker thread {id}"));
                    if result.is_ok() {
                        result = Err(err);
                    } else {
                        warn!("{err:#}");
                    }
                }
            }
            result
        })?;

        let loss = progress.loss.get();
        info!(
            loss,
            elapsed = ?progress.start.elapsed(),
            "training finished"
        );
        Ok(loss)
    }

    fn report(&self, bar: &ProgressBar, progress: &Progress) {
        let count = progress.token_count.load(Ordering::Relaxed);
        let elapsed = progress.start.elapsed().as_secs_f64();
        let fraction = (count as f64 / progress.total as f64).min(1.0);
        let lr = self.args.lr as f64 * (1.0 - fraction);
        let words_per_sec = count as f64 / elapsed.max(1e-3) / self.args.thread as f64;
        let eta = if fraction > 0.0 {
            (elapsed / fraction * (1.0 - fraction)) as u64
        } else {
            0
        };
        bar.set_position(count.min(progress.total));
        bar.set_message(format!(
            "words/sec/thread: {words_per_sec:.0}  lr: {lr:.6}  loss: {:.6}  eta: {}h{}m",
            progress.loss.get(),
            eta / 3600,
            eta % 3600 / 60,
        ));
    }

    fn train_thread(&self, id: usize, file_size: u64, progress: &Progress) -> Result<()> {
        let mut input = open(&self.args.input, "training file")?;
        input
            .seek(SeekFrom::Start(id as u64 * file_size / self.args.thread as u64))
            .context("error seeking within training file")?;

        let mut model = Model::new(
            Arc::clone(&self.input),
            Arc::clone(&self.output),
            &self.args,
            id as u64,
        );
        model.set_target_counts(&self.dict.counts());

        let mut line = Line::default();
        let mut bow = vec![];
        let mut local_count = 0;
        loop {
            let token_count = progress.token_count.load(Ordering::Relaxed);
            if token_count >= progress.total {
                break;
            }
            let lr = self.args.lr * (1.0 - token_count as real / progress.total as real);
            local_count += self.dict.get_line(&mut input, &mut line, model.rng())?;
            match self.args.model {
                ModelKind::Cbow => self.cbow(&mut model, &line, lr, &mut bow)?,
                ModelKind::Skipgram | ModelKind::Subword | ModelKind::Substoke => {
                    self.skipgram(&mut model, &line, lr)?
                }
            }
            if local_count > self.args.lr_update_rate {
                progress.token_count.fetch_add(local_count, Ordering::Relaxed);
                local_count = 0;
                if id == 0 {
                    progress.loss.set(model.loss());
                }
            }
        }
        if id == 0 {
            progress.loss.set(model.loss());
        }
        Ok(())
    }

    /// Predict every context target from the centre token's sources.
    fn skipgram(&self, model: &mut Model, line: &Line, lr: real) -> Result<()> {
        for w in 0..line.len() {
            let boundary = model.rng().gen_range(1..=self.args.ws);
            let sources = &line.sources[w];
            for c in w.saturating_sub(boundary)..(w + boundary + 1).min(line.len()) {
                if c != w {
                    model.update(sources, line.targets[c], lr)?;
                }
            }
        }
        Ok(())
    }

    /// Predict the centre target from the pooled sources of its context.
    fn cbow(&self, model: &mut Model, line: &Line, lr: real, bow: &mut Vec<usize>) -> Result<()> {
        for w in 0..line.len() {
            let boundary = model.rng().gen_range(1..=self.args.ws);
            bow.clear();
            for c in w.saturating_sub(boundary)..(w + boundary + 1).min(line.len()) {
                if c != w {
                    bow.extend_from_slice(&line.sources[c]);
                }
            }
            model.update(bow, line.targets[w], lr)?;
        }
        Ok(())
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    pub fn input_matrix(&self) -> &Matrix {
        &self.input
    }

    pub fn output_matrix(&self) -> &Matrix {
        &self.output
    }

    /// Average loss reported by thread 0 at the end of training.
    pub fn loss(&self) -> real {
        self.loss
    }

    /// A fresh model over the trained matrices.
    pub fn model(&self) -> Model {
        let mut model = Model::new(
            Arc::clone(&self.input),
            Arc::clone(&self.output),
            &self.args,
            0,
        );
        model.set_target_counts(&self.dict.counts());
        model
    }

    /// `<output><suffix>`
    pub fn output_path(&self, suffix: &str) -> PathBuf {
        let mut path = self.args.output.clone();
        path.as_mut_os_string().push(suffix);
        path
    }

    fn row(&self, matrix: &Matrix, i: usize) -> Vector {
        let mut v = Vector::new(self.args.dim);
        v.add_row(matrix, i);
        v
    }

    /// Mean of the given input rows; zero if there are none.
    fn average(&self, rows: &[usize]) -> Vector {
        let mut v = Vector::new(self.args.dim);
        for &row in rows {
            v.add_row(&self.input, row);
        }
        if !rows.is_empty() {
            v.mul(1.0 / rows.len() as real);
        }
        v
    }

    /// Mean of the word's feature rows; zero if it has none.
    pub fn word_vector(&self, id: usize) -> Vector {
        self.average(self.dict.word_features(id))
    }

    fn word_vectors(&self) -> impl ExactSizeIterator<Item = (&str, Vector)> + '_ {
        self.dict
            .word_props()
            .iter()
            .map(move |wp| (wp.word.as_str(), self.average(&wp.features)))
    }

    /// Write the text vector files for the trained model. Returns the paths
    /// written.
    pub fn save_vectors(&self) -> Result<Vec<PathBuf>> {
        let dim = self.args.dim;
        let nwords = self.dict.nwords();

        let mut written = vec![];
        match self.args.model {
            ModelKind::Skipgram | ModelKind::Cbow => {
                let path = self.output_path(".vec");
                let rows = (0..nwords).map(|id| (self.dict.word(id), self.row(&self.input, id)));
                write_vectors(&path, dim, rows)?;
                written.push(path);
            }
            ModelKind::Subword => {
                let path = self.output_path(".vec");
                write_vectors(&path, dim, self.word_vectors())?;
                written.push(path);
            }
            ModelKind::Substoke => {
                let path = self.output_path(".avg");
                write_vectors(&path, dim, self.word_vectors())?;
                written.push(path);

                let path = self.output_path(".vec");
                let targets = (0..self.dict.ntargets())
                    .map(|id| (self.dict.target(id), self.row(&self.output, id)));
                write_vectors(&path, dim, targets)?;
                written.push(path);
            }
        }
        if self.args.model.uses_features() {
            let path = self.output_path(".feature");
            let features = (0..self.dict.nfeatures())
                .map(|f| (self.dict.feature(f), self.row(&self.input, nwords + f)));
            write_vectors(&path, dim, features)?;
            written.push(path);
        }
        for path in &written {
            info!("wrote {}", path.display());
        }
        Ok(written)
    }

    /// Write `<output>.bin`: a bincode header with the configuration and
    /// vocabulary, then the input and output matrices.
    pub fn save_model(&self) -> Result<PathBuf> {
        let path = self.output_path(".bin");
        let mut out = BufWriter::new(
            File::create(&path)
                .with_context(|| format!("error creating checkpoint {}", path.display()))?,
        );
        let header = CheckpointHeader {
            args: self.args.clone(),
            words: self
                .dict
                .words()
                .map(|(word, count)| (word.to_string(), count))
                .collect(),
            features: (0..self.dict.nfeatures())
                .map(|f| self.dict.feature(f).to_string())
                .collect(),
        };
        bincode::serialize_into(&mut out, &header).context("error writing checkpoint header")?;
        self.input.save(&mut out)?;
        self.output.save(&mut out)?;
        out.flush().context("error writing checkpoint")?;
        info!("wrote {}", path.display());
        Ok(path)
    }
}

/// Write a `<count> <dim>` header, then one `<name> <values...>` line per
/// entry.
fn write_vectors<'a, I>(path: &Path, dim: usize, entries: I) -> Result<()>
where
    I: ExactSizeIterator<Item = (&'a str, Vector)>,
{
    let mut out = BufWriter::new(
        File::create(path).with_context(|| format!("error creating {}", path.display()))?,
    );
    writeln!(out, "{} {}", entries.len(), dim).context("error writing output file")?;
    for (name, vector) in entries {
        writeln!(out, "{name} {vector}").context("error writing output file")?;
    }
    out.flush().context("error writing output file")?;
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct CheckpointHeader {
    args: Args,
    words: Vec<(String, u64)>,
    features: Vec<String>,
}

/// The contents of a checkpoint written by `Trainer::save_model`.
pub struct Checkpoint {
    pub args: Args,
    /// Words and counts in id order.
    pub words: Vec<(String, u64)>,
    /// Feature strings in id order; feature `f` is input row `words.len() + f`.
    pub features: Vec<String>,
    pub input: Matrix,
    pub output: Matrix,
}

impl Checkpoint {
    pub fn load(path: &Path) -> Result<Checkpoint> {
        let mut input = open(path, "checkpoint")?;
        Self::read(&mut input)
    }

    pub fn read<R: Read>(input: &mut R) -> Result<Checkpoint> {
        let header: CheckpointHeader =
            bincode::deserialize_from(&mut *input).context("error reading checkpoint header")?;
        let input_matrix = Matrix::load(input)?;
        let output_matrix = Matrix::load(input)?;
        Ok(Checkpoint {
            args: header.args,
            words: header.words,
            features: header.features,
            input: input_matrix,
            output: output_matrix,
        })
    }
}
