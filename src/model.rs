//! Per-thread SGD over shared parameter matrices, with negative sampling.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::args::Args;
use crate::error::TrainError;
use crate::matrix::{Matrix, Vector};
use crate::real;

pub const SIGMOID_TABLE_SIZE: usize = 512;
pub const MAX_SIGMOID: real = 8.0;
pub const LOG_TABLE_SIZE: usize = 512;
pub const NEGATIVE_TABLE_SIZE: usize = 10_000_000;

pub struct Model {
    /// Rows are words, then features.
    input: Arc<Matrix>,
    /// Rows are targets.
    output: Arc<Matrix>,
    hidden: Vector,
    output_scores: Vector,
    grad: Vector,
    neg: usize,

    negatives: Vec<u32>,
    negpos: usize,
    /// Number of different ids in `negatives`; sampling needs at least two.
    negative_ids: usize,

    t_sigmoid: Vec<real>,
    t_log: Vec<real>,
    rng: StdRng,

    loss: real,
    nexamples: u64,
}

impl Model {
    pub fn new(input: Arc<Matrix>, output: Arc<Matrix>, args: &Args, seed: u64) -> Self {
        let dim = input.cols();
        assert_eq!(dim, output.cols(), "input and output dimensions differ");

        let t_sigmoid = (0..=SIGMOID_TABLE_SIZE)
            .map(|i| {
                let x = (i as real * 2.0 * MAX_SIGMOID) / SIGMOID_TABLE_SIZE as real - MAX_SIGMOID;
                1.0 / (1.0 + (-x).exp())
            })
            .collect();
        let t_log = (0..=LOG_TABLE_SIZE)
            .map(|i| ((i as real + 1e-5) / LOG_TABLE_SIZE as real).ln())
            .collect();

        Model {
            hidden: Vector::new(dim),
            output_scores: Vector::new(output.rows()),
            grad: Vector::new(dim),
            neg: args.neg,
            negatives: Vec::new(),
            negpos: 0,
            negative_ids: 0,
            t_sigmoid,
            t_log,
            rng: StdRng::seed_from_u64(seed),
            loss: 0.0,
            nexamples: 1,
            input,
            output,
        }
    }

    /// Approximate the logistic function, 1 / (1 + e^-x).
    pub fn sigmoid(&self, x: real) -> real {
        if x < -MAX_SIGMOID {
            0.0
        } else if x > MAX_SIGMOID {
            1.0
        } else {
            let i = ((x + MAX_SIGMOID) * SIGMOID_TABLE_SIZE as real / MAX_SIGMOID / 2.0) as usize;
            self.t_sigmoid[i]
        }
    }

    /// Approximate natural log on `(0, 1]`; 0 above 1.
    pub fn log(&self, x: real) -> real {
        if x > 1.0 {
            return 0.0;
        }
        let i = (x * LOG_TABLE_SIZE as real) as usize;
        self.t_log[i]
    }

    /// Build the negative-sampling table: each target id appears in
    /// proportion to the square root of its count.
    pub fn set_target_counts(&mut self, counts: &[u64]) {
        assert_eq!(counts.len(), self.output.rows(), "one count per output row");
        let z: f64 = counts.iter().map(|&c| (c as f64).sqrt()).sum();
        self.negatives.clear();
        for (id, &count) in counts.iter().enumerate() {
            let copies = ((count as f64).sqrt() * NEGATIVE_TABLE_SIZE as f64 / z).ceil() as usize;
            self.negatives.extend(std::iter::repeat(id as u32).take(copies));
        }
        self.negatives.shuffle(&mut self.rng);
        self.negpos = 0;
        self.negative_ids = counts.iter().filter(|&&c| c > 0).count();
    }

    /// Next id from the negative table that is not `target`.
    fn get_negative(&mut self, target: usize) -> Option<usize> {
        if self.negative_ids < 2 {
            return None;
        }
        loop {
            let negative = self.negatives[self.negpos] as usize;
            self.negpos = (self.negpos + 1) % self.negatives.len();
            if negative != target {
                return Some(negative);
            }
        }
    }

    fn binary_logistic(&mut self, target: usize, label: bool, lr: real) -> Result<real, TrainError> {
        let score = self.sigmoid(self.output.dot_row(self.hidden.as_slice(), target)?);
        let truth = if label { 1.0 } else { 0.0 };
        let alpha = lr * (truth - score);
        self.grad.add_row_scaled(&self.output, target, alpha);
        self.output.add_row(self.hidden.as_slice(), target, alpha);
        Ok(if label {
            -self.log(score)
        } else {
            -self.log(1.0 - score)
        })
    }

    fn negative_sampling(&mut self, target: usize, lr: real) -> Result<real, TrainError> {
        let mut loss = self.binary_logistic(target, true, lr)?;
        for _ in 0..self.neg {
            let Some(negative) = self.get_negative(target) else {
                break;
            };
            loss += self.binary_logistic(negative, false, lr)?;
        }
        Ok(loss)
    }

    /// Set `hidden` to the average of the input rows.
    fn compute_hidden(&mut self, input: &[usize]) {
        self.hidden.zero();
        for &i in input {
            self.hidden.add_row(&self.input, i);
        }
        self.hidden.mul(1.0 / input.len() as real);
    }

    /// One SGD step: predict `target` from the average of the `input` rows.
    pub fn update(&mut self, input: &[usize], target: usize, lr: real) -> Result<(), TrainError> {
        if input.is_empty() {
            return Ok(());
        }
        self.compute_hidden(input);
        self.grad.zero();
        self.loss += self.negative_sampling(target, lr)?;
        self.nexamples += 1;

        for &i in input {
            self.input.add_row(self.grad.as_slice(), i, 1.0);
        }
        Ok(())
    }

    /// The target scoring highest against the average of the `input` rows.
    pub fn predict(&mut self, input: &[usize]) -> Result<Option<usize>, TrainError> {
        if input.is_empty() || self.output_scores.is_empty() {
            return Ok(None);
        }
        self.compute_hidden(input);
        self.output_scores.mul_matrix(&self.output, &self.hidden)?;
        Ok(Some(self.output_scores.argmax()))
    }

    /// Average loss per example so far.
    pub fn loss(&self) -> real {
        self.loss / self.nexamples as real
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}
