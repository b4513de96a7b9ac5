//! Dense parameter storage.
//!
//! A `Matrix` is shared between training threads through an `Arc` and updated
//! without locks. Each cell is a `Real`: reads and writes are single relaxed
//! atomic operations, but `Real::add` is a separate load and store, so two
//! threads adding to the same cell can lose one of the updates. Asynchronous
//! SGD tolerates that, and it keeps the races defined behaviour.

use std::fmt;
use std::io::{Read, Write};
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU32, Ordering};

use aligned_box::AlignedBox;
use anyhow::{anyhow, Context, Result};
use ordered_float::OrderedFloat;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::TrainError;
use crate::real;

const ALIGNMENT: usize = 128;

/// Seed for `Matrix::uniform`, so initialization is reproducible.
const INIT_SEED: u64 = 1;

#[derive(Default)]
#[repr(transparent)]
pub struct Real {
    bits: AtomicU32,
}

impl Real {
    pub fn new(value: real) -> Self {
        Real {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    pub fn get(&self) -> real {
        real::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: real) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn add(&self, x: real) {
        let a = self.get();
        self.set(a + x);
    }
}

pub struct Matrix {
    /// `data[i * cols..(i+1) * cols]` is row `i`.
    data: AlignedBox<[Real]>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// A zero-filled `rows` x `cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        let len = rows
            .checked_mul(cols)
            .ok_or_else(|| anyhow!("a {rows}x{cols} matrix is too large"))?;
        // Never ask for an empty aligned slice.
        let data = AlignedBox::slice_from_default(ALIGNMENT, len.max(1))
            .map_err(|err| anyhow!("error allocating a {rows}x{cols} matrix: {err:?}"))?;
        Ok(Matrix { data, rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    fn cells(&self) -> &[Real] {
        &self.data[..self.rows * self.cols]
    }

    pub fn at(&self, i: usize, j: usize) -> real {
        assert!(i < self.rows && j < self.cols, "({i}, {j}) out of bounds");
        self.data[i * self.cols + j].get()
    }

    pub fn set(&self, i: usize, j: usize, value: real) {
        assert!(i < self.rows && j < self.cols, "({i}, {j}) out of bounds");
        self.data[i * self.cols + j].set(value);
    }

    pub fn row(&self, i: usize) -> &[Real] {
        assert!(i < self.rows, "row {i} out of bounds ({} rows)", self.rows);
        &self.data[i * self.cols..][..self.cols]
    }

    pub fn zero(&self) {
        for cell in self.cells() {
            cell.set(0.0);
        }
    }

    /// Fill with values drawn uniformly from `-a..a`. The generator is always
    /// seeded the same way.
    pub fn uniform(&self, a: real) {
        if a <= 0.0 {
            self.zero();
            return;
        }
        let mut rng = StdRng::seed_from_u64(INIT_SEED);
        let dist = Uniform::new(-a, a);
        for cell in self.cells() {
            cell.set(dist.sample(&mut rng));
        }
    }

    /// Dot product of row `i` with `vec`.
    pub fn dot_row(&self, vec: &[real], i: usize) -> Result<real, TrainError> {
        assert_eq!(vec.len(), self.cols);
        let d = self
            .row(i)
            .iter()
            .zip(vec)
            .map(|(cell, &v)| cell.get() * v)
            .sum::<real>();
        if d.is_nan() {
            return Err(TrainError::Numeric);
        }
        Ok(d)
    }

    /// `row[i] += a * vec`
    pub fn add_row(&self, vec: &[real], i: usize, a: real) {
        assert_eq!(vec.len(), self.cols);
        for (cell, &v) in self.row(i).iter().zip(vec) {
            cell.add(a * v);
        }
    }

    pub fn l2_norm_row(&self, i: usize) -> Result<real, TrainError> {
        let norm = self
            .row(i)
            .iter()
            .map(|cell| cell.get() * cell.get())
            .sum::<real>();
        if norm.is_nan() {
            return Err(TrainError::Numeric);
        }
        Ok(norm.sqrt())
    }

    /// Write the shape as two native-endian `i64`s followed by the row-major
    /// `f32` payload.
    pub fn save<W: Write>(&self, out: &mut W) -> Result<()> {
        let shape = [self.rows as i64, self.cols as i64];
        out.write_all(bytemuck::cast_slice::<i64, u8>(&shape))
            .context("error writing matrix shape")?;
        let mut buf: Vec<real> = vec![0.0; self.cols];
        for i in 0..self.rows {
            for (b, cell) in buf.iter_mut().zip(self.row(i)) {
                *b = cell.get();
            }
            out.write_all(bytemuck::cast_slice::<real, u8>(&buf))
                .context("error writing matrix data")?;
        }
        Ok(())
    }

    /// Read a matrix written by `save`.
    pub fn load<R: Read>(input: &mut R) -> Result<Self> {
        let mut shape = [0i64; 2];
        input
            .read_exact(bytemuck::cast_slice_mut::<i64, u8>(&mut shape))
            .context("error reading matrix shape")?;
        let [rows, cols] = shape;
        if rows < 0 || cols < 0 {
            return Err(TrainError::MatrixShape(format!("negative shape {rows}x{cols}")).into());
        }

        let matrix = Matrix::new(rows as usize, cols as usize)?;
        let mut buf: Vec<real> = vec![0.0; matrix.cols];
        for i in 0..matrix.rows {
            input
                .read_exact(bytemuck::cast_slice_mut::<real, u8>(&mut buf))
                .map_err(|err| {
                    TrainError::MatrixShape(format!("row {i} of {rows}x{cols} matrix: {err}"))
                })?;
            for (cell, &b) in matrix.row(i).iter().zip(&buf) {
                cell.set(b);
            }
        }
        Ok(matrix)
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish_non_exhaustive()
    }
}

/// A private, fixed-length working vector.
#[derive(Clone, Debug, PartialEq)]
pub struct Vector {
    data: Vec<real>,
}

impl Vector {
    pub fn new(n: usize) -> Self {
        Vector { data: vec![0.0; n] }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[real] {
        &self.data
    }

    pub fn zero(&mut self) {
        self.data.fill(0.0);
    }

    pub fn norm(&self) -> real {
        self.data.iter().map(|&e| e * e).sum::<real>().sqrt()
    }

    pub fn mul(&mut self, a: real) {
        for e in &mut self.data {
            *e *= a;
        }
    }

    /// Add row `i` of `matrix` to this vector.
    pub fn add_row(&mut self, matrix: &Matrix, i: usize) {
        assert_eq!(self.len(), matrix.cols());
        for (e, cell) in self.data.iter_mut().zip(matrix.row(i)) {
            *e += cell.get();
        }
    }

    /// Add `a` times row `i` of `matrix` to this vector.
    pub fn add_row_scaled(&mut self, matrix: &Matrix, i: usize, a: real) {
        assert_eq!(self.len(), matrix.cols());
        for (e, cell) in self.data.iter_mut().zip(matrix.row(i)) {
            *e += a * cell.get();
        }
    }

    /// Set `self[i]` to the dot product of row `i` of `matrix` with `vec`.
    pub fn mul_matrix(&mut self, matrix: &Matrix, vec: &Vector) -> Result<(), TrainError> {
        assert_eq!(self.len(), matrix.rows());
        for i in 0..self.data.len() {
            self.data[i] = matrix.dot_row(vec.as_slice(), i)?;
        }
        Ok(())
    }

    /// Index of the largest element; the first one wins ties. Panics if empty.
    pub fn argmax(&self) -> usize {
        assert!(!self.data.is_empty(), "argmax of an empty vector");
        self.data
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|&(_, &x)| OrderedFloat(x))
            .map_or(0, |(i, _)| i)
    }
}

impl Index<usize> for Vector {
    type Output = real;

    fn index(&self, i: usize) -> &real {
        &self.data[i]
    }
}

impl IndexMut<usize> for Vector {
    fn index_mut(&mut self, i: usize) -> &mut real {
        &mut self.data[i]
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (j, e) in self.data.iter().enumerate() {
            if j > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}
