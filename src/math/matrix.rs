use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::error::{NnError, Result};

/// Dense row-major matrix of `f64`.
///
/// The buffer length always equals `rows * cols` and both dimensions are
/// non-zero. All cell access goes through bounds-checked accessors; every
/// arithmetic operation validates shapes up front and returns a fresh,
/// independently owned matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Unchecked wire form; converted through `TryFrom` so a snapshot can never
/// smuggle in a buffer that disagrees with its shape.
#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<RawMatrix> for Matrix {
    type Error = NnError;

    fn try_from(raw: RawMatrix) -> Result<Matrix> {
        Matrix::from_vec(raw.rows, raw.cols, raw.data)
    }
}

/// Reserves exactly `rows * cols` cells, mapping every way this can go wrong
/// (degenerate shape, overflow, allocator refusal) to `AllocationFailure`.
fn reserve(rows: usize, cols: usize) -> Result<Vec<f64>> {
    let failure = NnError::AllocationFailure { rows, cols };
    if rows == 0 || cols == 0 {
        return Err(failure);
    }
    let len = rows.checked_mul(cols).ok_or(NnError::AllocationFailure { rows, cols })?;
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|_| failure)?;
    Ok(data)
}

impl Matrix {
    /// Zero-initialised `rows x cols` matrix.
    pub fn zeros(rows: usize, cols: usize) -> Result<Matrix> {
        Matrix::constant(rows, cols, 0.0)
    }

    /// Matrix filled uniformly with `value`.
    pub fn constant(rows: usize, cols: usize, value: f64) -> Result<Matrix> {
        let mut data = reserve(rows, cols)?;
        data.resize(rows * cols, value);
        Ok(Matrix { rows, cols, data })
    }

    /// `n x n` identity.
    pub fn identity(n: usize) -> Result<Matrix> {
        let mut res = Matrix::zeros(n, n)?;
        for i in 0..n {
            res.data[i * n + i] = 1.0;
        }
        Ok(res)
    }

    /// Returns `existing` untouched when it already has the requested shape,
    /// or a fresh zero matrix when there is nothing to reuse.
    ///
    /// Lets a hot loop keep one scratch buffer alive across iterations. A
    /// supplied matrix of the wrong shape is an error, never silently resized.
    pub fn create_or_reuse(rows: usize, cols: usize, existing: Option<Matrix>) -> Result<Matrix> {
        match existing {
            Some(m) if m.shape() == (rows, cols) => Ok(m),
            Some(m) => Err(NnError::ShapeMismatch {
                op: "create_or_reuse",
                left: (rows, cols),
                right: m.shape(),
            }),
            None => Matrix::zeros(rows, cols),
        }
    }

    /// Releases the matrix held in `slot`, if any. Calling it again on the
    /// same slot is a no-op.
    pub fn free(slot: &mut Option<Matrix>) {
        drop(slot.take());
    }

    /// Uniform samples in [-1, 1).
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Result<Matrix> {
        let mut res = Matrix::zeros(rows, cols)?;
        res.data.iter_mut().for_each(|x| *x = rng.gen::<f64>() * 2.0 - 1.0);
        Ok(res)
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // (0, 1] keeps ln() finite.
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn normal<R: Rng + ?Sized>(rows: usize, cols: usize, std_dev: f64, rng: &mut R) -> Result<Matrix> {
        let mut res = Matrix::zeros(rows, cols)?;
        res.data
            .iter_mut()
            .for_each(|x| *x = Matrix::sample_standard_normal(rng) * std_dev);
        Ok(res)
    }

    /// He initialization: N(0, sqrt(2 / cols)). `cols` is the fan-in.
    pub fn he<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Result<Matrix> {
        Matrix::normal(rows, cols, (2.0 / cols as f64).sqrt(), rng)
    }

    /// Xavier (Glorot) initialization: N(0, sqrt(1 / cols)). `cols` is the fan-in.
    pub fn xavier<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Result<Matrix> {
        Matrix::normal(rows, cols, (1.0 / cols as f64).sqrt(), rng)
    }

    /// Builds a matrix from a literal 2D array; the shape is taken from the
    /// array dimensions. Ragged rows are rejected.
    pub fn from_data(data: Vec<Vec<f64>>) -> Result<Matrix> {
        let rows = data.len();
        let cols = data.first().map(Vec::len).ok_or(NnError::NullInput("matrix rows"))?;
        if let Some(bad) = data.iter().find(|row| row.len() != cols) {
            return Err(NnError::ShapeMismatch {
                op: "from_data",
                left: (1, cols),
                right: (1, bad.len()),
            });
        }
        let mut buf = reserve(rows, cols)?;
        buf.extend(data.into_iter().flatten());
        Ok(Matrix { rows, cols, data: buf })
    }

    /// Wraps a row-major buffer; its length must equal `rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Matrix> {
        if rows == 0 || cols == 0 {
            return Err(NnError::AllocationFailure { rows, cols });
        }
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(NnError::ShapeMismatch {
                op: "from_vec",
                left: (rows, cols),
                right: (data.len(), 1),
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// `n x 1` column vector.
    pub fn column(values: Vec<f64>) -> Result<Matrix> {
        if values.is_empty() {
            return Err(NnError::NullInput("column values"));
        }
        Matrix::from_vec(values.len(), 1, values)
    }

    /// `1 x n` row vector.
    pub fn row(values: Vec<f64>) -> Result<Matrix> {
        if values.is_empty() {
            return Err(NnError::NullInput("row values"));
        }
        Matrix::from_vec(1, values.len(), values)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_column(&self) -> bool {
        self.cols == 1
    }

    /// Row-major view of every cell.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    fn offset(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.rows || col >= self.cols {
            return Err(NnError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(row * self.cols + col)
    }

    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.offset(row, col).map(|i| self.data[i])
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let i = self.offset(row, col)?;
        self.data[i] = value;
        Ok(())
    }

    pub fn row_slice(&self, row: usize) -> Result<&[f64]> {
        let start = self.offset(row, 0)?;
        Ok(&self.data[start..start + self.cols])
    }

    /// Builds a same-shaped matrix from a cell iterator, going through the
    /// fallible reservation like every other constructor.
    fn collect_shaped<I>(rows: usize, cols: usize, cells: I) -> Result<Matrix>
    where
        I: Iterator<Item = f64>,
    {
        let mut data = reserve(rows, cols)?;
        data.extend(cells);
        Ok(Matrix { rows, cols, data })
    }

    fn ensure_same_shape(&self, other: &Matrix, op: &'static str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(NnError::ShapeMismatch {
                op,
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(())
    }

    fn zip_with<F>(&self, other: &Matrix, op: &'static str, f: F) -> Result<Matrix>
    where
        F: Fn(f64, f64) -> f64,
    {
        self.ensure_same_shape(other, op)?;
        Matrix::collect_shaped(
            self.rows,
            self.cols,
            self.data.iter().zip(other.data.iter()).map(|(&a, &b)| f(a, b)),
        )
    }

    /// New matrix with `functor` applied to every cell.
    pub fn map<F>(&self, functor: F) -> Result<Matrix>
    where
        F: Fn(f64) -> f64,
    {
        Matrix::collect_shaped(self.rows, self.cols, self.data.iter().map(|&x| functor(x)))
    }

    pub fn map_in_place<F>(&mut self, functor: F)
    where
        F: Fn(f64) -> f64,
    {
        self.data.iter_mut().for_each(|x| *x = functor(*x));
    }

    /// Standard matrix product; `self.cols` must equal `rhs.rows`.
    pub fn multiply(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(NnError::ShapeMismatch {
                op: "multiply",
                left: self.shape(),
                right: rhs.shape(),
            });
        }

        let mut res = Matrix::zeros(self.rows, rhs.cols)?;

        for i in 0..self.rows {
            let lhs_row = &self.data[i * self.cols..(i + 1) * self.cols];
            let out_row = &mut res.data[i * rhs.cols..(i + 1) * rhs.cols];
            for (k, &a) in lhs_row.iter().enumerate() {
                let rhs_row = &rhs.data[k * rhs.cols..(k + 1) * rhs.cols];
                for (out, &b) in out_row.iter_mut().zip(rhs_row) {
                    *out += a * b;
                }
            }
        }

        Ok(res)
    }

    /// Element-wise (Hadamard) product of two same-shape matrices.
    pub fn hadamard(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, "hadamard", |a, b| a * b)
    }

    pub fn add(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, "add", |a, b| a + b)
    }

    pub fn subtract(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, "subtract", |a, b| a - b)
    }

    /// Every cell multiplied by `k`. `scale(1.0)` is the deep-copy idiom.
    pub fn scale(&self, k: f64) -> Result<Matrix> {
        self.map(|x| x * k)
    }

    pub fn transpose(&self) -> Result<Matrix> {
        let mut res = Matrix::zeros(self.cols, self.rows)?;

        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }

        Ok(res)
    }

    /// Shape check first, then exact cell-by-cell comparison (no tolerance).
    pub fn equals(&self, other: &Matrix) -> bool {
        self == other
    }

    /// Square root of the sum of squared cells.
    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    pub fn scale_in_place(&mut self, k: f64) {
        self.map_in_place(|x| x * k);
    }

    pub fn add_in_place(&mut self, rhs: &Matrix) -> Result<()> {
        self.add_scaled_in_place(rhs, 1.0)
    }

    /// `self += k * rhs`, cell by cell. The gradient-descent update is
    /// `weights.add_scaled_in_place(&grad, -lr)`.
    pub fn add_scaled_in_place(&mut self, rhs: &Matrix, k: f64) -> Result<()> {
        self.ensure_same_shape(rhs, "add_scaled_in_place")?;
        for (a, &b) in self.data.iter_mut().zip(rhs.data.iter()) {
            *a += k * b;
        }
        Ok(())
    }

    /// Row-major index of the largest cell; ties keep the first. NaN cells
    /// never win.
    pub fn argmax(&self) -> usize {
        self.data
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(best_i, best), (i, &x)| {
                if x > best {
                    (i, x)
                } else {
                    (best_i, best)
                }
            })
            .0
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(6);
        writeln!(f, "[")?;
        for row in self.data.chunks(self.cols) {
            write!(f, "  [")?;
            for (j, x) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:.*}", precision, x)?;
            }
            writeln!(f, "]")?;
        }
        write!(f, "]")
    }
}
