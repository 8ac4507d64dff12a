use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

use crate::error::{Error, Result};

/// Dense row-major matrix of `f64`.
///
/// A batch of examples is stored one example per row, so a `(batch, features)`
/// matrix times a `(features, units)` kernel yields `(batch, units)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wraps a row-major buffer. Fails if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Matrix> {
        if data.len() != rows * cols {
            return Err(Error::shape(
                format!("{} values for a {}x{} matrix", rows * cols, rows, cols),
                data.len(),
            ));
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Builds a matrix from equally sized rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Matrix> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(Error::shape(
                    format!("row {} of length {}", i, cols),
                    row.len(),
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(Matrix {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Glorot (Xavier) uniform initialization: samples from
    /// U(-limit, limit) with `limit = sqrt(6 / (fan_in + fan_out))`.
    ///
    /// Shape: (fan_in, fan_out), the kernel layout used by `Dense`.
    pub fn glorot_uniform<R: Rng + ?Sized>(fan_in: usize, fan_out: usize, rng: &mut R) -> Matrix {
        let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
        let dist = Uniform::new_inclusive(-limit, limit);
        let data = (0..fan_in * fan_out).map(|_| dist.sample(rng)).collect();
        Matrix {
            rows: fan_in,
            cols: fan_out,
            data,
        }
    }

    /// Reinterprets the buffer as `(-1, cols)`.
    pub fn reshape(self, cols: usize) -> Result<Matrix> {
        if cols == 0 || self.data.len() % cols != 0 {
            return Err(Error::shape(
                format!("a multiple of {} values", cols),
                self.data.len(),
            ));
        }
        Ok(Matrix {
            rows: self.data.len() / cols,
            cols,
            data: self.data,
        })
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_iter(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact(0) panics; an empty matrix simply has no rows.
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    /// Element-wise (Hadamard) product of two same-shape matrices.
    pub fn hadamard(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.rows, other.rows);
        assert_eq!(self.cols, other.cols);
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&other.data).map(|(a, b)| a * b).collect(),
        }
    }

    /// Adds a `1 × cols` row vector to every row.
    pub fn add_row(&self, row: &Matrix) -> Matrix {
        assert_eq!(row.rows, 1, "broadcast operand must be a single row");
        assert_eq!(self.cols, row.cols, "Matrices are of incorrect sizes");
        let mut res = self.clone();
        for chunk in res.data.chunks_exact_mut(self.cols.max(1)) {
            for (x, b) in chunk.iter_mut().zip(&row.data) {
                *x += b;
            }
        }
        res
    }

    /// Column sums as a `1 × cols` row vector.
    pub fn sum_rows(&self) -> Matrix {
        let mut res = Matrix::zeros(1, self.cols);
        for row in self.row_iter() {
            for (acc, x) in res.data.iter_mut().zip(row) {
                *acc += x;
            }
        }
        res
    }

    /// Index of the maximum element of every row. Ties resolve to the lowest
    /// index.
    pub fn argmax_rows(&self) -> Vec<usize> {
        self.row_iter().map(argmax).collect()
    }
}

/// Index of the maximum element in a slice.
pub fn argmax(v: &[f64]) -> usize {
    let mut best = 0;
    for (i, &x) in v.iter().enumerate() {
        if x > v[best] {
            best = i;
        }
    }
    best
}

impl Add for &Matrix {
    type Output = Matrix;

    fn add(self, rhs: Self) -> Self::Output {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            panic!("Matrices are of incorrect sizes")
        }
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&rhs.data).map(|(a, b)| a + b).collect(),
        }
    }
}

impl Sub for &Matrix {
    type Output = Matrix;

    fn sub(self, rhs: Self) -> Self::Output {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            panic!("Matrices are of incorrect sizes")
        }
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&rhs.data).map(|(a, b)| a - b).collect(),
        }
    }
}

impl Mul for &Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Self) -> Self::Output {
        if self.cols != rhs.rows {
            panic!("Matrices are of incorrect sizes")
        }

        let mut res = Matrix::zeros(self.rows, rhs.cols);

        // i-k-j order keeps the inner loop on contiguous memory of both
        // `rhs` and `res`.
        for i in 0..self.rows {
            let out = &mut res.data[i * rhs.cols..(i + 1) * rhs.cols];
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                if a == 0.0 {
                    continue;
                }
                let rhs_row = &rhs.data[k * rhs.cols..(k + 1) * rhs.cols];
                for (o, b) in out.iter_mut().zip(rhs_row) {
                    *o += a * b;
                }
            }
        }

        res
    }
}
