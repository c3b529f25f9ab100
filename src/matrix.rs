//! Dense 2D matrices.
//!
//! This is the value type that flows through the whole crate: batches are
//! `(batch_size, features)`, weights are `(out_features, in_features)`, a bias
//! is a single-row matrix `(1, out_features)`.
//!
//! Storage is a flat row-major `Vec<f32>`. The three matrix products backprop
//! needs (`A·B`, `A·Bᵀ`, `Aᵀ·B`) are expressed as strided GEMM calls so no
//! transpose is ever materialized:
//! - default: a simple, safe triple-loop kernel
//! - optional: a faster backend via the `matrixmultiply` feature
//!
//! Shape mismatches in these operations are programmer error and panic via
//! `assert!`; constructors that take external data validate and return
//! [`Result`](crate::Result).

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// All-zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Build a matrix from a flat row-major buffer.
    pub fn from_vec(data: Vec<f32>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidShape(format!(
                "buffer len {} does not match {rows}x{cols}",
                data.len()
            )));
        }
        Ok(Self { data, rows, cols })
    }

    /// Build a matrix from per-row slices. All rows must have the same length.
    pub fn from_rows(rows: &[&[f32]]) -> Result<Self> {
        let nrows = rows.len();
        if nrows == 0 {
            return Err(Error::InvalidShape("matrix must have at least one row".to_owned()));
        }
        let ncols = rows[0].len();
        let mut data = Vec::with_capacity(nrows * ncols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != ncols {
                return Err(Error::InvalidShape(format!(
                    "row {i} has len {}, expected {ncols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            rows: nrows,
            cols: ncols,
        })
    }

    /// Build a matrix by evaluating `f` once per element, in row-major order.
    pub fn from_fn<F: FnMut() -> f32>(rows: usize, cols: usize, mut f: F) -> Self {
        let data = (0..rows * cols).map(|_| f()).collect();
        Self { data, rows, cols }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col] = value;
    }

    /// Row `row` as a contiguous slice.
    #[inline]
    pub fn row(&self, row: usize) -> &[f32] {
        debug_assert!(row < self.rows);
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// `self · rhs`.
    ///
    /// Shape contract: `(m, k) · (k, n) -> (m, n)`.
    pub fn matmul(&self, rhs: &Matrix) -> Matrix {
        assert_eq!(
            self.cols, rhs.rows,
            "matmul: lhs is {}x{}, rhs is {}x{}",
            self.rows, self.cols, rhs.rows, rhs.cols
        );
        let mut out = Matrix::zeros(self.rows, rhs.cols);
        gemm(
            self.rows,
            rhs.cols,
            self.cols,
            &self.data,
            self.cols,
            1,
            &rhs.data,
            rhs.cols,
            1,
            &mut out.data,
        );
        out
    }

    /// `self · rhsᵀ` without materializing the transpose.
    ///
    /// Shape contract: `(m, k) · (n, k)ᵀ -> (m, n)`.
    pub fn matmul_rhs_t(&self, rhs: &Matrix) -> Matrix {
        assert_eq!(
            self.cols, rhs.cols,
            "matmul_rhs_t: lhs is {}x{}, rhs is {}x{}",
            self.rows, self.cols, rhs.rows, rhs.cols
        );
        let mut out = Matrix::zeros(self.rows, rhs.rows);
        // rhsᵀ element (p, j) lives at rhs.data[j * cols + p]: swap the strides.
        gemm(
            self.rows,
            rhs.rows,
            self.cols,
            &self.data,
            self.cols,
            1,
            &rhs.data,
            1,
            rhs.cols,
            &mut out.data,
        );
        out
    }

    /// `selfᵀ · rhs` without materializing the transpose.
    ///
    /// Shape contract: `(k, m)ᵀ · (k, n) -> (m, n)`.
    pub fn matmul_lhs_t(&self, rhs: &Matrix) -> Matrix {
        assert_eq!(
            self.rows, rhs.rows,
            "matmul_lhs_t: lhs is {}x{}, rhs is {}x{}",
            self.rows, self.cols, rhs.rows, rhs.cols
        );
        let mut out = Matrix::zeros(self.cols, rhs.cols);
        gemm(
            self.cols,
            rhs.cols,
            self.rows,
            &self.data,
            1,
            self.cols,
            &rhs.data,
            rhs.cols,
            1,
            &mut out.data,
        );
        out
    }

    /// Add a single-row matrix to every row of `self` (bias broadcast).
    pub fn add_row_assign(&mut self, row: &Matrix) {
        assert_eq!(
            (1, self.cols),
            row.shape(),
            "add_row_assign: self is {}x{}, row is {}x{}",
            self.rows,
            self.cols,
            row.rows,
            row.cols
        );
        for r in 0..self.rows {
            let base = r * self.cols;
            for c in 0..self.cols {
                self.data[base + c] += row.data[c];
            }
        }
    }

    /// Column-wise sums, as a `(1, cols)` matrix.
    pub fn column_sums(&self) -> Matrix {
        let mut out = Matrix::zeros(1, self.cols);
        for r in 0..self.rows {
            let base = r * self.cols;
            for c in 0..self.cols {
                out.data[c] += self.data[base + c];
            }
        }
        out
    }

    /// Elementwise map into a new matrix.
    pub fn map<F: Fn(f32) -> f32>(&self, f: F) -> Matrix {
        Matrix {
            data: self.data.iter().map(|&x| f(x)).collect(),
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Elementwise combine with another matrix of identical shape.
    pub fn zip_map<F: Fn(f32, f32) -> f32>(&self, other: &Matrix, f: F) -> Matrix {
        assert_eq!(
            self.shape(),
            other.shape(),
            "zip_map: self is {}x{}, other is {}x{}",
            self.rows,
            self.cols,
            other.rows,
            other.cols
        );
        Matrix {
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
            rows: self.rows,
            cols: self.cols,
        }
    }
}

/// `c = a · b` over strided inputs; `c` is contiguous row-major `(m, n)`.
///
/// Element `(i, p)` of `a` is `a[i * rsa + p * csa]`, element `(p, j)` of `b`
/// is `b[p * rsb + j * csb]`. Bounds are the caller's responsibility; all
/// callers in this module assert shapes first.
#[allow(clippy::too_many_arguments)]
#[inline]
fn gemm(
    m: usize,
    n: usize,
    k: usize,
    a: &[f32],
    rsa: usize,
    csa: usize,
    b: &[f32],
    rsb: usize,
    csb: usize,
    c: &mut [f32],
) {
    debug_assert_eq!(c.len(), m * n);

    #[cfg(feature = "matrixmultiply")]
    unsafe {
        matrixmultiply::sgemm(
            m,
            k,
            n,
            1.0,
            a.as_ptr(),
            rsa as isize,
            csa as isize,
            b.as_ptr(),
            rsb as isize,
            csb as isize,
            0.0,
            c.as_mut_ptr(),
            n as isize,
            1,
        );
    }

    #[cfg(not(feature = "matrixmultiply"))]
    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0_f32;
            let a0 = i * rsa;
            let b0 = j * csb;
            for p in 0..k {
                acc = a[a0 + p * csa].mul_add(b[p * rsb + b0], acc);
            }
            c[i * n + j] = acc;
        }
    }
}
