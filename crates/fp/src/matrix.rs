use std::fmt;

use crate::prime::{self, ValidPrime};
use crate::vector::FpVector;

/// A dense matrix over `F_p`.
///
/// Rows are stored as [`FpVector`]s, so row operations are cheap, but the
/// matrix is read as a linear map on *column* vectors: a coordinate vector of
/// length `columns()` is sent to one of length `rows()` by [`Matrix::apply`].
/// Row reduction records pivots in the same format as a column-to-pivot-row
/// map: `pivots()[j]` is the row index of the pivot in column `j`, or `-1`.
#[derive(Clone)]
pub struct Matrix {
    p: ValidPrime,
    columns: usize,
    rows: Vec<FpVector>,
    pivots: Vec<isize>,
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns && self.rows == other.rows
    }
}

impl Eq for Matrix {}

impl Matrix {
    /// The zero matrix with the given shape.
    pub fn new(p: ValidPrime, rows: usize, columns: usize) -> Self {
        Self {
            p,
            columns,
            rows: (0..rows).map(|_| FpVector::new(p, columns)).collect(),
            pivots: vec![-1; columns],
        }
    }

    pub fn identity(p: ValidPrime, dim: usize) -> Self {
        let mut result = Self::new(p, dim, dim);
        for i in 0..dim {
            result.rows[i].set_entry(i, 1);
        }
        result
    }

    pub fn from_rows(p: ValidPrime, rows: Vec<FpVector>, columns: usize) -> Self {
        for row in &rows {
            debug_assert_eq!(row.len(), columns);
        }
        Self {
            p,
            columns,
            rows,
            pivots: vec![-1; columns],
        }
    }

    pub fn from_vec(p: ValidPrime, input: &[Vec<u32>]) -> Self {
        let columns = input.first().map_or(0, Vec::len);
        let rows = input
            .iter()
            .map(|row| FpVector::from_slice(p, row))
            .collect();
        Self::from_rows(p, rows, columns)
    }

    /// Build the matrix whose columns are the given length-`dim` vectors.
    pub fn from_columns(p: ValidPrime, dim: usize, columns: &[&FpVector]) -> Self {
        let mut result = Self::new(p, dim, columns.len());
        for (j, col) in columns.iter().enumerate() {
            debug_assert_eq!(col.len(), dim);
            for i in 0..dim {
                result.rows[i].set_entry(j, col.entry(i));
            }
        }
        result
    }

    pub fn prime(&self) -> ValidPrime {
        self.p
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn row(&self, i: usize) -> &FpVector {
        &self.rows[i]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut FpVector {
        &mut self.rows[i]
    }

    pub fn column(&self, j: usize) -> FpVector {
        let mut result = FpVector::new(self.p, self.rows());
        for (i, row) in self.rows.iter().enumerate() {
            result.set_entry(i, row.entry(j));
        }
        result
    }

    pub fn iter(&self) -> std::slice::Iter<FpVector> {
        self.rows.iter()
    }

    pub fn is_zero(&self) -> bool {
        self.rows.iter().all(FpVector::is_zero)
    }

    pub fn pivots(&self) -> &[isize] {
        &self.pivots
    }

    /// The number of pivots after [`Matrix::row_reduce`].
    pub fn rank(&self) -> usize {
        self.pivots.iter().filter(|&&x| x >= 0).count()
    }

    /// `self * v`, reading `v` as a column vector.
    pub fn apply(&self, v: &FpVector) -> FpVector {
        debug_assert_eq!(v.len(), self.columns);
        let p = *self.p as u64;
        let mut result = FpVector::new(self.p, self.rows());
        for (i, row) in self.rows.iter().enumerate() {
            let mut acc: u64 = 0;
            for (j, c) in v.iter_nonzero() {
                acc += row.entry(j) as u64 * c as u64;
            }
            result.set_entry(i, (acc % p) as u32);
        }
        result
    }

    /// Matrix product `self * other`.
    pub fn compose(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.columns, other.rows());
        let mut result = Matrix::new(self.p, self.rows(), other.columns());
        let p = *self.p as u64;
        for i in 0..self.rows() {
            for j in 0..other.columns() {
                let mut acc: u64 = 0;
                for k in 0..self.columns {
                    acc += self.rows[i].entry(k) as u64 * other.rows[k].entry(j) as u64;
                }
                result.rows[i].set_entry(j, (acc % p) as u32);
            }
        }
        result
    }

    pub fn swap_rows(&mut self, i: usize, j: usize) {
        self.rows.swap(i, j);
    }

    /// `row[target] += coeff * row[source]`.
    pub fn row_op(&mut self, target: usize, source: usize, coeff: u32) {
        debug_assert!(target != source);
        let source_row = self.rows[source].clone();
        self.rows[target].add(&source_row, coeff);
    }

    /// Reduce to reduced row echelon form in place, recording pivots.
    pub fn row_reduce(&mut self) {
        let p = self.p;
        let rows = self.rows();
        self.pivots = vec![-1; self.columns];
        if rows == 0 {
            return;
        }
        let mut pivot: usize = 0;
        for pivot_column in 0..self.columns {
            // Search down the column for a nonzero entry.
            let Some(pivot_row) =
                (pivot..rows).find(|&i| self.rows[i].entry(pivot_column) != 0)
            else {
                continue;
            };

            self.pivots[pivot_column] = pivot as isize;
            self.swap_rows(pivot, pivot_row);

            let c = self.rows[pivot].entry(pivot_column);
            self.rows[pivot].scale(prime::inverse(p, c));

            for i in 0..rows {
                if i == pivot {
                    continue;
                }
                let entry = self.rows[i].entry(pivot_column);
                if entry != 0 {
                    self.row_op(i, pivot, *p - entry);
                }
            }
            pivot += 1;
            if pivot == rows {
                break;
            }
        }
    }

    /// A basis of `{v : self * v = 0}`.
    ///
    /// Computed by row reducing the augmented transpose `[selfᵀ | I]`: rows
    /// whose leading block vanishes carry kernel vectors in the trailing
    /// block.
    pub fn null_space(&self) -> Vec<FpVector> {
        let n = self.columns;
        let m = self.rows();
        let mut aug = Matrix::new(self.p, n, m + n);
        for j in 0..n {
            for i in 0..m {
                aug.rows[j].set_entry(i, self.rows[i].entry(j));
            }
            aug.rows[j].set_entry(m + j, 1);
        }
        aug.row_reduce();

        let mut result = Vec::new();
        for row in &aug.rows {
            if (0..m).all(|i| row.entry(i) == 0) {
                let mut v = FpVector::new(self.p, n);
                for j in 0..n {
                    v.set_entry(j, row.entry(m + j));
                }
                if !v.is_zero() {
                    result.push(v);
                }
            }
        }
        result
    }

    /// An independent subset of the columns spanning the image, in column
    /// order. The returned vectors are columns of the original matrix.
    pub fn column_space(&self) -> Vec<FpVector> {
        let mut reduced = self.clone();
        reduced.row_reduce();
        (0..self.columns)
            .filter(|&j| reduced.pivots[j] >= 0)
            .map(|j| self.column(j))
            .collect()
    }
}

/// The result of [`multi_reduce`]: which columns of each block were selected
/// as pivots, and the change-of-basis transform.
pub struct MultiReduction {
    /// For each input block, the in-block indices of its pivot columns.
    pub block_pivots: Vec<Vec<usize>>,
    /// The trailing identity block of the RREF of `[blocks… | I]`: the linear
    /// map from standard coordinates to coordinates in the concatenated pivot
    /// basis. Row `k` pairs with the `k`-th pivot, counted across blocks in
    /// order.
    pub transform: Matrix,
}

/// Row reduce the horizontal concatenation `[block_0 | block_1 | … | I]`,
/// where each block is a list of length-`dim` column vectors, and classify
/// the pivot columns by block. Pivots that fall in the trailing identity
/// block (directions outside the combined span) are not reported.
pub fn multi_reduce(p: ValidPrime, dim: usize, blocks: &[&[FpVector]]) -> MultiReduction {
    let total: usize = blocks.iter().map(|b| b.len()).sum();
    let mut aug = Matrix::new(p, dim, total + dim);
    for i in 0..dim {
        let mut col = 0;
        for block in blocks {
            for v in *block {
                debug_assert_eq!(v.len(), dim);
                aug.rows[i].set_entry(col, v.entry(i));
                col += 1;
            }
        }
        aug.rows[i].set_entry(total + i, 1);
    }
    aug.row_reduce();

    let mut block_pivots: Vec<Vec<usize>> = blocks.iter().map(|_| Vec::new()).collect();
    let mut block_idx = 0;
    let mut block_start = 0;
    for col in 0..total {
        while col - block_start >= blocks[block_idx].len() {
            block_start += blocks[block_idx].len();
            block_idx += 1;
        }
        if aug.pivots[col] >= 0 {
            block_pivots[block_idx].push(col - block_start);
        }
    }

    let mut transform = Matrix::new(p, dim, dim);
    for i in 0..dim {
        for j in 0..dim {
            transform.rows[i].set_entry(j, aug.rows[i].entry(total + j));
        }
    }

    MultiReduction {
        block_pivots,
        transform,
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut it = self.iter();
        match it.next() {
            Some(row) => write!(f, "[\n    {row}")?,
            None => return write!(f, "[]"),
        }
        for row in it {
            write!(f, ",\n    {row}")?;
        }
        write!(f, "\n]")
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl std::ops::Index<usize> for Matrix {
    type Output = FpVector;

    fn index(&self, i: usize) -> &Self::Output {
        &self.rows[i]
    }
}

impl std::ops::IndexMut<usize> for Matrix {
    fn index_mut(&mut self, i: usize) -> &mut Self::Output {
        &mut self.rows[i]
    }
}
