use ndarray::{Array2, ArrayBase, ArrayView2, Data, DataMut, Ix2, s};

use super::BlockIndices;

/// Row and column blocks addressing a sub-matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixBlocks {
    rows: BlockIndices,
    cols: BlockIndices,
}

impl MatrixBlocks {
    #[must_use]
    pub fn new(rows: BlockIndices, cols: BlockIndices) -> Self {
        Self { rows, cols }
    }

    #[must_use]
    pub fn rows(&self) -> &BlockIndices {
        &self.rows
    }

    #[must_use]
    pub fn cols(&self) -> &BlockIndices {
        &self.cols
    }

    /// Returns a read-only view of the addressed sub-matrix of `matrix`.
    #[must_use]
    pub fn view<'a, S>(&'a self, matrix: &'a ArrayBase<S, Ix2>) -> MatrixBlockView<'a>
    where
        S: Data<Elem = f64>,
    {
        MatrixBlockView {
            blocks: self,
            matrix: matrix.view(),
        }
    }

    /// Scatters `values` into the addressed sub-matrix of `target`.
    ///
    /// # Panics
    ///
    /// Panics if `values` is not `rows.nb_indices() × cols.nb_indices()` or a
    /// block lies outside `target`.
    pub fn write_to<S, T>(&self, values: &ArrayBase<S, Ix2>, target: &mut ArrayBase<T, Ix2>)
    where
        S: Data<Elem = f64>,
        T: DataMut<Elem = f64>,
    {
        assert_eq!(
            values.dim(),
            (self.rows.nb_indices(), self.cols.nb_indices()),
            "gathered block shape mismatch"
        );
        for (row_offset, row) in self.rows.placed() {
            for (col_offset, col) in self.cols.placed() {
                target.slice_mut(s![row.range(), col.range()]).assign(&values.slice(s![
                    row_offset..row_offset + row.len(),
                    col_offset..col_offset + col.len()
                ]));
            }
        }
    }
}

/// A borrowed sub-matrix selected by [`MatrixBlocks`].
///
/// Nothing is copied until [`MatrixBlockView::eval`] is called.
#[derive(Debug, Clone)]
pub struct MatrixBlockView<'a> {
    blocks: &'a MatrixBlocks,
    matrix: ArrayView2<'a, f64>,
}

impl MatrixBlockView<'_> {
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.blocks.rows.nb_indices()
    }

    #[must_use]
    pub fn ncols(&self) -> usize {
        self.blocks.cols.nb_indices()
    }

    /// Returns the entry at local position `(i, j)` of the view.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        let row = self.blocks.rows.index_at(i)?;
        let col = self.blocks.cols.index_at(j)?;
        self.matrix.get((row, col)).copied()
    }

    /// Copies the viewed entries into an owned matrix.
    #[must_use]
    pub fn eval(&self) -> Array2<f64> {
        self.blocks
            .cols
            .cview_cols(&self.blocks.rows.rview_rows(&self.matrix))
    }

    /// Frobenius norm of the viewed entries.
    #[must_use]
    pub fn norm(&self) -> f64 {
        self.blocks
            .rows
            .segments()
            .iter()
            .flat_map(|row| {
                self.blocks.cols.segments().iter().map(move |col| {
                    self.matrix
                        .slice(s![row.range(), col.range()])
                        .iter()
                        .map(|x| x * x)
                        .sum::<f64>()
                })
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Returns true if every viewed entry is within `tol` of zero.
    #[must_use]
    pub fn is_zero(&self, tol: f64) -> bool {
        self.eval().iter().all(|x| x.abs() <= tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use ndarray::array;

    fn sample() -> Array2<f64> {
        array![
            [0., 1., 2., 3.],
            [4., 5., 6., 7.],
            [8., 9., 10., 11.],
            [12., 13., 14., 15.],
        ]
    }

    fn rows_1_3_cols_0_2() -> MatrixBlocks {
        let mut rows = BlockIndices::new();
        rows.add_row(1, 1);
        rows.add_row(3, 1);
        let mut cols = BlockIndices::new();
        cols.add_col(0, 1);
        cols.add_col(2, 1);
        MatrixBlocks::new(rows, cols)
    }

    #[test]
    fn view_selects_rows_then_columns() {
        let m = sample();
        let blocks = rows_1_3_cols_0_2();
        let view = blocks.view(&m);

        assert_eq!((view.nrows(), view.ncols()), (2, 2));
        assert_eq!(view.eval(), array![[4., 6.], [12., 14.]]);
        assert_eq!(view.get(1, 1), Some(14.0));
        assert_eq!(view.get(2, 0), None);
    }

    #[test]
    fn norm_matches_evaluated_block() {
        let m = sample();
        let blocks = rows_1_3_cols_0_2();
        let expected = (16.0_f64 + 36.0 + 144.0 + 196.0).sqrt();
        assert_relative_eq!(blocks.view(&m).norm(), expected);
    }

    #[test]
    fn write_to_leaves_other_entries() {
        let blocks = rows_1_3_cols_0_2();
        let mut target = Array2::<f64>::zeros((4, 4));
        blocks.write_to(&array![[1., 2.], [3., 4.]], &mut target);

        assert_relative_eq!(target[[1, 0]], 1.0);
        assert_relative_eq!(target[[1, 2]], 2.0);
        assert_relative_eq!(target[[3, 0]], 3.0);
        assert_relative_eq!(target[[3, 2]], 4.0);
        assert_relative_eq!(target.sum(), 10.0);
        assert!(blocks.view(&target).norm() > 0.0);
    }

    #[test]
    fn empty_blocks_view_is_zero() {
        let m = sample();
        let blocks = MatrixBlocks::default();
        let view = blocks.view(&m);
        assert!(view.is_zero(0.0));
        assert_relative_eq!(view.norm(), 0.0);
    }
}
