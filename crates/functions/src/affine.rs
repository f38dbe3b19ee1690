use hitch_core::{DifferentiableFunction, FunctionError, LiegroupSpace};
use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, ArrayViewMut2};

/// The affine map `y = A x + b` between vector spaces.
///
/// The Jacobian is `A` everywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Affine {
    name: String,
    space: LiegroupSpace,
    matrix: Array2<f64>,
    offset: Array1<f64>,
}

impl Affine {
    /// Creates the map `x ↦ matrix · x + offset`.
    ///
    /// # Errors
    ///
    /// Returns [`FunctionError::InvalidInput`] if `offset` does not have one
    /// entry per row of `matrix`.
    pub fn new(
        name: impl Into<String>,
        matrix: Array2<f64>,
        offset: Array1<f64>,
    ) -> Result<Self, FunctionError> {
        if offset.len() != matrix.nrows() {
            return Err(FunctionError::InvalidInput(format!(
                "offset has {} entries but the matrix has {} rows",
                offset.len(),
                matrix.nrows()
            )));
        }
        Ok(Self {
            name: name.into(),
            space: LiegroupSpace::rn(matrix.nrows()),
            matrix,
            offset,
        })
    }

    /// Creates the linear map `x ↦ matrix · x`.
    pub fn linear(name: impl Into<String>, matrix: Array2<f64>) -> Self {
        let rows = matrix.nrows();
        Self {
            name: name.into(),
            space: LiegroupSpace::rn(rows),
            matrix,
            offset: Array1::zeros(rows),
        }
    }

    /// Creates the identity map on `R^n`.
    pub fn identity(name: impl Into<String>, n: usize) -> Self {
        Self::linear(name, Array2::eye(n))
    }

    #[must_use]
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    #[must_use]
    pub fn offset(&self) -> &Array1<f64> {
        &self.offset
    }
}

impl DifferentiableFunction for Affine {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> usize {
        self.matrix.ncols()
    }

    fn input_derivative_size(&self) -> usize {
        self.matrix.ncols()
    }

    fn output_space(&self) -> &LiegroupSpace {
        &self.space
    }

    fn compute(
        &self,
        input: ArrayView1<'_, f64>,
        mut output: ArrayViewMut1<'_, f64>,
    ) -> Result<(), FunctionError> {
        if input.len() != self.matrix.ncols() {
            return Err(FunctionError::InvalidInput(format!(
                "expected {} inputs, got {}",
                self.matrix.ncols(),
                input.len()
            )));
        }
        output.assign(&(self.matrix.dot(&input) + &self.offset));
        Ok(())
    }

    fn jacobian(
        &self,
        _input: ArrayView1<'_, f64>,
        mut jacobian: ArrayViewMut2<'_, f64>,
    ) -> Result<(), FunctionError> {
        jacobian.assign(&self.matrix);
        Ok(())
    }
}
