use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, ArrayViewMut2};
use thiserror::Error;

use crate::space::LiegroupSpace;

/// Errors that may occur when evaluating a function or its Jacobian.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FunctionError {
    /// The function has no value at the given input.
    ///
    /// For example, a relative pose between two frames that coincide.
    #[error("function is undefined at the given input")]
    Undefined { context: Option<String> },

    /// The input values are outside the function's valid domain.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The calculation failed due to a numerical or internal error.
    #[error("calculation error: {0}")]
    Calculation(String),
}

/// A vector function with a Jacobian, whose output lives in a Lie group.
///
/// Values and derivatives are sized independently: a function producing a
/// unit quaternion has an output of size 4 and an output derivative of size 3.
/// The input is a flat value vector of [`input_size`] entries; Jacobians have
/// [`output_derivative_size`] rows and [`input_derivative_size`] columns.
///
/// Implementations are used as trait objects by solvers, so the trait
/// requires `Send + Sync` and every method takes `&self`.
///
/// [`input_size`]: DifferentiableFunction::input_size
/// [`output_derivative_size`]: DifferentiableFunction::output_derivative_size
/// [`input_derivative_size`]: DifferentiableFunction::input_derivative_size
pub trait DifferentiableFunction: Send + Sync {
    /// A human readable name used in logs and errors.
    fn name(&self) -> &str;

    /// Number of input values.
    fn input_size(&self) -> usize;

    /// Number of input derivatives.
    fn input_derivative_size(&self) -> usize;

    /// The space the output belongs to.
    fn output_space(&self) -> &LiegroupSpace;

    /// Number of output values.
    fn output_size(&self) -> usize {
        self.output_space().nq()
    }

    /// Number of output derivatives.
    fn output_derivative_size(&self) -> usize {
        self.output_space().nv()
    }

    /// Writes the function value at `input` into `output`.
    ///
    /// # Errors
    ///
    /// Returns a [`FunctionError`] if no value can be produced for `input`.
    fn compute(
        &self,
        input: ArrayView1<'_, f64>,
        output: ArrayViewMut1<'_, f64>,
    ) -> Result<(), FunctionError>;

    /// Writes the Jacobian at `input` into `jacobian`.
    ///
    /// The matrix is zeroed by the caller, so sparse Jacobians only need to
    /// write their non-zero entries.
    ///
    /// # Errors
    ///
    /// Returns a [`FunctionError`] if the Jacobian is undefined at `input`.
    fn jacobian(
        &self,
        input: ArrayView1<'_, f64>,
        jacobian: ArrayViewMut2<'_, f64>,
    ) -> Result<(), FunctionError>;

    /// Returns the function value at `input` in a new vector.
    ///
    /// # Errors
    ///
    /// Returns a [`FunctionError`] if no value can be produced for `input`.
    fn value(&self, input: ArrayView1<'_, f64>) -> Result<Array1<f64>, FunctionError> {
        let mut output = Array1::zeros(self.output_size());
        self.compute(input, output.view_mut())?;
        Ok(output)
    }

    /// Returns the Jacobian at `input` in a new zero-initialized matrix.
    ///
    /// # Errors
    ///
    /// Returns a [`FunctionError`] if the Jacobian is undefined at `input`.
    fn jacobian_matrix(&self, input: ArrayView1<'_, f64>) -> Result<Array2<f64>, FunctionError> {
        let mut jacobian =
            Array2::zeros((self.output_derivative_size(), self.input_derivative_size()));
        self.jacobian(input, jacobian.view_mut())?;
        Ok(jacobian)
    }
}
