use hitch_core::{DifferentiableFunction, FunctionError, LiegroupSpace, SpaceError};
use ndarray::{Array1, ArrayView1, ArrayViewMut1, ArrayViewMut2};

/// A function with no inputs that always returns the same value.
///
/// Registered with an empty input block, it locks its output block to
/// `value`. Its Jacobian has no columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    name: String,
    space: LiegroupSpace,
    value: Array1<f64>,
}

impl Constant {
    /// Creates a constant in `R^n`, with `n = value.len()`.
    pub fn new(name: impl Into<String>, value: Array1<f64>) -> Self {
        Self {
            name: name.into(),
            space: LiegroupSpace::rn(value.len()),
            value,
        }
    }

    /// Creates a constant element of `space`.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::Dimension`] if `value` does not have
    /// `space.nq()` entries.
    pub fn in_space(
        name: impl Into<String>,
        space: LiegroupSpace,
        value: Array1<f64>,
    ) -> Result<Self, SpaceError> {
        if value.len() != space.nq() {
            return Err(SpaceError::Dimension {
                expected: space.nq(),
                actual: value.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            space,
            value,
        })
    }

    /// The locked value.
    #[must_use]
    pub fn locked_value(&self) -> &Array1<f64> {
        &self.value
    }
}

impl DifferentiableFunction for Constant {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> usize {
        0
    }

    fn input_derivative_size(&self) -> usize {
        0
    }

    fn output_space(&self) -> &LiegroupSpace {
        &self.space
    }

    fn compute(
        &self,
        _input: ArrayView1<'_, f64>,
        mut output: ArrayViewMut1<'_, f64>,
    ) -> Result<(), FunctionError> {
        output.assign(&self.value);
        Ok(())
    }

    fn jacobian(
        &self,
        _input: ArrayView1<'_, f64>,
        _jacobian: ArrayViewMut2<'_, f64>,
    ) -> Result<(), FunctionError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::{Array1, array};

    #[test]
    fn returns_its_value_for_any_input() {
        let locked = Constant::new("locked", array![0.25]);
        let value = locked.value(Array1::zeros(0).view()).expect("constant");
        assert_eq!(value, array![0.25]);
        assert_eq!(locked.output_size(), 1);
        assert_eq!(locked.output_derivative_size(), 1);
    }

    #[test]
    fn jacobian_has_no_columns() {
        let locked = Constant::new("locked", array![1.0, 2.0]);
        let jacobian = locked
            .jacobian_matrix(Array1::zeros(0).view())
            .expect("constant");
        assert_eq!(jacobian.dim(), (2, 0));
    }

    #[test]
    fn rotation_constant_has_fewer_derivatives() {
        let identity = Constant::in_space("frame", LiegroupSpace::so3(), array![0., 0., 0., 1.])
            .expect("unit quaternion");
        assert_eq!(identity.output_size(), 4);
        assert_eq!(identity.output_derivative_size(), 3);

        let wrong = Constant::in_space("frame", LiegroupSpace::so3(), array![1.0]);
        assert!(matches!(wrong, Err(SpaceError::Dimension { .. })));
    }
}
