use std::{fmt, sync::Arc};

use hitch_core::{BlockIndices, DifferentiableFunction, FunctionError};
use ndarray::{Array2, ArrayView1, ArrayViewMut1};
use tracing::warn;

use super::{BlockKind, RegistrationError, SolveError};

/// Index of an accepted entry, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(super) usize);

impl EntryId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A function bound to the state blocks it reads and writes.
///
/// `in_arg`/`out_arg` index the value vector, `in_der`/`out_der` the
/// derivative vector.
#[derive(Clone)]
pub struct Entry {
    function: Arc<dyn DifferentiableFunction>,
    in_arg: BlockIndices,
    out_arg: BlockIndices,
    in_der: BlockIndices,
    out_der: BlockIndices,
}

impl Entry {
    pub(super) fn new(
        function: Arc<dyn DifferentiableFunction>,
        in_arg: BlockIndices,
        out_arg: BlockIndices,
        in_der: BlockIndices,
        out_der: BlockIndices,
    ) -> Self {
        Self {
            function,
            in_arg,
            out_arg,
            in_der,
            out_der,
        }
    }

    #[must_use]
    pub fn function(&self) -> &Arc<dyn DifferentiableFunction> {
        &self.function
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.function.name()
    }

    #[must_use]
    pub fn in_arg(&self) -> &BlockIndices {
        &self.in_arg
    }

    #[must_use]
    pub fn out_arg(&self) -> &BlockIndices {
        &self.out_arg
    }

    #[must_use]
    pub fn in_der(&self) -> &BlockIndices {
        &self.in_der
    }

    #[must_use]
    pub fn out_der(&self) -> &BlockIndices {
        &self.out_der
    }

    /// Checks the declared blocks against the function sizes and the state
    /// dimensions.
    pub(super) fn validate(&self, nq: usize, nv: usize) -> Result<(), RegistrationError> {
        let f = &self.function;
        let sizes = [
            ("input values", f.input_size(), &self.in_arg),
            ("output values", f.output_size(), &self.out_arg),
            ("input derivatives", f.input_derivative_size(), &self.in_der),
            ("output derivatives", f.output_derivative_size(), &self.out_der),
        ];
        for (what, declared, blocks) in sizes {
            if declared != blocks.nb_indices() {
                return Err(RegistrationError::SizeMismatch {
                    function: f.name().to_owned(),
                    what,
                    declared,
                    blocks: blocks.nb_indices(),
                });
            }
        }

        let bounds = [
            (BlockKind::Argument, nq, &self.in_arg),
            (BlockKind::Argument, nq, &self.out_arg),
            (BlockKind::Derivative, nv, &self.in_der),
            (BlockKind::Derivative, nv, &self.out_der),
        ];
        for (kind, size, blocks) in bounds {
            if blocks.end() > size {
                return Err(RegistrationError::OutOfBounds {
                    function: f.name().to_owned(),
                    kind,
                    end: blocks.end(),
                    size,
                });
            }
        }

        for (kind, blocks) in [
            (BlockKind::Argument, &self.out_arg),
            (BlockKind::Derivative, &self.out_der),
        ] {
            if blocks.is_empty() {
                return Err(RegistrationError::EmptyOutput {
                    function: f.name().to_owned(),
                    kind,
                });
            }
        }

        Ok(())
    }

    /// Computes the function from the state's input blocks and writes the
    /// result into its output blocks.
    pub(super) fn evaluate(&self, mut state: ArrayViewMut1<'_, f64>) -> Result<(), SolveError> {
        let input = self.in_arg.rview(&state);
        let value = self
            .function
            .value(input.view())
            .map_err(|source| self.failure(source))?;
        self.out_arg.write_to(&value, &mut state);
        Ok(())
    }

    /// The function's Jacobian (`out_der × in_der`) at the state's inputs.
    pub(super) fn local_jacobian(
        &self,
        state: ArrayView1<'_, f64>,
    ) -> Result<Array2<f64>, SolveError> {
        let input = self.in_arg.rview(&state);
        self.function
            .jacobian_matrix(input.view())
            .map_err(|source| self.failure(source))
    }

    fn failure(&self, source: FunctionError) -> SolveError {
        warn!("function `{}` failed: {}", self.name(), source);
        SolveError::Function {
            name: self.name().to_owned(),
            source,
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("function", &self.function.name())
            .field("in_arg", &self.in_arg)
            .field("out_arg", &self.out_arg)
            .field("in_der", &self.in_der)
            .field("out_der", &self.out_der)
            .finish()
    }
}
