use std::fmt;

use hitch_core::{BlockIndices, FunctionError, SpaceError};
use thiserror::Error;

/// Which space a block index set lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Value space, of size `nq`.
    Argument,
    /// Derivative space, of size `nv`.
    Derivative,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument => write!(f, "argument"),
            Self::Derivative => write!(f, "derivative"),
        }
    }
}

/// Reasons an entry is refused by [`ExplicitSolver::try_add`].
///
/// [`Conflict`] and [`Cycle`] are expected outcomes of combining constraints;
/// the remaining variants indicate that the caller declared blocks that do
/// not match the function.
///
/// [`ExplicitSolver::try_add`]: super::ExplicitSolver::try_add
/// [`Conflict`]: RegistrationError::Conflict
/// [`Cycle`]: RegistrationError::Cycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("output {kind} blocks are already produced by another entry: {overlap:?}")]
    Conflict {
        kind: BlockKind,
        overlap: BlockIndices,
    },

    #[error("`{function}` would close a dependency cycle through `{through}`")]
    Cycle { function: String, through: String },

    #[error("`{function}` declares {declared} {what} but the blocks cover {blocks}")]
    SizeMismatch {
        function: String,
        what: &'static str,
        declared: usize,
        blocks: usize,
    },

    #[error("{kind} blocks of `{function}` end at {end}, past the size {size}")]
    OutOfBounds {
        function: String,
        kind: BlockKind,
        end: usize,
        size: usize,
    },

    #[error("`{function}` has no output {kind} block")]
    EmptyOutput { function: String, kind: BlockKind },

    #[error("cannot map value blocks to derivative blocks")]
    Space(#[from] SpaceError),
}

impl RegistrationError {
    /// Returns true for outcomes a caller is expected to handle, as opposed
    /// to inconsistent declarations.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Cycle { .. })
    }
}

/// Errors that can occur while evaluating the registered functions.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("function `{name}` failed")]
    Function {
        name: String,
        #[source]
        source: FunctionError,
    },

    #[error("expected a state of size {expected}, got {actual}")]
    StateSize { expected: usize, actual: usize },

    #[error("expected a {expected}x{expected} matrix, got {rows}x{cols}")]
    MatrixSize {
        expected: usize,
        rows: usize,
        cols: usize,
    },

    #[error("expected an error vector of size {expected}, got {actual}")]
    ErrorSize { expected: usize, actual: usize },

    #[error("no difference operator is set and values ({nq}) and derivatives ({nv}) differ in size")]
    NoDifference { nq: usize, nv: usize },

    #[error("difference operator failed")]
    Difference(#[source] SpaceError),
}
