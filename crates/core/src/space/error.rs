use thiserror::Error;

/// Errors raised by configuration space operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpaceError {
    /// A vector does not have the size the space expects.
    #[error("expected a vector of size {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// A value block extends past the end of the space.
    #[error("value block ending at {end} exceeds the space size {size}")]
    OutOfBounds { end: usize, size: usize },

    /// A value block covers part of a component whose values and
    /// derivatives cannot be mapped one to one.
    #[error("value block splits the {component} component starting at index {start}")]
    SplitComponent {
        component: &'static str,
        start: usize,
    },
}
