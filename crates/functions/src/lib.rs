//! Reusable differentiable functions for the Hitch solvers.
//!
//! - [`Constant`] — a fixed output with no inputs, used to lock a block
//! - [`Affine`] — `y = A x + b`, with [`Affine::identity`] copying a block

mod affine;
mod constant;

pub use affine::Affine;
pub use constant::Constant;
