//! Core traits and types for the Hitch solvers.
//!
//! This crate defines the shared abstractions that explicit solvers and
//! function plugins build on:
//!
//! - [`BlockIndices`] — a merged set of `(start, len)` intervals over a flat
//!   vector, with gather/scatter views over vectors and matrices
//! - [`MatrixBlocks`] — a pair of row and column [`BlockIndices`] addressing
//!   a sub-block of a matrix
//! - [`DifferentiableFunction`] — a vector function with a Jacobian, plugged
//!   into solvers as a trait object
//! - [`LiegroupSpace`] and [`ConfigurationSpace`] — configuration spaces whose
//!   values and derivatives can differ in size

mod block;
mod function;

pub mod space;

pub use block::{BlockIndices, MatrixBlockView, MatrixBlocks, Segment};
pub use function::{DifferentiableFunction, FunctionError};
pub use space::{ConfigurationSpace, LiegroupSpace, LiegroupType, SpaceError};
