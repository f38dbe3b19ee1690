//! Solvers for explicit constraints.
//!
//! An explicit constraint computes some entries of a state vector directly
//! from other entries, without iterating. The [`explicit`] module gathers such
//! constraints, orders them by dependency, evaluates them, and composes their
//! Jacobians.

pub mod explicit;
