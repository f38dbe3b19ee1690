//! Explicit constraint solver.
//!
//! An explicit constraint is a function that computes some blocks of a state
//! vector (its outputs) directly from other blocks (its inputs). The
//! [`ExplicitSolver`] collects such functions, refuses any two that claim the
//! same output, orders them so producers run before consumers, and then:
//!
//! - [`solve`] writes every output block from the current inputs;
//! - [`jacobian`] composes the functions' Jacobians by the chain rule, so
//!   each output row expresses the sensitivity to the free variables only;
//! - [`is_satisfied`] measures how far a state is from its solved value,
//!   with a manifold-aware difference.
//!
//! Values and derivatives are indexed separately (`nq` and `nv` entries), so
//! blocks holding rotations can have more values than derivatives.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use hitch_core::BlockIndices;
//! use hitch_functions::{Affine, Constant};
//! use hitch_solvers::explicit::ExplicitSolver;
//! use ndarray::array;
//!
//! let mut solver = ExplicitSolver::new(3, 3);
//!
//! // x[1] is locked to 0.5, x[2] copies x[1].
//! let locked = Arc::new(Constant::new("locked", array![0.5]));
//! let copy = Arc::new(Affine::identity("copy", 1));
//! let x1 = BlockIndices::from_segment(1, 1);
//! let x2 = BlockIndices::from_segment(2, 1);
//!
//! assert!(solver.add(locked, BlockIndices::new(), x1.clone(), BlockIndices::new(), x1.clone()));
//! assert!(solver.add(copy, x1.clone(), x2.clone(), x1, x2));
//!
//! let mut q = array![7.0, 1.0, 2.0];
//! solver.solve(q.view_mut()).unwrap();
//! assert_eq!(q, array![7.0, 0.5, 0.5]);
//! ```
//!
//! [`solve`]: ExplicitSolver::solve
//! [`jacobian`]: ExplicitSolver::jacobian
//! [`is_satisfied`]: ExplicitSolver::is_satisfied

mod config;
mod entry;
mod error;
mod graph;


pub use config::{Config, ConfigError};
pub use entry::{Entry, EntryId};
pub use error::{BlockKind, RegistrationError, SolveError};
pub use graph::{Dependency, DependencyGraph};

use std::{fmt, sync::Arc};

use hitch_core::{
    BlockIndices, ConfigurationSpace, DifferentiableFunction, MatrixBlockView, MatrixBlocks,
    SpaceError,
};
use ndarray::{Array1, ArrayBase, ArrayView1, ArrayViewMut1, ArrayViewMut2, Data, Ix2};
use tracing::{debug, warn};

/// A manifold difference `out = a ⊖ b` over whole states.
///
/// `a` and `b` hold `nq` values, `out` holds `nv` derivatives.
pub type DifferenceFn = dyn Fn(ArrayView1<'_, f64>, ArrayView1<'_, f64>, ArrayViewMut1<'_, f64>) -> Result<(), SpaceError>
    + Send
    + Sync;

/// Composes explicit functions over a state of `nq` values and `nv`
/// derivatives.
///
/// Entries are only ever added. The set of output blocks produced so far
/// (`out_args`, `out_ders`) grows with each accepted entry; its complement
/// (`free_args`, `free_ders`) is what the functions ultimately depend on.
pub struct ExplicitSolver {
    nq: usize,
    nv: usize,
    config: Config,
    entries: Vec<Entry>,
    out_args: BlockIndices,
    out_ders: BlockIndices,
    graph: DependencyGraph,
    jacobian_blocks: MatrixBlocks,
    difference: Option<Box<DifferenceFn>>,
}

impl ExplicitSolver {
    /// Creates an empty solver with the default [`Config`].
    #[must_use]
    pub fn new(nq: usize, nv: usize) -> Self {
        Self::with_config(nq, nv, Config::default())
    }

    /// Creates an empty solver.
    #[must_use]
    pub fn with_config(nq: usize, nv: usize, config: Config) -> Self {
        Self {
            nq,
            nv,
            config,
            entries: Vec::new(),
            out_args: BlockIndices::new(),
            out_ders: BlockIndices::new(),
            graph: DependencyGraph::default(),
            jacobian_blocks: MatrixBlocks::new(
                BlockIndices::new(),
                BlockIndices::from_segment(0, nv),
            ),
            difference: None,
        }
    }

    /// Number of values in a state.
    #[must_use]
    pub fn nq(&self) -> usize {
        self.nq
    }

    /// Number of derivatives in a state.
    #[must_use]
    pub fn nv(&self) -> usize {
        self.nv
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Installs the difference used by [`Self::is_satisfied`].
    ///
    /// Without one, states are subtracted, which requires `nq == nv`.
    pub fn set_difference<F>(&mut self, difference: F)
    where
        F: Fn(ArrayView1<'_, f64>, ArrayView1<'_, f64>, ArrayViewMut1<'_, f64>) -> Result<(), SpaceError>
            + Send
            + Sync
            + 'static,
    {
        self.difference = Some(Box::new(difference));
    }

    /// Installs the difference of a configuration space.
    pub fn use_space<S>(&mut self, space: S)
    where
        S: ConfigurationSpace + 'static,
    {
        self.set_difference(move |a, b, out| space.difference(a, b, out));
    }

    /// Registers a function with its input and output blocks.
    ///
    /// Returns `false`, leaving the solver unchanged, if an output block is
    /// already produced by an accepted entry or if the new entry would close
    /// a dependency cycle.
    ///
    /// # Panics
    ///
    /// Panics if the blocks do not match the function's declared sizes or the
    /// solver dimensions. Use [`Self::try_add`] to handle those as errors.
    pub fn add(
        &mut self,
        function: Arc<dyn DifferentiableFunction>,
        in_arg: BlockIndices,
        out_arg: BlockIndices,
        in_der: BlockIndices,
        out_der: BlockIndices,
    ) -> bool {
        match self.try_add(function, in_arg, out_arg, in_der, out_der) {
            Ok(_) => true,
            Err(error) if error.is_recoverable() => false,
            Err(error) => panic!("inconsistent explicit function: {error}"),
        }
    }

    /// Registers a function with its input and output blocks.
    ///
    /// Validation runs in order: declared sizes and bounds, output conflicts,
    /// then dependency cycles. On any error the solver is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Conflict`] if an output overlaps the
    /// outputs of an accepted entry, [`RegistrationError::Cycle`] if the
    /// entry would make the functions depend on each other, and the other
    /// variants if the blocks are inconsistent with the function.
    pub fn try_add(
        &mut self,
        function: Arc<dyn DifferentiableFunction>,
        in_arg: BlockIndices,
        out_arg: BlockIndices,
        in_der: BlockIndices,
        out_der: BlockIndices,
    ) -> Result<EntryId, RegistrationError> {
        let entry = Entry::new(function, in_arg, out_arg, in_der, out_der);
        entry.validate(self.nq, self.nv)?;

        let conflicts = [
            (BlockKind::Argument, entry.out_arg().intersection(&self.out_args)),
            (BlockKind::Derivative, entry.out_der().intersection(&self.out_ders)),
        ];
        for (kind, overlap) in conflicts {
            if !overlap.is_empty() {
                warn!(
                    "rejected `{}`: output {} blocks {:?} are already produced",
                    entry.name(),
                    kind,
                    overlap.segments()
                );
                return Err(RegistrationError::Conflict { kind, overlap });
            }
        }

        if let Err(cycle) = self.graph.insert(&self.entries, &entry) {
            let through = self
                .entries
                .get(cycle.through)
                .map_or(entry.name(), Entry::name)
                .to_owned();
            warn!("rejected `{}`: dependency cycle through `{}`", entry.name(), through);
            return Err(RegistrationError::Cycle {
                function: entry.name().to_owned(),
                through,
            });
        }

        let id = EntryId(self.entries.len());
        self.out_args.union_with(entry.out_arg());
        self.out_ders.union_with(entry.out_der());
        self.jacobian_blocks =
            MatrixBlocks::new(self.out_ders.clone(), self.out_ders.complement(self.nv));
        debug!(
            "accepted `{}` as entry {}, evaluation order {:?}",
            entry.name(),
            id.index(),
            self.graph.order()
        );
        self.entries.push(entry);

        Ok(id)
    }

    /// Registers a function, deriving its derivative blocks from its value
    /// blocks through `space`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::Space`] if a value block cannot be mapped,
    /// and otherwise the errors of [`Self::try_add`].
    pub fn add_in_space<S>(
        &mut self,
        space: &S,
        function: Arc<dyn DifferentiableFunction>,
        in_arg: BlockIndices,
        out_arg: BlockIndices,
    ) -> Result<EntryId, RegistrationError>
    where
        S: ConfigurationSpace + ?Sized,
    {
        let in_der = space.derivative_indices(&in_arg)?;
        let out_der = space.derivative_indices(&out_arg)?;
        self.try_add(function, in_arg, out_arg, in_der, out_der)
    }

    /// Returns true if this exact function handle is registered.
    #[must_use]
    pub fn contains(&self, function: &Arc<dyn DifferentiableFunction>) -> bool {
        self.entries
            .iter()
            .any(|entry| Arc::ptr_eq(entry.function(), function))
    }

    /// Accepted entries, in registration order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Accepted entries, in evaluation order.
    pub fn ordered(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.graph.order().iter().map(|&index| &self.entries[index])
    }

    /// Dependencies between accepted entries.
    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Value blocks produced by the entries.
    #[must_use]
    pub fn out_args(&self) -> &BlockIndices {
        &self.out_args
    }

    /// Derivative blocks produced by the entries.
    #[must_use]
    pub fn out_ders(&self) -> &BlockIndices {
        &self.out_ders
    }

    /// Value blocks not produced by any entry.
    #[must_use]
    pub fn free_args(&self) -> BlockIndices {
        self.out_args.complement(self.nq)
    }

    /// Derivative blocks not produced by any entry.
    #[must_use]
    pub fn free_ders(&self) -> BlockIndices {
        self.out_ders.complement(self.nv)
    }

    /// Free value blocks read by at least one entry.
    #[must_use]
    pub fn in_args(&self) -> BlockIndices {
        self.read_blocks(Entry::in_arg).difference(&self.out_args)
    }

    /// Free derivative blocks read by at least one entry.
    #[must_use]
    pub fn in_ders(&self) -> BlockIndices {
        self.read_blocks(Entry::in_der).difference(&self.out_ders)
    }

    /// Writes every output block of `state` from its inputs.
    ///
    /// Entries run in dependency order, so an entry reading another's
    /// output sees the value computed in this pass.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::StateSize`] if `state` does not hold `nq`
    /// values, or [`SolveError::Function`] if a function fails. Outputs of
    /// the entries evaluated before the failure are already written.
    pub fn solve(&self, mut state: ArrayViewMut1<'_, f64>) -> Result<(), SolveError> {
        self.check_state(state.len())?;
        for entry in self.ordered() {
            entry.evaluate(state.view_mut())?;
        }
        Ok(())
    }

    /// Writes into `matrix` the `nv × nv` Jacobian of the solved state with
    /// respect to the state, evaluated at `state`.
    ///
    /// Free derivatives map to themselves (unit diagonal). The rows of an
    /// output block are `J_f · J[in_der, :]`: a free input passes `J_f`
    /// through, an input produced by another entry chains that entry's rows.
    /// Once all entries are composed, output rows only have non-zero entries
    /// in free columns.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::MatrixSize`] or [`SolveError::StateSize`] on
    /// wrong dimensions, or [`SolveError::Function`] if a Jacobian fails.
    pub fn jacobian(
        &self,
        mut matrix: ArrayViewMut2<'_, f64>,
        state: ArrayView1<'_, f64>,
    ) -> Result<(), SolveError> {
        let (rows, cols) = matrix.dim();
        if rows != self.nv || cols != self.nv {
            return Err(SolveError::MatrixSize {
                expected: self.nv,
                rows,
                cols,
            });
        }
        self.check_state(state.len())?;

        matrix.fill(0.0);
        for i in self.free_ders().indices() {
            matrix[[i, i]] = 1.0;
        }

        for entry in self.ordered() {
            let local = entry.local_jacobian(state)?;
            let inputs = entry.in_der().rview_rows(&matrix);
            entry.out_der().write_rows(&local.dot(&inputs), &mut matrix);
        }
        Ok(())
    }

    /// Restricts a Jacobian computed by [`Self::jacobian`] to the output
    /// derivative rows and free derivative columns.
    #[must_use]
    pub fn view_jacobian<'a, S>(&'a self, matrix: &'a ArrayBase<S, Ix2>) -> MatrixBlockView<'a>
    where
        S: Data<Elem = f64>,
    {
        self.jacobian_blocks.view(matrix)
    }

    /// Checks whether `state` already holds the values the entries produce.
    ///
    /// Solves a copy of `state`, then writes `state ⊖ solved` restricted to
    /// the output derivative blocks into `error`, which must hold
    /// `out_ders().nb_indices()` entries. Returns true if the norm of `error`
    /// is at most the configured threshold.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::StateSize`] or [`SolveError::ErrorSize`] on
    /// wrong dimensions, [`SolveError::NoDifference`] if no difference is set
    /// and `nq != nv`, and propagates function and difference failures.
    pub fn is_satisfied(
        &self,
        state: ArrayView1<'_, f64>,
        mut error: ArrayViewMut1<'_, f64>,
    ) -> Result<bool, SolveError> {
        self.check_state(state.len())?;
        let expected = self.out_ders.nb_indices();
        if error.len() != expected {
            return Err(SolveError::ErrorSize {
                expected,
                actual: error.len(),
            });
        }

        let mut solved = state.to_owned();
        self.solve(solved.view_mut())?;

        let mut diff = Array1::zeros(self.nv);
        match &self.difference {
            Some(difference) => {
                difference(state, solved.view(), diff.view_mut()).map_err(SolveError::Difference)?;
            }
            None if self.nq == self.nv => diff.assign(&(&state - &solved)),
            None => {
                return Err(SolveError::NoDifference {
                    nq: self.nq,
                    nv: self.nv,
                });
            }
        }

        let residual = self.out_ders.rview(&diff);
        error.assign(&residual);
        Ok(residual.dot(&residual).sqrt() <= self.config.error_threshold())
    }

    fn check_state(&self, actual: usize) -> Result<(), SolveError> {
        if actual == self.nq {
            Ok(())
        } else {
            Err(SolveError::StateSize {
                expected: self.nq,
                actual,
            })
        }
    }

    fn read_blocks(&self, blocks: fn(&Entry) -> &BlockIndices) -> BlockIndices {
        let mut read = BlockIndices::new();
        for entry in &self.entries {
            read.union_with(blocks(entry));
        }
        read
    }
}

impl fmt::Debug for ExplicitSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplicitSolver")
            .field("nq", &self.nq)
            .field("nv", &self.nv)
            .field("config", &self.config)
            .field("entries", &self.entries)
            .field("order", &self.graph.order())
            .field("has_difference", &self.difference.is_some())
            .finish_non_exhaustive()
    }
}
