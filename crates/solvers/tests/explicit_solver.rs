//! A floating base driven by two joints, a coupled joint, and a locked joint.
//!
//! The state is `R^3 × SO(3) × R^6`: 13 values and 12 derivatives.
//!
//! | block            | values  | derivatives |
//! |------------------|---------|-------------|
//! | base translation | 0..3    | 0..3        |
//! | base rotation    | 3..7    | 3..6        |
//! | joints           | 7..13   | 6..12       |

use std::sync::Arc;

use approx::assert_relative_eq;
use hitch_core::{BlockIndices, DifferentiableFunction, FunctionError, LiegroupSpace};
use hitch_functions::{Affine, Constant};
use hitch_solvers::explicit::ExplicitSolver;
use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, ArrayViewMut2, array};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Places the base at `(a, b, 0)`, turned by `a` about the vertical axis.
struct FloatingBase {
    space: LiegroupSpace,
}

impl DifferentiableFunction for FloatingBase {
    fn name(&self) -> &str {
        "floating base"
    }

    fn input_size(&self) -> usize {
        2
    }

    fn input_derivative_size(&self) -> usize {
        2
    }

    fn output_space(&self) -> &LiegroupSpace {
        &self.space
    }

    fn compute(
        &self,
        input: ArrayView1<'_, f64>,
        mut output: ArrayViewMut1<'_, f64>,
    ) -> Result<(), FunctionError> {
        let (a, b) = (input[0], input[1]);
        let half = a / 2.0;
        output.assign(&array![a, b, 0.0, 0.0, 0.0, half.sin(), half.cos()]);
        Ok(())
    }

    fn jacobian(
        &self,
        _input: ArrayView1<'_, f64>,
        mut jacobian: ArrayViewMut2<'_, f64>,
    ) -> Result<(), FunctionError> {
        jacobian[[0, 0]] = 1.0;
        jacobian[[1, 1]] = 1.0;
        jacobian[[5, 0]] = 1.0;
        Ok(())
    }
}

fn space() -> LiegroupSpace {
    LiegroupSpace::r3_so3() * LiegroupSpace::rn(6)
}

fn values(start: usize, len: usize) -> BlockIndices {
    BlockIndices::from_segment(start, len)
}

fn build() -> ExplicitSolver {
    let space = space();
    let mut solver = ExplicitSolver::new(space.nq(), space.nv());
    solver.use_space(space.clone());

    let base = FloatingBase {
        space: LiegroupSpace::r3_so3(),
    };
    solver
        .add_in_space(&space, Arc::new(base), values(7, 2), values(0, 7))
        .expect("base");
    solver
        .add_in_space(&space, Arc::new(Affine::identity("coupling", 1)), values(9, 1), values(10, 1))
        .expect("coupling");
    solver
        .add_in_space(&space, Arc::new(Constant::new("locked", array![0.25])), BlockIndices::new(), values(12, 1))
        .expect("locked");
    solver
}

fn random_state(seed: u64) -> Array1<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    space().random(&mut rng)
}

#[test]
fn derivative_blocks_follow_the_space() {
    let solver = build();

    let mut out_ders = values(0, 6);
    out_ders.add(9, 1);
    out_ders.add(11, 1);
    assert_eq!(solver.out_ders(), &out_ders);

    let mut free = values(6, 3);
    free.add(10, 1);
    assert_eq!(solver.free_ders(), free);
    assert_eq!(solver.free_args().nb_indices(), 4);
}

#[test]
fn solved_random_states_are_satisfied() {
    let solver = build();
    let mut error = Array1::zeros(solver.out_ders().nb_indices());

    for seed in 0..10 {
        let mut q = random_state(seed);
        assert!(!solver.is_satisfied(q.view(), error.view_mut()).expect("check"));

        solver.solve(q.view_mut()).expect("solve");
        assert!(solver.is_satisfied(q.view(), error.view_mut()).expect("check"));
        assert_relative_eq!(q[10], q[9]);
        assert_relative_eq!(q[12], 0.25);
        assert_relative_eq!(q[0], q[7]);
    }
}

#[test]
fn residual_matches_a_perturbation_of_the_outputs() {
    let space = space();
    let solver = build();

    let mut q = random_state(7);
    solver.solve(q.view_mut()).expect("solve");

    let mut v = Array1::zeros(space.nv());
    v[1] = 0.01;
    v[4] = -0.02;
    v[9] = 0.03;
    let perturbed = space.integrate(q.view(), v.view()).expect("integrate");

    let mut error = Array1::zeros(solver.out_ders().nb_indices());
    assert!(!solver.is_satisfied(perturbed.view(), error.view_mut()).expect("check"));
    assert_relative_eq!(error, solver.out_ders().rview(&v), epsilon = 1e-12);
}

#[test]
fn jacobian_matches_finite_differences() {
    let space = space();
    let solver = build();
    let eps = 1e-7;

    let mut q = random_state(3);
    solver.solve(q.view_mut()).expect("solve");

    let mut jacobian = Array2::zeros((space.nv(), space.nv()));
    solver
        .jacobian(jacobian.view_mut(), q.view())
        .expect("jacobian");

    for k in solver.free_ders().indices() {
        let mut step = Array1::zeros(space.nv());
        step[k] = eps;
        let mut moved = space.integrate(q.view(), step.view()).expect("integrate");
        solver.solve(moved.view_mut()).expect("solve");

        let mut column = Array1::zeros(space.nv());
        space
            .difference(moved.view(), q.view(), column.view_mut())
            .expect("difference");
        column /= eps;

        assert_relative_eq!(column, jacobian.column(k).to_owned(), epsilon = 1e-5);
    }
}

#[test]
fn view_keeps_output_rows_and_free_columns() {
    let solver = build();
    let q = random_state(11);

    let mut jacobian = Array2::zeros((12, 12));
    solver
        .jacobian(jacobian.view_mut(), q.view())
        .expect("jacobian");

    let view = solver.view_jacobian(&jacobian);
    assert_eq!((view.nrows(), view.ncols()), (8, 4));

    let expected = array![
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 0.0],
    ];
    assert_relative_eq!(view.eval(), expected);
    assert_relative_eq!(view.norm(), 2.0);
}
