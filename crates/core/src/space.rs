//! Configuration spaces whose values and derivatives may differ in size.
//!
//! A [`LiegroupSpace`] is a Cartesian product of vector spaces `R^n` and
//! rotation groups `SO(3)`. Rotations are stored as unit quaternions
//! `[x, y, z, w]` (4 values) and differentiated along rotation vectors
//! (3 derivatives), so a free-floating base `R^3 × SO(3)` has 7 values and
//! 6 derivatives.
//!
//! # Example
//!
//! ```
//! use hitch_core::{BlockIndices, LiegroupSpace};
//!
//! // Free-floating base followed by five revolute joints.
//! let space = LiegroupSpace::r3_so3() * LiegroupSpace::rn(5);
//! assert_eq!((space.nq(), space.nv()), (12, 11));
//!
//! // The joint at configuration rank 8 has velocity rank 7.
//! let ders = space
//!     .derivative_indices(&BlockIndices::from_segment(8, 1))
//!     .unwrap();
//! assert_eq!(ders, BlockIndices::from_segment(7, 1));
//! ```

mod error;
mod so3;

pub use error::SpaceError;

use std::{f64::consts::TAU, fmt, ops::Mul};

use ndarray::{Array1, ArrayView1, ArrayViewMut1, s};
use rand::Rng;

use crate::block::BlockIndices;

/// The configuration space seen by a solver.
///
/// Provides sizes, a neutral element, the manifold difference, and the
/// mapping from value-space blocks to derivative-space blocks.
pub trait ConfigurationSpace: Send + Sync {
    /// Number of values.
    fn nq(&self) -> usize;

    /// Number of derivatives.
    fn nv(&self) -> usize;

    /// The neutral configuration.
    fn neutral(&self) -> Array1<f64>;

    /// Writes `a ⊖ b` into `out`: the tangent vector `v` with `b ⊕ v = a`.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::Dimension`] if a vector has the wrong size.
    fn difference(
        &self,
        a: ArrayView1<'_, f64>,
        b: ArrayView1<'_, f64>,
        out: ArrayViewMut1<'_, f64>,
    ) -> Result<(), SpaceError>;

    /// Maps value-space blocks to the matching derivative-space blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if a block leaves the space or splits a component.
    fn derivative_indices(&self, values: &BlockIndices) -> Result<BlockIndices, SpaceError>;
}

/// A single factor of a [`LiegroupSpace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiegroupType {
    /// The vector space `R^n`.
    Vector(usize),
    /// Rotations in 3D, stored as unit quaternions.
    SpecialOrthogonal3,
}

impl LiegroupType {
    /// Number of values.
    #[must_use]
    pub fn nq(self) -> usize {
        match self {
            Self::Vector(n) => n,
            Self::SpecialOrthogonal3 => 4,
        }
    }

    /// Number of derivatives.
    #[must_use]
    pub fn nv(self) -> usize {
        match self {
            Self::Vector(n) => n,
            Self::SpecialOrthogonal3 => 3,
        }
    }
}

impl fmt::Display for LiegroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector(n) => write!(f, "R^{n}"),
            Self::SpecialOrthogonal3 => write!(f, "SO(3)"),
        }
    }
}

/// A Cartesian product of [`LiegroupType`] factors.
///
/// Consecutive vector spaces are merged, so `R^2 × R^3` equals `R^5`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LiegroupSpace {
    components: Vec<LiegroupType>,
}

impl LiegroupSpace {
    /// Builds a product space from its factors.
    pub fn from_components<I: IntoIterator<Item = LiegroupType>>(components: I) -> Self {
        let mut space = Self::default();
        for component in components {
            space.push(component);
        }
        space
    }

    /// The vector space `R^n`.
    #[must_use]
    pub fn rn(n: usize) -> Self {
        Self::from_components([LiegroupType::Vector(n)])
    }

    /// The rotation group `SO(3)`.
    #[must_use]
    pub fn so3() -> Self {
        Self::from_components([LiegroupType::SpecialOrthogonal3])
    }

    /// `R^3 × SO(3)`, the space of a free-floating rigid body.
    #[must_use]
    pub fn r3_so3() -> Self {
        Self::from_components([LiegroupType::Vector(3), LiegroupType::SpecialOrthogonal3])
    }

    #[must_use]
    pub fn components(&self) -> &[LiegroupType] {
        &self.components
    }

    /// Number of values.
    #[must_use]
    pub fn nq(&self) -> usize {
        self.components.iter().map(|c| c.nq()).sum()
    }

    /// Number of derivatives.
    #[must_use]
    pub fn nv(&self) -> usize {
        self.components.iter().map(|c| c.nv()).sum()
    }

    /// Returns true if the space has no rotation factor.
    #[must_use]
    pub fn is_vector_space(&self) -> bool {
        self.components
            .iter()
            .all(|c| matches!(c, LiegroupType::Vector(_)))
    }

    /// The neutral element: zero vectors and identity rotations.
    #[must_use]
    pub fn neutral(&self) -> Array1<f64> {
        let mut q = Array1::zeros(self.nq());
        for (iq, _, component) in self.placed() {
            if component == LiegroupType::SpecialOrthogonal3 {
                q.slice_mut(s![iq..iq + 4])
                    .assign(&ArrayView1::from(&so3::IDENTITY));
            }
        }
        q
    }

    /// A random element: vector entries uniform in `[-1, 1]`, rotations
    /// uniformly distributed.
    pub fn random<R: Rng>(&self, rng: &mut R) -> Array1<f64> {
        let mut q = Array1::zeros(self.nq());
        for (iq, _, component) in self.placed() {
            match component {
                LiegroupType::Vector(n) => {
                    for value in q.slice_mut(s![iq..iq + n]).iter_mut() {
                        *value = rng.gen_range(-1.0..=1.0);
                    }
                }
                LiegroupType::SpecialOrthogonal3 => {
                    let u1: f64 = rng.gen_range(0.0..1.0);
                    let u2: f64 = rng.gen_range(0.0..1.0);
                    let u3: f64 = rng.gen_range(0.0..1.0);
                    let (a, b) = ((1.0 - u1).sqrt(), u1.sqrt());
                    let quat = [
                        a * (TAU * u2).sin(),
                        a * (TAU * u2).cos(),
                        b * (TAU * u3).sin(),
                        b * (TAU * u3).cos(),
                    ];
                    q.slice_mut(s![iq..iq + 4])
                        .assign(&ArrayView1::from(&quat));
                }
            }
        }
        q
    }

    /// Writes `a ⊖ b` into `out`.
    ///
    /// Vector factors subtract; rotation factors use `log(b⁻¹ a)`.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::Dimension`] if a vector has the wrong size.
    pub fn difference(
        &self,
        a: ArrayView1<'_, f64>,
        b: ArrayView1<'_, f64>,
        mut out: ArrayViewMut1<'_, f64>,
    ) -> Result<(), SpaceError> {
        self.check_values(a.len())?;
        self.check_values(b.len())?;
        self.check_derivatives(out.len())?;

        for (iq, iv, component) in self.placed() {
            match component {
                LiegroupType::Vector(n) => {
                    let diff = &a.slice(s![iq..iq + n]) - &b.slice(s![iq..iq + n]);
                    out.slice_mut(s![iv..iv + n]).assign(&diff);
                }
                LiegroupType::SpecialOrthogonal3 => {
                    let qa = quaternion_at(&a, iq);
                    let qb = quaternion_at(&b, iq);
                    let v = so3::log(so3::multiply(so3::conjugate(qb), qa));
                    out.slice_mut(s![iv..iv + 3])
                        .assign(&ArrayView1::from(&v));
                }
            }
        }
        Ok(())
    }

    /// Returns `q ⊕ v`.
    ///
    /// Vector factors add; rotation factors use `q · exp(v)`.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::Dimension`] if a vector has the wrong size.
    pub fn integrate(
        &self,
        q: ArrayView1<'_, f64>,
        v: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, SpaceError> {
        self.check_values(q.len())?;
        self.check_derivatives(v.len())?;

        let mut result = q.to_owned();
        for (iq, iv, component) in self.placed() {
            match component {
                LiegroupType::Vector(n) => {
                    let mut block = result.slice_mut(s![iq..iq + n]);
                    block += &v.slice(s![iv..iv + n]);
                }
                LiegroupType::SpecialOrthogonal3 => {
                    let step = so3::exp([v[iv], v[iv + 1], v[iv + 2]]);
                    let quat = so3::normalize(so3::multiply(quaternion_at(&q, iq), step));
                    result
                        .slice_mut(s![iq..iq + 4])
                        .assign(&ArrayView1::from(&quat));
                }
            }
        }
        Ok(result)
    }

    /// Maps value-space blocks to the matching derivative-space blocks.
    ///
    /// Vector entries map one to one; a rotation maps as a whole, so a block
    /// must either cover all four quaternion entries or none of them.
    ///
    /// # Errors
    ///
    /// Returns [`SpaceError::OutOfBounds`] if a block ends past [`Self::nq`],
    /// or [`SpaceError::SplitComponent`] if a block covers part of a rotation.
    pub fn derivative_indices(&self, values: &BlockIndices) -> Result<BlockIndices, SpaceError> {
        let nq = self.nq();
        if values.end() > nq {
            return Err(SpaceError::OutOfBounds {
                end: values.end(),
                size: nq,
            });
        }

        let mut ders = BlockIndices::new();
        for seg in values.segments() {
            for (iq, iv, component) in self.placed() {
                let (begin, end) = (seg.start().max(iq), seg.end().min(iq + component.nq()));
                if begin >= end {
                    continue;
                }
                match component {
                    LiegroupType::Vector(_) => ders.add(iv + (begin - iq), end - begin),
                    LiegroupType::SpecialOrthogonal3 => {
                        if begin != iq || end != iq + 4 {
                            return Err(SpaceError::SplitComponent {
                                component: "SO(3)",
                                start: iq,
                            });
                        }
                        ders.add(iv, 3);
                    }
                }
            }
        }
        Ok(ders)
    }

    fn push(&mut self, component: LiegroupType) {
        match (self.components.last_mut(), component) {
            (_, LiegroupType::Vector(0)) => {}
            (Some(LiegroupType::Vector(n)), LiegroupType::Vector(m)) => *n += m,
            _ => self.components.push(component),
        }
    }

    /// Components with their value and derivative offsets.
    fn placed(&self) -> impl Iterator<Item = (usize, usize, LiegroupType)> + '_ {
        self.components.iter().scan((0, 0), |(iq, iv), &component| {
            let at = (*iq, *iv, component);
            *iq += component.nq();
            *iv += component.nv();
            Some(at)
        })
    }

    fn check_values(&self, actual: usize) -> Result<(), SpaceError> {
        let expected = self.nq();
        if actual == expected {
            Ok(())
        } else {
            Err(SpaceError::Dimension { expected, actual })
        }
    }

    fn check_derivatives(&self, actual: usize) -> Result<(), SpaceError> {
        let expected = self.nv();
        if actual == expected {
            Ok(())
        } else {
            Err(SpaceError::Dimension { expected, actual })
        }
    }
}

fn quaternion_at(values: &ArrayView1<'_, f64>, at: usize) -> so3::Quaternion {
    [values[at], values[at + 1], values[at + 2], values[at + 3]]
}

impl Mul for LiegroupSpace {
    type Output = LiegroupSpace;

    fn mul(mut self, rhs: LiegroupSpace) -> LiegroupSpace {
        for component in rhs.components {
            self.push(component);
        }
        self
    }
}

impl fmt::Display for LiegroupSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "R^0");
        }
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, "*")?;
            }
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

impl ConfigurationSpace for LiegroupSpace {
    fn nq(&self) -> usize {
        Self::nq(self)
    }

    fn nv(&self) -> usize {
        Self::nv(self)
    }

    fn neutral(&self) -> Array1<f64> {
        Self::neutral(self)
    }

    fn difference(
        &self,
        a: ArrayView1<'_, f64>,
        b: ArrayView1<'_, f64>,
        out: ArrayViewMut1<'_, f64>,
    ) -> Result<(), SpaceError> {
        Self::difference(self, a, b, out)
    }

    fn derivative_indices(&self, values: &BlockIndices) -> Result<BlockIndices, SpaceError> {
        Self::derivative_indices(self, values)
    }
}
