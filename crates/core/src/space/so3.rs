//! Unit quaternion helpers, stored as `[x, y, z, w]`.

/// Rotations smaller than this use the series expansions below.
const SMALL_ANGLE: f64 = 1e-8;

pub(super) type Quaternion = [f64; 4];

pub(super) const IDENTITY: Quaternion = [0.0, 0.0, 0.0, 1.0];

/// Hamilton product `a * b`.
pub(super) fn multiply(a: Quaternion, b: Quaternion) -> Quaternion {
    let [ax, ay, az, aw] = a;
    let [bx, by, bz, bw] = b;
    [
        aw * bx + ax * bw + ay * bz - az * by,
        aw * by - ax * bz + ay * bw + az * bx,
        aw * bz + ax * by - ay * bx + az * bw,
        aw * bw - ax * bx - ay * by - az * bz,
    ]
}

/// Inverse of a unit quaternion.
pub(super) fn conjugate(q: Quaternion) -> Quaternion {
    let [x, y, z, w] = q;
    [-x, -y, -z, w]
}

pub(super) fn normalize(q: Quaternion) -> Quaternion {
    let norm = q.iter().map(|c| c * c).sum::<f64>().sqrt();
    q.map(|c| c / norm)
}

/// Exponential map from a rotation vector to a unit quaternion.
pub(super) fn exp(v: [f64; 3]) -> Quaternion {
    let theta_sq = v.iter().map(|c| c * c).sum::<f64>();
    let theta = theta_sq.sqrt();
    let half = 0.5 * theta;

    // sin(θ/2) / θ ≈ 1/2 - θ²/48
    let k = if theta < SMALL_ANGLE {
        0.5 - theta_sq / 48.0
    } else {
        half.sin() / theta
    };

    [k * v[0], k * v[1], k * v[2], half.cos()]
}

/// Logarithm map from a unit quaternion to a rotation vector of norm `≤ π`.
pub(super) fn log(q: Quaternion) -> [f64; 3] {
    // q and -q are the same rotation; pick the shortest path.
    let [x, y, z, w] = if q[3] < 0.0 { q.map(|c| -c) } else { q };
    let s = (x * x + y * y + z * z).sqrt();

    let k = if s < SMALL_ANGLE {
        2.0 / w
    } else {
        2.0 * s.atan2(w) / s
    };

    [k * x, k * y, k * z]
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn exp_then_log_recovers_rotation_vector() {
        let v = [0.3, -1.2, 0.7];
        let back = log(exp(v));
        for (a, b) in v.iter().zip(back.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn small_rotations_are_stable() {
        let v = [1e-10, 0.0, -2e-10];
        let back = log(exp(v));
        assert_relative_eq!(back[0], 1e-10, epsilon = 1e-18);
        assert_relative_eq!(back[2], -2e-10, epsilon = 1e-18);
        assert_eq!(log(IDENTITY), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn conjugate_is_inverse() {
        let q = normalize([0.1, 0.2, -0.3, 0.9]);
        let p = multiply(conjugate(q), q);
        assert_relative_eq!(p[3], 1.0, epsilon = 1e-12);
        assert_relative_eq!(p[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn quarter_turn_about_z() {
        let q = exp([0.0, 0.0, std::f64::consts::FRAC_PI_2]);
        let half = std::f64::consts::FRAC_PI_4;
        assert_relative_eq!(q[2], half.sin(), epsilon = 1e-12);
        assert_relative_eq!(q[3], half.cos(), epsilon = 1e-12);
    }
}
