use num_bigint::BigInt;
use num_traits::Signed;

use crate::scratch::{mantissa_diff, Mantissa, ScratchPool};
use crate::sign::Sign;

pub type Point2I = [Mantissa; 2];
pub type Point3I = [Mantissa; 3];

fn det2(a: &BigInt, b: &BigInt, c: &BigInt, d: &BigInt) -> BigInt {
    a * d - b * c
}

fn det3(m: [[BigInt; 3]; 3]) -> BigInt {
    &m[0][0] * det2(&m[1][1], &m[1][2], &m[2][1], &m[2][2])
        - &m[0][1] * det2(&m[1][0], &m[1][2], &m[2][0], &m[2][2])
        + &m[0][2] * det2(&m[1][0], &m[1][1], &m[2][0], &m[2][1])
}

fn sign_of(v: &BigInt) -> Sign {
    if v.is_positive() {
        Sign::Positive
    } else if v.is_negative() {
        Sign::Negative
    } else {
        Sign::Zero
    }
}

/// Sign of the orientation of `c` relative to the directed edge `a -> b`.
///
/// Positive means `(a, b, c)` is a positively (counterclockwise) oriented
/// triangle.
pub fn orient2d(pool: &mut ScratchPool, a: Point2I, b: Point2I, c: Point2I) -> Sign {
    if let Some(sign) = fast::orient2d_fast(a, b, c) {
        return sign;
    }
    log::trace!("orient2d fast path inconclusive, falling back to exact determinant");
    pool.reset();
    let bax = pool.diff(mantissa_diff(b[0], a[0]));
    let bay = pool.diff(mantissa_diff(b[1], a[1]));
    let cax = pool.diff(mantissa_diff(c[0], a[0]));
    let cay = pool.diff(mantissa_diff(c[1], a[1]));
    sign_of(&det2(&bax, &bay, &cax, &cay))
}

/// Sign of the orientation of `d` relative to the oriented triangle `(a,
/// b, c)`.
///
/// Positive means `(a, b, c, d)` is a positively oriented tetrahedron.
pub fn orient3d(pool: &mut ScratchPool, a: Point3I, b: Point3I, c: Point3I, d: Point3I) -> Sign {
    if let Some(sign) = fast::orient3d_fast(a, b, c, d) {
        return sign;
    }
    log::trace!("orient3d fast path inconclusive, falling back to exact determinant");
    pool.reset();
    let row = |p: Point3I| -> [BigInt; 3] {
        [
            pool_diff(pool, p[0], d[0]),
            pool_diff(pool, p[1], d[1]),
            pool_diff(pool, p[2], d[2]),
        ]
    };
    let m = [row(a), row(b), row(c)];
    sign_of(&det3(m))
}

fn pool_diff(pool: &mut ScratchPool, a: Mantissa, b: Mantissa) -> BigInt {
    pool.diff(mantissa_diff(a, b))
}

pub(crate) mod fast {
    use super::{Point2I, Point3I};
    use crate::sign::Sign;

    /// Conservative non-exact double-precision fast path.
    ///
    /// Computes the same determinant in `f64` and compares its magnitude
    /// against a fixed error bound derived from the number of floating
    /// operations involved, rather than Shewchuk-style adaptive-precision
    /// expansion arithmetic (see DESIGN.md for why). Returns `None`
    /// whenever the bound can't certify the sign, in which case the
    /// caller falls through to the exact path. Correctness never depends
    /// on this function returning `Some`.
    const ORIENT2D_BOUND: f64 = 16.0 * f64::EPSILON;
    const ORIENT3D_BOUND: f64 = 64.0 * f64::EPSILON;

    pub fn orient2d_fast(a: Point2I, b: Point2I, c: Point2I) -> Option<Sign> {
        let (ax, ay) = (a[0] as f64, a[1] as f64);
        let (bx, by) = (b[0] as f64, b[1] as f64);
        let (cx, cy) = (c[0] as f64, c[1] as f64);
        let bax = bx - ax;
        let bay = by - ay;
        let cax = cx - ax;
        let cay = cy - ay;
        let det = bax * cay - bay * cax;
        let bound = ORIENT2D_BOUND * (bax.abs() * cay.abs() + bay.abs() * cax.abs()).max(1.0);
        if det.abs() > bound {
            Some(if det > 0.0 { Sign::Positive } else { Sign::Negative })
        } else {
            None
        }
    }

    pub fn orient3d_fast(a: Point3I, b: Point3I, c: Point3I, d: Point3I) -> Option<Sign> {
        let v = |p: Point3I| {
            [
                p[0] as f64 - d[0] as f64,
                p[1] as f64 - d[1] as f64,
                p[2] as f64 - d[2] as f64,
            ]
        };
        let [ax, ay, az] = v(a);
        let [bx, by, bz] = v(b);
        let [cx, cy, cz] = v(c);
        let det = ax * (by * cz - bz * cy) - ay * (bx * cz - bz * cx) + az * (bx * cy - by * cx);
        let magnitude_sum = ax.abs() * (by.abs() * cz.abs() + bz.abs() * cy.abs())
            + ay.abs() * (bx.abs() * cz.abs() + bz.abs() * cx.abs())
            + az.abs() * (bx.abs() * cy.abs() + by.abs() * cx.abs());
        let bound = ORIENT3D_BOUND * magnitude_sum.max(1.0);
        if det.abs() > bound {
            Some(if det > 0.0 { Sign::Positive } else { Sign::Negative })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ccw_triangle_is_positive() {
        let mut pool = ScratchPool::new();
        let a = [10, 10];
        let b = [20, 10];
        let c = [10, 20];
        assert_eq!(orient2d(&mut pool, a, b, c), Sign::Positive);
        assert_eq!(orient2d(&mut pool, a, c, b), Sign::Negative);
    }

    #[test]
    fn colinear_points_are_zero() {
        let mut pool = ScratchPool::new();
        let a = [10, 10];
        let b = [20, 10];
        let c = [30, 10];
        assert_eq!(orient2d(&mut pool, a, b, c), Sign::Zero);
    }

    #[test]
    fn axis_aligned_tetrahedron_orientation() {
        // (a, b, c, d) here is negatively oriented under this crate's
        // row-relative-to-d convention: swapping any two of a/b/c flips it.
        let mut pool = ScratchPool::new();
        let a = [0, 0, 0];
        let b = [10, 0, 0];
        let c = [0, 10, 0];
        let d = [0, 0, 10];
        assert_eq!(orient3d(&mut pool, a, b, c, d), Sign::Negative);
        assert_eq!(orient3d(&mut pool, b, a, c, d), Sign::Positive);
    }

    #[test]
    fn coplanar_points_are_zero() {
        let mut pool = ScratchPool::new();
        let a = [0, 0, 0];
        let b = [10, 0, 0];
        let c = [0, 10, 0];
        let d = [5, 5, 0];
        assert_eq!(orient3d(&mut pool, a, b, c, d), Sign::Zero);
    }
}
