use nalgebra::{Matrix3, Vector2, Vector3};

/// Circumcenter of a triangle `(a, b, c)` in the plane.
///
/// Returns `None` when the three points are (numerically) colinear and no
/// finite circumcenter exists. Computed in plain `f64`: circumcenters are
/// used only to build Voronoi face geometry, which is explicitly
/// non-exact.
pub fn circumcenter2(a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>) -> Option<Vector2<f64>> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < f64::EPSILON {
        return None;
    }
    let a2 = a.x * a.x + a.y * a.y;
    let b2 = b.x * b.x + b.y * b.y;
    let c2 = c.x * c.x + c.y * c.y;
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    Some(Vector2::new(ux, uy))
}

/// Circumcenter of a tetrahedron `(a, b, c, d)`.
///
/// Built the same way `qhull-rs`'s barycentric transform is built: set up
/// the linear system as a 3x3 matrix and solve it with an LU
/// decomposition rather than a hand-unrolled Cramer's-rule formula.
/// Returns `None` for a (numerically) degenerate, flat tetrahedron.
pub fn circumcenter3(
    a: Vector3<f64>,
    b: Vector3<f64>,
    c: Vector3<f64>,
    d: Vector3<f64>,
) -> Option<Vector3<f64>> {
    let row = |p: Vector3<f64>| 2.0 * (p - a);
    let rhs = |p: Vector3<f64>| p.dot(&p) - a.dot(&a);

    let m = Matrix3::from_rows(&[row(b).transpose(), row(c).transpose(), row(d).transpose()]);
    let rhs_vec = Vector3::new(rhs(b), rhs(c), rhs(d));

    let decomp = m.lu();
    decomp.solve(&rhs_vec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_right_triangle_circumcenter_is_hypotenuse_midpoint() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(2.0, 0.0);
        let c = Vector2::new(0.0, 2.0);
        let center = circumcenter2(a, b, c).unwrap();
        assert!((center - Vector2::new(1.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn colinear_triangle_has_no_circumcenter() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(1.0, 0.0);
        let c = Vector2::new(2.0, 0.0);
        assert!(circumcenter2(a, b, c).is_none());
    }

    #[test]
    fn regular_corner_tetrahedron_circumcenter() {
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(2.0, 0.0, 0.0);
        let c = Vector3::new(0.0, 2.0, 0.0);
        let d = Vector3::new(0.0, 0.0, 2.0);
        let center = circumcenter3(a, b, c, d).unwrap();
        assert!((center - Vector3::new(1.0, 1.0, 1.0)).norm() < 1e-9);
    }
}
