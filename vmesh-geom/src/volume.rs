use nalgebra::Vector3;

/// Signed volume and centroid of a tetrahedron `(a, b, c, d)`.
///
/// Used by the 3D Voronoi builder to accumulate a cell's volume and
/// centroid as a sum of tetrahedra fanned out from the generator. The
/// sign follows the same right-hand convention as
/// `vmesh-predicates::orient3d`, so callers can add contributions directly
/// without first taking an absolute value.
pub fn tetra_signed_volume_centroid(
    a: Vector3<f64>,
    b: Vector3<f64>,
    c: Vector3<f64>,
    d: Vector3<f64>,
) -> (f64, Vector3<f64>) {
    let volume = (b - a).dot(&(c - a).cross(&(d - a))) / 6.0;
    let centroid = (a + b + c + d) / 4.0;
    (volume, centroid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_corner_tetrahedron_volume() {
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(1.0, 0.0, 0.0);
        let c = Vector3::new(0.0, 1.0, 0.0);
        let d = Vector3::new(0.0, 0.0, 1.0);
        let (volume, centroid) = tetra_signed_volume_centroid(a, b, c, d);
        assert!((volume - 1.0 / 6.0).abs() < 1e-12);
        assert!((centroid - Vector3::new(0.25, 0.25, 0.25)).norm() < 1e-12);
    }
}
