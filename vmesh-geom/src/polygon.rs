use nalgebra::{Vector2, Vector3};

/// Area and centroid of a simple polygon given as an ordered ring of 2D
/// points, computed by decomposing it into a fan of triangles from the
/// first vertex.
pub fn polygon_area_centroid2(points: &[Vector2<f64>]) -> (f64, Vector2<f64>) {
    if points.len() < 3 {
        return (0.0, points.first().copied().unwrap_or_else(Vector2::zeros));
    }
    let p0 = points[0];
    let mut area_sum = 0.0;
    let mut centroid_sum = Vector2::zeros();
    for i in 1..points.len() - 1 {
        let p1 = points[i];
        let p2 = points[i + 1];
        let twice_area = (p1 - p0).perp(&(p2 - p0));
        area_sum += twice_area;
        centroid_sum += twice_area * (p0 + p1 + p2);
    }
    if area_sum.abs() < f64::EPSILON {
        return (0.0, p0);
    }
    (area_sum / 2.0, centroid_sum / (3.0 * area_sum))
}

/// Area and centroid of a planar polygon embedded in 3D, given as an
/// ordered ring of vertices and the polygon's (unnormalized) normal
/// direction, used to decide each triangle fan's orientation consistently.
pub fn polygon_area_centroid3(
    points: &[Vector3<f64>],
    normal_hint: Vector3<f64>,
) -> (f64, Vector3<f64>) {
    if points.len() < 3 {
        return (0.0, points.first().copied().unwrap_or_else(Vector3::zeros));
    }
    let p0 = points[0];
    let mut area_sum = 0.0;
    let mut centroid_sum = Vector3::zeros();
    for i in 1..points.len() - 1 {
        let p1 = points[i];
        let p2 = points[i + 1];
        let cross = (p1 - p0).cross(&(p2 - p0));
        let signed_twice_area = cross.dot(&normal_hint.normalize());
        area_sum += signed_twice_area;
        centroid_sum += signed_twice_area * (p0 + p1 + p2);
    }
    if area_sum.abs() < f64::EPSILON {
        return (0.0, p0);
    }
    (area_sum.abs() / 2.0, centroid_sum / (3.0 * area_sum))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_square_area_and_centroid() {
        let points = [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 1.0),
        ];
        let (area, centroid) = polygon_area_centroid2(&points);
        assert!((area - 1.0).abs() < 1e-12);
        assert!((centroid - Vector2::new(0.5, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn planar_square_in_3d() {
        let points = [
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, 0.0, 1.0),
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(0.0, 1.0, 1.0),
        ];
        let (area, centroid) = polygon_area_centroid3(&points, Vector3::new(0.0, 0.0, 1.0));
        assert!((area - 1.0).abs() < 1e-12);
        assert!((centroid - Vector3::new(0.5, 0.5, 1.0)).norm() < 1e-12);
    }
}
