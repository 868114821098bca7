//! Floating-point geometry kernel: circumcenters, polygon area/centroid,
//! and tetrahedron signed volume/centroid. Everything here is plain `f64`
//! arithmetic on `nalgebra` vectors — none of it needs to be exact, since
//! it only ever feeds Voronoi face/cell geometry, never a topological
//! decision.

mod circumcenter;
mod polygon;
mod volume;

pub use circumcenter::{circumcenter2, circumcenter3};
pub use polygon::{polygon_area_centroid2, polygon_area_centroid3};
pub use volume::tetra_signed_volume_centroid;

pub use nalgebra::{Vector2, Vector3};
