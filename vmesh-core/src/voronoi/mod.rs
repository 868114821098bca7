//! Delaunay→Voronoi dual conversion: per local generator, walk the
//! incident simplices to fan a cell polygon/polyhedron out of
//! circumcenters, accumulate its volume and centroid, and emit one face
//! record per Delaunay edge.
//!
//! Faces are binned by a 1-bit `sid`: `0` for an interior (local–local)
//! face, `1` for a boundary (local–ghost) face, matching the host's
//! flux-exchange bucket convention.

pub mod three_d;
pub mod two_d;

use vmesh_topology::VertexId;

/// One Voronoi face: the dual of a single Delaunay edge.
#[derive(Clone, Debug)]
pub struct FaceRecord<V> {
    /// `0` for an interior local–local face, `1` for a local–ghost
    /// boundary face.
    pub sid: u8,
    pub left: VertexId,
    pub right: VertexId,
    pub area: f64,
    pub midpoint: V,
    /// Ordered ring of circumcenters bounding this face, for hosts that
    /// want the full polygon rather than just area/midpoint.
    pub polygon: Vec<V>,
}

/// One Voronoi cell: the dual of a local generator.
#[derive(Clone, Debug)]
pub struct CellRecord<V> {
    pub generator: VertexId,
    pub volume: f64,
    pub centroid: V,
    /// Indices into the owning [`VoronoiView`]'s `faces`.
    pub faces: Vec<usize>,
}

/// The materialised dual of one tessellation.
#[derive(Clone, Debug)]
pub struct VoronoiView<V> {
    pub cells: Vec<CellRecord<V>>,
    pub faces: Vec<FaceRecord<V>>,
}

impl<V> VoronoiView<V> {
    /// Sum of all cell volumes, exposed as a self-check: the host
    /// compares this against the known convex-hull measure of the local
    /// generators.
    pub fn total_volume(&self) -> f64 {
        self.cells.iter().map(|c| c.volume).sum()
    }
}
