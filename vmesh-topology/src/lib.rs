//! Struct-of-arrays storage for an incremental tessellation: the simplex
//! (topology) store and the vertex store, with no knowledge of the
//! insertion/flip logic that drives them. This generalizes `qhull-rs`'s
//! struct-of-arrays `Delaunay`/`ConvexHull` types (boxed slices of
//! vertices/simplices/neighbors behind small index handles) into a
//! growable form: `qhull-rs` builds its arrays once from a finished qhull
//! run, while this store builds them up one insertion at a time.

pub mod ids;
pub mod simplex_store;
pub mod vertex_store;

pub use ids::{SimplexId, VertexId};
pub use simplex_store::{Simplex, SimplexStore};
pub use vertex_store::VertexStore;
