//! Incremental Delaunay tessellation and Delaunay→Voronoi dual
//! construction for unstructured mesh generation.
//!
//! This crate owns the host-facing API: [`config::TessellatorConfig`] to
//! start a run, [`tessellator::Tessellator2D`]/[`tessellator::Tessellator3D`]
//! to stream vertices in and query the resulting triangulation, and
//! [`voronoi`] to convert a consolidated tessellation into its dual. The
//! exact-predicate numerics live one layer down in `vmesh-predicates`
//! (orientation/in-sphere tests) and `vmesh-topology` (vertex/simplex
//! storage); this crate is where those pieces become an algorithm.

pub mod config;
pub mod error;
pub mod hilbert;
pub mod tessellator;
pub mod voronoi;

pub use config::TessellatorConfig;
pub use error::{Result, TessellationError};
pub use tessellator::{Tessellator2D, Tessellator3D};
