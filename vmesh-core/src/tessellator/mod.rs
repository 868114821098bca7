//! Incremental Delaunay tessellators, one module per dimension. Both
//! share the point-location/flip-cascade machinery in [`common`] but keep
//! their own `Simplex<3>`/`Simplex<4>` storage and flip zoo, since the
//! 2D and 3D flip sets are genuinely different operations rather than a
//! single generic one.

pub mod common;
pub mod three_d;
pub mod two_d;

pub use common::{Location, TieBreak};
pub use three_d::Tessellator3D;
pub use two_d::Tessellator2D;
