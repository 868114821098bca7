//! Exact sign-of-determinant predicates on integer mantissa coordinates.
//!
//! Two primitives, each in 2D and 3D: [`orient2d`]/[`orient3d`] and
//! [`incircle`]/[`insphere`]. Inputs are unsigned 52-bit mantissas (the
//! canonical integer coordinate produced by the vertex store's rescale
//! step); every predicate reduces its determinant to a sum of products of
//! integer differences computed with arbitrary-precision arithmetic, then
//! returns only the sign. A non-exact `f64` fast path is tried first and
//! falls through to the exact path whenever it can't certify the sign;
//! correctness never depends on the fast path firing.

mod insphere;
mod orient;
mod scratch;
mod sign;

pub use insphere::{incircle, insphere};
pub use orient::{orient2d, orient3d, Point2I, Point3I};
pub use scratch::{Mantissa, ScratchPool};
pub use sign::Sign;
