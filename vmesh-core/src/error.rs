use std::fmt;

/// Diagnostics for the precondition violations this crate treats as fatal:
/// three or four zero orientations (coincident/colinear/coplanar input), or
/// a walk that falls off the bounding simplex. These are host bugs
/// (duplicate points, a box too small to contain them) rather than
/// recoverable runtime conditions, so callers get a `Result` but the
/// expected response is "fix the input", not "retry". A coordinate that
/// doesn't rescale into `[1, 2)` is caught one layer down, in
/// `vmesh-topology`'s vertex store, and is fatal the same way but via
/// `panic!` rather than this type: that store has no dependency on
/// `vmesh-core` to construct one of these.
#[derive(Debug)]
pub enum TessellationError {
    /// Two or more zero orientations at the same point location: the new
    /// point coincides with, or is colinear/coplanar with, existing input.
    DegenerateInput { description: String },
    /// A point-location walk stepped into a dummy simplex, meaning the
    /// point lies outside the bounding simplex's hull entirely.
    WalkedOffBoundingSimplex,
    /// `build_voronoi` or a self-check found a broken invariant.
    InvariantViolation { description: String },
}

impl fmt::Display for TessellationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TessellationError::DegenerateInput { description } => {
                write!(f, "degenerate input: {description}")
            }
            TessellationError::WalkedOffBoundingSimplex => {
                write!(f, "point location walked off the bounding simplex")
            }
            TessellationError::InvariantViolation { description } => {
                write!(f, "invariant violation: {description}")
            }
        }
    }
}

impl std::error::Error for TessellationError {}

pub type Result<T> = std::result::Result<T, TessellationError>;
