use vmesh_predicates::Mantissa;

use crate::ids::{SimplexId, VertexId};

/// Slack applied to the rescale factor so the boundary-maximum rescaled
/// value never rounds to exactly `2.0`, whose mantissa is `0` at a
/// different exponent — that would break the "mantissa is a linear
/// function of position" property every exact predicate relies on.
pub const RESCALE_SLACK: f64 = 1e-13;

const MANTISSA_MASK: u64 = 0x000F_FFFF_FFFF_FFFF;

/// Three coordinate views plus per-vertex bookkeeping, for vertices of a
/// fixed dimension `DIM` (2 or 3).
///
/// Growth is whatever `Vec::push` already does (amortised doubling), so
/// this store doesn't hand-roll its own capacity management.
pub struct VertexStore<const DIM: usize> {
    original: Vec<[f64; DIM]>,
    rescaled: Vec<[f64; DIM]>,
    mantissa: Vec<[Mantissa; DIM]>,
    simplex_link: Vec<Option<SimplexId>>,
    simplex_slot: Vec<u8>,
    search_radius: Vec<f64>,

    anchor: [f64; DIM],
    inverse_side: f64,

    /// Set once by `consolidate`: first index that is a ghost.
    ghost_offset: Option<u32>,
    /// Set once by `consolidate`: one past the last local vertex.
    vertex_end: Option<u32>,
}

impl<const DIM: usize> VertexStore<DIM> {
    /// `anchor` and `box_side` describe the host-supplied bounding box:
    /// `anchor` is its minimum corner, `box_side` its side length. Every
    /// coordinate added later must rescale into `[1, 2)` under these
    /// parameters or the box was misconfigured — a fatal precondition
    /// violation.
    pub fn new(anchor: [f64; DIM], box_side: f64, initial_capacity: usize) -> Self {
        assert!(box_side > 0.0, "bounding box side must be positive");
        VertexStore {
            original: Vec::with_capacity(initial_capacity),
            rescaled: Vec::with_capacity(initial_capacity),
            mantissa: Vec::with_capacity(initial_capacity),
            simplex_link: Vec::with_capacity(initial_capacity),
            simplex_slot: Vec::with_capacity(initial_capacity),
            search_radius: Vec::with_capacity(initial_capacity),
            anchor,
            inverse_side: (1.0 - RESCALE_SLACK) / box_side,
            ghost_offset: None,
            vertex_end: None,
        }
    }

    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Rescales `pos` into `[1, 2)` under this store's box and extracts
    /// each axis's mantissa, without recording it as a vertex. Used by the
    /// tessellator to evaluate predicates against a candidate point during
    /// point location, before it is known whether the point will actually
    /// be inserted.
    pub fn rescale(&self, pos: [f64; DIM]) -> ([f64; DIM], [Mantissa; DIM]) {
        let mut rescaled = [0.0; DIM];
        let mut mantissa = [0u64; DIM];
        for axis in 0..DIM {
            let r = 1.0 + (pos[axis] - self.anchor[axis]) * self.inverse_side;
            assert!(
                (1.0..2.0).contains(&r),
                "coordinate {} on axis {axis} rescaled to {r}, outside [1, 2) \
                 — the bounding box is misconfigured",
                pos[axis],
            );
            rescaled[axis] = r;
            mantissa[axis] = r.to_bits() & MANTISSA_MASK;
        }
        (rescaled, mantissa)
    }

    /// Appends a vertex and records all three coordinate views. The new
    /// vertex's simplex link starts as "none" and its search radius as
    /// `+inf`, meaning "not yet computed".
    pub fn add_vertex(&mut self, pos: [f64; DIM]) -> VertexId {
        let (rescaled, mantissa) = self.rescale(pos);
        let id = VertexId(self.original.len() as u32);
        self.original.push(pos);
        self.rescaled.push(rescaled);
        self.mantissa.push(mantissa);
        self.simplex_link.push(None);
        self.simplex_slot.push(0);
        self.search_radius.push(f64::INFINITY);
        id
    }

    pub fn position(&self, v: VertexId) -> [f64; DIM] {
        self.original[v.index()]
    }

    pub fn mantissa(&self, v: VertexId) -> [Mantissa; DIM] {
        self.mantissa[v.index()]
    }

    pub fn simplex_link(&self, v: VertexId) -> Option<(SimplexId, u8)> {
        self.simplex_link[v.index()].map(|s| (s, self.simplex_slot[v.index()]))
    }

    pub fn set_simplex_link(&mut self, v: VertexId, simplex: SimplexId, slot: u8) {
        self.simplex_link[v.index()] = Some(simplex);
        self.simplex_slot[v.index()] = slot;
    }

    pub fn search_radius(&self, v: VertexId) -> f64 {
        self.search_radius[v.index()]
    }

    pub fn set_search_radius(&mut self, v: VertexId, radius: f64) {
        self.search_radius[v.index()] = radius;
    }

    /// Freezes the local/ghost boundary at the current vertex count.
    /// One-shot: calling this twice is a host bug.
    pub fn consolidate(&mut self) {
        assert!(self.ghost_offset.is_none(), "consolidate called more than once");
        self.vertex_end = Some(self.original.len() as u32);
        self.ghost_offset = Some(self.original.len() as u32);
    }

    pub fn is_consolidated(&self) -> bool {
        self.ghost_offset.is_some()
    }

    pub fn vertex_end(&self) -> Option<u32> {
        self.vertex_end
    }

    pub fn is_ghost(&self, v: VertexId) -> bool {
        matches!(self.ghost_offset, Some(offset) if v.0 >= offset)
    }

    pub fn is_local(&self, v: VertexId, aux_count: u32) -> bool {
        v.0 >= aux_count && !self.is_ghost(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescale_round_trips_mantissa_linearly() {
        let mut store: VertexStore<2> = VertexStore::new([0.0, 0.0], 10.0, 4);
        let a = store.add_vertex([0.0, 0.0]);
        let b = store.add_vertex([5.0, 0.0]);
        let c = store.add_vertex([10.0 * (1.0 - RESCALE_SLACK), 0.0]);
        let ma = store.mantissa(a)[0];
        let mb = store.mantissa(b)[0];
        let mc = store.mantissa(c)[0];
        assert!(ma < mb);
        assert!(mb < mc);
    }

    #[test]
    #[should_panic(expected = "misconfigured")]
    fn out_of_box_point_is_fatal() {
        let mut store: VertexStore<2> = VertexStore::new([0.0, 0.0], 10.0, 4);
        store.add_vertex([100.0, 0.0]);
    }

    #[test]
    fn consolidate_marks_ghost_boundary() {
        let mut store: VertexStore<2> = VertexStore::new([0.0, 0.0], 10.0, 4);
        let local = store.add_vertex([1.0, 1.0]);
        store.consolidate();
        let ghost = store.add_vertex([2.0, 2.0]);
        assert!(!store.is_ghost(local));
        assert!(store.is_ghost(ghost));
    }
}
