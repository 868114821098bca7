use crate::ids::{SimplexId, VertexId};

/// One simplex: `K` vertices (3 for a triangle, 4 for a tetrahedron), `K`
/// neighbours (one per opposite-face slot), and for each neighbour slot
/// the reciprocal slot that neighbour occupies in us. Storing that
/// reciprocal index alongside the neighbour pointer turns every flip into
/// a handful of constant-time array writes instead of a search for "which
/// of my neighbour's faces points back at me".
#[derive(Clone, Debug)]
pub struct Simplex<const K: usize> {
    pub vertices: [VertexId; K],
    pub neighbors: [SimplexId; K],
    /// `index_in_neighbor[i]` is the slot in `neighbors[i]` at which this
    /// simplex appears.
    pub index_in_neighbor: [u8; K],
    pub active: bool,
}

/// Struct-of-arrays store of simplices with soft delete.
///
/// Deactivated slots are pushed onto a free stack and reused by the next
/// [`SimplexStore::new_simplex`] call rather than compacted out from under
/// every other simplex's neighbour indices.
pub struct SimplexStore<const K: usize> {
    simplices: Vec<Simplex<K>>,
    free: Vec<SimplexId>,
}

impl<const K: usize> SimplexStore<K> {
    pub fn with_capacity(cap: usize) -> Self {
        SimplexStore {
            simplices: Vec::with_capacity(cap),
            free: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.simplices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.simplices.is_empty()
    }

    /// Allocates a new simplex slot, reusing the free stack when
    /// non-empty, and returns its id. Callers are expected to immediately
    /// wire up `neighbors`/`index_in_neighbor` via [`SimplexStore::link`].
    pub fn new_simplex(&mut self, vertices: [VertexId; K], neighbors: [SimplexId; K]) -> SimplexId {
        let simplex = Simplex {
            vertices,
            neighbors,
            index_in_neighbor: [0; K],
            active: true,
        };
        if let Some(id) = self.free.pop() {
            self.simplices[id.index()] = simplex;
            id
        } else {
            let id = SimplexId(self.simplices.len() as u32);
            self.simplices.push(simplex);
            id
        }
    }

    pub fn deactivate(&mut self, id: SimplexId) {
        debug_assert!(self.simplices[id.index()].active, "double deactivation of {id:?}");
        self.simplices[id.index()].active = false;
        self.free.push(id);
        log::debug!("deactivated {id:?}, free stack now has {} slot(s)", self.free.len());
    }

    pub fn get(&self, id: SimplexId) -> &Simplex<K> {
        &self.simplices[id.index()]
    }

    pub fn get_mut(&mut self, id: SimplexId) -> &mut Simplex<K> {
        &mut self.simplices[id.index()]
    }

    pub fn is_active(&self, id: SimplexId) -> bool {
        self.simplices[id.index()].active
    }

    /// Rewrites the directed link `a.neighbors[slot_a] = b` together with
    /// its reciprocal `b.neighbors[slot_b] = a`, keeping the reciprocity
    /// invariant intact. Every topological flip is built from calls to
    /// this one primitive.
    pub fn link(&mut self, a: SimplexId, slot_a: usize, b: SimplexId, slot_b: usize) {
        self.simplices[a.index()].neighbors[slot_a] = b;
        self.simplices[a.index()].index_in_neighbor[slot_a] = slot_b as u8;
        self.simplices[b.index()].neighbors[slot_b] = a;
        self.simplices[b.index()].index_in_neighbor[slot_b] = slot_a as u8;
    }

    /// Iterator over the ids of all active simplices, in storage order.
    pub fn active_ids(&self) -> impl Iterator<Item = SimplexId> + '_ {
        self.simplices
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, _)| SimplexId(i as u32))
    }

    /// Finds which slot of `id` holds `vertex`, if any.
    pub fn slot_of_vertex(&self, id: SimplexId, vertex: VertexId) -> Option<usize> {
        self.get(id).vertices.iter().position(|&v| v == vertex)
    }

    /// Checks that every active simplex's neighbour links are reciprocal:
    /// if `a`'s neighbour slot points at `b`, `b`'s reciprocal slot must
    /// point back at `a`. Intended for a debug-build self-check pass.
    pub fn check_reciprocity(&self) -> Result<(), String> {
        for a in self.active_ids() {
            let simplex = self.get(a);
            for (slot, &b) in simplex.neighbors.iter().enumerate() {
                if !self.is_active(b) {
                    continue;
                }
                let recip_slot = simplex.index_in_neighbor[slot] as usize;
                let back = self.get(b);
                if back.neighbors[recip_slot] != a {
                    return Err(format!(
                        "{a:?} slot {slot} -> {b:?}, but {b:?} slot {recip_slot} -> {:?}",
                        back.neighbors[recip_slot]
                    ));
                }
                if back.index_in_neighbor[recip_slot] as usize != slot {
                    return Err(format!(
                        "{a:?} slot {slot} <-> {b:?} slot {recip_slot} index_in_neighbor mismatch"
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vid(i: u32) -> VertexId {
        VertexId(i)
    }

    #[test]
    fn new_simplex_reuses_freed_slots() {
        let mut store: SimplexStore<3> = SimplexStore::with_capacity(4);
        let s0 = store.new_simplex([vid(0), vid(1), vid(2)], [SimplexId(0); 3]);
        let s1 = store.new_simplex([vid(1), vid(2), vid(3)], [SimplexId(0); 3]);
        assert_eq!(store.len(), 2);
        store.deactivate(s0);
        let s2 = store.new_simplex([vid(4), vid(5), vid(6)], [SimplexId(0); 3]);
        assert_eq!(s2, s0, "freed slot should be reused");
        assert_eq!(store.len(), 2);
        assert!(store.is_active(s1));
    }

    #[test]
    fn link_maintains_reciprocity() {
        let mut store: SimplexStore<3> = SimplexStore::with_capacity(4);
        let a = store.new_simplex([vid(0), vid(1), vid(2)], [SimplexId(0); 3]);
        let b = store.new_simplex([vid(1), vid(2), vid(3)], [SimplexId(0); 3]);
        store.link(a, 0, b, 1);
        assert!(store.check_reciprocity().is_ok());
        assert_eq!(store.get(a).neighbors[0], b);
        assert_eq!(store.get(b).neighbors[1], a);
        assert_eq!(store.get(a).index_in_neighbor[0], 1);
        assert_eq!(store.get(b).index_in_neighbor[1], 0);
    }
}
