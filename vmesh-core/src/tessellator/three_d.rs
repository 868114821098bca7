//! Incremental 3D Delaunay tessellator: tetrahedra as `Simplex<4>`, point
//! location by face-orientation walk, insertion by 1→4 / 2→6 / N→2N
//! split, and Delaunay repair by the 2-3, 3-2 and (best-effort) 4-4 flips.

use log::debug;
use vmesh_predicates::{insphere, orient3d, ScratchPool, Sign};
use vmesh_topology::{SimplexId, SimplexStore, VertexId, VertexStore};

use crate::config::TessellatorConfig;
use crate::error::{Result, TessellationError};
use crate::tessellator::common::{Location, TieBreak};

const AUX_COUNT: u32 = 4;
const RESCALE_DOMAIN_MARGIN: f64 = 16.0;

pub struct Tessellator3D {
    vertices: VertexStore<3>,
    simplices: SimplexStore<4>,
    pool: ScratchPool,
    tie_break: TieBreak,
    to_check: Vec<(SimplexId, u8)>,
    last_simplex: SimplexId,
    last_walk_steps: usize,
    config: TessellatorConfig,
}

fn is_dummy(vertices: &[VertexId; 4]) -> bool {
    vertices.iter().any(|v| v.is_invalid())
}

fn slot_of(vertices: &[VertexId; 4], target: VertexId) -> usize {
    vertices.iter().position(|&v| v == target).expect("vertex not found in simplex")
}

impl Tessellator3D {
    /// Builds the bounding tetrahedron (6x the host box) plus its ring of
    /// four dummy simplices (one per face), and returns a tessellator
    /// ready to accept local vertices.
    pub fn init(config: TessellatorConfig) -> Self {
        assert_eq!(config.anchor.len(), 3, "3D tessellator needs a 3-element anchor");
        let host_anchor = [config.anchor[0], config.anchor[1], config.anchor[2]];
        let c = [
            host_anchor[0] + config.box_side / 2.0,
            host_anchor[1] + config.box_side / 2.0,
            host_anchor[2] + config.box_side / 2.0,
        ];
        let domain_side = RESCALE_DOMAIN_MARGIN * config.box_side;
        let domain_anchor = [c[0] - domain_side / 2.0, c[1] - domain_side / 2.0, c[2] - domain_side / 2.0];
        let mut vertices = VertexStore::<3>::new(domain_anchor, domain_side, config.capacity_hint);
        let mut simplices = SimplexStore::<4>::with_capacity(config.capacity_hint * 6 + 16);

        // A regular-ish tetrahedron, scaled to dwarf the host box (the
        // same "6x" auxiliary-simplex sizing as the 2D bounding triangle,
        // generalised to 3D).
        let half = 3.0 * config.box_side;
        let p0 = vertices.add_vertex([c[0] - half, c[1] - half, c[2] - half]);
        let p1 = vertices.add_vertex([c[0] + half, c[1] + half, c[2] - half]);
        let p2 = vertices.add_vertex([c[0] + half, c[1] - half, c[2] + half]);
        let p3 = vertices.add_vertex([c[0] - half, c[1] + half, c[2] + half]);

        // `locate`'s per-face inside test assumes (p0, p1, p2, p3) is
        // positively oriented; swap two corners if this particular corner
        // layout isn't, rather than silently building an inverted mesh.
        let mut orient_pool = ScratchPool::new();
        let m0 = vertices.mantissa(p0);
        let m1 = vertices.mantissa(p1);
        let m2 = vertices.mantissa(p2);
        let m3 = vertices.mantissa(p3);
        let root_sign = orient3d(&mut orient_pool, m0, m1, m2, m3);
        debug_assert_ne!(root_sign, Sign::Zero, "bounding tetrahedron corners must not be coplanar");
        let (p0, p1, p2, p3) = if root_sign == Sign::Negative {
            log::warn!("bounding tetrahedron corners were negatively oriented; swapping p1 and p2");
            (p0, p2, p1, p3)
        } else {
            (p0, p1, p2, p3)
        };

        let root = simplices.new_simplex([p0, p1, p2, p3], [SimplexId(0); 4]);

        // One dummy tetrahedron per face of the root, each carrying an
        // invalid tip and a reciprocal link back to root.
        // Face i of root excludes vertex i; the dummy's invalid tip sits
        // at slot 3 (arbitrary, fixed) with the face's three vertices,
        // reversed, filling slots 0..3.
        let face = |excl: usize| -> [VertexId; 3] {
            let v = [p0, p1, p2, p3];
            let mut out = [VertexId::INVALID; 3];
            let mut k = 0;
            for i in (0..4).rev() {
                if i != excl {
                    out[k] = v[i];
                    k += 1;
                }
            }
            out
        };
        let mk_dummy = |simplices: &mut SimplexStore<4>, excl: usize| -> SimplexId {
            let f = face(excl);
            simplices.new_simplex([f[0], f[1], f[2], VertexId::INVALID], [SimplexId(0); 4])
        };
        let d0 = mk_dummy(&mut simplices, 0);
        let d1 = mk_dummy(&mut simplices, 1);
        let d2 = mk_dummy(&mut simplices, 2);
        let d3 = mk_dummy(&mut simplices, 3);
        let dummies = [d0, d1, d2, d3];

        for i in 0..4 {
            simplices.link(root, i, dummies[i], 3);
        }
        // Ring the dummies around the invalid tip: dummy i's two non-root
        // edges meet dummy (i+1) and dummy (i-1) modulo 4, found directly
        // by vertex-position search rather than hard-coded offsets (the
        // reversed-face vertex order above makes those offsets fiddly).
        for i in 0..4 {
            for j in 0..4 {
                if i == j {
                    continue;
                }
                let vi = simplices.get(dummies[i]).vertices;
                let vj = simplices.get(dummies[j]).vertices;
                let shared: Vec<VertexId> = vi
                    .iter()
                    .filter(|v| !v.is_invalid() && vj.contains(v))
                    .copied()
                    .collect();
                if shared.len() == 2 {
                    let slot_i = (0..3).find(|&k| !shared.contains(&vi[k])).unwrap_or(2);
                    let slot_j = (0..3).find(|&k| !shared.contains(&vj[k])).unwrap_or(2);
                    if simplices.get(dummies[i]).neighbors[slot_i] == SimplexId(0)
                        && simplices.get(dummies[j]).neighbors[slot_j] == SimplexId(0)
                        && slot_i != 3
                    {
                        simplices.link(dummies[i], slot_i, dummies[j], slot_j);
                    }
                }
            }
        }

        vertices.set_simplex_link(p0, root, 0);
        vertices.set_simplex_link(p1, root, 1);
        vertices.set_simplex_link(p2, root, 2);
        vertices.set_simplex_link(p3, root, 3);

        let seed = config.seed;
        Tessellator3D {
            vertices,
            simplices,
            pool: ScratchPool::new(),
            tie_break: TieBreak::new(seed),
            to_check: Vec::new(),
            last_simplex: root,
            last_walk_steps: 0,
            config,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn simplex_store(&self) -> &SimplexStore<4> {
        &self.simplices
    }

    pub fn vertex_store(&self) -> &VertexStore<3> {
        &self.vertices
    }

    pub fn config(&self) -> &TessellatorConfig {
        &self.config
    }

    pub fn aux_count(&self) -> u32 {
        AUX_COUNT
    }

    /// Number of face crossings the most recent point-location walk took.
    /// See [`Tessellator2D::last_walk_steps`] for why this is exposed.
    pub fn last_walk_steps(&self) -> usize {
        self.last_walk_steps
    }

    pub fn consolidate(&mut self) {
        self.vertices.consolidate();
    }

    pub fn add_local_vertex(&mut self, pos: [f64; 3]) -> Result<VertexId> {
        assert!(
            !self.vertices.is_consolidated(),
            "cannot add local vertices after consolidate()"
        );
        self.insert(pos)
    }

    pub fn add_ghost_vertex(&mut self, pos: [f64; 3]) -> Result<VertexId> {
        assert!(
            self.vertices.is_consolidated(),
            "ghost vertices require consolidate() first"
        );
        self.insert(pos)
    }

    fn insert(&mut self, pos: [f64; 3]) -> Result<VertexId> {
        let (_, candidate_mantissa) = self.vertices.rescale(pos);
        let location = self.locate(candidate_mantissa)?;
        let w = self.vertices.add_vertex(pos);
        match location {
            Location::Inside(t) => self.split_1_4(t, w),
            Location::OnFace(t, slot) => self.split_2_6(t, slot, w),
            Location::OnRidge(ring) => self.split_ridge(ring, w),
        }
        self.flip_cascade();
        Ok(w)
    }

    fn locate(&mut self, pos: [vmesh_predicates::Mantissa; 3]) -> Result<Location<SimplexId>> {
        let mut cur = self.last_simplex;
        let mut steps = 0usize;
        let max_steps = self.simplices.len() * 2 + 64;
        loop {
            steps += 1;
            if steps > max_steps {
                return Err(TessellationError::WalkedOffBoundingSimplex);
            }
            let s = self.simplices.get(cur);
            if is_dummy(&s.vertices) {
                return Err(TessellationError::WalkedOffBoundingSimplex);
            }
            let vs = s.vertices;
            let m = [
                self.vertices.mantissa(vs[0]),
                self.vertices.mantissa(vs[1]),
                self.vertices.mantissa(vs[2]),
                self.vertices.mantissa(vs[3]),
            ];
            // Face i excludes vertex i; orient3d(the other three in
            // cyclic order, pos) mirrors the 2D pattern.
            let face_verts = |i: usize| -> [vmesh_predicates::Mantissa; 3] {
                let idx = [(i + 1) % 4, (i + 2) % 4, (i + 3) % 4];
                [m[idx[0]], m[idx[1]], m[idx[2]]]
            };
            let mut signs = [Sign::Zero; 4];
            for i in 0..4 {
                let f = face_verts(i);
                // Faces opposite even/odd slots alternate handedness in a
                // positively oriented tetrahedron; flip the test triangle
                // for odd slots so "positive" consistently means "pos is
                // on the inner side" for every face.
                signs[i] = if i % 2 == 0 {
                    orient3d(&mut self.pool, f[0], f[1], f[2], pos)
                } else {
                    orient3d(&mut self.pool, f[1], f[0], f[2], pos)
                };
            }
            let zero_count = signs.iter().filter(|s| **s == Sign::Zero).count();
            if zero_count >= 3 {
                return Err(TessellationError::DegenerateInput {
                    description: "new point coincides with, or is colinear with, existing input".into(),
                });
            }
            let negatives: Vec<usize> = (0..4).filter(|&i| signs[i] == Sign::Negative).collect();
            if negatives.is_empty() {
                self.last_simplex = cur;
                self.last_walk_steps = steps;
                if zero_count == 2 {
                    let ring = self.ridge_ring(cur, &signs);
                    return Ok(Location::OnRidge(ring));
                }
                if zero_count == 1 {
                    let slot = signs.iter().position(|&s| s == Sign::Zero).unwrap();
                    return Ok(Location::OnFace(cur, slot));
                }
                return Ok(Location::Inside(cur));
            }
            let chosen = if negatives.len() == 1 {
                negatives[0]
            } else {
                negatives[self.tie_break.choose(negatives.len())]
            };
            cur = self.simplices.get(cur).neighbors[chosen];
        }
    }

    /// Collects the ring of tetrahedra sharing the edge implied by the two
    /// zero slots in `signs`, by rotating via neighbour links until the
    /// walk returns to `start`.
    fn ridge_ring(&self, start: SimplexId, signs: &[Sign; 4]) -> Vec<(SimplexId, usize)> {
        let zero_slots: Vec<usize> = (0..4).filter(|&i| signs[i] == Sign::Zero).collect();
        let (e0_slot, e1_slot) = (zero_slots[0], zero_slots[1]);
        let e0 = self.simplices.get(start).vertices[e0_slot];
        let e1 = self.simplices.get(start).vertices[e1_slot];
        self.rotate_around_edge(start, e0, e1)
    }

    /// Walks tetrahedra around the edge `(e0, e1)`, starting from `start`,
    /// returning `(id, slot_of_e0)` pairs in rotation order. Used both for
    /// ridge-insertion and by the Voronoi dual builder.
    ///
    /// Consecutive ring tets share exactly one of their two non-edge
    /// ("apex") vertices; advancing means crossing the face opposite the
    /// apex already shared with the previous tet, never a fixed slot
    /// index, the same way `Tessellator2D::incident_simplices` re-derives
    /// its pivot vertex's slot after every hop instead of hardcoding one.
    pub fn rotate_around_edge(&self, start: SimplexId, e0: VertexId, e1: VertexId) -> Vec<(SimplexId, usize)> {
        let mut out = Vec::new();
        let mut cur = start;
        let start_verts = self.simplices.get(start).vertices;
        let slot_e0_start = slot_of(&start_verts, e0);
        let slot_e1_start = slot_of(&start_verts, e1);
        let apex_slots_start: Vec<usize> = (0..4)
            .filter(|&i| i != slot_e0_start && i != slot_e1_start)
            .collect();
        // Which apex we call "already entered" only fixes which of the two
        // rotation directions we walk in; either choice visits the full ring.
        let mut entered_apex = start_verts[apex_slots_start[0]];
        loop {
            let verts = self.simplices.get(cur).vertices;
            let slot_e0 = slot_of(&verts, e0);
            out.push((cur, slot_e0));
            let slot_e1 = slot_of(&verts, e1);
            let apex_slots: Vec<usize> = (0..4).filter(|&i| i != slot_e0 && i != slot_e1).collect();
            let slot_entered = apex_slots
                .iter()
                .copied()
                .find(|&i| verts[i] == entered_apex)
                .expect("rotation around edge lost track of the shared apex");
            let other_apex = apex_slots
                .into_iter()
                .map(|i| verts[i])
                .find(|&v| v != entered_apex)
                .expect("tet has two distinct apex vertices");
            let next = self.simplices.get(cur).neighbors[slot_entered];
            if is_dummy(&self.simplices.get(next).vertices) || next == start {
                break;
            }
            entered_apex = other_apex;
            cur = next;
            if out.iter().any(|(id, _)| *id == cur) {
                break;
            }
        }
        out
    }

    /// Strictly-inside insertion: tet `t` splits into 4, one per original
    /// vertex replaced by `w` at the same slot.
    fn split_1_4(&mut self, t: SimplexId, w: VertexId) {
        let old = self.simplices.get(t).clone();
        let v = old.vertices;
        let n = old.neighbors;
        let rec = old.index_in_neighbor;

        let mut ids = [t; 4];
        for i in 1..4 {
            ids[i] = self.simplices.new_simplex([VertexId::INVALID; 4], [SimplexId(0); 4]);
        }
        for i in 0..4 {
            let mut verts = v;
            verts[i] = w;
            self.simplices.get_mut(ids[i]).vertices = verts;
        }
        for i in 0..4 {
            self.simplices.link(ids[i], i, n[i], rec[i] as usize);
        }
        for i in 0..4 {
            for j in (i + 1)..4 {
                self.simplices.link(ids[i], j, ids[j], i);
            }
        }
        for i in 0..4 {
            self.vertices.set_simplex_link(v[i], ids[(i + 1) % 4], i);
        }
        self.vertices.set_simplex_link(w, ids[0], 0);
        for i in 0..4 {
            self.to_check.push((ids[i], i));
        }
        self.last_simplex = ids[0];
    }

    /// On-face insertion: `w` lies exactly on the face opposite slot
    /// `slot` of `t`, shared with neighbour `u`. Replaces the pair with 6
    /// tets, 3 fanned from each side's apex.
    fn split_2_6(&mut self, t: SimplexId, slot: usize, w: VertexId) {
        let told = self.simplices.get(t).clone();
        let apex_t = told.vertices[slot];
        let a = told.vertices[(slot + 1) % 4];
        let b = told.vertices[(slot + 2) % 4];
        let c = told.vertices[(slot + 3) % 4];
        // External neighbours of t opposite a, b, c (unaffected by the
        // face split).
        let ext = |vert: VertexId| -> (SimplexId, u8) {
            let s = slot_of(&told.vertices, vert);
            (told.neighbors[s], told.index_in_neighbor[s])
        };
        let (n_a, n_a_r) = ext(a);
        let (n_b, n_b_r) = ext(b);
        let (n_c, n_c_r) = ext(c);

        let u = told.neighbors[slot];
        let uold = self.simplices.get(u).clone();
        let u_recip = told.index_in_neighbor[slot] as usize;
        let apex_u = uold.vertices[u_recip];
        let uext = |vert: VertexId| -> (SimplexId, u8) {
            let s = slot_of(&uold.vertices, vert);
            (uold.neighbors[s], uold.index_in_neighbor[s])
        };
        let (m_a, m_a_r) = uext(a);
        let (m_b, m_b_r) = uext(b);
        let (m_c, m_c_r) = uext(c);

        // T-side fan: one tet per edge of (a, b, c), each paired with
        // apex_t; slot layout [edge_v0, edge_v1, w, apex] so slot2 (opp
        // w) is external, slot3 (opp apex) is internal with the matching
        // U-side tet, and slot0/slot1 ring internally among T-siblings.
        let t_ab = t;
        let t_bc = self.simplices.new_simplex([VertexId::INVALID; 4], [SimplexId(0); 4]);
        let t_ca = self.simplices.new_simplex([VertexId::INVALID; 4], [SimplexId(0); 4]);
        self.simplices.get_mut(t_ab).vertices = [a, b, w, apex_t];
        self.simplices.get_mut(t_bc).vertices = [b, c, w, apex_t];
        self.simplices.get_mut(t_ca).vertices = [c, a, w, apex_t];

        let u_ab = u;
        let u_bc = self.simplices.new_simplex([VertexId::INVALID; 4], [SimplexId(0); 4]);
        let u_ca = self.simplices.new_simplex([VertexId::INVALID; 4], [SimplexId(0); 4]);
        self.simplices.get_mut(u_ab).vertices = [b, a, w, apex_u];
        self.simplices.get_mut(u_bc).vertices = [c, b, w, apex_u];
        self.simplices.get_mut(u_ca).vertices = [a, c, w, apex_u];

        self.simplices.link(t_ab, 2, n_c, n_c_r as usize);
        self.simplices.link(t_bc, 2, n_a, n_a_r as usize);
        self.simplices.link(t_ca, 2, n_b, n_b_r as usize);
        self.simplices.link(u_ab, 2, m_c, m_c_r as usize);
        self.simplices.link(u_bc, 2, m_a, m_a_r as usize);
        self.simplices.link(u_ca, 2, m_b, m_b_r as usize);

        self.simplices.link(t_ab, 0, t_bc, 1);
        self.simplices.link(t_bc, 0, t_ca, 1);
        self.simplices.link(t_ca, 0, t_ab, 1);
        self.simplices.link(u_ab, 0, u_bc, 1);
        self.simplices.link(u_bc, 0, u_ca, 1);
        self.simplices.link(u_ca, 0, u_ab, 1);

        self.simplices.link(t_ab, 3, u_ab, 3);
        self.simplices.link(t_bc, 3, u_bc, 3);
        self.simplices.link(t_ca, 3, u_ca, 3);

        self.vertices.set_simplex_link(a, t_ab, 0);
        self.vertices.set_simplex_link(b, t_ab, 1);
        self.vertices.set_simplex_link(c, t_bc, 1);
        self.vertices.set_simplex_link(w, t_ab, 2);
        self.vertices.set_simplex_link(apex_t, t_ab, 3);
        self.vertices.set_simplex_link(apex_u, u_ab, 3);

        for id in [t_ab, t_bc, t_ca, u_ab, u_bc, u_ca] {
            self.to_check.push((id, 2));
        }
        self.last_simplex = t_ab;
    }

    /// On-edge insertion: `w` lies exactly on the shared ridge of the
    /// tets in `ring`, collected by [`Tessellator3D::rotate_around_edge`].
    /// Splits each tet `{e0, e1, x_i, x_{i+1}}` into `{e0, w, x_i, x_{i+1}}`
    /// and `{w, e1, x_i, x_{i+1}}`, doubling the ring.
    fn split_ridge(&mut self, ring: Vec<(SimplexId, usize)>, w: VertexId) {
        let n = ring.len();
        let mut e0 = VertexId::INVALID;
        let mut e1 = VertexId::INVALID;
        let mut outer_ext = Vec::with_capacity(n);
        for &(id, slot_e0) in &ring {
            let s = self.simplices.get(id).clone();
            e0 = s.vertices[slot_e0];
            outer_ext.push(s);
        }
        // e1: the unique vertex shared by every tet in the ring besides
        // e0 that is not one of the per-tet apex vertices.
        if n > 0 {
            let first = &outer_ext[0];
            let slot_e0_first = ring[0].1;
            let candidates: Vec<VertexId> = first
                .vertices
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != slot_e0_first)
                .map(|(_, v)| *v)
                .collect();
            for cand in candidates {
                if outer_ext.iter().all(|s| s.vertices.contains(&cand)) {
                    e1 = cand;
                    break;
                }
            }
        }
        debug_assert!(!e1.is_invalid(), "ridge ring must share a second common vertex");

        // For each ring tet, the two non-edge vertices are the "apex
        // pair" (x_i, x_{i+1}) shared with its ring neighbours.
        let mut lo_ids = Vec::with_capacity(n);
        let mut hi_ids = Vec::with_capacity(n);
        let mut apex_pairs = Vec::with_capacity(n);
        for s in &outer_ext {
            let slot_e0 = slot_of(&s.vertices, e0);
            let slot_e1 = slot_of(&s.vertices, e1);
            let apex_slots: Vec<usize> = (0..4).filter(|&i| i != slot_e0 && i != slot_e1).collect();
            let (x0, x1) = (s.vertices[apex_slots[0]], s.vertices[apex_slots[1]]);
            apex_pairs.push((x0, x1));
        }
        for i in 0..n {
            lo_ids.push(ring[i].0); // {e0, w, x_i, x_{i+1}} reuses the id
            hi_ids.push(self.simplices.new_simplex([VertexId::INVALID; 4], [SimplexId(0); 4]));
        }
        for i in 0..n {
            let (x0, x1) = apex_pairs[i];
            // slot layout [e, w-or-e1, x0, x1]: lo has e0 & w, hi has w & e1.
            self.simplices.get_mut(lo_ids[i]).vertices = [e0, w, x0, x1];
            self.simplices.get_mut(hi_ids[i]).vertices = [w, e1, x0, x1];
        }
        // Internal ring linking: lo_i shares face (w, x_i, x_{i+1}) with
        // hi_i (slot opposite e0 in lo_i / opposite e1 in hi_i), and
        // shares face (e0, w, x_{i+1}) with lo_{i+1} (spoke faces).
        for i in 0..n {
            let j = (i + 1) % n;
            // lo_i = [e0, w, x_i, x_{i+1}]; opposite x_{i+1} (slot3) is
            // face (e0, w, x_i), internal with lo_{i-1}'s opposite x_i.
            self.simplices.link(lo_ids[i], 3, lo_ids[j], 2);
            self.simplices.link(hi_ids[i], 3, hi_ids[j], 2);
            // lo_i opposite e0 (slot0) is face (w, x_i, x_{i+1}), shared
            // with hi_i opposite e1 (slot1, same face).
            self.simplices.link(lo_ids[i], 0, hi_ids[i], 1);
        }
        // External spokes: lo_i's faces opposite w (slot1) and hi_i's
        // opposite w (slot0) sit where the ring's original tet i had its
        // faces opposite x_{i+1} and x_i respectively, EXCEPT those are
        // exactly the ring's own internal ring-to-ring links (already
        // handled via the rotation itself), not host-supplied externals:
        // a ridge interior to the mesh has no external faces at all other
        // than through its endpoints, which are unaffected by this split.
        for i in 0..n {
            let s = &outer_ext[i];
            let slot_e0 = slot_of(&s.vertices, e0);
            let slot_e1 = slot_of(&s.vertices, e1);
            self.simplices.link(
                lo_ids[i],
                1,
                s.neighbors[slot_e1],
                s.index_in_neighbor[slot_e1],
            );
            self.simplices.link(
                hi_ids[i],
                0,
                s.neighbors[slot_e0],
                s.index_in_neighbor[slot_e0],
            );
        }

        self.vertices.set_simplex_link(e0, lo_ids[0], 0);
        self.vertices.set_simplex_link(e1, hi_ids[0], 1);
        self.vertices.set_simplex_link(w, lo_ids[0], 1);
        for i in 0..n {
            let (x0, _x1) = apex_pairs[i];
            self.vertices.set_simplex_link(x0, lo_ids[i], 2);
        }
        for i in 0..n {
            self.to_check.push((lo_ids[i], 1));
            self.to_check.push((hi_ids[i], 0));
        }
        self.last_simplex = lo_ids[0];
    }

    fn flip_cascade(&mut self) {
        while let Some((t, slot)) = self.to_check.pop() {
            if !self.simplices.is_active(t) {
                continue;
            }
            let s = self.simplices.get(t).clone();
            let new_v = s.vertices[slot];
            if new_v == VertexId::INVALID {
                continue;
            }
            let neighbor = s.neighbors[slot];
            let nb = self.simplices.get(neighbor).clone();
            if is_dummy(&nb.vertices) {
                continue;
            }
            let recip = s.index_in_neighbor[slot] as usize;
            let apex = nb.vertices[recip];
            let others: Vec<VertexId> = (0..4).filter(|&i| i != slot).map(|i| s.vertices[i]).collect();
            let ma = self.vertices.mantissa(others[0]);
            let mb = self.vertices.mantissa(others[1]);
            let mc = self.vertices.mantissa(others[2]);
            let mv = self.vertices.mantissa(new_v);
            let m_apex = self.vertices.mantissa(apex);
            let _ = mv;
            let sign = insphere(&mut self.pool, ma, mb, mc, mv, m_apex);
            if sign == Sign::Negative {
                debug!("3D flip candidate between {t:?} and {neighbor:?}");
                self.attempt_flip(t, slot, neighbor, recip);
            }
        }
    }

    /// Dispatches on the sign pattern of the three "flip diamond" orient
    /// tests: one per edge of the shared face, testing whether `(apex_t,
    /// apex_u)` passes cleanly on the positive side of that edge. All
    /// three agreeing means the bipyramid is convex (2→3). One test
    /// landing on zero points at a 4→4 flip across that edge; one test
    /// disagreeing with the other two points at a 3→2 flip across that
    /// edge. Both the 4→4 and 3→2 cases require a specific number of
    /// tetrahedra already present around the implicated edge; when that
    /// configuration isn't there yet, the flip is deferred rather than
    /// forced.
    fn attempt_flip(&mut self, t: SimplexId, t_slot: usize, u: SimplexId, u_slot: usize) {
        let tv = self.simplices.get(t).vertices;
        let uv = self.simplices.get(u).vertices;
        let shared: Vec<VertexId> = tv.iter().filter(|v| uv.contains(v)).copied().collect();
        debug_assert_eq!(shared.len(), 3, "t and u must share exactly one triangular face");
        let apex_t = tv[t_slot];
        let apex_u = uv[u_slot];
        let (a, b, c) = (shared[0], shared[1], shared[2]);
        let edges = [(a, b), (b, c), (c, a)];

        let m_apex_t = self.vertices.mantissa(apex_t);
        let m_apex_u = self.vertices.mantissa(apex_u);
        let signs: Vec<Sign> = edges
            .iter()
            .map(|&(p, q)| {
                let mp = self.vertices.mantissa(p);
                let mq = self.vertices.mantissa(q);
                orient3d(&mut self.pool, mp, mq, m_apex_t, m_apex_u)
            })
            .collect();

        if let Some(zi) = signs.iter().position(|s| s.is_zero()) {
            let (p, q) = edges[zi];
            let ring = self.rotate_around_edge(t, p, q);
            if ring.len() == 4 {
                debug!("3D flip44 around edge ({p:?}, {q:?})");
                self.flip_4_4(ring, p, q);
            } else {
                debug!("deferred 3D flip44 around edge ({p:?}, {q:?}): ring len {}", ring.len());
                self.to_check.push((t, t_slot));
            }
            return;
        }

        let pos = signs.iter().filter(|s| s.is_positive()).count();
        if pos == 3 || pos == 0 {
            debug!("3D flip23 between {t:?} and {u:?}");
            self.flip_2_3(t, u, apex_t, apex_u, &shared);
            return;
        }

        let majority = if pos > 1 { Sign::Positive } else { Sign::Negative };
        let di = signs.iter().position(|s| *s != majority).expect("one sign must disagree");
        let (p, q) = edges[di];
        let ring = self.rotate_around_edge(t, p, q);
        if ring.len() == 3 {
            debug!("3D flip32 around edge ({p:?}, {q:?})");
            self.flip_3_2(ring, p, q);
        } else {
            debug!("deferred 3D flip32 around edge ({p:?}, {q:?}): ring len {}", ring.len());
            self.to_check.push((t, t_slot));
        }
    }

    /// Standard 3D bipyramid flip: `t = {a, b, c, apex_t}` and
    /// `u = {a, b, c, apex_u}` (sharing face `a, b, c`) become three tets
    /// each containing the new edge `(apex_t, apex_u)` and one edge of
    /// the old shared face.
    fn flip_2_3(&mut self, t: SimplexId, u: SimplexId, apex_t: VertexId, apex_u: VertexId, shared: &[VertexId]) {
        let (a, b, c) = (shared[0], shared[1], shared[2]);
        let told = self.simplices.get(t).clone();
        let uold = self.simplices.get(u).clone();
        let ext = |s: &vmesh_topology::Simplex<4>, vert: VertexId| -> (SimplexId, u8) {
            let slot = slot_of(&s.vertices, vert);
            (s.neighbors[slot], s.index_in_neighbor[slot])
        };
        // t's face opposite each of a/b/c borders the tet's own outer
        // shell; u's does likewise. In the new tets those become the
        // faces opposite apex_u (inherited from t) and opposite apex_t
        // (inherited from u) respectively.
        let (n_t_a, n_t_a_r) = ext(&told, a);
        let (n_t_b, n_t_b_r) = ext(&told, b);
        let (n_t_c, n_t_c_r) = ext(&told, c);
        let (n_u_a, n_u_a_r) = ext(&uold, a);
        let (n_u_b, n_u_b_r) = ext(&uold, b);
        let (n_u_c, n_u_c_r) = ext(&uold, c);

        // New tets, one per edge of (a, b, c), each carrying both apexes.
        let e_ab = t;
        let e_bc = u;
        let e_ca = self.simplices.new_simplex([VertexId::INVALID; 4], [SimplexId(0); 4]);
        self.simplices.get_mut(e_ab).vertices = [a, b, apex_t, apex_u];
        self.simplices.get_mut(e_bc).vertices = [b, c, apex_t, apex_u];
        self.simplices.get_mut(e_ca).vertices = [c, a, apex_t, apex_u];

        self.simplices.link(e_ab, 2, n_u_c, n_u_c_r as usize);
        self.simplices.link(e_ab, 3, n_t_c, n_t_c_r as usize);
        self.simplices.link(e_bc, 2, n_u_a, n_u_a_r as usize);
        self.simplices.link(e_bc, 3, n_t_a, n_t_a_r as usize);
        self.simplices.link(e_ca, 2, n_u_b, n_u_b_r as usize);
        self.simplices.link(e_ca, 3, n_t_b, n_t_b_r as usize);

        // The three faces opposite an edge-endpoint ring internally among
        // the new tets (each contains both apexes and the third edge
        // vertex, shared pairwise between the two tets that border it).
        self.simplices.link(e_ab, 0, e_bc, 1);
        self.simplices.link(e_ab, 1, e_ca, 0);
        self.simplices.link(e_bc, 0, e_ca, 1);

        self.vertices.set_simplex_link(a, e_ab, 0);
        self.vertices.set_simplex_link(b, e_ab, 1);
        self.vertices.set_simplex_link(c, e_bc, 1);
        self.vertices.set_simplex_link(apex_t, e_ab, 2);
        self.vertices.set_simplex_link(apex_u, e_ab, 3);

        for id in [e_ab, e_bc, e_ca] {
            self.to_check.push((id, 2));
            self.to_check.push((id, 3));
        }
    }

    /// Collects, for each tet in an edge ring, the slot holding the other
    /// ring-edge endpoint and the two "equator" vertices in rotation
    /// order, following the same convention [`Tessellator3D::rotate_around_edge`]
    /// builds its ring in (tet `i`'s second equator vertex is tet `i+1`'s
    /// first).
    fn ring_equator(&self, ring: &[(SimplexId, usize)], other_end: VertexId) -> Vec<(VertexId, VertexId, (SimplexId, u8), (SimplexId, u8))> {
        ring.iter()
            .map(|&(id, slot_p)| {
                let s = self.simplices.get(id).clone();
                let slot_q = slot_of(&s.vertices, other_end);
                let apex_slots: Vec<usize> = (0..4).filter(|&k| k != slot_p && k != slot_q).collect();
                let (x0, x1) = (s.vertices[apex_slots[0]], s.vertices[apex_slots[1]]);
                let opp_p = (s.neighbors[slot_p], s.index_in_neighbor[slot_p]);
                let opp_q = (s.neighbors[slot_q], s.index_in_neighbor[slot_q]);
                (x0, x1, opp_p, opp_q)
            })
            .collect()
    }

    /// 3→2 flip: three tets `{p, q, x_i, x_{i+1}}` sharing edge `(p, q)`
    /// collapse to two, `{x0, x1, x2, p}` and `{x0, x1, x2, q}`, removing
    /// the edge and deactivating the third slot.
    fn flip_3_2(&mut self, ring: Vec<(SimplexId, usize)>, p: VertexId, q: VertexId) {
        debug_assert_eq!(ring.len(), 3);
        let info = self.ring_equator(&ring, q);
        let x = [info[0].0, info[1].0, info[2].0];
        let opp_p: Vec<(SimplexId, u8)> = info.iter().map(|r| r.2).collect();
        let opp_q: Vec<(SimplexId, u8)> = info.iter().map(|r| r.3).collect();

        let tet_p = ring[0].0;
        let tet_q = ring[1].0;
        self.simplices.deactivate(ring[2].0);

        self.simplices.get_mut(tet_p).vertices = [x[0], x[1], x[2], p];
        self.simplices.get_mut(tet_q).vertices = [x[0], x[1], x[2], q];

        // tet_p's face opposite x_k matches ring tet m's face opposite q,
        // where k = (m + 2) % 3 (the equator index not adjacent to x_m).
        for m in 0..3 {
            let k = (m + 2) % 3;
            self.simplices.link(tet_p, k, opp_q[m].0, opp_q[m].1 as usize);
            self.simplices.link(tet_q, k, opp_p[m].0, opp_p[m].1 as usize);
        }
        self.simplices.link(tet_p, 3, tet_q, 3);

        self.vertices.set_simplex_link(x[0], tet_p, 0);
        self.vertices.set_simplex_link(x[1], tet_p, 1);
        self.vertices.set_simplex_link(x[2], tet_p, 2);
        self.vertices.set_simplex_link(p, tet_p, 3);
        self.vertices.set_simplex_link(q, tet_q, 3);

        self.to_check.push((tet_p, 3));
        self.to_check.push((tet_q, 3));
    }

    /// 4→4 flip: four tets `{p, q, x_i, x_{i+1}}` sharing edge `(p, q)`,
    /// whose equator `x0..x3` is coplanar with it, are re-split around
    /// the quad's other diagonal `(x0, x2)` instead. All four ids are
    /// reused; nothing is allocated or freed.
    fn flip_4_4(&mut self, ring: Vec<(SimplexId, usize)>, p: VertexId, q: VertexId) {
        debug_assert_eq!(ring.len(), 4);
        let info = self.ring_equator(&ring, q);
        let x = [info[0].0, info[1].0, info[2].0, info[3].0];
        let opp_p: Vec<(SimplexId, u8)> = info.iter().map(|r| r.2).collect();
        let opp_q: Vec<(SimplexId, u8)> = info.iter().map(|r| r.3).collect();
        let [id0, id1, id2, id3] = [ring[0].0, ring[1].0, ring[2].0, ring[3].0];

        self.simplices.get_mut(id0).vertices = [x[0], x[2], x[1], p];
        self.simplices.get_mut(id1).vertices = [x[0], x[2], x[1], q];
        self.simplices.get_mut(id2).vertices = [x[0], x[2], x[3], p];
        self.simplices.get_mut(id3).vertices = [x[0], x[2], x[3], q];

        self.simplices.link(id0, 0, opp_q[1].0, opp_q[1].1 as usize);
        self.simplices.link(id0, 1, opp_q[0].0, opp_q[0].1 as usize);
        self.simplices.link(id1, 0, opp_p[1].0, opp_p[1].1 as usize);
        self.simplices.link(id1, 1, opp_p[0].0, opp_p[0].1 as usize);
        self.simplices.link(id2, 0, opp_q[2].0, opp_q[2].1 as usize);
        self.simplices.link(id2, 1, opp_q[3].0, opp_q[3].1 as usize);
        self.simplices.link(id3, 0, opp_p[2].0, opp_p[2].1 as usize);
        self.simplices.link(id3, 1, opp_p[3].0, opp_p[3].1 as usize);

        self.simplices.link(id0, 2, id2, 2);
        self.simplices.link(id0, 3, id1, 3);
        self.simplices.link(id1, 2, id3, 2);
        self.simplices.link(id2, 3, id3, 3);

        self.vertices.set_simplex_link(x[0], id0, 0);
        self.vertices.set_simplex_link(x[2], id0, 1);
        self.vertices.set_simplex_link(x[1], id0, 2);
        self.vertices.set_simplex_link(x[3], id2, 2);
        self.vertices.set_simplex_link(p, id0, 3);
        self.vertices.set_simplex_link(q, id1, 3);

        for id in [id0, id1, id2, id3] {
            self.to_check.push((id, 2));
            self.to_check.push((id, 3));
        }
    }

    /// Floods the set of active tetrahedra incident to `v` by walking
    /// neighbour links that still contain `v`, starting from its simplex
    /// back-link. Used by both [`Tessellator3D::search_radius`] and the
    /// Voronoi builder's per-generator scan.
    pub fn incident_simplices(&self, v: VertexId) -> Vec<SimplexId> {
        let Some((start, _slot)) = self.vertices.simplex_link(v) else {
            return Vec::new();
        };
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![start];
        let mut result = Vec::new();
        seen.insert(start);
        while let Some(cur) = stack.pop() {
            result.push(cur);
            let s = self.simplices.get(cur);
            for i in 0..4 {
                let n = s.neighbors[i];
                let nv = self.simplices.get(n).vertices;
                if is_dummy(&nv) || !nv.contains(&v) {
                    continue;
                }
                if seen.insert(n) {
                    stack.push(n);
                }
            }
        }
        result
    }

    /// Conservative bound on how far from `v` a point must lie before it
    /// can no longer affect any Voronoi face touching `v`. Cached on
    /// first call.
    pub fn search_radius(&mut self, v: VertexId) -> f64 {
        let cached = self.vertices.search_radius(v);
        if cached.is_finite() {
            return cached;
        }
        let mut radius: f64 = 0.0;
        let to_vec = |p: [f64; 3]| vmesh_geom::Vector3::new(p[0], p[1], p[2]);
        let pv = to_vec(self.vertices.position(v));
        for s in self.incident_simplices(v) {
            let verts = self.simplices.get(s).vertices;
            if is_dummy(&verts) {
                continue;
            }
            let p0 = to_vec(self.vertices.position(verts[0]));
            let p1 = to_vec(self.vertices.position(verts[1]));
            let p2 = to_vec(self.vertices.position(verts[2]));
            let p3 = to_vec(self.vertices.position(verts[3]));
            if let Some(center) = vmesh_geom::circumcenter3(p0, p1, p2, p3) {
                let cr = (center - p0).norm();
                let d = (center - pv).norm();
                radius = radius.max(d + cr);
            }
        }
        self.vertices.set_search_radius(v, radius);
        radius
    }

    /// Tab-separated text dump: one `V` line per vertex, one `T` line per
    /// active (non-dummy) tetrahedron.
    pub fn dump_tessellation(&self) -> String {
        let mut out = String::new();
        for idx in 0..self.vertices.len() {
            let v = VertexId(idx as u32);
            let p = self.vertices.position(v);
            out.push_str(&format!("V\t{idx}\t{}\t{}\t{}\n", p[0], p[1], p[2]));
        }
        for id in self.simplices.active_ids() {
            let s = self.simplices.get(id);
            if is_dummy(&s.vertices) {
                continue;
            }
            out.push_str(&format!(
                "T\t{}\t{}\t{}\t{}\n",
                s.vertices[0].0, s.vertices[1].0, s.vertices[2].0, s.vertices[3].0
            ));
        }
        out
    }

    /// Writes [`Tessellator3D::dump_tessellation`]'s text dump to `path`.
    pub fn print_tessellation(&self, path: impl AsRef<std::path::Path>) -> std::io::Result<()> {
        std::fs::write(path, self.dump_tessellation())
    }

    /// Materialises the Voronoi dual of this tessellation.
    pub fn build_voronoi(&self) -> Result<crate::voronoi::three_d::VoronoiView3D> {
        crate::voronoi::three_d::build_voronoi(self)
    }

    /// Tab-separated text dump of the dual.
    pub fn dump_voronoi(&self) -> Result<String> {
        Ok(crate::voronoi::three_d::print_voronoi(&self.build_voronoi()?))
    }

    /// Writes [`Tessellator3D::dump_voronoi`]'s text dump to `path`.
    pub fn print_voronoi(&self, path: impl AsRef<std::path::Path>) -> std::io::Result<()> {
        let text = self
            .dump_voronoi()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, text)
    }
}
