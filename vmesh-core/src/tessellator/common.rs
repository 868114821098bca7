use rand::SeedableRng;
use rand_pcg::Pcg64;

/// Wraps the tie-break PRNG so every tessellator owns an independent,
/// reproducible stream instead of reaching for a process-global
/// `rand::thread_rng()`: the same input, seed, and insertion order must
/// always produce the same tessellation.
pub struct TieBreak {
    rng: Pcg64,
}

impl TieBreak {
    pub fn new(seed: u64) -> Self {
        TieBreak {
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    /// Picks one of `count` candidates uniformly. Called only when point
    /// location finds more than one negatively-oriented face at once.
    pub fn choose(&mut self, count: usize) -> usize {
        use rand::Rng;
        self.rng.gen_range(0..count)
    }
}

/// Outcome of walking a point down to the simplex that contains it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location<Id> {
    /// Strictly inside; insertion splits this one simplex into `K`.
    Inside(Id),
    /// Exactly on the face opposite vertex slot `usize`, shared with
    /// exactly one neighbour (2D edge, or a 3D face): 2-way split of the
    /// pair (2D: 2→4; 3D face case handled by the 3D module directly).
    OnFace(Id, usize),
    /// Exactly on the ridge (3D only) shared by `N` tetrahedra arranged in
    /// a ring around it: split into `2N`.
    OnRidge(Vec<(Id, usize)>),
}
