/// Host-supplied knobs for a tessellation run.
///
/// `seed` drives the tie-break PRNG used when point location finds more
/// than one negatively-oriented face of the current simplex: without a
/// fixed seed, two runs over the same input could walk different
/// paths and land on different (but equally valid) triangulations of
/// co-circular/co-spherical configurations, which breaks reproducibility
/// for anything that diffs tessellations across runs.
#[derive(Clone, Debug)]
pub struct TessellatorConfig {
    /// Minimum corner of the host-supplied bounding box.
    pub anchor: Vec<f64>,
    /// Side length of the host-supplied bounding box (must be positive).
    pub box_side: f64,
    /// Seed for the tie-break PRNG.
    pub seed: u64,
    /// Expected vertex count, used to size the initial store allocations.
    pub capacity_hint: usize,
}

impl TessellatorConfig {
    pub fn new(anchor: Vec<f64>, box_side: f64) -> Self {
        TessellatorConfig {
            anchor,
            box_side,
            seed: 0x5eed_5eed_5eed_5eed,
            capacity_hint: 1024,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_capacity_hint(mut self, capacity_hint: usize) -> Self {
        self.capacity_hint = capacity_hint;
        self
    }
}
