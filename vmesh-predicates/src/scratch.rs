use num_bigint::BigInt;

/// Canonical integer coordinate consumed by every predicate: the 52-bit
/// mantissa of a coordinate rescaled into `[1, 2)` (see vmesh-topology's
/// vertex store). Differences of two mantissas fit comfortably in `i64`;
/// widening to `BigInt` happens once, inside [`ScratchPool::diff`].
pub type Mantissa = u64;

/// Per-tessellation scratch state for the exact predicates.
///
/// A `ScratchPool` owns a small arena of [`BigInt`] slots that are cleared
/// and reused call after call, instead of being freed and reallocated. This
/// is single-threaded state: it must not be shared between tessellations
/// running on different threads, which is why the tessellator owns exactly
/// one pool and every predicate call borrows it mutably.
pub struct ScratchPool {
    slots: Vec<BigInt>,
    cursor: usize,
}

impl ScratchPool {
    pub fn new() -> Self {
        ScratchPool {
            slots: Vec::new(),
            cursor: 0,
        }
    }

    /// Must be called once per predicate evaluation before taking any slots.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Borrow a scratch `BigInt`, seeded with `value`, reusing a previous
    /// allocation's backing digits when one is available.
    pub fn diff(&mut self, value: i64) -> BigInt {
        if self.cursor < self.slots.len() {
            let slot = &mut self.slots[self.cursor];
            slot.clone_from(&BigInt::from(value));
            self.cursor += 1;
            slot.clone()
        } else {
            let v = BigInt::from(value);
            self.slots.push(v.clone());
            self.cursor += 1;
            v
        }
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Widening signed difference of two mantissas; always exact since both
/// operands fit in 52 bits.
pub fn mantissa_diff(a: Mantissa, b: Mantissa) -> i64 {
    a as i64 - b as i64
}
