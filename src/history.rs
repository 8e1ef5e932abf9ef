
use bitvec::prelude::*;
use crate::branch::Outcome;

/// A fixed-width branch history register.
///
/// The newest outcome lives at bit 0 and the oldest at bit `len - 1`.
/// Pushing a new outcome discards the oldest one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryRegister {
    data: BitVec<usize, Lsb0>,
    len: usize,
}

// NOTE: This *reverses* the all of the bits and presents them in a format
// where the leftmost bit is the oldest (index n) and the rightmost bit is
// the newest (index 0).
impl std::fmt::Display for HistoryRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let x: String = self.data.as_bitslice().iter().by_vals()
            .map(|b| if b { '1' } else { '0' })
            .rev()
            .collect();
        write!(f, "{}", x)
    }
}

impl HistoryRegister {
    /// Longest register whose contents fit in [`HistoryRegister::value`].
    pub const MAX_LEN: usize = u32::BITS as usize;

    /// Create a register with the specified length in bits.
    /// All bits in the register are initialized to zero.
    ///
    /// # Panics
    ///
    /// Panics if `len` is greater than [`HistoryRegister::MAX_LEN`].
    pub fn new(len: usize) -> Self {
        assert!(len <= Self::MAX_LEN,
            "history register of {} bits exceeds {} bits", len, Self::MAX_LEN);
        Self {
            data: bitvec![usize, Lsb0; 0; len],
            len,
        }
    }

    pub fn len(&self) -> usize { self.len }
    pub fn is_empty(&self) -> bool { self.len == 0 }
    pub fn data(&self) -> &BitSlice { self.data.as_bitslice() }

    /// Shift a new outcome into the register.
    pub fn push(&mut self, outcome: Outcome) {
        if self.len == 0 {
            return;
        }
        // The oldest bit wraps around to index 0 and is overwritten.
        self.data.rotate_right(1);
        self.data.set(0, outcome.into());
    }

    /// Return the contents of the register as an integer.
    pub fn value(&self) -> u32 {
        if self.len == 0 {
            return 0;
        }
        self.data.load_le::<u32>()
    }

    /// Clear all bits in the register.
    pub fn clear(&mut self) {
        self.data.fill(false);
    }
}
