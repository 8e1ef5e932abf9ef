//! Types for representing branches and branch outcomes.

use bitvec::prelude::*;

/// A branch outcome.
#[repr(u32)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    /// Not taken
    N = 0,
    /// Taken
    T = 1
}

impl Outcome {
    pub fn vec_from_bitvec(bits: &BitVec) -> Vec<Self> {
        bits.iter().map(|b| (*b).into()).collect()
    }

    pub fn is_taken(&self) -> bool { matches!(self, Self::T) }
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::T => "t",
            Self::N => "n",
        };
        write!(f, "{}", s)
    }
}

impl std::ops::Not for Outcome {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Self::N => Self::T,
            Self::T => Self::N,
        }
    }
}

impl From<bool> for Outcome {
    fn from(x: bool) -> Self {
        match x {
            true => Self::T,
            false => Self::N
        }
    }
}
impl From<Outcome> for bool {
    fn from(x: Outcome) -> Self {
        x.is_taken()
    }
}

/// Size of every instruction in bytes.
///
/// Addresses are assumed to be word-aligned, so the fall-through address
/// of a branch is always `pc + 4`.
pub const INST_SIZE: u32 = 4;

/// Return the fall-through address for a branch at `pc`.
pub fn fallthrough(pc: u32) -> u32 {
    pc.wrapping_add(INST_SIZE)
}

/// A record of branch execution.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BranchRecord {
    /// The program counter value for this branch
    pub pc: u32,

    /// The target address evaluated for this branch
    pub tgt: u32,

    /// The outcome evaluated for this branch
    pub outcome: Outcome,
}
impl BranchRecord {
    pub fn new(pc: u32, tgt: u32, outcome: Outcome) -> Self {
        Self { pc, tgt, outcome }
    }

    /// Returns 'true' if this branch was taken.
    pub fn is_taken(&self) -> bool {
        self.outcome.is_taken()
    }

    /// Returns the address of the next instruction executed after this one.
    pub fn next_pc(&self) -> u32 {
        match self.outcome {
            Outcome::T => self.tgt,
            Outcome::N => fallthrough(self.pc),
        }
    }
}
