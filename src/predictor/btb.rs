//! Direct-mapped branch target buffer (BTB).

use crate::config::{ PredictorConfig, Scope };
use crate::error::PredictorError;
use crate::history::*;
use crate::predictor::table::*;

/// An entry in a [`Btb`] tracking a single branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BtbEntry {
    /// Program counter bits identifying the branch
    pub tag: u32,
    /// Cached target address for this branch
    pub tgt: u32,
    /// Local history for this branch, when history is kept per-entry
    pub history: Option<HistoryRegister>,
}
impl BtbEntry {
    pub fn new(tag: u32, tgt: u32, history: Option<HistoryRegister>) -> Self {
        Self { tag, tgt, history }
    }

    pub fn target(&self) -> u32 { self.tgt }
}

/// A direct-mapped BTB. Empty slots are `None`.
///
/// The table is indexed with the *word-aligned* program counter (`pc >> 2`).
/// The slot is `addr & (btb_size - 1)`, and the `tag_bits` above the low
/// `index_bits` are kept as the tag. When `btb_size` is not a power of two
/// some slots are never selected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Btb {
    data: Vec<Option<BtbEntry>>,
    index_bits: usize,
    index_mask: u32,
    tag_mask: u32,
    /// Width of the local history in each entry (if any)
    local_history: Option<usize>,
}
impl Btb {
    pub fn new(cfg: &PredictorConfig) -> Result<Self, PredictorError> {
        let mut data = Vec::new();
        data.try_reserve_exact(cfg.btb_size)?;
        data.resize(cfg.btb_size, None);
        let local_history = match cfg.history {
            Scope::Global => None,
            Scope::Local => Some(cfg.history_bits),
        };
        Ok(Self {
            data,
            index_bits: cfg.index_bits(),
            index_mask: cfg.index_mask(),
            tag_mask: cfg.tag_mask(),
            local_history,
        })
    }

    /// Returns a reference to the entry for `tag` at `idx`, if present.
    pub fn lookup(&self, idx: usize, tag: u32) -> Option<&BtbEntry> {
        self.data[idx].as_ref().filter(|e| e.tag == tag)
    }

    /// Record the target of the branch with `tag` in the slot at `idx`.
    ///
    /// When the slot holds some other branch (or nothing), the previous
    /// occupant is evicted and a new entry is allocated. Local history
    /// (if any) starts out cleared.
    pub fn fill(&mut self, idx: usize, tag: u32, tgt: u32) -> &mut BtbEntry {
        let history = self.local_history;
        let slot = &mut self.data[idx];
        let entry = match slot.take() {
            Some(mut e) if e.tag == tag => {
                e.tgt = tgt;
                e
            },
            _ => BtbEntry::new(tag, tgt, history.map(HistoryRegister::new)),
        };
        slot.insert(entry)
    }

    /// Returns the number of occupied slots.
    pub fn num_valid(&self) -> usize {
        self.data.iter().filter(|e| e.is_some()).count()
    }
}

impl PredictorTable for Btb {
    /// The word-aligned program counter
    type Input = u32;
    type Entry = Option<BtbEntry>;

    fn size(&self) -> usize { self.data.len() }

    fn get_index(&self, addr: u32) -> usize {
        (addr & self.index_mask) as usize
    }

    fn get_entry(&self, idx: usize) -> &Option<BtbEntry> {
        &self.data[idx]
    }

    fn get_entry_mut(&mut self, idx: usize) -> &mut Option<BtbEntry> {
        &mut self.data[idx]
    }
}

impl TaggedPredictorTable for Btb {
    fn get_tag(&self, addr: u32) -> u32 {
        addr.checked_shr(self.index_bits as u32).unwrap_or(0) & self.tag_mask
    }
}

/// Number of target address bits stored in each entry.
pub const TARGET_BITS: usize = 30;

/// Storage cost of a single BTB entry (valid bit, tag, and target).
pub fn entry_bits(tag_bits: usize) -> usize {
    1 + tag_bits + TARGET_BITS
}
