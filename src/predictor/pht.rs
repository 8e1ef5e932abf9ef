//! Implementations of a pattern history table (PHT).

use crate::config::{ PredictorConfig, Scope };
use crate::error::PredictorError;
use crate::predictor::counter::*;
use crate::predictor::table::*;

/// Input used to select a counter in a [`PatternHistoryTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhtInput {
    /// The BTB slot owning the branch
    pub slot: usize,
    /// History value (possibly mixed with program counter bits)
    pub history: u32,
}

/// Storage for one or more tables of [`FsmState`] counters.
///
/// With global tables, every branch shares a single table of
/// `2^history_bits` counters. With local tables, each BTB slot owns a
/// private table, and the tables are stored back-to-back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternHistoryTable {
    /// Table of counters
    data: Vec<FsmState>,

    /// Number of counters in each table
    table_size: usize,

    /// Whether the tables are shared or private to each BTB slot
    scope: Scope,

    /// Initial state of every counter
    init: FsmState,
}
impl PatternHistoryTable {
    pub fn new(cfg: &PredictorConfig) -> Result<Self, PredictorError> {
        let table_size = cfg.table_size();
        let len = table_size * cfg.num_tables();
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, cfg.fsm_init);
        Ok(Self {
            data,
            table_size,
            scope: cfg.tables,
            init: cfg.fsm_init,
        })
    }

    /// Number of counters in each table.
    pub fn table_size(&self) -> usize { self.table_size }

    /// Number of tables.
    pub fn num_tables(&self) -> usize { self.data.len() / self.table_size }

    /// Reset the private table owned by some BTB slot.
    /// A global table is shared by all branches and is never reset.
    pub fn reset_table(&mut self, slot: usize) {
        if let Scope::Local = self.scope {
            let start = slot * self.table_size;
            self.data[start..start + self.table_size].fill(self.init);
        }
    }

    /// Returns the counters belonging to some BTB slot.
    pub fn table(&self, slot: usize) -> &[FsmState] {
        let start = match self.scope {
            Scope::Global => 0,
            Scope::Local => slot * self.table_size,
        };
        &self.data[start..start + self.table_size]
    }
}

impl PredictorTable for PatternHistoryTable {
    type Input = PhtInput;
    type Entry = FsmState;

    fn size(&self) -> usize { self.data.len() }

    fn get_index(&self, input: PhtInput) -> usize {
        let offset = input.history as usize & (self.table_size - 1);
        match self.scope {
            Scope::Global => offset,
            Scope::Local => input.slot * self.table_size + offset,
        }
    }

    fn get_entry(&self, idx: usize) -> &FsmState {
        &self.data[idx]
    }

    fn get_entry_mut(&mut self, idx: usize) -> &mut FsmState {
        &mut self.data[idx]
    }
}
