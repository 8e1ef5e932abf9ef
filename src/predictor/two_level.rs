//! A BTB combined with two-level (history-indexed) direction prediction.

use tracing::{ debug, trace };

use crate::branch::*;
use crate::config::{ PredictorConfig, Scope, ShareMode };
use crate::error::PredictorError;
use crate::history::*;
use crate::predictor::btb::*;
use crate::predictor::counter::FsmState;
use crate::predictor::pht::*;
use crate::predictor::table::*;
use crate::stats::PredictorStats;

/// Output from [`BtbPredictor::predict`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prediction {
    /// The predicted direction
    pub outcome: Outcome,
    /// The predicted address of the next instruction
    pub target: u32,
}
impl Prediction {
    /// Predict that the branch at `pc` falls through.
    pub fn fallthrough(pc: u32) -> Self {
        Self { outcome: Outcome::N, target: fallthrough(pc) }
    }
}

/// A direct-mapped BTB where each hit is qualified by a two-bit counter
/// selected with branch history.
///
/// History may be kept globally or per BTB entry, and counters may live in
/// a single global table or in a private table for each BTB entry. With a
/// global table, bits from the program counter can be XOR'ed into the
/// history value ("gshare") to reduce aliasing.
///
/// Each branch is expected to call [`BtbPredictor::predict`] followed by
/// exactly one [`BtbPredictor::update`], in program order.
#[derive(Debug)]
pub struct BtbPredictor {
    /// The configuration used to create this object
    cfg: PredictorConfig,

    /// Branch target buffer
    btb: Btb,

    /// Table(s) of two-bit counters
    pht: PatternHistoryTable,

    /// Global history register (only with global history)
    ghr: Option<HistoryRegister>,

    /// Number of predictions
    br_num: u64,

    /// Number of mispredicted directions
    flush_num: u64,
}

impl BtbPredictor {
    pub fn new(cfg: PredictorConfig) -> Result<Self, PredictorError> {
        cfg.validate()?;
        let btb = Btb::new(&cfg)?;
        let pht = PatternHistoryTable::new(&cfg)?;
        let ghr = match cfg.history {
            Scope::Global => Some(HistoryRegister::new(cfg.history_bits)),
            Scope::Local => None,
        };
        debug!(
            btb_size = cfg.btb_size,
            index_bits = cfg.index_bits(),
            tag_bits = cfg.tag_bits,
            history_bits = cfg.history_bits,
            tables = pht.num_tables(),
            counters = pht.size(),
            "built predictor"
        );
        Ok(Self { cfg, btb, pht, ghr, br_num: 0, flush_num: 0 })
    }

    /// Returns the configuration used to create this predictor.
    pub fn config(&self) -> &PredictorConfig { &self.cfg }

    /// Returns the number of predictions made so far.
    pub fn predictions(&self) -> u64 { self.br_num }

    /// Returns the number of mispredictions observed so far.
    pub fn mispredictions(&self) -> u64 { self.flush_num }

    /// Returns the BTB.
    pub fn btb(&self) -> &Btb { &self.btb }

    /// Returns the pattern history table(s).
    pub fn pht(&self) -> &PatternHistoryTable { &self.pht }

    /// Returns the global history register (if any).
    pub fn global_history(&self) -> Option<&HistoryRegister> { self.ghr.as_ref() }

    /// Total number of storage bits needed to build this predictor.
    pub fn hardware_bits(&self) -> u64 {
        let cfg = &self.cfg;
        let btb = cfg.btb_size * entry_bits(cfg.tag_bits);
        let history = match cfg.history {
            Scope::Global => cfg.history_bits,
            Scope::Local => cfg.history_bits * cfg.btb_size,
        };
        let fsm = FsmState::STORAGE_BITS * cfg.table_size() * cfg.num_tables();
        (btb + history + fsm) as u64
    }
}

impl BtbPredictor {
    /// Split a program counter into a BTB index and tag.
    fn locate(&self, pc: u32) -> (usize, u32) {
        let addr = pc >> 2;
        (self.btb.get_index(addr), self.btb.get_tag(addr))
    }

    /// Form the input used to select a counter for the branch at `pc`.
    fn pht_input(&self, pc: u32, slot: usize, entry: &BtbEntry) -> PhtInput {
        let mask = self.cfg.history_mask();
        let hist = match (&self.ghr, &entry.history) {
            (Some(ghr), _) => ghr.value(),
            (None, Some(local)) => local.value(),
            (None, None) => 0,
        };
        let history = match self.cfg.share {
            ShareMode::None => hist,
            ShareMode::Lsb => hist ^ ((pc >> 2) & mask),
            ShareMode::Mid => hist ^ ((pc >> ShareMode::MID_SHIFT) & mask),
        };
        PhtInput { slot, history }
    }
}

/// The public interface to a [`BtbPredictor`].
impl BtbPredictor {
    /// Make a prediction for the branch at `pc`.
    ///
    /// Apart from counting the prediction, this does not change the state
    /// of the predictor.
    pub fn predict(&mut self, pc: u32) -> Prediction {
        self.br_num += 1;

        let (idx, tag) = self.locate(pc);
        let Some(entry) = self.btb.lookup(idx, tag) else {
            return Prediction::fallthrough(pc);
        };

        let input = self.pht_input(pc, idx, entry);
        let ctr = self.pht.get_entry(self.pht.get_index(input));
        match ctr.predict() {
            Outcome::T => Prediction { outcome: Outcome::T, target: entry.target() },
            Outcome::N => Prediction::fallthrough(pc),
        }
    }

    /// Given the resolved outcome and target of the branch at `pc`, and the
    /// target returned by the matching call to [`BtbPredictor::predict`],
    /// update the state of the predictor.
    ///
    /// A misprediction is counted when the predicted *direction* is wrong.
    /// The direction is inferred from `predicted_target`: anything other
    /// than the fall-through address was a "taken" prediction.
    pub fn update(&mut self, pc: u32, target: u32, outcome: Outcome,
        predicted_target: u32)
    {
        let (idx, tag) = self.locate(pc);

        let predicted = Outcome::from(predicted_target != fallthrough(pc));
        if predicted != outcome {
            self.flush_num += 1;
        }

        let hit = self.btb.lookup(idx, tag)
            .map(|entry| self.pht_input(pc, idx, entry));

        match hit {
            // Move the counter toward the outcome
            Some(input) => {
                let ctr_idx = self.pht.get_index(input);
                let ctr = self.pht.get_entry_mut(ctr_idx);
                let prev = *ctr;
                ctr.update(outcome);
                trace!(pc, ctr_idx, ?prev, next = ?*ctr, "counter update");
            },

            // New branch (or a conflict with another branch)
            None => {
                if let Some(old) = self.btb.get_entry(idx) {
                    trace!(pc, idx, old_tag = old.tag, tag, "BTB eviction");
                } else {
                    trace!(pc, idx, tag, "BTB allocation");
                }
                self.pht.reset_table(idx);
            },
        }

        // Allocates on a miss, otherwise refreshes the target
        let entry = self.btb.fill(idx, tag, target);

        match (&mut self.ghr, &mut entry.history) {
            (Some(ghr), _) => ghr.push(outcome),
            (None, Some(local)) => local.push(outcome),
            (None, None) => {},
        }
    }

    /// Report final statistics, consuming the predictor.
    pub fn finish(self) -> PredictorStats {
        PredictorStats {
            br_num: self.br_num,
            flush_num: self.flush_num,
            size: self.hardware_bits(),
        }
    }
}
