//! Driving a predictor with a stream of branch records.

use tracing::{ debug, trace };

use crate::branch::*;
use crate::predictor::BtbPredictor;
use crate::stats::*;

/// Results from [`Simulator::run`].
#[derive(Debug)]
pub struct SimReport {
    /// Final statistics reported by the predictor
    pub stats: PredictorStats,

    /// Per-branch statistics collected while running
    pub branches: BranchStats,
}

/// Feeds branch records to a [`BtbPredictor`], one at a time and in
/// program order.
#[derive(Debug)]
pub struct Simulator {
    predictor: BtbPredictor,
    branches: BranchStats,
}
impl Simulator {
    pub fn new(predictor: BtbPredictor) -> Self {
        Self { predictor, branches: BranchStats::new() }
    }

    /// Returns the predictor being driven.
    pub fn predictor(&self) -> &BtbPredictor { &self.predictor }

    /// Predict and then resolve a single branch.
    pub fn step(&mut self, record: &BranchRecord) {
        let pred = self.predictor.predict(record.pc);
        trace!(pc = record.pc, ?pred, actual = ?record.outcome, "resolve");
        self.branches.update(record, pred.outcome);
        self.predictor.update(record.pc, record.tgt, record.outcome, pred.target);
    }

    /// Consume the simulator and report results.
    pub fn finish(self) -> SimReport {
        let stats = self.predictor.finish();
        debug!(%stats, "simulation finished");
        SimReport { stats, branches: self.branches }
    }

    /// Run a predictor over a trace of branch records.
    pub fn run<'a>(predictor: BtbPredictor,
        records: impl IntoIterator<Item = &'a BranchRecord>) -> SimReport
    {
        let mut sim = Self::new(predictor);
        for record in records {
            sim.step(record);
        }
        sim.finish()
    }
}
