//! Helpers for collecting statistics.

use std::collections::*;
use crate::branch::*;
use bitvec::prelude::*;
use itertools::*;

/// Final statistics reported by a predictor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PredictorStats {
    /// Number of predictions made
    pub br_num: u64,

    /// Number of mispredicted directions (each requiring a pipeline flush)
    pub flush_num: u64,

    /// Storage needed to build the predictor (in bits)
    pub size: u64,
}
impl PredictorStats {
    /// Return the fraction of predictions which were mispredicted.
    pub fn flush_rate(&self) -> f64 {
        if self.br_num == 0 {
            return 0.0;
        }
        self.flush_num as f64 / self.br_num as f64
    }
}

impl std::fmt::Display for PredictorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "flush_num: {}, br_num: {}, size: {}b",
            self.flush_num, self.br_num, self.size)
    }
}

/// Container for recording per-branch statistics while evaluating a
/// predictor.
#[derive(Debug, Default)]
pub struct BranchStats {
    /// Per-branch statistics (indexed by program counter value).
    pub data: BTreeMap<u32, BranchData>,

    /// Number of correct predictions
    pub global_hits: usize,

    /// Number of times any branch instruction was executed
    pub global_brns: usize,
}
impl BranchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the global hit rate.
    pub fn hit_rate(&self) -> f64 {
        if self.global_brns == 0 {
            return 0.0;
        }
        self.global_hits as f64 / self.global_brns as f64
    }

    /// Return the global hit count.
    pub fn global_hits(&self) -> usize { self.global_hits }

    /// Return the global miss count.
    pub fn global_miss(&self) -> usize { self.global_brns - self.global_hits }

    /// Return the total branch count.
    pub fn global_brns(&self) -> usize { self.global_brns }

    /// Record a prediction for some branch.
    pub fn update(&mut self, record: &BranchRecord, prediction: Outcome) {
        let hit = prediction == record.outcome;
        self.global_brns += 1;
        if hit { self.global_hits += 1; }

        let data = self.get_mut(record.pc);
        data.occ += 1;
        data.pat.push(record.outcome.into());
        if hit { data.hits += 1; }
    }

    /// Returns a reference to data collected for a particular branch.
    pub fn get(&self, pc: u32) -> Option<&BranchData> {
        self.data.get(&pc)
    }

    /// Returns a mutable reference to data collected for a particular branch.
    /// Creates a new entry if one doesn't already exist.
    pub fn get_mut(&mut self, pc: u32) -> &mut BranchData {
        self.data.entry(pc).or_default()
    }

    /// Returns the number of unique observed branch instructions.
    pub fn num_unique_branches(&self) -> usize {
        self.data.len()
    }

    /// Returns the number of branches that are always taken
    pub fn num_always_taken(&self) -> usize {
        self.data.values().filter(|d| d.is_always_taken()).count()
    }

    /// Returns the number of branches that are never taken
    pub fn num_never_taken(&self) -> usize {
        self.data.values().filter(|d| d.is_never_taken()).count()
    }

    /// Returns the `n` most frequently executed branches.
    pub fn get_common_branches(&self, n: usize) -> Vec<(u32, &BranchData)> {
        self.data.iter()
            .sorted_by_key(|(_, d)| d.occ)
            .rev()
            .take(n)
            .map(|(pc, d)| (*pc, d))
            .collect()
    }

    /// Returns the `n` branches with the most mispredictions.
    pub fn get_worst_branches(&self, n: usize) -> Vec<(u32, &BranchData)> {
        self.data.iter()
            .filter(|(_, d)| d.misses() > 0)
            .sorted_by(|x, y| {
                y.1.misses().cmp(&x.1.misses()).then(x.0.cmp(y.0))
            })
            .take(n)
            .map(|(pc, d)| (*pc, d))
            .collect()
    }
}

/// Container for per-branch statistics.
#[derive(Debug, Default)]
pub struct BranchData {
    /// Number of times this branch was encountered.
    pub occ: usize,

    /// Number of correct predictions for this branch.
    pub hits: usize,

    /// Record of all observed outcomes for this branch.
    pub pat: BitVec,
}
impl BranchData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the hit rate for this branch.
    pub fn hit_rate(&self) -> f64 {
        if self.occ == 0 {
            return 0.0;
        }
        self.hits as f64 / self.occ as f64
    }

    /// Return the number of mispredictions for this branch.
    pub fn misses(&self) -> usize { self.occ - self.hits }

    pub fn is_always_taken(&self) -> bool {
        self.pat.count_ones() == self.pat.len()
    }

    pub fn is_never_taken(&self) -> bool {
        self.pat.count_zeros() == self.pat.len()
    }

    pub fn times_taken(&self) -> usize {
        self.pat.count_ones()
    }

    // NOTE: Remember that this isn't too useful apart from telling you
    // whether some sequence of outcomes is mixed or uniform.
    pub fn shannon_entropy(&self) -> f64 {
        let n   = self.pat.len() as f64;
        let n_t = self.pat.count_ones();
        let n_f = self.pat.count_zeros();

        let p_t = (n_t as f64) / n;
        let p_f = (n_f as f64) / n;

        let res = -(p_t * p_t.log2() + p_f * p_f.log2());
        if res.is_nan() { 0.0 } else { res }
    }

    /// Render the most recent `n` outcomes (oldest first).
    pub fn recent_pattern(&self, n: usize) -> String {
        let start = self.pat.len().saturating_sub(n);
        self.pat[start..].iter().by_vals()
            .map(|b| if b { 'T' } else { 'N' })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_matches_report_format() {
        let s = PredictorStats { br_num: 10, flush_num: 3, size: 129 };
        assert_eq!(s.to_string(), "flush_num: 3, br_num: 10, size: 129b");
        assert!((s.flush_rate() - 0.3).abs() < 1e-9);
        assert_eq!(PredictorStats::default().flush_rate(), 0.0);
    }

    #[test]
    fn per_branch_counts() {
        let mut stat = BranchStats::new();
        let a = BranchRecord::new(0x100, 0x80, Outcome::T);
        let b = BranchRecord::new(0x200, 0x80, Outcome::N);
        stat.update(&a, Outcome::T);
        stat.update(&a, Outcome::N);
        stat.update(&b, Outcome::T);
        stat.update(&b, Outcome::T);
        stat.update(&b, Outcome::N);

        assert_eq!(stat.global_brns(), 5);
        assert_eq!(stat.global_hits(), 2);
        assert_eq!(stat.global_miss(), 3);
        assert_eq!(stat.num_unique_branches(), 2);
        assert_eq!(stat.num_always_taken(), 1);
        assert_eq!(stat.num_never_taken(), 1);

        let worst = stat.get_worst_branches(4);
        assert_eq!(worst.len(), 2);
        assert_eq!(worst[0].0, 0x200);
        assert_eq!(worst[0].1.misses(), 2);

        let common = stat.get_common_branches(1);
        assert_eq!(common[0].0, 0x200);

        let a = stat.get(0x100).unwrap();
        assert_eq!(a.hit_rate(), 0.5);
        assert_eq!(a.times_taken(), 2);
        assert_eq!(a.recent_pattern(8), "TT");
        assert_eq!(a.shannon_entropy(), 0.0);
    }

    #[test]
    fn entropy_of_mixed_pattern() {
        let mut d = BranchData::new();
        d.pat.extend([true, false, true, false]);
        assert!((d.shannon_entropy() - 1.0).abs() < 1e-9);
        assert_eq!(d.recent_pattern(3), "NTN");
    }
}
