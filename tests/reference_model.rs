//! Compare [`BtbPredictor`] against a direct, array-based model of the
//! predictor written with plain integers.

use bpsim::*;
use proptest::prelude::*;
use rstest::rstest;

/// Straightforward model: parallel arrays for the BTB, integer histories
/// and raw counter values.
struct Model {
    cfg: PredictorConfig,
    index_bits: u32,
    valid: Vec<bool>,
    tag: Vec<u32>,
    tgt: Vec<u32>,
    local_hist: Vec<u32>,
    global_hist: u32,
    fsm: Vec<u8>,
    br_num: u64,
    flush_num: u64,
}
impl Model {
    fn new(cfg: PredictorConfig) -> Self {
        let n = cfg.btb_size;
        let tables = if cfg.tables == Scope::Global { 1 } else { n };
        Self {
            cfg,
            index_bits: cfg.index_bits() as u32,
            valid: vec![false; n],
            tag: vec![0; n],
            tgt: vec![0; n],
            local_hist: vec![0; n],
            global_hist: 0,
            fsm: vec![cfg.fsm_init as u8; (1 << cfg.history_bits) * tables],
            br_num: 0,
            flush_num: 0,
        }
    }

    fn hist_mask(&self) -> u32 { (1u32 << self.cfg.history_bits) - 1 }

    fn locate(&self, pc: u32) -> (usize, u32) {
        let a = pc >> 2;
        let index = a & (self.cfg.btb_size as u32 - 1);
        let tag = (a >> self.index_bits) & ((1u32 << self.cfg.tag_bits) - 1);
        (index as usize, tag)
    }

    fn counter_index(&self, pc: u32, index: usize) -> usize {
        let mut h = match self.cfg.history {
            Scope::Global => self.global_hist,
            Scope::Local => self.local_hist[index],
        };
        match self.cfg.share {
            ShareMode::None => {},
            ShareMode::Lsb => h ^= (pc >> 2) & self.hist_mask(),
            ShareMode::Mid => h ^= (pc >> 16) & self.hist_mask(),
        }
        match self.cfg.tables {
            Scope::Global => h as usize,
            Scope::Local => index * (1 << self.cfg.history_bits) + h as usize,
        }
    }

    fn predict(&mut self, pc: u32) -> (bool, u32) {
        self.br_num += 1;
        let (index, tag) = self.locate(pc);
        if self.valid[index] && self.tag[index] == tag {
            let c = self.fsm[self.counter_index(pc, index)];
            if c >= 2 {
                return (true, self.tgt[index]);
            }
        }
        (false, pc.wrapping_add(4))
    }

    fn update(&mut self, pc: u32, target: u32, taken: bool, predicted_target: u32) {
        let (index, tag) = self.locate(pc);
        if (predicted_target != pc.wrapping_add(4)) != taken {
            self.flush_num += 1;
        }
        if !self.valid[index] || self.tag[index] != tag {
            self.valid[index] = true;
            self.tag[index] = tag;
            self.tgt[index] = target;
            self.local_hist[index] = 0;
            if self.cfg.tables == Scope::Local {
                let size = 1 << self.cfg.history_bits;
                let init = self.cfg.fsm_init as u8;
                self.fsm[index * size..(index + 1) * size].fill(init);
            }
        } else {
            let i = self.counter_index(pc, index);
            self.fsm[i] = if taken {
                (self.fsm[i] + 1).min(3)
            } else {
                self.fsm[i].saturating_sub(1)
            };
            self.tgt[index] = target;
        }
        let bit = taken as u32;
        match self.cfg.history {
            Scope::Global => {
                self.global_hist = ((self.global_hist << 1) | bit) & self.hist_mask();
            },
            Scope::Local => {
                let h = self.local_hist[index];
                self.local_hist[index] = ((h << 1) | bit) & self.hist_mask();
            },
        }
    }
}

fn scope() -> impl Strategy<Value = Scope> {
    prop_oneof![Just(Scope::Global), Just(Scope::Local)]
}

fn share() -> impl Strategy<Value = ShareMode> {
    prop_oneof![Just(ShareMode::None), Just(ShareMode::Lsb), Just(ShareMode::Mid)]
}

fn config_strategy() -> impl Strategy<Value = PredictorConfig> {
    (1usize..=12, 0usize..=5, 0usize..=8, 0u8..=3, scope(), scope(), share())
        .prop_map(|(btb_size, history_bits, tag_bits, fsm, history, tables, share)| {
            PredictorConfig {
                btb_size,
                history_bits,
                tag_bits,
                fsm_init: FsmState::try_from(fsm).unwrap(),
                history,
                tables,
                share,
            }
        })
}

/// A small set of branch addresses so that branches repeat and collide.
/// The upper half-word varies to exercise the mid-bit sharing mode.
fn branch_strategy() -> impl Strategy<Value = (u32, bool, u32)> {
    (0u32..24, 0u32..3, any::<bool>(), 0u32..8).prop_map(|(lo, hi, taken, t)| {
        let pc = lo * 4 + hi * 0x1_0000;
        (pc, taken, 0x4000 + t * 0x40)
    })
}

proptest! {
    #[test]
    fn matches_model(
        cfg in config_strategy(),
        branches in proptest::collection::vec(branch_strategy(), 0..300)
    ) {
        let mut p = BtbPredictor::new(cfg).unwrap();
        let mut m = Model::new(cfg);

        for (i, &(pc, taken, tgt)) in branches.iter().enumerate() {
            let pred = p.predict(pc);
            let (m_taken, m_target) = m.predict(pc);
            prop_assert_eq!(pred.outcome.is_taken(), m_taken, "branch {} at {:#x}", i, pc);
            prop_assert_eq!(pred.target, m_target, "branch {} at {:#x}", i, pc);

            p.update(pc, tgt, Outcome::from(taken), pred.target);
            m.update(pc, tgt, taken, m_target);
            prop_assert_eq!(p.mispredictions(), m.flush_num);
        }

        let stats = p.finish();
        prop_assert_eq!(stats.br_num, m.br_num);
        prop_assert_eq!(stats.flush_num, m.flush_num);
    }
}

#[test]
fn three_entry_btb_skips_slot_one() {
    // With btb_size = 3 the index mask is 0b10 and the tag starts at bit 2
    let cfg = PredictorConfig {
        btb_size: 3,
        history_bits: 1,
        tag_bits: 4,
        fsm_init: FsmState::StronglyTaken,
        history: Scope::Global,
        tables: Scope::Global,
        share: ShareMode::None,
    };
    let mut p = BtbPredictor::new(cfg).unwrap();

    let pred = p.predict(0x0);
    p.update(0x0, 40, Outcome::T, pred.target);
    assert_eq!(p.predict(0x0).target, 40);
    p.update(0x0, 40, Outcome::T, 40);

    // Word address 1 lands in slot 0 with the same tag as word address 0
    let pred = p.predict(0x4);
    assert_eq!(pred.target, 40);
    p.update(0x4, 40, Outcome::T, pred.target);

    // Word address 5 lands in slot 0 with tag 1 and evicts it
    let pred = p.predict(0x14);
    assert_eq!(pred.target, 0x18);
    p.update(0x14, 4096, Outcome::T, pred.target);

    assert!(p.btb().get_entry(1).is_none());
    assert_eq!(p.btb().lookup(0, 1).map(|e| e.target()), Some(4096));
    assert_eq!(p.predict(0x0).target, 0x4);
}

#[rstest]
#[case(Scope::Global, Scope::Global, ShareMode::Lsb)]
#[case(Scope::Local, Scope::Local, ShareMode::None)]
#[case(Scope::Local, Scope::Global, ShareMode::Mid)]
fn predict_does_not_change_state(
    #[case] history: Scope,
    #[case] tables: Scope,
    #[case] share: ShareMode,
) {
    let mut p = BtbPredictor::new(PredictorConfig {
        btb_size: 4,
        history_bits: 3,
        tag_bits: 6,
        fsm_init: FsmState::WeaklyNotTaken,
        history,
        tables,
        share,
    }).unwrap();

    for (i, pc) in [0x0, 0x4, 0x10, 0x0, 0x4, 0x0, 0x1_0000].iter().enumerate() {
        let pred = p.predict(*pc);
        p.update(*pc, 0x800, Outcome::from(i % 3 != 1), pred.target);
    }

    let btb = p.btb().clone();
    let pht = p.pht().clone();
    let ghr = p.global_history().cloned();
    let flushes = p.mispredictions();

    let first = p.predict(0x0);
    let second = p.predict(0x0);
    assert_eq!(first, second);
    assert_eq!(p.predict(0x40), Prediction::fallthrough(0x40));

    assert_eq!(p.btb(), &btb);
    assert_eq!(p.pht(), &pht);
    assert_eq!(p.global_history().cloned(), ghr);
    assert_eq!(p.mispredictions(), flushes);
    assert_eq!(p.predictions(), 10);
}
