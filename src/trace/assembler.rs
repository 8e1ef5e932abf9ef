//! Assembling synthetic traces from a small program of branches.
//!
//! ```ignore
//! let mut asm = TraceAssembler::new(0x1000_0000, 0);
//! let top = asm.create_label();
//! asm.bind_label(top)?;
//! asm.pad(0x40);
//! asm.branch_to_label(top, BranchPattern::NotTakenPeriodic(8));
//! let trace = asm.compile(1024)?;
//! ```

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::branch::*;
use crate::error::{ TraceError, TraceResult };

/// A trace produced by a [`TraceAssembler`].
#[derive(Clone, Debug)]
pub struct SyntheticTrace {
    pub data: Vec<BranchRecord>,
}
impl SyntheticTrace {
    /// Return the number of records
    pub fn num_entries(&self) -> usize { self.data.len() }

    /// Return a slice of records.
    pub fn as_slice(&self) -> &[BranchRecord] { &self.data }
}

/// An identifier for a particular [EmitterOp].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Label(usize);
impl Label {
    pub fn new(id: usize) -> Self { Self(id) }
    pub fn id(&self) -> usize { self.0 }
}

/// A map from labels to indexes.
#[derive(Debug, Default)]
pub struct LabelDb {
    data: Vec<Option<usize>>,
}
impl LabelDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new label
    pub fn alloc(&mut self) -> Label {
        let res = Label::new(self.data.len());
        self.data.push(None);
        res
    }

    /// Bind a label to some index
    pub fn define(&mut self, label: &Label, idx: usize) -> TraceResult<()> {
        let slot = self.data.get_mut(label.id())
            .ok_or(TraceError::UndefinedLabel(label.id()))?;
        *slot = Some(idx);
        Ok(())
    }

    /// Resolve a label
    pub fn resolve(&self, label: &Label) -> Option<usize> {
        self.data.get(label.id()).copied().flatten()
    }
}

/// A pre-determined pattern of outcomes associated with a conditional branch.
#[derive(Clone, Debug, PartialEq)]
pub enum BranchPattern {
    /// A branch whose outcome is always 'taken'.
    AlwaysTaken,

    /// A branch whose outcome is always 'not-taken'.
    NeverTaken,

    /// A branch whose outcome is only periodically "taken".
    /// Otherwise, the branch is "not-taken" by default.
    TakenPeriodic(usize),

    /// A branch whose outcome is only periodically "not-taken".
    /// Otherwise, the branch is "taken" by default.
    NotTakenPeriodic(usize),

    /// A branch with an arbitrary repeating pattern of outcomes.
    Pattern(Vec<Outcome>),

    /// A branch which is "taken" with some probability.
    Random(f64),
}
impl BranchPattern {
    fn validate(&self) -> TraceResult<()> {
        match self {
            Self::TakenPeriodic(0) | Self::NotTakenPeriodic(0) => Err(
                TraceError::BadProgram("period must be non-zero".to_string())
            ),
            Self::Pattern(p) if p.is_empty() => Err(
                TraceError::BadProgram("pattern must be non-empty".to_string())
            ),
            Self::Random(p) if !(0.0..=1.0).contains(p) => Err(
                TraceError::BadProgram(format!("probability {} out of range", p))
            ),
            _ => Ok(()),
        }
    }

    /// Generate the outcome for the `ctr`-th execution of the branch.
    fn outcome(&self, ctr: usize, rng: &mut StdRng) -> Outcome {
        match self {
            Self::AlwaysTaken => Outcome::T,
            Self::NeverTaken => Outcome::N,
            Self::TakenPeriodic(p) => {
                if ctr % p == (p - 1) { Outcome::T } else { Outcome::N }
            },
            Self::NotTakenPeriodic(p) => {
                if ctr % p == (p - 1) { Outcome::N } else { Outcome::T }
            },
            Self::Pattern(p) => p[ctr % p.len()],
            Self::Random(p) => Outcome::from(rng.gen_bool(*p)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmitterLoc {
    /// A label to be resolved into an index at compile-time.
    Label(Label),

    /// An index pointing to some [EmitterOp].
    Index(usize),
}
impl EmitterLoc {
    fn resolve(&mut self, labels: &LabelDb) -> TraceResult<()> {
        if let Self::Label(lab) = self {
            let idx = labels.resolve(lab)
                .ok_or(TraceError::UndefinedLabel(lab.id()))?;
            *self = Self::Index(idx);
        }
        Ok(())
    }

    fn index(&self) -> usize {
        match self {
            Self::Index(idx) => *idx,
            // All labels are rewritten before a trace is compiled
            Self::Label(lab) => unreachable!("unresolved label {:?}", lab),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BranchTarget {
    /// A single fixed target location
    Direct(EmitterLoc),

    /// A list of target locations, visited round-robin
    Indirect(Vec<EmitterLoc>),
}
impl BranchTarget {
    fn locs_mut(&mut self) -> &mut [EmitterLoc] {
        match self {
            Self::Direct(loc) => std::slice::from_mut(loc),
            Self::Indirect(locs) => locs,
        }
    }

    fn loc(&self, ctr: usize) -> &EmitterLoc {
        match self {
            Self::Direct(loc) => loc,
            Self::Indirect(locs) => &locs[ctr % locs.len()],
        }
    }
}

/// An instruction in the IR.
#[derive(Clone, Debug, PartialEq)]
pub enum EmitterOp {
    /// A conditional branch instruction.
    /// Consists of a single target, and some pattern of outcomes.
    Branch(BranchTarget, BranchPattern),

    /// An unconditional branch instruction.
    Jump(BranchTarget),
}
impl EmitterOp {
    fn target_mut(&mut self) -> &mut BranchTarget {
        match self {
            Self::Branch(tgt, _) | Self::Jump(tgt) => tgt,
        }
    }

    fn target(&self) -> &BranchTarget {
        match self {
            Self::Branch(tgt, _) | Self::Jump(tgt) => tgt,
        }
    }
}

/// Used to assemble and compile a trace.
#[derive(Debug)]
pub struct TraceAssembler {
    /// The list of [EmitterOp]s.
    ops: Vec<EmitterOp>,

    /// The list of program counter values corresponding to each [EmitterOp].
    pcs: Vec<u32>,

    /// State tracking the program counter value during assembly.
    cursor: u32,

    /// Map from some [Label] to an [EmitterOp] index.
    labels: LabelDb,

    /// Source of outcomes for [BranchPattern::Random].
    rng: StdRng,
}

impl TraceAssembler {
    /// Create a new assembler starting at address `base`.
    /// Random branch outcomes are generated from `seed`.
    pub fn new(base: u32, seed: u64) -> Self {
        Self {
            ops: Vec::new(),
            pcs: Vec::new(),
            cursor: base,
            labels: LabelDb::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a new label.
    pub fn create_label(&mut self) -> Label {
        self.labels.alloc()
    }

    /// Bind a label to the current point in the program.
    ///
    /// Fails if the label was not created by this assembler.
    pub fn bind_label(&mut self, label: Label) -> TraceResult<()> {
        let off = self.ops.len();
        self.labels.define(&label, off)
    }

    /// Returns the program counter of the next emitted instruction.
    pub fn cursor(&self) -> u32 { self.cursor }

    fn push_op(&mut self, op: EmitterOp) {
        self.ops.push(op);
        self.pcs.push(self.cursor);
        self.cursor = fallthrough(self.cursor);
    }

    /// Emit a conditional direct branch to the provided [Label].
    pub fn branch_to_label(&mut self, tgt: Label, pat: BranchPattern)
        -> TraceResult<()>
    {
        pat.validate()?;
        self.push_op(EmitterOp::Branch(
            BranchTarget::Direct(EmitterLoc::Label(tgt)),
            pat
        ));
        Ok(())
    }

    /// Emit an unconditional direct branch to the provided [Label].
    pub fn jump_to_label(&mut self, tgt: Label) {
        self.push_op(EmitterOp::Jump(
            BranchTarget::Direct(EmitterLoc::Label(tgt))
        ));
    }

    /// Emit an unconditional indirect branch which cycles through the
    /// provided [Label]s.
    pub fn jump_indirect(&mut self, tgts: &[Label]) -> TraceResult<()> {
        if tgts.is_empty() {
            return Err(TraceError::BadProgram(
                "indirect jump needs at least one target".to_string()
            ));
        }
        let locs = tgts.iter().map(|l| EmitterLoc::Label(*l)).collect();
        self.push_op(EmitterOp::Jump(BranchTarget::Indirect(locs)));
        Ok(())
    }

    /// Skip `len` bytes of non-branch instructions.
    pub fn pad(&mut self, len: u32) {
        self.cursor = self.cursor.wrapping_add(len & !(INST_SIZE - 1));
    }

    /// Skip ahead to the next multiple of `aln` bytes.
    pub fn pad_align(&mut self, aln: u32) -> TraceResult<()> {
        if !aln.is_power_of_two() || aln < INST_SIZE {
            return Err(TraceError::BadProgram(
                format!("bad alignment {:#x}", aln)
            ));
        }
        let mask = aln - 1;
        self.cursor = self.cursor.wrapping_add(mask) & !mask;
        Ok(())
    }
}

impl TraceAssembler {
    /// Rewrite occurences of [EmitterLoc::Label] into [EmitterLoc::Index].
    fn rewrite_labels(&mut self) -> TraceResult<()> {
        for op in self.ops.iter_mut() {
            for loc in op.target_mut().locs_mut() {
                loc.resolve(&self.labels)?;
            }
        }
        Ok(())
    }

    /// Unroll this program into a trace of at most `max_records` branches.
    ///
    /// The trace ends early if control falls through the last instruction.
    pub fn compile(&mut self, max_records: usize) -> TraceResult<SyntheticTrace> {
        self.rewrite_labels()?;

        let num_ops = self.ops.len();
        let mut ctr = vec![0; num_ops];
        let mut data = Vec::new();
        let mut cur = 0;

        while data.len() < max_records && cur < num_ops {
            let op = &self.ops[cur];
            let pc = self.pcs[cur];

            let outcome = match op {
                EmitterOp::Jump(_) => Outcome::T,
                EmitterOp::Branch(_, pat) => pat.outcome(ctr[cur], &mut self.rng),
            };
            let tgt_idx = op.target().loc(ctr[cur]).index();
            let tgt = self.pcs.get(tgt_idx).copied().unwrap_or(self.cursor);
            ctr[cur] += 1;

            data.push(BranchRecord { pc, tgt, outcome });

            cur = match outcome {
                Outcome::T => tgt_idx,
                Outcome::N => cur + 1,
            };
        }

        Ok(SyntheticTrace { data })
    }
}
