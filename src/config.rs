//! Configuration for a [`BtbPredictor`](crate::predictor::BtbPredictor).
//!
//! A configuration can be deserialized from JSON, or parsed from the
//! single-line header at the top of a text trace:
//!
//! ```text
//! <btb_size> <history_bits> <tag_bits> <fsm_init> <GlobalHist|LocalHist> <GlobalTables|LocalTables> <share>
//! ```
//!
//! where `<share>` is one of `not_using_share`, `using_share_lsb` or
//! `using_share_mid`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PredictorError;
use crate::predictor::counter::FsmState;

/// Largest supported history register.
pub const MAX_HISTORY_BITS: usize = 16;

/// Number of significant bits in a word-aligned 32-bit address.
pub const ADDR_BITS: usize = 30;

/// Whether some structure is shared by all branches, or private to each
/// entry in the BTB.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Global,
    Local,
}

/// How bits from the program counter are mixed into the history value
/// used to index a pattern history table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareMode {
    /// Index with history alone
    #[default]
    None,
    /// XOR with the low bits of the word-aligned program counter
    Lsb,
    /// XOR with bits taken from the program counter starting at bit 16
    Mid,
}
impl ShareMode {
    /// The lowest program counter bit used by [`ShareMode::Mid`].
    pub const MID_SHIFT: u32 = 16;
}

impl FromStr for ShareMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_using_share" | "none" => Ok(Self::None),
            "using_share_lsb" | "lsb" => Ok(Self::Lsb),
            "using_share_mid" | "mid" => Ok(Self::Mid),
            _ => Err(format!("unknown share mode '{}'", s)),
        }
    }
}

/// Parameters fixed when a predictor is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Number of entries in the BTB
    pub btb_size: usize,

    /// Number of bits in each history register
    pub history_bits: usize,

    /// Number of program counter bits kept in each BTB tag
    pub tag_bits: usize,

    /// Initial state of every two-bit counter
    pub fsm_init: FsmState,

    /// Global history register, or one history register per BTB entry
    pub history: Scope,

    /// Global counter table, or one counter table per BTB entry
    pub tables: Scope,

    /// How program counter bits are mixed into the table index
    #[serde(default)]
    pub share: ShareMode,
}

impl PredictorConfig {
    /// Number of program counter bits used to select a BTB entry.
    pub fn index_bits(&self) -> usize {
        let mut bits = 0;
        while (1usize << bits) < self.btb_size {
            bits += 1;
        }
        bits
    }

    /// Number of counters in a single pattern history table.
    pub fn table_size(&self) -> usize { 1 << self.history_bits }

    /// Number of pattern history tables.
    pub fn num_tables(&self) -> usize {
        match self.tables {
            Scope::Global => 1,
            Scope::Local => self.btb_size,
        }
    }

    /// Bitmask covering a history register.
    pub fn history_mask(&self) -> u32 { low_mask(self.history_bits) }

    /// Bitmask covering a BTB tag.
    pub fn tag_mask(&self) -> u32 { low_mask(self.tag_bits) }

    /// Mask selecting a BTB slot, `btb_size - 1`.
    ///
    /// Only a contiguous low mask when `btb_size` is a power of two.
    pub fn index_mask(&self) -> u32 {
        u32::try_from(self.btb_size.saturating_sub(1)).unwrap_or(u32::MAX)
    }

    /// Reject configurations that cannot be represented with 32-bit
    /// addresses.
    pub fn validate(&self) -> Result<(), PredictorError> {
        if self.btb_size == 0 {
            return Err(PredictorError::Config(
                "BTB must have at least one entry".to_string()
            ));
        }
        if self.history_bits > MAX_HISTORY_BITS {
            return Err(PredictorError::Config(format!(
                "history length {} exceeds the maximum of {} bits",
                self.history_bits, MAX_HISTORY_BITS
            )));
        }
        if self.index_bits() + self.tag_bits > ADDR_BITS {
            return Err(PredictorError::Config(format!(
                "{} index bits and {} tag bits exceed {} address bits",
                self.index_bits(), self.tag_bits, ADDR_BITS
            )));
        }
        Ok(())
    }
}

/// Return a mask with the low `bits` bits set.
pub(crate) fn low_mask(bits: usize) -> u32 {
    if bits >= 32 { u32::MAX } else { (1u32 << bits) - 1 }
}

fn parse_scope(tok: &str, global: &str, local: &str) -> Result<Scope, String> {
    if tok == global {
        Ok(Scope::Global)
    } else if tok == local {
        Ok(Scope::Local)
    } else {
        Err(format!("expected '{}' or '{}', found '{}'", global, local, tok))
    }
}

fn parse_field(tok: Option<&str>, name: &str) -> Result<usize, String> {
    let tok = tok.ok_or_else(|| format!("missing {}", name))?;
    tok.parse::<usize>()
        .map_err(|e| format!("bad {} '{}': {}", name, tok, e))
}

impl FromStr for PredictorConfig {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut toks = s.split_whitespace();
        let btb_size = parse_field(toks.next(), "BTB size")?;
        let history_bits = parse_field(toks.next(), "history size")?;
        let tag_bits = parse_field(toks.next(), "tag size")?;
        let fsm_init = toks.next()
            .ok_or_else(|| "missing FSM state".to_string())?
            .parse::<FsmState>()?;
        let history = parse_scope(
            toks.next().ok_or_else(|| "missing history scope".to_string())?,
            "GlobalHist", "LocalHist"
        )?;
        let tables = parse_scope(
            toks.next().ok_or_else(|| "missing table scope".to_string())?,
            "GlobalTables", "LocalTables"
        )?;
        let share = match toks.next() {
            Some(tok) => tok.parse::<ShareMode>()?,
            None => ShareMode::None,
        };
        if let Some(extra) = toks.next() {
            return Err(format!("unexpected token '{}'", extra));
        }
        Ok(Self { btb_size, history_bits, tag_bits, fsm_init, history, tables, share })
    }
}
