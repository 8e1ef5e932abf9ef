//! Reading branch traces.
//!
//! A text trace starts with a configuration header (see [`crate::config`])
//! followed by one branch per line:
//!
//! ```text
//! # btb history tag fsm history-scope table-scope share
//! 4 2 20 1 GlobalHist GlobalTables using_share_lsb
//! 0x00001000 T 0x00000f00
//! 0x00001008 N 0x00002000
//! ```
//!
//! Addresses may be written in hex (with a `0x` prefix) or decimal.
//! Empty lines and lines starting with `#` are ignored.

pub mod assembler;

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::branch::*;
use crate::config::PredictorConfig;
use crate::error::{ TraceError, TraceResult };

/// A parsed text trace.
#[derive(Clone, Debug)]
pub struct TextTrace {
    /// Configuration taken from the trace header
    pub cfg: PredictorConfig,

    /// Branch records, in program order
    pub data: Vec<BranchRecord>,

    /// The name of this trace
    pub name: String,
}
impl TextTrace {
    /// Read a [`TextTrace`] from a file.
    pub fn from_file(path: impl AsRef<Path>) -> TraceResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| TraceError::FileReadError(path.to_path_buf(), e))?;
        let name = path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut res = Self::parse(&text)?;
        res.name = name;
        debug!(name = %res.name, records = res.data.len(), "loaded trace");
        Ok(res)
    }

    /// Parse a [`TextTrace`] from a string.
    pub fn parse(text: &str) -> TraceResult<Self> {
        let mut lines = text.lines().enumerate()
            .map(|(num, line)| (num + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let (line, header) = lines.next().ok_or(TraceError::MissingHeader)?;
        let cfg = header.parse::<PredictorConfig>()
            .map_err(|msg| TraceError::BadHeader { line, msg })?;

        let data = lines
            .map(|(line, text)| {
                parse_record(text).map_err(|msg| TraceError::BadRecord { line, msg })
            })
            .collect::<TraceResult<Vec<_>>>()?;

        Ok(Self { cfg, data, name: String::new() })
    }

    /// Return the number of records
    pub fn num_entries(&self) -> usize { self.data.len() }

    pub fn name(&self) -> &str { &self.name }

    /// Return a slice of records.
    pub fn as_slice(&self) -> &[BranchRecord] { &self.data }
}

/// Parse an address in hex (`0x` prefix) or decimal.
pub fn parse_addr(s: &str) -> Result<u32, String> {
    let res = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    res.map_err(|e| format!("bad address '{}': {}", s, e))
}

/// Parse a single `<pc> <T|N> <target>` record.
pub fn parse_record(s: &str) -> Result<BranchRecord, String> {
    let mut toks = s.split_whitespace();
    let pc = parse_addr(toks.next().ok_or("missing program counter")?)?;
    let outcome = match toks.next().ok_or("missing outcome")? {
        "T" | "t" => Outcome::T,
        "N" | "n" => Outcome::N,
        x => return Err(format!("bad outcome '{}' (expected T or N)", x)),
    };
    let tgt = parse_addr(toks.next().ok_or("missing target")?)?;
    if let Some(extra) = toks.next() {
        return Err(format!("unexpected token '{}'", extra));
    }
    Ok(BranchRecord { pc, tgt, outcome })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{ Scope, ShareMode };

    const TRACE: &str = "\
# a small trace
2 1 4 2 LocalHist LocalTables not_using_share

0x1000 T 0x0f00
4104 N 0x2000
0x1000 t 0xf00
";

    #[test]
    fn parse_trace() {
        let t = TextTrace::parse(TRACE).unwrap();
        assert_eq!(t.cfg.btb_size, 2);
        assert_eq!(t.cfg.history, Scope::Local);
        assert_eq!(t.cfg.tables, Scope::Local);
        assert_eq!(t.cfg.share, ShareMode::None);
        assert_eq!(t.num_entries(), 3);
        assert_eq!(t.as_slice()[0], BranchRecord::new(0x1000, 0xf00, Outcome::T));
        assert_eq!(t.as_slice()[1], BranchRecord::new(0x1008, 0x2000, Outcome::N));
    }

    #[test]
    fn errors_report_line_numbers() {
        let bad = "1 1 0 2 GlobalHist GlobalTables\n0x0 T 0x4\n0x4 X 0x8\n";
        match TextTrace::parse(bad) {
            Err(TraceError::BadRecord { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result {:?}", other),
        }

        let bad = "\n# comment\n1 1 0 9 GlobalHist GlobalTables\n";
        match TextTrace::parse(bad) {
            Err(TraceError::BadHeader { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result {:?}", other),
        }

        assert!(matches!(TextTrace::parse("# empty\n"),
            Err(TraceError::MissingHeader)));
    }

    #[test]
    fn parse_records() {
        assert_eq!(parse_addr("0xFFFFFFFC"), Ok(0xffff_fffc));
        assert!(parse_addr("0x1_0000_0000").is_err());
        assert!(parse_record("0x10 T").is_err());
        assert!(parse_record("0x10 T 0x20 0x30").is_err());
        assert!(parse_record("pc T 0x20").is_err());
    }
}
