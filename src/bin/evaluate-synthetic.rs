//! Sweep [`BtbPredictor`] configurations over a synthetic trace.

use std::error::Error;

use clap::Parser;
use itertools::iproduct;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bpsim::*;
use bpsim::assembler::*;

#[derive(Parser, Debug)]
#[command(about = "Evaluate predictor configurations on a synthetic trace")]
struct Args {
    /// Seed for randomly-behaving branches
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of branch records to generate
    #[arg(long, default_value_t = 100_000)]
    records: usize,

    /// Number of BTB entries
    #[arg(long, default_value_t = 16)]
    btb_size: usize,
}

/// Build a program with a mix of loops, correlated branches, an indirect
/// jump, and a few noisy branches.
fn build_trace(seed: u64, records: usize) -> TraceResult<SyntheticTrace> {
    let mut asm = TraceAssembler::new(0x0040_0000, seed);
    let top = asm.create_label();
    let inner = asm.create_label();
    let skip = asm.create_label();
    let a = asm.create_label();
    let b = asm.create_label();

    asm.bind_label(top)?;
    asm.bind_label(inner)?;
    asm.pad(0x20);
    asm.branch_to_label(inner, BranchPattern::NotTakenPeriodic(7))?;
    asm.branch_to_label(skip, BranchPattern::Pattern(vec![
        Outcome::T, Outcome::T, Outcome::N,
    ]))?;
    asm.pad(0x10);
    asm.bind_label(skip)?;
    asm.branch_to_label(skip, BranchPattern::Random(0.1))?;
    asm.jump_indirect(&[a, b])?;
    asm.pad_align(0x1_0000)?;
    asm.bind_label(a)?;
    asm.branch_to_label(top, BranchPattern::TakenPeriodic(3))?;
    asm.jump_to_label(top);
    asm.pad_align(0x1_0000)?;
    asm.bind_label(b)?;
    asm.jump_to_label(top);
    asm.compile(records)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let trace = build_trace(args.seed, args.records)?;
    info!(records = trace.num_entries(), seed = args.seed, "built trace");

    let scopes = [Scope::Global, Scope::Local];
    let shares = [ShareMode::None, ShareMode::Lsb, ShareMode::Mid];
    let configs = iproduct!(1..=8usize, scopes, scopes, shares)
        // Sharing only makes sense with a global table
        .filter(|(_, _, tables, share)| {
            *tables == Scope::Global || *share == ShareMode::None
        });

    for (history_bits, history, tables, share) in configs {
        let cfg = PredictorConfig {
            btb_size: args.btb_size,
            history_bits,
            tag_bits: 16,
            fsm_init: FsmState::WeaklyNotTaken,
            history,
            tables,
            share,
        };
        let report = Simulator::run(BtbPredictor::new(cfg)?, trace.as_slice());
        println!("  hist={} {:6} hist, {:6} tables, share={:4} {:8}b  {:.2}% flushed ({})",
            history_bits,
            format!("{:?}", history),
            format!("{:?}", tables),
            format!("{:?}", share),
            report.stats.size,
            report.stats.flush_rate() * 100.0,
            report.stats,
        );
    }
    Ok(())
}
