//! Run a [`BtbPredictor`] over a text trace and report statistics.

use std::error::Error;
use std::fs;
use std::path::{ Path, PathBuf };

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bpsim::*;

#[derive(Parser, Debug)]
#[command(about = "Simulate a BTB-based branch predictor over a trace")]
struct Args {
    /// Trace file (configuration header followed by branch records)
    trace: PathBuf,

    /// JSON predictor configuration, overriding the trace header
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also list the N most frequently mispredicted branches
    #[arg(short, long, value_name = "N")]
    worst: Option<usize>,
}

fn load_config(path: &Path) -> TraceResult<PredictorConfig> {
    let text = fs::read_to_string(path)
        .map_err(|e| TraceError::FileReadError(path.to_path_buf(), e))?;
    Ok(serde_json::from_str(&text)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let trace = TextTrace::from_file(&args.trace)?;
    let cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => trace.cfg,
    };
    info!(trace = trace.name(), records = trace.num_entries(), ?cfg, "starting");

    let predictor = BtbPredictor::new(cfg)?;
    let report = Simulator::run(predictor, trace.as_slice());
    println!("{}", report.stats);

    if let Some(n) = args.worst {
        let stat = &report.branches;
        println!("[*] Unique branches: {}", stat.num_unique_branches());
        println!("[*] Global hit rate: {}/{} ({:.2}% correct) ({} misses)",
            stat.global_hits(),
            stat.global_brns(),
            stat.hit_rate() * 100.0,
            stat.global_miss()
        );
        for (pc, data) in stat.get_worst_branches(n) {
            println!("    {:08x}: {:6}/{:6} ({:.4}) H={:.2} {}",
                pc, data.hits, data.occ, data.hit_rate(),
                data.shannon_entropy(), data.recent_pattern(32));
        }
    }
    Ok(())
}
