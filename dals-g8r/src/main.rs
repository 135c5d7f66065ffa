// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use clap::Parser;

use dals_g8r::aig::dce::dce;
use dals_g8r::aig::gate::GateFn;
use dals_g8r::aig_sim::ErrorMetric;
use dals_g8r::dals::{Dals, DalsOptions};
use dals_g8r::timing::DelayModel;

/// Trades accuracy for delay: approximates the critical paths of a gate-level
/// circuit until the sampled output error reaches a bound.
#[derive(Parser, Debug)]
struct Args {
    /// Path to the input circuit in g8r text form.
    input: String,

    /// Stop once the measured error reaches this value.
    #[arg(long, default_value_t = 0.15)]
    error_constraint: f64,

    /// Number of 64-pattern words simulated per input bit.
    #[arg(long, default_value_t = 10_000)]
    sample_words: usize,

    /// Estimated-best substitutes per node refined by exact simulation.
    #[arg(long, default_value_t = 3)]
    top_k: usize,

    /// Upper bound on the number of rounds.
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Seed for the random input patterns.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, value_enum, default_value_t = ErrorMetric::BitFlip)]
    error_metric: ErrorMetric,

    #[arg(long, default_value_t = 1)]
    and_delay: u32,

    #[arg(long, default_value_t = 1)]
    inv_delay: u32,

    /// Where to write the approximated circuit.
    #[arg(long, default_value = "output.g8r")]
    output: String,

    /// Remove nodes no output reaches before writing.
    #[arg(long, default_value_t = false)]
    #[arg(action = clap::ArgAction::Set)]
    dce: bool,

    /// Write the per-round report as JSON to this path.
    #[arg(long)]
    report_json: Option<String>,
}

fn main() -> Result<()> {
    let _ = env_logger::builder().try_init();
    let args = Args::parse();

    let options = DalsOptions {
        error_constraint: args.error_constraint,
        sample_words: args.sample_words,
        top_k: args.top_k,
        seed: args.seed,
        delay_model: DelayModel {
            and2: args.and_delay,
            inv: args.inv_delay,
        },
        error_metric: args.error_metric,
        max_rounds: args.max_rounds,
    };

    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input))?;
    let circuit =
        GateFn::from_str(&text).with_context(|| format!("parsing {}", args.input))?;

    let mut dals = Dals::new(&circuit, options)?;
    let summary = dals.run()?;

    let mut result = dals.into_working();
    if args.dce {
        result = dce(&result);
    }
    std::fs::write(&args.output, result.to_string())
        .with_context(|| format!("writing {}", args.output))?;

    if let Some(path) = &args.report_json {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path))?;
    }

    println!(
        "rounds: {}, stop: {:?}, error: {:.6}, delay: {} -> {}, gates: {} -> {}",
        summary.rounds.len(),
        summary.stop_reason,
        summary.final_error,
        summary.golden_delay,
        summary.final_delay,
        summary.golden_gate_count,
        summary.final_gate_count
    );
    Ok(())
}
