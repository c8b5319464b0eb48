//! Alsvid Command-Line Interface
//!
//! Compiles an OpenQASM 2.0 program onto a device coupling graph:
//! parses, allocates qubits with the selected allocator, lowers reverse
//! edges, optionally verifies, and emits the rewritten program.
//!
//! ```text
//!            A L S V I D
//!    Qubit Allocation for OpenQASM
//!
//!     "Swift toward the morning sun"
//! ```

use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use alsvid_arch::{ArchGraph, presets};
use alsvid_compile::{AllocatorKind, BmtConfig, CompileSettings, CostConfig, compile};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Alsvid - qubit allocation for OpenQASM programs
#[derive(Parser)]
#[command(name = "alsvid")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input OpenQASM 2.0 file
    #[arg(short, long)]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Target architecture preset (square5, ibmqx2, linear16)
    #[arg(long, conflicts_with = "arch_file")]
    arch: Option<String>,

    /// Target architecture JSON file
    #[arg(long)]
    arch_file: Option<String>,

    /// Allocator key (Q_bmt, Q_sabre, Q_dynprog, Q_greedy)
    #[arg(long, default_value = "Q_bmt")]
    alloc: String,

    /// Gate names preserved by inlining
    #[arg(long, value_delimiter = ',')]
    basis: Vec<String>,

    /// Cost of a swap intrinsic
    #[arg(long, default_value = "7")]
    swap_cost: u32,

    /// Cost of a reverse-CX intrinsic
    #[arg(long, default_value = "4")]
    rev_cost: u32,

    /// Cost of a bridged-CX intrinsic
    #[arg(long, default_value = "10")]
    lcx_cost: u32,

    /// Max children per partial solution (bounded-mapping-tree)
    #[arg(long)]
    bmt_max_children: Option<u32>,

    /// Max partial solutions per step (bounded-mapping-tree)
    #[arg(long)]
    bmt_max_partial: Option<u32>,

    /// Mapping sequences tracebacked from phase 2 (bounded-mapping-tree)
    #[arg(long, default_value = "1")]
    bmt_max_mapseq: u32,

    /// Reorder statements by layer before allocating
    #[arg(long)]
    reorder: bool,

    /// Verify the output against the source
    #[arg(long)]
    verify: bool,

    /// Emit even when verification fails
    #[arg(long)]
    force: bool,

    /// Print collected statistics
    #[arg(long)]
    stats: bool,

    /// Seed for the randomised strategies
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn load_arch(cli: &Cli) -> Result<ArchGraph> {
    if let Some(name) = &cli.arch {
        return presets::by_name(name).ok_or_else(|| {
            anyhow!(
                "unknown architecture '{name}' (known: {})",
                presets::names().join(", ")
            )
        });
    }
    if let Some(path) = &cli.arch_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read architecture file '{path}'"))?;
        return ArchGraph::from_json(&text)
            .with_context(|| format!("failed to parse architecture file '{path}'"));
    }
    bail!("one of --arch or --arch-file is required");
}

fn run(cli: &Cli) -> Result<bool> {
    let arch = load_arch(cli)?;

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read input '{}'", cli.input))?;
    let qmod = alsvid_qasm::parse(&source)
        .with_context(|| format!("failed to parse '{}'", cli.input))?;

    let allocator = AllocatorKind::from_key(&cli.alloc)
        .ok_or_else(|| anyhow!("unknown allocator '{}'", cli.alloc))?;

    tracing::info!(
        input = %cli.input,
        allocator = allocator.key(),
        qubits = arch.size(),
        "compiling"
    );

    let settings = CompileSettings {
        allocator,
        basis: cli.basis.clone(),
        reorder: cli.reorder,
        verify: cli.verify,
        force: cli.force,
        seed: cli.seed,
        costs: CostConfig {
            swap: cli.swap_cost,
            rev: cli.rev_cost,
            lcx: cli.lcx_cost,
        },
        bmt: BmtConfig {
            max_children: cli.bmt_max_children.unwrap_or(u32::MAX),
            max_partial: cli.bmt_max_partial.unwrap_or(u32::MAX),
            max_mapseq: cli.bmt_max_mapseq,
        },
    };

    let out = compile(qmod, &arch, &settings)?;

    if cli.stats {
        eprint!("{}", out.stats);
    }

    let Some(module) = out.module else {
        // Verification failed and --force was off; output is withheld.
        return Ok(false);
    };

    let text = alsvid_qasm::emit(&module);
    match &cli.output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("failed to write output '{path}'"))?,
        None => print!("{text}"),
    }

    if let Some(report) = out.verify {
        if report.ok() {
            eprintln!("{} output verified", style("✓").green().bold());
        }
    }

    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("{} verification failed", style("Error:").red().bold());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{} {e:#}", style("Error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_defaults() {
        let cli = Cli::parse_from(["alsvid", "-i", "in.qasm", "--arch", "square5"]);
        assert_eq!(cli.alloc, "Q_bmt");
        assert_eq!(cli.swap_cost, 7);
        assert_eq!(cli.rev_cost, 4);
        assert_eq!(cli.lcx_cost, 10);
        assert!(!cli.verify);
    }

    #[test]
    fn test_load_arch_preset_and_error() {
        let cli = Cli::parse_from(["alsvid", "-i", "x", "--arch", "square5"]);
        assert!(load_arch(&cli).is_ok());

        let cli = Cli::parse_from(["alsvid", "-i", "x", "--arch", "nope"]);
        assert!(load_arch(&cli).is_err());

        let cli = Cli::parse_from(["alsvid", "-i", "x"]);
        assert!(load_arch(&cli).is_err());
    }
}
