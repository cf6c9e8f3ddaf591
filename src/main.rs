//! launchbench CLI - kernel-launch microbenchmark harness

use anyhow::Result;
use clap::Parser;
use launchbench::{HarnessConfig, Orchestrator, PhaseReport};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "launchbench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Number of f32 elements per buffer
    #[arg(long, default_value_t = 1 << 20)]
    elements: usize,

    /// Threads per block for the workload kernel
    #[arg(long, default_value_t = 32)]
    threads_per_block: u32,

    /// Kernel launches per timing mode per phase
    #[arg(long, default_value_t = 1000)]
    iterations: u32,

    /// Module file containing the elementwise-add kernel
    #[arg(long, default_value = "vectoradd.ptx")]
    kernel_module: PathBuf,

    /// Entry point of the elementwise-add kernel
    #[arg(long, default_value = "vectoradd")]
    kernel_entry: String,

    /// Module file containing the no-op kernel
    #[arg(long, default_value = "nop.ptx")]
    noop_module: PathBuf,

    /// Entry point of the no-op kernel
    #[arg(long, default_value = "mynop")]
    noop_entry: String,

    /// CUDA device ordinal
    #[arg(long, default_value_t = 0)]
    device: usize,
}

fn print_phase(kernel: &str, phase: &str, report: &PhaseReport) {
    println!("{} / {}", kernel, phase);
    println!("  pipelined   {}", report.pipelined);
    println!("  synchronous {}", report.synchronous);
    if let Some(verdict) = report.verdict {
        println!(
            "  {}",
            if verdict.passed() { "PASSED" } else { "FAILED" }
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = HarnessConfig {
        element_count: cli.elements,
        threads_per_block: cli.threads_per_block,
        iterations: cli.iterations,
        kernel_module: cli.kernel_module,
        kernel_entry: cli.kernel_entry,
        noop_module: cli.noop_module,
        noop_entry: cli.noop_entry,
        device_id: cli.device,
    };

    let summary = Orchestrator::new(config)?.run()?;

    for report in [&summary.workload, &summary.baseline] {
        print_phase(&report.kernel, "device resident", &report.device_resident);
        print_phase(&report.kernel, "host resident", &report.host_resident);
    }

    if !summary.passed() {
        anyhow::bail!("result validation failed");
    }
    Ok(())
}
