//! Command-line front end: evaluate a CH-benCHmark raw output file

use anyhow::{Context, Result};
use chbench_common::{AnalysisConfig, ConfigSource};
use chbench_metrics::{Evaluation, EvaluationOptions, GeometricMeanPolicy, NormFactorInput, ScaleFactor};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chbench-evaluate")]
#[command(about = "Analyse the raw output of a CH-benCHmark run and compute its metrics")]
#[command(version)]
#[command(after_help = "The report is printed to stdout. Errors are printed to stderr and exit with status 1.")]
struct Cli {
    /// Raw timing log written by the benchmark driver
    input: PathBuf,

    /// Scale factor of the initial dataset; switches to divisive normalization
    scale_factor: Option<ScaleFactor>,

    /// Write latency and throughput series for plotting
    #[arg(long)]
    plot: bool,

    /// Directory for plot data
    #[arg(long, default_value = "plots")]
    plot_dir: PathBuf,

    /// JSON or TOML file overriding the normalization factors
    #[arg(long, env = "CHBENCH_NORM_FACTORS")]
    norm_factors: Option<PathBuf>,

    /// TOML file with analysis settings
    #[arg(short, long, env = "CHBENCH_CONFIG")]
    config: Option<PathBuf>,

    /// Also write the metrics as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Fail instead of reporting a geometric mean over non-positive latencies
    #[arg(long)]
    strict: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: Cli) -> Result<()> {
    let options = build_options(&cli)?;
    let evaluation = Evaluation::from_file(&cli.input, &options)
        .with_context(|| format!("Could not evaluate {}", cli.input.display()))?;

    println!("{}", evaluation.report());

    if let Some(path) = &cli.json {
        evaluation
            .json_report()
            .with_source(cli.input.display().to_string())
            .write_to_file(path)
            .with_context(|| format!("Could not write JSON report to {}", path.display()))?;
        info!("Metrics written to {}", path.display());
    }

    if cli.plot {
        println!("Writing OLAP latency and throughput plot data to {}", cli.plot_dir.display());
        // Plotting is best effort; the report above is already complete.
        match evaluation.plot_data().and_then(|plot| plot.write_to_dir(&cli.plot_dir)) {
            Ok(files) => {
                for file in files {
                    println!("  {}", file.display());
                }
            }
            Err(e) => warn!("Skipping plot output: {}", e),
        }
    }

    Ok(())
}

fn build_options(cli: &Cli) -> Result<EvaluationOptions> {
    let config = match &cli.config {
        Some(path) => chbench_common::load_config(ConfigSource::File(path.clone()))
            .with_context(|| format!("Could not load configuration from {}", path.display()))?,
        None => AnalysisConfig::default(),
    }
    .apply_env()
    .context("Invalid environment configuration")?;

    let factors = match &cli.norm_factors {
        Some(path) => NormFactorInput::from_file(path)
            .with_context(|| format!("Could not read normalization factors from {}", path.display()))?,
        None => NormFactorInput::None,
    };

    let policy = if cli.strict {
        GeometricMeanPolicy::Strict
    } else {
        GeometricMeanPolicy::Permissive
    };

    Ok(EvaluationOptions {
        config,
        factors,
        scale_factor: cli.scale_factor,
        policy,
    })
}
