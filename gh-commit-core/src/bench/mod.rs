// bench module - latency and estimated cost of `gh models run` per model, as csv

pub mod cost;
pub mod pricing;
pub mod report;
pub mod runner;
pub mod tokens;
pub mod trial;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use tracing::info;

use crate::ai::invoker::{GhModels, check_gh_available};
use crate::config::{BenchConfig, BenchOverrides, FileConfig};

pub use cost::{CostEstimate, DEFAULT_UNIT_PRICE, compute};
pub use pricing::{MultiplierRate, Pricing, PricingMode, ProviderRate, RateRecord};
pub use report::{ReportEmitter, header, row};
pub use runner::{BenchSummary, TrialRunner};
pub use tokens::{TokenEstimate, estimate_tokens};
pub use trial::{Trial, TrialStatus};

#[derive(Parser, Debug, Clone)]
#[command(name = "model-bench")]
#[command(about = "benchmark gh models latency and estimated cost, csv on stdout", long_about = None)]
pub struct BenchArgs {
    /// model identifiers to benchmark (repeat the flag or separate with commas)
    #[arg(short, long = "model", env = "BENCH_MODELS", value_delimiter = ',')]
    pub models: Vec<String>,

    /// runs per model
    #[arg(short, long, env = "RUNS")]
    pub runs: Option<u32>,

    /// usd per token unit in multiplier mode
    #[arg(long, env = "UNIT_PRICE")]
    pub unit_price: Option<f64>,

    /// json table of provider prices per 1k tokens
    #[arg(long, env = "PROVIDER_PRICING_FILE")]
    pub provider_pricing: Option<PathBuf>,

    /// json table of unified billing multipliers
    #[arg(long, env = "MULTIPLIER_PRICING_FILE")]
    pub multiplier_pricing: Option<PathBuf>,

    /// per-trial timeout in seconds, 0 for none
    #[arg(short, long = "timeout", env = "TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// pause between trials in milliseconds
    #[arg(long, env = "PAUSE_MS")]
    pub pause_ms: Option<u64>,

    /// gh executable to run
    #[arg(long = "gh", env = "GH_BIN")]
    pub gh_bin: Option<String>,

    /// config file (defaults to ./.gh-commit.toml when present)
    #[arg(short, long, env = "GH_COMMIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl BenchArgs {
    pub fn overrides(&self) -> BenchOverrides {
        BenchOverrides {
            gh_bin: self.gh_bin.clone(),
            models: self
                .models
                .iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            runs: self.runs,
            timeout_secs: self.timeout_secs,
            pause_ms: self.pause_ms,
            unit_price: self.unit_price,
            provider_pricing: self.provider_pricing.clone(),
            multiplier_pricing: self.multiplier_pricing.clone(),
            progress: !self.no_progress,
        }
    }
}

/// resolve configuration and rate tables once, then run every trial against `gh`
pub async fn run_benchmark(args: BenchArgs) -> Result<BenchSummary> {
    let file = FileConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let config = BenchConfig::resolve(&file, args.overrides()).context("invalid benchmark settings")?;

    check_gh_available(&config.gh_bin)?;

    let pricing = Pricing::load(
        config.provider_pricing.as_deref(),
        config.multiplier_pricing.as_deref(),
    )
    .context("failed to load rate table")?;

    info!(
        models = config.models.len(),
        runs = config.runs,
        mode = pricing.mode().as_str(),
        "starting benchmark"
    );
    eprintln!(
        "{}",
        style(format!(
            "benchmarking {} model(s) x {} run(s), pricing: {}",
            config.models.len(),
            config.runs,
            pricing.mode().as_str()
        ))
        .cyan()
    );

    let invoker = GhModels::new(config.gh_bin.clone(), config.timeout);
    let runner = TrialRunner::new(&config, &pricing, invoker);
    let summary = runner.run(io::stdout()).await?;

    let line = format!(
        "{} trial(s): {} ok, {} failed",
        summary.trials, summary.ok, summary.failed
    );
    if summary.failed == 0 {
        eprintln!("{}", style(line).green().bold());
    } else {
        eprintln!("{}", style(line).yellow().bold());
    }

    Ok(summary)
}
