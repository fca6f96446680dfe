// model-bench: latency and estimated cost of gh models, one csv row per trial
use gh_commit_core::bench::{BenchArgs, run_benchmark};
use gh_commit_core::{Parser, dotenv, init_logging, style};

#[tokio::main]
async fn main() {
    // .env has to be loaded before clap reads RUNS, UNIT_PRICE, ...
    dotenv().ok();
    let args = BenchArgs::parse();
    init_logging(args.verbose);

    if let Err(e) = run_benchmark(args).await {
        eprintln!(
            "{} {} {}",
            style("❌"),
            style("model-bench failed:").red().bold(),
            style(format!("{e:#}")).red()
        );
        std::process::exit(1);
    }
}
