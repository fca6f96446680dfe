use std::io::Write;
use std::path::Path;
use std::time::Duration;

use gh_commit_core::ai::{GhModels, ModelInvoker, ModelOutput};
use gh_commit_core::bench::{BenchSummary, Pricing, PricingMode, TrialRunner};
use gh_commit_core::config::BenchConfig;
use gh_commit_core::error::InvokeError;
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

/// answers every call with the same text, like a well-behaved model
struct FixedAnswer(String);

impl ModelInvoker for FixedAnswer {
    async fn invoke(
        &self,
        _model: &str,
        _prompt: &str,
        _context: &str,
    ) -> Result<ModelOutput, InvokeError> {
        Ok(ModelOutput {
            success: true,
            exit_code: Some(0),
            stdout: format!("{}\n", self.0),
            ..ModelOutput::default()
        })
    }
}

/// starts answering, then gets killed at the timeout
struct TimedOut;

impl ModelInvoker for TimedOut {
    async fn invoke(
        &self,
        _model: &str,
        _prompt: &str,
        _context: &str,
    ) -> Result<ModelOutput, InvokeError> {
        Ok(ModelOutput {
            stdout: "par".to_string(),
            timed_out: true,
            ..ModelOutput::default()
        })
    }
}

fn table_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

fn config(models: &[&str], runs: u32) -> BenchConfig {
    BenchConfig {
        models: models.iter().map(|m| m.to_string()).collect(),
        runs,
        unit_price: 0.00001,
        pause: Duration::ZERO,
        progress: false,
        ..BenchConfig::default()
    }
}

async fn run_csv<I: ModelInvoker>(
    config: &BenchConfig,
    pricing: &Pricing,
    invoker: I,
    prompt: &str,
    context: &str,
) -> (BenchSummary, Vec<String>) {
    let runner = TrialRunner::new(config, pricing, invoker).with_input(prompt, context);
    let mut out = Vec::new();
    let summary = runner.run(&mut out).await.unwrap();
    let lines = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    (summary, lines)
}

/// the Millis column is the only one that changes between identical runs
fn without_millis(line: &str) -> String {
    line.split(',')
        .enumerate()
        .filter(|(i, _)| *i != 2)
        .map(|(_, f)| f)
        .collect::<Vec<_>>()
        .join(",")
}

#[tokio::test]
async fn multiplier_row_matches_worked_example() {
    let multipliers = table_file(
        r#"{"test/model": {"input_multiplier": 1, "output_multiplier": 2, "source": "sku"}}"#,
    );
    let pricing = Pricing::load(None, Some(multipliers.path())).unwrap();
    assert_eq!(pricing.mode(), PricingMode::Multiplier);

    let prompt = "p".repeat(300);
    let context = "c".repeat(100);
    let config = config(&["test/model"], 1);
    let (summary, lines) =
        run_csv(&config, &pricing, FixedAnswer("a".repeat(40)), &prompt, &context).await;

    assert_eq!(summary, BenchSummary { trials: 1, ok: 1, failed: 0 });
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "Model,Run,Millis,Status,InChars,OutChars,EstInTokens,EstOutTokens,\
         InputMult,OutputMult,UnitPrice,TokenUnits,EstCostUSD"
    );

    let fields: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(fields.len(), 13);
    assert!(fields[2].parse::<u64>().is_ok());
    assert_eq!(
        without_millis(&lines[1]),
        "test/model,1,OK,400,40,100,10,1,2,0.00001,120.000000,0.001200"
    );
}

#[tokio::test]
async fn identical_inputs_give_identical_reports() {
    let provider = table_file(
        r#"{"a/model": {"in_per_1k": 0.1, "out_per_1k": 0.4, "source": "list"}}"#,
    );
    let pricing = Pricing::load(Some(provider.path()), None).unwrap();
    let config = config(&["a/model", "b/model"], 2);

    let (_, first) = run_csv(&config, &pricing, FixedAnswer("answer".into()), "prompt", "diff").await;
    let (_, second) = run_csv(&config, &pricing, FixedAnswer("answer".into()), "prompt", "diff").await;

    assert_eq!(first.len(), 5);
    assert_eq!(
        first.iter().map(|l| without_millis(l)).collect::<Vec<_>>(),
        second.iter().map(|l| without_millis(l)).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn provider_table_wins_and_unknown_models_stay_blank() {
    let provider = table_file(
        r#"{"a/model": {"in_per_1k": "0.1", "out_per_1k": 0.4, "source": "list"}}"#,
    );
    let multipliers = table_file(
        r#"{"a/model": {"input_multiplier": 1, "output_multiplier": 4, "source": "sku"}}"#,
    );
    let pricing = Pricing::load(Some(provider.path()), Some(multipliers.path())).unwrap();
    let config = config(&["a/model", "z/unpriced"], 1);

    let (_, lines) = run_csv(
        &config,
        &pricing,
        FixedAnswer("x".repeat(200)),
        &"p".repeat(200),
        &"c".repeat(200),
    )
    .await;

    assert!(lines[0].ends_with(",PriceInPer1k,PriceOutPer1k,EstCostUSD"));
    // 100 input tokens at 0.1/1k plus 50 output tokens at 0.4/1k
    assert_eq!(
        without_millis(&lines[1]),
        "a/model,1,OK,400,200,100,50,0.1,0.4,0.030000"
    );
    assert_eq!(without_millis(&lines[2]), "z/unpriced,1,OK,400,200,100,50,,,");
}

#[tokio::test]
async fn failed_trials_still_produce_rows() {
    let pricing = Pricing::None;
    let config = config(&["slow/model"], 2);
    let (summary, lines) = run_csv(&config, &pricing, TimedOut, "abc", "").await;

    assert_eq!(summary, BenchSummary { trials: 2, ok: 0, failed: 2 });
    assert_eq!(lines[0], "Model,Run,Millis,Status,InChars,OutChars,EstInTokens,EstOutTokens");
    assert_eq!(without_millis(&lines[1]), "slow/model,1,FAIL,3,3,1,1");
    assert_eq!(without_millis(&lines[2]), "slow/model,2,FAIL,3,3,1,1");
}

#[cfg(unix)]
#[tokio::test]
async fn timed_out_command_reports_partial_output() {
    let pricing = Pricing::None;
    let config = config(&["m"], 1);
    // `sh -c script sh <model> <prompt>`
    let invoker = GhModels::with_args(
        "sh",
        ["-c", "printf partial; sleep 5", "sh"],
        Some(Duration::from_millis(500)),
    );
    let (summary, lines) = run_csv(&config, &pricing, invoker, "p", "c").await;

    assert_eq!(summary, BenchSummary { trials: 1, ok: 0, failed: 1 });
    assert_eq!(without_millis(&lines[1]), "m,1,FAIL,2,7,1,2");
}

#[test]
fn missing_tables_disable_cost_columns() {
    let pricing = Pricing::load(
        Some(Path::new("/nonexistent/provider.json")),
        Some(Path::new("/nonexistent/multipliers.json")),
    )
    .unwrap();
    assert_eq!(pricing.mode(), PricingMode::None);
}
