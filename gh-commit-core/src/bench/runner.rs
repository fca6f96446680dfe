// trial runner - one sequential pass over models x runs
//
// each trial goes PENDING -> RUNNING -> COMPLETED_OK | COMPLETED_FAIL and
// always ends with exactly one csv row. failures are recorded, never retried.

use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::cost::compute;
use super::pricing::Pricing;
use super::report::ReportEmitter;
use super::tokens::TokenEstimate;
use super::trial::{Trial, TrialStatus};
use crate::ai::invoker::ModelInvoker;
use crate::ai::prompts::{BENCH_CONTEXT, BENCH_PROMPT, input_chars};
use crate::config::BenchConfig;

/// counts for the end-of-run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BenchSummary {
    pub trials: u64,
    pub ok: u64,
    pub failed: u64,
}

impl BenchSummary {
    fn record(&mut self, trial: &Trial) {
        self.trials += 1;
        if trial.is_ok() {
            self.ok += 1;
        } else {
            self.failed += 1;
        }
    }
}

pub struct TrialRunner<'a, I> {
    config: &'a BenchConfig,
    pricing: &'a Pricing,
    invoker: I,
    prompt: &'a str,
    context: &'a str,
}

impl<'a, I: ModelInvoker> TrialRunner<'a, I> {
    pub fn new(config: &'a BenchConfig, pricing: &'a Pricing, invoker: I) -> Self {
        Self {
            config,
            pricing,
            invoker,
            prompt: BENCH_PROMPT,
            context: BENCH_CONTEXT,
        }
    }

    /// replace the fixed benchmark prompt and stdin context
    pub fn with_input(mut self, prompt: &'a str, context: &'a str) -> Self {
        self.prompt = prompt;
        self.context = context;
        self
    }

    /// run every trial in (model, run) order, writing the csv to `out`
    pub async fn run<W: Write>(&self, out: W) -> Result<BenchSummary> {
        let mut emitter = ReportEmitter::new(out, self.pricing.mode());
        emitter
            .write_header()
            .context("failed to write csv header")?;

        let progress = self.progress_bar();
        let mut summary = BenchSummary::default();

        for (model_index, model) in self.config.models.iter().enumerate() {
            for run_index in 1..=self.config.runs {
                if (model_index > 0 || run_index > 1) && !self.config.pause.is_zero() {
                    sleep(self.config.pause).await;
                }
                progress.set_message(format!("{model} run {run_index}"));

                let trial = self.run_trial(model, run_index).await;
                let tokens = TokenEstimate::from_chars(trial.in_chars, trial.out_chars);
                let estimate = self
                    .pricing
                    .resolve(&trial.model)
                    .map(|rate| compute(tokens, rate, self.config.unit_price));

                emitter
                    .write_row(&trial, tokens, estimate.as_ref())
                    .context("failed to write csv row")?;
                summary.record(&trial);
                progress.inc(1);
            }
        }

        progress.finish_and_clear();
        Ok(summary)
    }

    async fn run_trial(&self, model: &str, run_index: u32) -> Trial {
        let in_chars = input_chars(self.prompt, self.context);

        let started = Instant::now();
        let result = self.invoker.invoke(model, self.prompt, self.context).await;
        let elapsed_ms = millis(started.elapsed());

        let (status, out_chars) = match result {
            Ok(output) => {
                let status = if output.success {
                    TrialStatus::Ok
                } else if output.timed_out {
                    warn!(model, run_index, "model command timed out");
                    TrialStatus::Fail
                } else {
                    warn!(
                        model,
                        run_index,
                        exit_code = ?output.exit_code,
                        stderr = %output.stderr.trim(),
                        "model command failed"
                    );
                    TrialStatus::Fail
                };
                (status, output_chars(&output.stdout))
            }
            Err(e) => {
                warn!(model, run_index, "model command failed: {e}");
                (TrialStatus::Fail, 0)
            }
        };

        debug!(model, run_index, elapsed_ms, %status, out_chars, "trial complete");
        Trial {
            model: model.to_string(),
            run_index,
            elapsed_ms,
            status,
            in_chars,
            out_chars,
        }
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.config.progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(self.config.trial_count());
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.blue} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }
}

/// trailing newlines are not part of the answer, as with `$(...)` capture
fn output_chars(stdout: &str) -> usize {
    stdout.trim_end_matches('\n').chars().count()
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
