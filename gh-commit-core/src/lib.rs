// gh-commit-core/src/lib.rs

// declare modules
pub mod ai;
pub mod bench;
pub mod config;
pub mod error;
pub mod git;
pub mod logging;

// re-export key structs/functions for the binaries
pub use anyhow::{Context, Result};
pub use clap::Parser;
pub use console::style;
pub use dialoguer::{Select, theme::ColorfulTheme};
pub use dotenv::dotenv;
pub use indicatif::{ProgressBar, ProgressStyle};

pub use crate::ai::{CommitMessage, GhModels, ModelInvoker, check_gh_available, parse_commit_message};
pub use crate::config::{BenchConfig, CommitConfig, CommitOverrides, FileConfig};
pub use crate::git::{StagedDiff, get_staged_diff, get_staged_files, has_staged_changes};
pub use crate::logging::init_logging;

use std::path::PathBuf;
use std::process::Command as StdCommand;
use std::time::Duration;

use tracing::{debug, info};

use crate::ai::prompts::{COMMIT_PROMPT, build_commit_context};

// argument parsing struct, shared by the cli crate
#[derive(Parser, Debug, Clone)]
#[command(name = "gh-commit")]
#[command(about = "write a commit message for the staged changes with gh models", long_about = None)]
pub struct CoreCliArgs {
    /// path to git repository (defaults to current directory)
    #[arg(short, long)]
    pub path: Option<String>,

    /// model identifier passed to `gh models run`
    #[arg(short, long, env = "GH_COMMIT_MODEL")]
    pub model: Option<String>,

    /// maximum bytes of staged diff sent to the model
    #[arg(long)]
    pub max_diff_bytes: Option<usize>,

    /// model timeout in seconds, 0 for none
    #[arg(short, long = "timeout", env = "GH_COMMIT_TIMEOUT")]
    pub timeout_secs: Option<u64>,

    /// gh executable to run
    #[arg(long = "gh", env = "GH_BIN")]
    pub gh_bin: Option<String>,

    /// config file (defaults to ./.gh-commit.toml when present)
    #[arg(short, long, env = "GH_COMMIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// show detailed diff information
    #[arg(short, long)]
    pub verbose: bool,

    /// automatically run the commit command without asking
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// print the message and the git command without committing
    #[arg(long)]
    pub dry_run: bool,
}

impl CoreCliArgs {
    pub fn overrides(&self) -> CommitOverrides {
        CommitOverrides {
            gh_bin: self.gh_bin.clone(),
            model: self.model.clone(),
            max_diff_bytes: self.max_diff_bytes,
            timeout_secs: self.timeout_secs,
        }
    }
}

/// ask the model once and parse its answer
pub async fn generate_commit_message<I: ModelInvoker>(
    invoker: &I,
    model: &str,
    context: &str,
) -> Result<CommitMessage> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("generating commit message with {model}..."));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let result = invoker.invoke(model, COMMIT_PROMPT, context).await;
    spinner.finish_and_clear();

    let output = result.context("failed to run gh models")?;
    if output.timed_out {
        return Err(anyhow::anyhow!(
            "gh models did not answer in time; raise the timeout with --timeout"
        ));
    }
    if !output.success {
        let stderr = output.stderr.trim();
        return Err(anyhow::anyhow!(
            "gh models exited with {}: {}",
            output
                .exit_code
                .map_or_else(|| "a signal".to_string(), |code| format!("status {code}")),
            if stderr.is_empty() { "no error output" } else { stderr }
        ));
    }

    debug!(chars = output.stdout.len(), "raw model response received");
    parse_commit_message(&output.stdout).context("failed to parse the model response")
}

/// the equivalent shell command, for printing
pub fn git_commit_command(message: &CommitMessage) -> String {
    let quoted: Vec<String> = message
        .to_git_args()
        .iter()
        .map(|arg| {
            if arg == "-m" {
                arg.clone()
            } else {
                format!(
                    "\"{}\"",
                    arg.replace('\\', "\\\\")
                        .replace('"', "\\\"")
                        .replace('$', "\\$")
                        .replace('`', "\\`")
                )
            }
        })
        .collect();
    format!("git commit {}", quoted.join(" "))
}

// the commit generation and interaction logic
pub async fn execute_commit_flow(args: CoreCliArgs) -> Result<(CommitMessage, bool)> {
    let repo_path = args.path.clone().unwrap_or_else(|| ".".to_string());

    let file = FileConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let config = CommitConfig::resolve(&file, args.overrides()).context("invalid settings")?;
    check_gh_available(&config.gh_bin)?;

    println!("{}", style("\ngh-commit").cyan().bold());
    println!("{}\n", style("commit messages from gh models").dim());

    if !has_staged_changes(&repo_path).context("failed to check staged changes")? {
        return Err(anyhow::anyhow!(
            "no staged changes found; stage files with `git add` first"
        ));
    }

    let diff = get_staged_diff(&repo_path, config.max_diff_bytes)
        .context("failed to get staged diff")?;

    println!("{}\n", style("staged files:").cyan().bold());
    for file in &diff.files {
        println!("{}", style(format!("  - {file}")).green());
    }
    println!();

    if args.verbose {
        println!(
            "sending {} bytes of diff to {}{}",
            diff.patch.len(),
            config.model,
            if diff.truncated { " (truncated)" } else { "" }
        );
    }

    let context = build_commit_context(&diff);
    let invoker = GhModels::new(config.gh_bin.clone(), config.timeout);

    let mut message = generate_commit_message(&invoker, &config.model, &context).await?;

    println!("\n{}\n", style("✅ generated commit message:").green().bold());
    println!("{}", style(&message).yellow());
    println!();

    if args.dry_run {
        println!("{}", style("--dry-run: not committing").dim());
        return Ok((message, false));
    }

    if !args.yes {
        println!("{}", style("press ctrl+c at any time to exit").dim());

        loop {
            let options = &[
                "yes, commit this message",
                "edit this message",
                "no, regenerate message",
                "cancel",
            ];
            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("what would you like to do?")
                .default(0)
                .items(options)
                .interact()?;

            match selection {
                0 => {
                    println!("{}", style("proceeding with commit...").green());
                    break;
                }
                1 => {
                    let edited = edit::edit(message.to_string())
                        .context("failed to open editor for commit message")?;
                    let edited = CommitMessage::from_plain_text(&edited);
                    if edited.subject.is_empty() || edited == message {
                        println!("{}", style("no changes; using previous message").yellow());
                    } else {
                        message = edited;
                        println!("{}", style("commit message updated").green());
                    }
                    println!("\n{}", style("current commit message:").cyan().bold());
                    println!("{}", style(&message).yellow());
                    println!();
                }
                2 => {
                    println!("\n{}", style("regenerating...").cyan());
                    message = generate_commit_message(&invoker, &config.model, &context)
                        .await
                        .context("failed to regenerate commit message")?;
                    println!("\n{}\n", style("✅ newly generated commit message:").green().bold());
                    println!("{}", style(&message).yellow());
                    println!();
                }
                _ => {
                    println!("{}", style("cancelled, nothing committed").yellow());
                    return Ok((message, false));
                }
            }
        }
    } else {
        println!("{}", style("--yes flag detected, committing the generated message.").green());
    }

    run_git_commit(&repo_path, &message)?;
    info!(subject = %message.subject, "commit created");
    Ok((message, true))
}

fn run_git_commit(repo_path: &str, message: &CommitMessage) -> Result<()> {
    println!("{}", style("executing commit command...").cyan());

    let output = StdCommand::new("git")
        .current_dir(repo_path)
        .arg("commit")
        .args(message.to_git_args())
        .output()
        .context("failed to execute git commit command")?;

    if output.status.success() {
        println!("{}", style("\n✅ commit successful!").green().bold());
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            println!("{stdout}");
        }
        Ok(())
    } else {
        eprintln!("{}", style("\n❌ commit failed:").red().bold());
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            eprintln!("{stderr}");
        }
        Err(anyhow::anyhow!("git commit command failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ModelOutput;
    use crate::error::InvokeError;

    struct FixedInvoker(ModelOutput);

    impl ModelInvoker for FixedInvoker {
        async fn invoke(
            &self,
            _model: &str,
            prompt: &str,
            _context: &str,
        ) -> std::result::Result<ModelOutput, InvokeError> {
            assert_eq!(prompt, COMMIT_PROMPT);
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn generates_message_from_json_answer() {
        let invoker = FixedInvoker(ModelOutput {
            success: true,
            exit_code: Some(0),
            stdout: "{\"subject\": \"feat: add bench\", \"body\": \"Adds a benchmark.\"}\n".to_string(),
            ..ModelOutput::default()
        });
        let message = generate_commit_message(&invoker, "test/model", "diff").await.unwrap();
        assert_eq!(message.subject, "feat: add bench");
        assert_eq!(message.body, "Adds a benchmark.");
    }

    #[tokio::test]
    async fn failed_command_surfaces_stderr() {
        let invoker = FixedInvoker(ModelOutput {
            success: false,
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "unknown model\n".to_string(),
            timed_out: false,
        });
        let err = generate_commit_message(&invoker, "bad/model", "diff").await.unwrap_err();
        let text = format!("{err:#}");
        assert!(text.contains("status 1"));
        assert!(text.contains("unknown model"));
    }

    #[tokio::test]
    async fn timed_out_model_is_an_error() {
        let invoker = FixedInvoker(ModelOutput {
            stdout: "{\"subject\": \"feat: half".to_string(),
            timed_out: true,
            ..ModelOutput::default()
        });
        let err = generate_commit_message(&invoker, "slow/model", "diff").await.unwrap_err();
        assert!(format!("{err:#}").contains("did not answer in time"));
    }

    #[test]
    fn printed_command_escapes_shell_characters() {
        let message = CommitMessage {
            subject: "fix: quote \"$HOME\"".to_string(),
            body: String::new(),
        };
        assert_eq!(
            git_commit_command(&message),
            r#"git commit -m "fix: quote \"\$HOME\"""#
        );
    }
}
