// model invocation - runs `gh models run <model> <prompt>` with context on stdin

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::InvokeError;

/// how long a killed command's pipes get to drain before reading stops
const PIPE_GRACE: Duration = Duration::from_millis(200);

/// what the model command produced by the time it exited or was killed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// killed at the timeout; `stdout` holds whatever arrived before that
    pub timed_out: bool,
}

/// anything that can answer a prompt for a model identifier
#[allow(async_fn_in_trait)]
pub trait ModelInvoker {
    async fn invoke(
        &self,
        model: &str,
        prompt: &str,
        context: &str,
    ) -> Result<ModelOutput, InvokeError>;
}

/// the `gh models run` extension, or any command with the same calling convention
#[derive(Debug, Clone)]
pub struct GhModels {
    program: String,
    base_args: Vec<String>,
    timeout: Option<Duration>,
}

impl GhModels {
    /// `timeout = None` waits for the command indefinitely
    pub fn new(program: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self::with_args(program, ["models", "run"], timeout)
    }

    /// model and prompt are appended after `base_args`
    pub fn with_args<I, S>(program: impl Into<String>, base_args: I, timeout: Option<Duration>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            base_args: base_args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl ModelInvoker for GhModels {
    async fn invoke(
        &self,
        model: &str,
        prompt: &str,
        context: &str,
    ) -> Result<ModelOutput, InvokeError> {
        debug!(program = %self.program, model, "spawning model command");

        let mut child = Command::new(&self.program)
            .args(&self.base_args)
            .arg(model)
            .arg(prompt)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| InvokeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // feed stdin from its own task so a chatty command cannot deadlock on a full pipe
        let stdin = child.stdin.take();
        let context = context.to_owned();
        let writer = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(context.as_bytes()).await {
                    debug!("model command closed stdin early: {e}");
                }
            }
        });
        let (stdout, mut stdout_reader) = capture(child.stdout.take());
        let (stderr, mut stderr_reader) = capture(child.stderr.take());

        let status = match self.timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, child.wait()).await;
                match waited {
                    Ok(status) => Some(status?),
                    Err(_) => {
                        debug!(model, ?limit, "model command timed out, killing it");
                        if let Err(e) = child.kill().await {
                            debug!("failed to kill model command: {e}");
                        }
                        None
                    }
                }
            }
            None => Some(child.wait().await?),
        };

        match status {
            Some(status) => {
                let _ = writer.await;
                let _ = stdout_reader.await;
                let _ = stderr_reader.await;
                Ok(ModelOutput {
                    success: status.success(),
                    exit_code: status.code(),
                    stdout: captured_text(&stdout),
                    stderr: captured_text(&stderr),
                    timed_out: false,
                })
            }
            None => {
                writer.abort();
                // a killed command can leave grandchildren holding the pipes open
                for reader in [&mut stdout_reader, &mut stderr_reader] {
                    if tokio::time::timeout(PIPE_GRACE, &mut *reader).await.is_err() {
                        reader.abort();
                    }
                }
                Ok(ModelOutput {
                    success: false,
                    exit_code: None,
                    stdout: captured_text(&stdout),
                    stderr: captured_text(&stderr),
                    timed_out: true,
                })
            }
        }
    }
}

/// bytes read so far from one of the child's pipes
type Captured = Arc<Mutex<Vec<u8>>>;

/// read a pipe to its end in the background, keeping every chunk as it arrives
fn capture<R>(pipe: Option<R>) -> (Captured, JoinHandle<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let captured = Captured::default();
    let sink = Arc::clone(&captured);
    let reader = tokio::spawn(async move {
        let Some(mut pipe) = pipe else { return };
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    if let Ok(mut buf) = sink.lock() {
                        buf.extend_from_slice(&chunk[..n]);
                    }
                }
                Err(e) => {
                    debug!("model command pipe closed: {e}");
                    break;
                }
            }
        }
    });
    (captured, reader)
}

fn captured_text(captured: &Captured) -> String {
    captured
        .lock()
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

/// make sure the gh binary can be found before doing any work
pub fn check_gh_available(program: &str) -> Result<PathBuf> {
    which::which(program).with_context(|| {
        format!("'{program}' not found on PATH; install the GitHub CLI and run `gh extension install github/gh-models`")
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str, timeout: Option<Duration>) -> GhModels {
        // `sh -c script sh <model> <prompt>` puts model in $1 and prompt in $2
        GhModels::with_args("sh", ["-c", script, "sh"], timeout)
    }

    #[tokio::test]
    async fn passes_model_prompt_and_stdin() {
        let invoker = shell(r#"printf '%s|%s|' "$1" "$2"; cat"#, Some(Duration::from_secs(10)));
        let output = invoker.invoke("test/model", "the prompt", "the context").await.unwrap();
        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout, "test/model|the prompt|the context");
    }

    #[tokio::test]
    async fn non_zero_exit_keeps_output() {
        let invoker = shell("printf partial; echo oops >&2; exit 3", Some(Duration::from_secs(10)));
        let output = invoker.invoke("m", "p", "c").await.unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, "partial");
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let invoker = shell("sleep 5", Some(Duration::from_millis(100)));
        let started = std::time::Instant::now();
        let output = invoker.invoke("m", "p", "c").await.unwrap();
        assert!(output.timed_out);
        assert!(!output.success);
        assert_eq!(output.exit_code, None);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn timeout_keeps_output_written_so_far() {
        let invoker = shell("printf partial; sleep 5", Some(Duration::from_millis(500)));
        let output = invoker.invoke("m", "p", "c").await.unwrap();
        assert!(output.timed_out);
        assert!(!output.success);
        assert_eq!(output.stdout, "partial");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let invoker = GhModels::new("/nonexistent/gh-binary", None);
        let err = invoker.invoke("m", "p", "c").await.unwrap_err();
        assert!(matches!(err, InvokeError::Spawn { .. }));
    }

    #[test]
    fn missing_gh_is_reported() {
        assert!(check_gh_available("definitely-not-a-real-gh-binary").is_err());
    }
}
