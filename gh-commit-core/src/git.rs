use anyhow::{Context, Result};
use encoding_rs::UTF_8;
use git2::{Diff, DiffFormat, DiffOptions, Repository};
use tracing::debug;

/// default cap on the patch text sent to the model
pub const DEFAULT_MAX_DIFF_BYTES: usize = 60_000;

/// staged changes as the model sees them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedDiff {
    pub files: Vec<String>,
    pub patch: String,
    /// true when `patch` was cut at the byte limit
    pub truncated: bool,
}

/// diff between HEAD and the index; a repository without commits diffs against the empty tree
fn staged_diff(repo: &Repository) -> Result<Diff<'_>> {
    let head_tree = match repo.head() {
        Ok(head) => Some(head.peel_to_tree().context("failed to read HEAD tree")?),
        Err(_) => None,
    };

    let mut diff_opts = DiffOptions::new();
    diff_opts.show_binary(false);

    repo.diff_tree_to_index(head_tree.as_ref(), None, Some(&mut diff_opts))
        .context("failed to diff HEAD against the index")
}

fn open_repo(repo_path: &str) -> Result<Repository> {
    Repository::discover(repo_path).context("failed to open git repository")
}

/// check if there are any staged changes in the repository
pub fn has_staged_changes(repo_path: &str) -> Result<bool> {
    let repo = open_repo(repo_path)?;
    let diff = staged_diff(&repo)?;
    Ok(diff.deltas().len() > 0)
}

/// get a list of staged files for display
pub fn get_staged_files(repo_path: &str) -> Result<Vec<String>> {
    let repo = open_repo(repo_path)?;
    let diff = staged_diff(&repo)?;
    Ok(delta_paths(&diff))
}

fn delta_paths(diff: &Diff<'_>) -> Vec<String> {
    diff.deltas()
        .filter_map(|delta| {
            delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(|path| path.to_string_lossy().to_string())
        })
        .collect()
}

/// collect the staged patch, cut at `max_bytes` on a character boundary
pub fn get_staged_diff(repo_path: &str, max_bytes: usize) -> Result<StagedDiff> {
    let repo = open_repo(repo_path)?;
    let diff = staged_diff(&repo)?;

    let files = delta_paths(&diff);
    if files.is_empty() {
        return Err(anyhow::anyhow!(
            "no staged changes found; stage files with `git add` first"
        ));
    }

    let mut patch = String::new();
    diff.print(DiffFormat::Patch, |delta, _, line| {
        if delta.new_file().is_binary() || delta.old_file().is_binary() {
            return true;
        }
        // keep reading once full; returning false would abort the walk with an error
        if patch.len() > max_bytes {
            return true;
        }
        if matches!(line.origin(), '+' | '-' | ' ') {
            patch.push(line.origin());
        }
        patch.push_str(&decode_line_content(line.content()));
        true
    })
    .context("failed to render staged diff")?;

    let truncated = patch.len() > max_bytes;
    if truncated {
        let mut end = max_bytes;
        while end > 0 && !patch.is_char_boundary(end) {
            end -= 1;
        }
        patch.truncate(end);
    }

    debug!(files = files.len(), bytes = patch.len(), truncated, "collected staged diff");
    Ok(StagedDiff {
        files,
        patch,
        truncated,
    })
}

/// decode line content as utf-8, falling back to lossy conversion
fn decode_line_content(content: &[u8]) -> String {
    let (cow, had_errors) = UTF_8.decode_without_bom_handling(content);
    if had_errors {
        String::from_utf8_lossy(content).to_string()
    } else {
        cow.into_owned()
    }
}
