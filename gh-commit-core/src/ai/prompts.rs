// prompt construction - the instruction is fixed, the staged diff goes on stdin

use crate::git::StagedDiff;

/// instruction passed as the prompt argument to `gh models run`
pub const COMMIT_PROMPT: &str = "You write git commit messages. The staged diff is provided on standard input. \
Respond with a single JSON object and nothing else, of the form \
{\"subject\": \"...\", \"body\": \"...\"}. \
The subject is a conventional commit header (type(scope): description), imperative mood, \
at most 72 characters, no trailing period. \
The body explains what changed and why in short wrapped lines, or is an empty string for trivial changes.";

/// the benchmark sends the same instruction on every trial
pub const BENCH_PROMPT: &str = COMMIT_PROMPT;

/// fixed sample diff used as benchmark context so every model sees identical input
pub const BENCH_CONTEXT: &str = r#"staged files:
src/cache.rs

diff --git a/src/cache.rs b/src/cache.rs
--- a/src/cache.rs
+++ b/src/cache.rs
@@ -12,7 +12,11 @@ impl Cache {
     pub fn get(&self, key: &str) -> Option<&Entry> {
-        self.entries.get(key)
+        let entry = self.entries.get(key)?;
+        if entry.is_expired() {
+            return None;
+        }
+        Some(entry)
     }
"#;

/// stdin payload for a commit: the staged file list followed by the patch
pub fn build_commit_context(diff: &StagedDiff) -> String {
    let mut context = String::from("staged files:\n");
    for file in &diff.files {
        context.push_str(file);
        context.push('\n');
    }
    context.push('\n');
    context.push_str(&diff.patch);
    if diff.truncated {
        context.push_str("\n... (diff truncated)\n");
    }
    context
}

/// characters the model receives for one call, prompt and context together
pub fn input_chars(prompt: &str, context: &str) -> usize {
    prompt.chars().count() + context.chars().count()
}
