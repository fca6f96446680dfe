// ai module - everything that talks to or about `gh models`

pub mod invoker;
pub mod prompts;
pub mod response;

// re-export key public items for convenient access
pub use invoker::{GhModels, ModelInvoker, ModelOutput, check_gh_available};
pub use prompts::{BENCH_CONTEXT, BENCH_PROMPT, COMMIT_PROMPT, build_commit_context};
pub use response::{CommitMessage, parse_commit_message};
