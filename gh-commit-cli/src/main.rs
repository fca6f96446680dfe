use clap::Parser;
use gh_commit_core::{CoreCliArgs, dotenv, execute_commit_flow, git_commit_command, init_logging, style};

#[tokio::main]
async fn main() {
    dotenv().ok();
    let cli_args = CoreCliArgs::parse();
    init_logging(cli_args.verbose);

    match execute_commit_flow(cli_args).await {
        Ok((message, committed)) => {
            if !committed && !message.subject.is_empty() {
                println!("\n{}", style("✨ ready to commit! ✨").green().bold());
                println!("{}", style("run this command from your terminal:").cyan());
                println!("{}\n", style(git_commit_command(&message)).yellow().bold());
            }
        }
        Err(e) => {
            eprintln!(
                "{} {} {}",
                style("❌"),
                style("gh-commit failed:").red().bold(),
                style(format!("{e:#}")).red()
            );
            std::process::exit(1);
        }
    }
}
