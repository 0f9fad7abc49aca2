use clap::Parser;
use hubsync::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hubsync::commands::run(Cli::parse()).await
}
