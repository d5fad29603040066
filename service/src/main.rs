use anyhow::Result;
use clap::Parser;
use service::commands::{self, Cli, Commands};
use service::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = config::resolve_settings(cli.settings.as_deref())?;
    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&settings.observability.logging_level);
    init_logging(level);

    match cli.command {
        Commands::Run(args) => commands::run::run(settings, args).await,
        Commands::Push(args) => commands::push::run(settings, args).await.map(|_| ()),
        Commands::Browse(args) => commands::browse::run(&settings, args).await.map(|_| ()),
        Commands::Check(args) => commands::check::run(&settings, args).map(|_| ()),
    }
}
