pub mod browse;
pub mod check;
pub mod push;
pub mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tagbridge",
    author,
    version,
    about = "Tag Bridge - polls plant data sources and pushes tag values to the ingestion endpoint",
    long_about = "Reads the acquisition CSV, polls every item group on its own cadence and pushes \
                  the values.\n\nThe acquisition CSV is watched: editing it restarts acquisition, \
                  deleting it stops acquisition."
)]
pub struct Cli {
    /// Settings file (.toml, .yaml or .yml)
    #[arg(long, env = "TB_SETTINGS", global = true)]
    pub settings: Option<PathBuf>,

    /// Logging level, overridden by RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run acquisition until interrupted")]
    Run(run::RunArgs),

    #[command(about = "Push a single value and exit (acquisition disabled)")]
    Push(push::PushArgs),

    #[command(about = "List the items exposed by a source")]
    Browse(browse::BrowseArgs),

    #[command(about = "Validate the acquisition configuration and print it")]
    Check(check::CheckArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_push() {
        let cli = Cli::try_parse_from([
            "tagbridge",
            "--log-level",
            "debug",
            "push",
            "--variable-id",
            "42",
            "--value",
            "-1.5",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Push(args) => {
                assert_eq!(args.variable_id, 42);
                assert_eq!(args.value, -1.5);
            }
            _ => panic!("Expected push command"),
        }
    }

    #[test]
    fn test_parse_check_with_path() {
        let cli = Cli::try_parse_from(["tagbridge", "check", "tags.csv"]).unwrap();
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.config_file, Some(PathBuf::from("tags.csv")));
            }
            _ => panic!("Expected check command"),
        }
    }
}
