use crate::output;
use anyhow::Result;
use bridge_core::Configuration;
use clap::Args;
use config::{ServiceSettings, load_configuration};
use std::path::PathBuf;

#[derive(Args)]
pub struct CheckArgs {
    /// Acquisition CSV (defaults to the configured one)
    #[arg(value_name = "PATH")]
    pub config_file: Option<PathBuf>,
}

pub fn run(settings: &ServiceSettings, args: CheckArgs) -> Result<Configuration> {
    let path = args
        .config_file
        .unwrap_or_else(|| settings.acquisition.config_file.clone());

    output::header(&format!("Acquisition configuration {}", path.display()));
    let configuration = match load_configuration(&path, &settings.source.default_url) {
        Ok(configuration) => configuration,
        Err(e) => {
            output::error(&e.to_string());
            return Err(e.into());
        }
    };

    print!("{}", configuration);
    output::success(&format!(
        "{} source(s), {} group(s)",
        configuration.sources().len(),
        configuration.group_count()
    ));
    Ok(configuration)
}
