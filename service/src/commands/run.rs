use crate::observer::PushingObserver;
use crate::signal::shutdown_signal;
use crate::supervisor::{ConfigSupervisor, SupervisorOptions};
use acquisition::{AcquisitionWorker, create_connector};
use anyhow::{Context, Result};
use clap::Args;
use config::ServiceSettings;
use pusher::{DataPusher, PusherConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Args)]
pub struct RunArgs {
    /// Acquisition CSV, overrides the settings
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<PathBuf>,
}

/// Wire the connector, the pusher and the worker described by `settings`.
pub fn build_worker(settings: &ServiceSettings) -> Result<AcquisitionWorker> {
    let connector = create_connector(settings.source.kind, settings.source.request_timeout())
        .context("Cannot create the source connector")?;
    let pusher = DataPusher::new(PusherConfig::from(&settings.pusher))
        .context("Cannot create the data pusher")?;
    let observer = Arc::new(PushingObserver::new(Arc::new(pusher)));

    Ok(AcquisitionWorker::new(connector, observer)
        .keep_bad_values(settings.acquisition.keep_bad_values))
}

pub async fn run(mut settings: ServiceSettings, args: RunArgs) -> Result<()> {
    if let Some(path) = args.config_file {
        settings.acquisition.config_file = path;
    }

    let worker = build_worker(&settings)?;
    let supervisor = ConfigSupervisor::new(SupervisorOptions::from_settings(&settings), worker);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });

    info!(
        version = env!("CARGO_PKG_VERSION"),
        source_kind = %settings.source.kind,
        "Tag Bridge starting"
    );
    supervisor.run(cancel).await?;
    info!("Tag Bridge stopped");
    Ok(())
}
