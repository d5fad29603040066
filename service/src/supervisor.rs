//! # Configuration Supervisor
//!
//! Keeps exactly one acquisition generation running for the current content
//! of the configuration file.
//!
//! A restart happens only when the SHA-256 of the file differs from the one
//! the running generation was started from. Deleting the file stops
//! acquisition until it reappears.

use crate::error::{SupervisorError, SupervisorResult};
use acquisition::{AcquisitionWorker, StopOutcome, WorkerHandle};
use config::{ConfigReloadEvent, ServiceSettings, load_or_report, watch_config};
use metrics::counter;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use utils::{Fingerprint, RetryPolicy, file_fingerprint};

/// Supervisor parameters.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub config_path: PathBuf,
    pub default_source: String,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
    pub retry: RetryPolicy,
}

impl SupervisorOptions {
    pub fn from_settings(settings: &ServiceSettings) -> Self {
        Self {
            config_path: settings.acquisition.config_file.clone(),
            default_source: settings.source.default_url.clone(),
            start_timeout: settings.acquisition.start_timeout(),
            stop_timeout: settings.acquisition.stop_timeout(),
            retry: RetryPolicy {
                attempts: settings.acquisition.fingerprint_retry_attempts,
                delay: settings.acquisition.fingerprint_retry_delay(),
            },
        }
    }
}

/// What a reload request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A new generation is running.
    Restarted { generation: u64 },
    /// Same content as the running generation.
    Unchanged,
    /// No configuration file; nothing is running.
    Idle,
}

pub struct ConfigSupervisor {
    options: SupervisorOptions,
    worker: AcquisitionWorker,
    current: Option<WorkerHandle>,
    fingerprint: Option<Fingerprint>,
    generation: u64,
}

impl ConfigSupervisor {
    pub fn new(options: SupervisorOptions, worker: AcquisitionWorker) -> Self {
        Self {
            options,
            worker,
            current: None,
            fingerprint: None,
            generation: 0,
        }
    }

    /// Number of generations started so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.fingerprint
    }

    /// Load the configuration and start acquisition regardless of any
    /// previously seen content.
    pub async fn start(&mut self) -> SupervisorResult<ReloadOutcome> {
        self.reload(true).await
    }

    pub async fn handle_event(
        &mut self,
        event: &ConfigReloadEvent,
    ) -> SupervisorResult<ReloadOutcome> {
        match event {
            ConfigReloadEvent::Changed(_) | ConfigReloadEvent::Created(_) => {
                self.reload(false).await
            }
            ConfigReloadEvent::Removed(path) => {
                warn!(path = %path.display(), "Configuration file removed, stopping acquisition");
                self.stop().await;
                Ok(ReloadOutcome::Idle)
            }
            ConfigReloadEvent::Ready => {
                debug!("Configuration watch established");
                Ok(self.steady_outcome())
            }
            ConfigReloadEvent::Error { path, error } => {
                error!(path = %path.display(), error = %error, "Configuration watch failed");
                Ok(self.steady_outcome())
            }
        }
    }

    /// Stop the running generation, if any, and forget its fingerprint.
    pub async fn stop(&mut self) -> Option<StopOutcome> {
        self.fingerprint = None;
        let handle = self.current.take()?;
        let outcome = handle.stop(self.options.stop_timeout).await;
        match outcome {
            StopOutcome::Stopped => info!("Acquisition stopped"),
            StopOutcome::TimedOut => warn!(
                timeout_secs = self.options.stop_timeout.as_secs(),
                "Acquisition did not stop in time"
            ),
        }
        Some(outcome)
    }

    /// Watch the configuration file and follow its changes until `cancel`
    /// fires, then stop acquisition.
    #[instrument(skip_all, fields(path = %self.options.config_path.display()))]
    pub async fn run(mut self, cancel: CancellationToken) -> SupervisorResult<()> {
        let mut events = watch_config(&self.options.config_path).await?;

        if let Err(e) = self.start().await {
            error!(error = %e, "Acquisition could not be started, waiting for a configuration change");
        }

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };
            let Some(event) = event else {
                warn!("Configuration watch ended");
                break;
            };
            if let Err(e) = self.handle_event(&event).await {
                error!(error = %e, "Configuration reload failed");
            }
        }

        self.stop().await;
        Ok(())
    }

    fn steady_outcome(&self) -> ReloadOutcome {
        if self.is_running() {
            ReloadOutcome::Unchanged
        } else {
            ReloadOutcome::Idle
        }
    }

    async fn reload(&mut self, force: bool) -> SupervisorResult<ReloadOutcome> {
        let path = self.options.config_path.clone();

        let fingerprint = match file_fingerprint(&path, &self.options.retry).await {
            Ok(fingerprint) => fingerprint,
            Err(e) if e.is_not_found() => {
                warn!(path = %path.display(), "Configuration file not found, acquisition is idle");
                self.stop().await;
                return Ok(ReloadOutcome::Idle);
            }
            Err(e) => return Err(SupervisorError::Fingerprint(e)),
        };

        if !force && self.fingerprint == Some(fingerprint) {
            debug!(fingerprint = %fingerprint, "Configuration content unchanged");
            return Ok(ReloadOutcome::Unchanged);
        }

        info!(fingerprint = %fingerprint, "Loading acquisition configuration");
        let configuration = load_or_report(&path, &self.options.default_source, |e| {
            error!(path = %path.display(), error = %e, "Invalid acquisition configuration");
        });

        self.stop().await;

        let handle = self
            .worker
            .start(configuration, self.options.start_timeout)
            .await?;
        self.current = Some(handle);
        self.fingerprint = Some(fingerprint);
        self.generation += 1;
        counter!("bridge.config.reloads").increment(1);
        info!(generation = self.generation, "Acquisition started");

        Ok(ReloadOutcome::Restarted {
            generation: self.generation,
        })
    }
}
