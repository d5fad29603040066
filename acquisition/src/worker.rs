//! Acquisition worker.
//!
//! Runs one configuration generation: a poll loop per group, started one
//! after the other so that many groups do not hit the source at the same
//! instant.

use crate::error::{WorkerError, WorkerResult};
use crate::observer::ReadObserver;
use crate::poll::GroupPoller;
use crate::telemetry::Telemetry;
use bridge_core::{Configuration, SourceConnector};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

const MAX_STAGGER: Duration = Duration::from_secs(30);
const STAGGER_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Delay between two successive group starts: `min(30s, 5min / group_count)`.
pub fn stagger_interval(group_count: usize) -> Duration {
    match u32::try_from(group_count) {
        Ok(0) => MAX_STAGGER,
        Ok(n) => MAX_STAGGER.min(STAGGER_WINDOW / n),
        Err(_) => Duration::ZERO,
    }
}

/// How a stop request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// The timeout elapsed and the remaining tasks were aborted.
    TimedOut,
}

/// Starts acquisition generations.
#[derive(Clone)]
pub struct AcquisitionWorker {
    connector: Arc<dyn SourceConnector>,
    observer: Arc<dyn ReadObserver>,
    keep_bad_values: bool,
}

impl AcquisitionWorker {
    pub fn new(connector: Arc<dyn SourceConnector>, observer: Arc<dyn ReadObserver>) -> Self {
        Self {
            connector,
            observer,
            keep_bad_values: false,
        }
    }

    #[must_use]
    pub fn keep_bad_values(mut self, keep: bool) -> Self {
        self.keep_bad_values = keep;
        self
    }

    /// Start polling every group of `configuration`.
    ///
    /// Returns once the first group has completed its first read, or at once
    /// when there is nothing to poll. Fails if that takes longer than
    /// `start_timeout`; the partially started generation is torn down. The
    /// push of that first read does not count toward the timeout.
    pub async fn start(
        &self,
        configuration: Configuration,
        start_timeout: Duration,
    ) -> WorkerResult<WorkerHandle> {
        let cancel = CancellationToken::new();
        let (ready_tx, ready_rx) = oneshot::channel();

        let task = tokio::spawn(orchestrate(
            configuration,
            self.connector.clone(),
            self.observer.clone(),
            self.keep_bad_values,
            cancel.clone(),
            ready_tx,
        ));

        let handle = WorkerHandle {
            guard: cancel.clone().drop_guard(),
            cancel,
            task,
        };

        match tokio::time::timeout(start_timeout, ready_rx).await {
            Ok(Ok(())) => Ok(handle),
            Ok(Err(_)) => {
                handle.stop(start_timeout).await;
                Err(WorkerError::StartAborted)
            }
            Err(_) => {
                error!(
                    timeout_secs = start_timeout.as_secs(),
                    "The acquisition worker did not start in time"
                );
                handle.abort();
                Err(WorkerError::StartTimeout {
                    timeout: start_timeout,
                })
            }
        }
    }
}

/// A running acquisition generation.
///
/// Dropping the handle cancels the generation without waiting for it.
pub struct WorkerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    guard: DropGuard,
}

impl WorkerHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel every poll loop and wait up to `timeout` for them to end.
    ///
    /// Never fails: a generation that does not stop in time is aborted.
    pub async fn stop(self, timeout: Duration) -> StopOutcome {
        let WorkerHandle {
            cancel,
            mut task,
            guard,
        } = self;
        cancel.cancel();
        let _ = guard.disarm();

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(())) => StopOutcome::Stopped,
            Ok(Err(e)) => {
                warn!(error = %e, "Acquisition task ended abnormally");
                StopOutcome::Stopped
            }
            Err(_) => {
                warn!(
                    timeout_secs = timeout.as_secs(),
                    "Acquisition did not stop in time, abandoning remaining work"
                );
                task.abort();
                StopOutcome::TimedOut
            }
        }
    }

    fn abort(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

async fn orchestrate(
    configuration: Configuration,
    connector: Arc<dyn SourceConnector>,
    observer: Arc<dyn ReadObserver>,
    keep_bad_values: bool,
    cancel: CancellationToken,
    ready: oneshot::Sender<()>,
) {
    for line in configuration.to_string().lines() {
        info!("{}", line);
    }

    let total = configuration.group_count();
    if total == 0 {
        warn!("There is no group to read");
        let _ = ready.send(());
        return;
    }

    let stagger = stagger_interval(total);
    info!(
        groups = total,
        stagger_ms = stagger.as_millis() as u64,
        "Starting group poll loops"
    );

    let mut ready = Some(ready);
    let mut pollers = JoinSet::new();
    let mut started = 0usize;

    'sources: for source in configuration.into_sources() {
        for group in source.groups {
            if cancel.is_cancelled() {
                break 'sources;
            }

            let poller = GroupPoller::new(
                source.url.clone(),
                group,
                connector.clone(),
                observer.clone(),
            )
            .keep_bad_values(keep_bad_values);
            pollers.spawn(poller.run(cancel.child_token(), ready.take()));
            started += 1;
            Telemetry::set_running_groups(started);

            if started < total {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break 'sources,
                    _ = tokio::time::sleep(stagger) => {}
                }
            }
        }
    }

    while let Some(result) = pollers.join_next().await {
        if let Err(e) = result {
            if e.is_panic() {
                error!(error = %e, "Group poll loop panicked");
            }
        }
    }
    Telemetry::set_running_groups(0);
    debug!("All group poll loops stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stagger_interval() {
        assert_eq!(stagger_interval(1), Duration::from_secs(30));
        assert_eq!(stagger_interval(4), Duration::from_secs(30));
        assert_eq!(stagger_interval(10), Duration::from_secs(30));
        assert_eq!(stagger_interval(20), Duration::from_secs(15));
        assert_eq!(stagger_interval(600), Duration::from_millis(500));
    }
}
