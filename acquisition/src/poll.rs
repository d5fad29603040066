//! Group poll loop.
//!
//! One loop per item group: read, report, wait one cadence, repeat until
//! cancelled. Read failures never end the loop.

use crate::observer::ReadObserver;
use crate::telemetry::{ReadTimer, Telemetry};
use bridge_core::{ItemGroup, ItemReading, Quality, Sample, SourceConnector};
use chrono::{DateTime, Utc};
use errors::SourceError;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

/// Samples and diagnostics produced by one read of a group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupReadout {
    pub samples: Vec<Sample>,
    /// Items whose value could not be turned into a sample.
    pub errors: Vec<String>,
    /// Bad readings that were discarded.
    pub discarded: Vec<ItemReading>,
}

impl GroupReadout {
    pub fn good_count(&self) -> usize {
        self.samples.iter().filter(|s| s.quality.is_good()).count()
    }
}

/// Turn source readings into samples for `group`.
///
/// Each reading fans out to every configured item with a matching name.
/// Bad readings are discarded unless `keep_bad_values` is set.
pub fn shape_readings(
    group: &ItemGroup,
    readings: Vec<ItemReading>,
    keep_bad_values: bool,
) -> GroupReadout {
    let mut readout = GroupReadout::default();

    for reading in readings {
        if !reading.is_good() && !keep_bad_values {
            readout.discarded.push(reading);
            continue;
        }

        let value = match reading.value.as_f64() {
            Ok(v) => v,
            Err(reason) => {
                readout.errors.push(format!(
                    "Cannot handle item '{}': {}",
                    reading.item_name, reason
                ));
                continue;
            }
        };

        let quality = if reading.is_good() {
            Quality::Good
        } else {
            Quality::Bad
        };

        let before = readout.samples.len();
        readout
            .samples
            .extend(group.items_named(&reading.item_name).map(|item| Sample {
                item_name: item.name.clone(),
                variable_id: item.variable_id,
                timestamp: reading.timestamp,
                value,
                quality,
            }));
        if readout.samples.len() == before {
            debug!(group = %group.name, item = %reading.item_name, "Reading matches no configured item");
        }
    }

    readout
}

/// `read_at` plus one cadence, saturating at the latest representable time.
pub fn next_poll_time(read_at: DateTime<Utc>, cadence: std::time::Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(cadence)
        .ok()
        .and_then(|step| read_at.checked_add_signed(step))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

enum CycleOutcome {
    Completed,
    Cancelled,
}

/// Drives one item group on its cadence.
pub struct GroupPoller {
    source_url: String,
    group: ItemGroup,
    connector: Arc<dyn SourceConnector>,
    observer: Arc<dyn ReadObserver>,
    keep_bad_values: bool,
}

impl GroupPoller {
    pub fn new(
        source_url: impl Into<String>,
        group: ItemGroup,
        connector: Arc<dyn SourceConnector>,
        observer: Arc<dyn ReadObserver>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            group,
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

    /// Open a session, read every item of the group once, close the session.
    pub async fn read_once(&self) -> Result<GroupReadout, SourceError> {
        let names = self.group.distinct_item_names();
        let mut session = self.connector.connect(&self.source_url).await?;
        let result = session.read_items(&names).await;
        if let Err(e) = session.close().await {
            debug!(source = %self.source_url, error = %e, "Failed to close source session");
        }
        Ok(shape_readings(&self.group, result?, self.keep_bad_values))
    }

    /// Run until `cancel` fires.
    ///
    /// `ready` is signalled once the first read has finished, whatever its
    /// outcome, and before its samples are handed to the observer. It is
    /// dropped unsent if the loop is cancelled first.
    #[instrument(skip_all, fields(group = %self.group.name, source = %self.source_url))]
    pub async fn run(self, cancel: CancellationToken, ready: Option<oneshot::Sender<()>>) {
        let mut ready = ready;
        debug!(cadence_secs = self.group.cadence.as_secs(), "Group poll loop started");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match AssertUnwindSafe(self.cycle(&cancel, &mut ready))
                .catch_unwind()
                .await
            {
                Ok(CycleOutcome::Completed) => {}
                Ok(CycleOutcome::Cancelled) => break,
                Err(_) => error!("Poll cycle panicked, continuing on the next cycle"),
            }

            if let Some(tx) = ready.take() {
                let _ = tx.send(());
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.group.cadence) => {}
            }
        }

        debug!("Group poll loop stopped");
    }

    async fn cycle(
        &self,
        cancel: &CancellationToken,
        ready: &mut Option<oneshot::Sender<()>>,
    ) -> CycleOutcome {
        self.observer.before_read(&self.group, self.group.items.len());
        Telemetry::record_read(&self.group.name);
        let timer = ReadTimer::new(&self.group.name);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return CycleOutcome::Cancelled,
            result = self.read_once() => result,
        };
        timer.finish();
        let read_at = Utc::now();
        if let Some(tx) = ready.take() {
            let _ = tx.send(());
        }

        let readout = match result {
            Ok(readout) => readout,
            Err(e) => {
                Telemetry::record_read_error(&self.group.name);
                self.observer.on_error(&self.group, &e.to_string());
                return CycleOutcome::Completed;
            }
        };

        for message in &readout.errors {
            self.observer.on_error(&self.group, message);
        }
        for reading in &readout.discarded {
            self.observer.on_bad_item(&self.group, reading);
        }

        let next_poll = next_poll_time(read_at, self.group.cadence);
        self.observer
            .after_read(&self.group, readout.good_count(), next_poll);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => CycleOutcome::Cancelled,
            _ = self.observer.on_result(&self.group, readout.samples) => CycleOutcome::Completed,
        }
    }
}
