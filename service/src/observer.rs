//! Read observer that logs every poll cycle and pushes its samples.

use acquisition::ReadObserver;
use async_trait::async_trait;
use bridge_core::{ItemGroup, ItemReading, Sample};
use chrono::{DateTime, Utc};
use pusher::{DataPusher, FilterMode, PushError, PushOutcome};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct PushingObserver {
    pusher: Arc<DataPusher>,
}

impl PushingObserver {
    pub fn new(pusher: Arc<DataPusher>) -> Self {
        Self { pusher }
    }
}

#[async_trait]
impl ReadObserver for PushingObserver {
    fn before_read(&self, group: &ItemGroup, item_count: usize) {
        info!(group = %group.name, "Start reading {} tag(s) from group {}", item_count, group.name);
    }

    fn after_read(&self, group: &ItemGroup, good_count: usize, next_poll: DateTime<Utc>) {
        info!(
            group = %group.name,
            "{} tag(s) read from group {}, next polling time {} UTC",
            good_count,
            group.name,
            next_poll.format("%Y-%m-%d %H:%M:%S")
        );
    }

    fn on_error(&self, group: &ItemGroup, error: &str) {
        error!(group = %group.name, error = %error, "Error reading group");
    }

    fn on_bad_item(&self, group: &ItemGroup, reading: &ItemReading) {
        match &reading.fault {
            Some(fault) => warn!(group = %group.name, item = %reading.item_name, fault = %fault, "Item read failed"),
            None => debug!(group = %group.name, item = %reading.item_name, "Discarding bad quality value"),
        }
    }

    async fn on_result(&self, group: &ItemGroup, samples: Vec<Sample>) {
        let report = |e: &PushError| {
            error!(group = %group.name, error = %e, "Push failed, samples of this cycle are dropped");
        };
        match self
            .pusher
            .push(&samples, FilterMode::DiscardUnmapped, Some(&report))
            .await
        {
            Ok(PushOutcome::Delivered { count }) => {
                debug!(group = %group.name, count, "Samples delivered");
            }
            Ok(PushOutcome::Skipped) => {
                debug!(group = %group.name, "No mapped sample to push");
            }
            Ok(PushOutcome::Failed) => {}
            Err(e) => report(&e),
        }
    }
}
