use async_trait::async_trait;
use bridge_core::{ItemGroup, ItemReading, Sample};
use chrono::{DateTime, Utc};

/// Hooks a group poll loop reports through.
///
/// Every hook except [`ReadObserver::on_result`] defaults to doing nothing.
/// Hooks are called from the poll loop's own task and must not block; the
/// result hook may await (it is where samples are pushed) and is abandoned if
/// the loop is cancelled meanwhile.
#[async_trait]
pub trait ReadObserver: Send + Sync {
    fn before_read(&self, _group: &ItemGroup, _item_count: usize) {}

    fn after_read(&self, _group: &ItemGroup, _good_count: usize, _next_poll: DateTime<Utc>) {}

    /// A failed read cycle, or a single item whose value could not be used.
    fn on_error(&self, _group: &ItemGroup, _error: &str) {}

    /// A bad-quality reading that is being discarded.
    fn on_bad_item(&self, _group: &ItemGroup, _reading: &ItemReading) {}

    async fn on_result(&self, group: &ItemGroup, samples: Vec<Sample>);
}
