use acquisition::ReadObserver;
use async_trait::async_trait;
use bridge_core::{
    Configuration, Item, ItemGroup, ItemReading, NamespaceNode, Quality, Sample, SourceConfig,
    SourceConnector, SourceKind, SourceSession, SourceValue,
};
use chrono::{DateTime, Utc};
use errors::SourceError;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

pub const CSV_HEADER: &str = "OpcServer,ReadCycleMinutes,GroupName,TagName,VariableId";

/// One read request seen by a [`ScriptedConnector`].
#[derive(Debug, Clone)]
pub struct ReadCall {
    pub source_url: String,
    pub item_names: Vec<String>,
    pub at: Instant,
}

#[derive(Default)]
struct ScriptState {
    connects: AtomicUsize,
    closes: AtomicUsize,
    reads: Mutex<Vec<ReadCall>>,
    queued: Mutex<VecDeque<Result<Vec<ItemReading>, SourceError>>>,
    values: Mutex<HashMap<String, (SourceValue, Quality)>>,
    delay: Mutex<Duration>,
    connect_error: Mutex<Option<SourceError>>,
    namespace: Mutex<Vec<NamespaceNode>>,
}

/// In-memory source connector.
///
/// Reads answer queued results first; once the queue is empty every requested
/// item is answered from the configured values (default: good quality, 1.0).
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    state: Arc<ScriptState>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_arc(self) -> Arc<dyn SourceConnector> {
        Arc::new(self)
    }

    #[must_use]
    pub fn with_value(self, item_name: &str, value: SourceValue, quality: Quality) -> Self {
        self.state
            .values
            .lock()
            .insert(item_name.to_ascii_lowercase(), (value, quality));
        self
    }

    #[must_use]
    pub fn with_read_delay(self, delay: Duration) -> Self {
        *self.state.delay.lock() = delay;
        self
    }

    #[must_use]
    pub fn with_namespace(self, nodes: Vec<NamespaceNode>) -> Self {
        *self.state.namespace.lock() = nodes;
        self
    }

    /// Queue the result of the next read.
    pub fn push_result(&self, result: Result<Vec<ItemReading>, SourceError>) {
        self.state.queued.lock().push_back(result);
    }

    pub fn fail_connect(&self, error: Option<SourceError>) {
        *self.state.connect_error.lock() = error;
    }

    pub fn read_count(&self) -> usize {
        self.state.reads.lock().len()
    }

    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> Vec<ReadCall> {
        self.state.reads.lock().clone()
    }
}

#[async_trait]
impl SourceConnector for ScriptedConnector {
    fn kind(&self) -> SourceKind {
        SourceKind::HttpGateway
    }

    async fn connect(&self, source_url: &str) -> Result<Box<dyn SourceSession>, SourceError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.state.connect_error.lock().clone() {
            return Err(error);
        }
        Ok(Box::new(ScriptedSession {
            state: self.state.clone(),
            source_url: source_url.to_string(),
        }))
    }
}

struct ScriptedSession {
    state: Arc<ScriptState>,
    source_url: String,
}

#[async_trait]
impl SourceSession for ScriptedSession {
    async fn read_items(&mut self, item_names: &[String]) -> Result<Vec<ItemReading>, SourceError> {
        self.state.reads.lock().push(ReadCall {
            source_url: self.source_url.clone(),
            item_names: item_names.to_vec(),
            at: Instant::now(),
        });

        let delay = *self.state.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(result) = self.state.queued.lock().pop_front() {
            return result;
        }

        let now = Utc::now();
        let values = self.state.values.lock();
        Ok(item_names
            .iter()
            .map(|name| {
                let (value, quality) = values
                    .get(&name.to_ascii_lowercase())
                    .cloned()
                    .unwrap_or((SourceValue::Float(1.0), Quality::Good));
                ItemReading {
                    item_name: name.clone(),
                    value,
                    quality,
                    timestamp: now,
                    fault: None,
                }
            })
            .collect())
    }

    async fn browse(&mut self) -> Result<Vec<NamespaceNode>, SourceError> {
        let delay = *self.state.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(self.state.namespace.lock().clone())
    }

    async fn close(self: Box<Self>) -> Result<(), SourceError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A poll loop hook invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    BeforeRead {
        group: String,
        item_count: usize,
        at: Instant,
    },
    AfterRead {
        group: String,
        good_count: usize,
        next_poll: DateTime<Utc>,
    },
    Error {
        group: String,
        message: String,
    },
    BadItem {
        group: String,
        item_name: String,
    },
    Result {
        group: String,
        samples: Vec<Sample>,
    },
}

/// Observer that records every hook.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Observed>>,
    result_delay: Mutex<Duration>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `on_result` take `delay` before returning.
    pub fn set_result_delay(&self, delay: Duration) {
        *self.result_delay.lock() = delay;
    }

    pub fn events(&self) -> Vec<Observed> {
        self.events.lock().clone()
    }

    pub fn results(&self) -> Vec<Vec<Sample>> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Observed::Result { samples, .. } => Some(samples.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Observed::Error { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// When each read of `group` began, in order.
    pub fn read_starts(&self, group: &str) -> Vec<Instant> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Observed::BeforeRead { group: g, at, .. } if g == group => Some(*at),
                _ => None,
            })
            .collect()
    }

    /// When each group first began reading, in start order.
    pub fn first_read_starts(&self) -> Vec<(String, Instant)> {
        let mut firsts: Vec<(String, Instant)> = Vec::new();
        for event in self.events.lock().iter() {
            if let Observed::BeforeRead { group, at, .. } = event {
                if !firsts.iter().any(|(g, _)| g == group) {
                    firsts.push((group.clone(), *at));
                }
            }
        }
        firsts
    }
}

#[async_trait]
impl ReadObserver for RecordingObserver {
    fn before_read(&self, group: &ItemGroup, item_count: usize) {
        self.events.lock().push(Observed::BeforeRead {
            group: group.name.clone(),
            item_count,
            at: Instant::now(),
        });
    }

    fn after_read(&self, group: &ItemGroup, good_count: usize, next_poll: DateTime<Utc>) {
        self.events.lock().push(Observed::AfterRead {
            group: group.name.clone(),
            good_count,
            next_poll,
        });
    }

    fn on_error(&self, group: &ItemGroup, error: &str) {
        self.events.lock().push(Observed::Error {
            group: group.name.clone(),
            message: error.to_string(),
        });
    }

    fn on_bad_item(&self, group: &ItemGroup, reading: &ItemReading) {
        self.events.lock().push(Observed::BadItem {
            group: group.name.clone(),
            item_name: reading.item_name.clone(),
        });
    }

    async fn on_result(&self, group: &ItemGroup, samples: Vec<Sample>) {
        let delay = *self.result_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.events.lock().push(Observed::Result {
            group: group.name.clone(),
            samples,
        });
    }
}

/// One source with one group.
pub fn single_group_config(
    source: &str,
    group: &str,
    cadence: Duration,
    items: &[(&str, i32)],
) -> Configuration {
    Configuration::new(vec![SourceConfig::new(source).with_group(
        ItemGroup::new(group, cadence)
            .with_items(items.iter().map(|(name, id)| Item::new(*name, *id))),
    )])
}

/// One source with `count` groups named `G0..`, each holding one item.
pub fn multi_group_config(source: &str, count: usize, cadence: Duration) -> Configuration {
    let mut config = SourceConfig::new(source);
    for i in 0..count {
        config = config.with_group(
            ItemGroup::new(format!("G{}", i), cadence)
                .with_items([Item::new(format!("Tag{}", i), i as i32)]),
        );
    }
    Configuration::new(vec![config])
}

/// CSV text with the standard header.
pub fn csv_text(rows: &[&str]) -> String {
    let mut text = String::from(CSV_HEADER);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

/// Overwrite `path` with `contents`.
pub fn write_file(path: &Path, contents: &str) {
    let mut file = std::fs::File::create(path).expect("create config file");
    file.write_all(contents.as_bytes()).expect("write config file");
    file.sync_all().expect("sync config file");
}

/// A temporary directory holding `tags.csv` written from `rows`.
pub fn config_dir(rows: &[&str]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("tags.csv");
    write_file(&path, &csv_text(rows));
    (dir, path)
}
