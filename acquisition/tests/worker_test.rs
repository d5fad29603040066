use acquisition::{AcquisitionWorker, ReadObserver, StopOutcome, WorkerError};
use async_trait::async_trait;
use bridge_core::{Configuration, ItemGroup, Quality, Sample, SourceValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;
use testing::{multi_group_config, single_group_config, RecordingObserver, ScriptedConnector};

const START_TIMEOUT: Duration = Duration::from_secs(30);
const STOP_TIMEOUT: Duration = Duration::from_secs(30);
const CADENCE: Duration = Duration::from_secs(300);

fn worker(connector: &ScriptedConnector, observer: &std::sync::Arc<RecordingObserver>) -> AcquisitionWorker {
    AcquisitionWorker::new(connector.clone().into_arc(), observer.clone())
}

#[tokio::test(start_paused = true)]
async fn test_groups_start_staggered() {
    let connector = ScriptedConnector::new();
    let observer = RecordingObserver::new();
    let t0 = tokio::time::Instant::now();

    let handle = worker(&connector, &observer)
        .start(multi_group_config("S1", 4, CADENCE), START_TIMEOUT)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(100)).await;

    let offsets: Vec<_> = observer
        .first_read_starts()
        .into_iter()
        .map(|(group, at)| (group, (at - t0).as_secs()))
        .collect();
    assert_eq!(
        offsets,
        vec![
            ("G0".to_string(), 0),
            ("G1".to_string(), 30),
            ("G2".to_string(), 60),
            ("G3".to_string(), 90),
        ]
    );

    assert_eq!(handle.stop(STOP_TIMEOUT).await, StopOutcome::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_many_groups_start_within_five_minutes() {
    let connector = ScriptedConnector::new();
    let observer = RecordingObserver::new();
    let t0 = tokio::time::Instant::now();

    let handle = worker(&connector, &observer)
        .start(multi_group_config("S1", 20, CADENCE), START_TIMEOUT)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(290)).await;

    let starts = observer.first_read_starts();
    assert_eq!(starts.len(), 20);
    assert_eq!((starts[1].1 - starts[0].1).as_secs(), 15);
    assert_eq!((starts[19].1 - t0).as_secs(), 285);

    handle.stop(STOP_TIMEOUT).await;
}

#[tokio::test(start_paused = true)]
async fn test_empty_configuration_starts_idle() {
    let connector = ScriptedConnector::new();
    let observer = RecordingObserver::new();

    let handle = worker(&connector, &observer)
        .start(Configuration::empty(), START_TIMEOUT)
        .await
        .unwrap();
    tokio::time::sleep(CADENCE).await;

    assert_eq!(connector.connect_count(), 0);
    assert!(observer.events().is_empty());
    assert!(handle.is_finished());
    assert_eq!(handle.stop(STOP_TIMEOUT).await, StopOutcome::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_no_reads_after_stop() {
    let connector = ScriptedConnector::new();
    let observer = RecordingObserver::new();

    let handle = worker(&connector, &observer)
        .start(multi_group_config("S1", 2, CADENCE), START_TIMEOUT)
        .await
        .unwrap();
    tokio::time::sleep(CADENCE + Duration::from_secs(10)).await;
    assert_eq!(handle.stop(STOP_TIMEOUT).await, StopOutcome::Stopped);

    // G0 at 0s and 300s, G1 at 30s.
    let reads = connector.read_count();
    assert_eq!(reads, 3);
    tokio::time::sleep(CADENCE * 3).await;
    assert_eq!(connector.read_count(), reads);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_stagger_skips_remaining_groups() {
    let connector = ScriptedConnector::new();
    let observer = RecordingObserver::new();

    let handle = worker(&connector, &observer)
        .start(multi_group_config("S1", 4, CADENCE), START_TIMEOUT)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(40)).await;
    assert_eq!(handle.stop(STOP_TIMEOUT).await, StopOutcome::Stopped);

    tokio::time::sleep(CADENCE).await;
    assert_eq!(observer.first_read_starts().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_first_read_times_out_start() {
    let connector = ScriptedConnector::new().with_read_delay(Duration::from_secs(60));
    let observer = RecordingObserver::new();

    let result = worker(&connector, &observer)
        .start(
            single_group_config("S1", "G1", CADENCE, &[("Tag1", 1)]),
            START_TIMEOUT,
        )
        .await;

    match result {
        Err(WorkerError::StartTimeout { timeout }) => assert_eq!(timeout, START_TIMEOUT),
        Err(e) => panic!("Expected start timeout, got {}", e),
        Ok(_) => panic!("Expected start timeout"),
    }

    tokio::time::sleep(CADENCE * 2).await;
    assert_eq!(connector.read_count(), 1);
    assert!(observer.results().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_push_is_abandoned_on_stop() {
    let connector = ScriptedConnector::new();
    let observer = RecordingObserver::new();

    let handle = worker(&connector, &observer)
        .start(
            single_group_config("S1", "G1", Duration::from_secs(60), &[("Tag1", 1)]),
            START_TIMEOUT,
        )
        .await
        .unwrap();

    observer.set_result_delay(Duration::from_secs(600));
    tokio::time::sleep(Duration::from_secs(61)).await;

    let before = tokio::time::Instant::now();
    assert_eq!(handle.stop(STOP_TIMEOUT).await, StopOutcome::Stopped);
    assert!(before.elapsed() < STOP_TIMEOUT);
    assert_eq!(observer.results().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bad_quality_item_is_not_pushed() {
    let connector = ScriptedConnector::new()
        .with_value("Tag1", SourceValue::Float(3.14), Quality::Good)
        .with_value("Tag2", SourceValue::Float(2.0), Quality::Bad);
    let observer = RecordingObserver::new();

    let handle = worker(&connector, &observer)
        .start(
            single_group_config("S1", "G1", CADENCE, &[("Tag1", 10), ("Tag2", 11)]),
            START_TIMEOUT,
        )
        .await
        .unwrap();

    let results = observer.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].len(), 1);
    assert_eq!(results[0][0].variable_id, 10);
    assert_eq!(results[0][0].value, 3.14);

    handle.stop(STOP_TIMEOUT).await;
}

#[tokio::test(start_paused = true)]
async fn test_keep_bad_values_pushes_bad_quality() {
    let connector = ScriptedConnector::new()
        .with_value("Tag2", SourceValue::Float(2.0), Quality::Bad);
    let observer = RecordingObserver::new();

    let handle = worker(&connector, &observer)
        .keep_bad_values(true)
        .start(
            single_group_config("S1", "G1", CADENCE, &[("Tag1", 10), ("Tag2", 11)]),
            START_TIMEOUT,
        )
        .await
        .unwrap();

    let results = observer.results();
    assert_eq!(results[0].len(), 2);
    assert_eq!(results[0][1].quality, Quality::Bad);

    handle.stop(STOP_TIMEOUT).await;
}

#[tokio::test(start_paused = true)]
async fn test_slow_sink_does_not_fail_start() {
    let connector = ScriptedConnector::new();
    let observer = RecordingObserver::new();
    observer.set_result_delay(Duration::from_secs(45));

    let handle = worker(&connector, &observer)
        .start(
            single_group_config("S1", "G1", CADENCE, &[("Tag1", 1)]),
            START_TIMEOUT,
        )
        .await
        .unwrap();
    assert!(observer.results().is_empty());

    // Reads at 0s and 345s, each result 45s later.
    tokio::time::sleep(CADENCE * 2).await;
    assert_eq!(connector.read_count(), 2);
    assert_eq!(observer.results().len(), 2);

    handle.stop(STOP_TIMEOUT).await;
}

/// Blocks the poll loop thread inside `before_read` from the second read on,
/// until the gate is opened.
struct StuckObserver {
    calls: AtomicUsize,
    entered: Mutex<mpsc::Sender<()>>,
    gate: Mutex<mpsc::Receiver<()>>,
}

#[async_trait]
impl ReadObserver for StuckObserver {
    fn before_read(&self, _group: &ItemGroup, _item_count: usize) {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return;
        }
        let _ = self.entered.lock().unwrap().send(());
        let _ = self.gate.lock().unwrap().recv();
    }

    async fn on_result(&self, _group: &ItemGroup, _samples: Vec<Sample>) {}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unresponsive_loop_is_abandoned_on_stop() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (gate_tx, gate_rx) = mpsc::channel();
    let observer = Arc::new(StuckObserver {
        calls: AtomicUsize::new(0),
        entered: Mutex::new(entered_tx),
        gate: Mutex::new(gate_rx),
    });
    let connector = ScriptedConnector::new();
    let worker = AcquisitionWorker::new(connector.clone().into_arc(), observer);

    let handle = worker
        .start(
            single_group_config("S1", "G1", Duration::from_millis(50), &[("Tag1", 1)]),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
    tokio::task::spawn_blocking(move || entered_rx.recv())
        .await
        .unwrap()
        .unwrap();

    let stop_timeout = Duration::from_millis(200);
    let before = std::time::Instant::now();
    assert_eq!(handle.stop(stop_timeout).await, StopOutcome::TimedOut);
    assert!(before.elapsed() >= stop_timeout);

    gate_tx.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(connector.read_count(), 1);
}
