use metrics::{counter, gauge, histogram};
use std::time::Instant;

pub struct Telemetry;

impl Telemetry {
    pub fn record_read(group: &str) {
        counter!("bridge.reads.total", "group" => group.to_string()).increment(1);
    }

    pub fn record_read_error(group: &str) {
        counter!("bridge.read.errors", "group" => group.to_string()).increment(1);
    }

    pub fn record_read_latency(group: &str, duration_ms: f64) {
        histogram!("bridge.read.duration_ms", "group" => group.to_string()).record(duration_ms);
    }

    pub fn set_running_groups(count: usize) {
        gauge!("bridge.groups.running").set(count as f64);
    }
}

pub struct ReadTimer {
    start: Instant,
    group: String,
}

impl ReadTimer {
    pub fn new(group: &str) -> Self {
        Self {
            start: Instant::now(),
            group: group.to_string(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed().as_millis() as f64;
        Telemetry::record_read_latency(&self.group, duration);
    }
}
