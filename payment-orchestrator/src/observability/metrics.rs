use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics collector for the Payment Orchestrator, keyed by saga step and
/// outcome (§4.6) plus per-event-type counters for the two streams (§4.5).
#[derive(Debug, Clone, Default)]
pub struct Metrics;

impl Metrics {
    pub fn new() -> Self {
        Self
    }

    /// Records one externally-facing call (`CreatePayment`, `ProcessPayment`,
    /// `CancelPayment`).
    pub fn record_call(&self, operation: &str, outcome: &str, duration_ms: f64) {
        counter!(
            "orchestrator_calls_total",
            "operation" => operation.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
        histogram!(
            "orchestrator_call_duration_ms",
            "operation" => operation.to_string()
        )
        .record(duration_ms);
    }

    pub fn record_payment_status(&self, status: &str) {
        counter!("orchestrator_payments_total", "status" => status.to_string()).increment(1);
    }

    pub fn record_partial_commit_anomaly(&self) {
        counter!("orchestrator_partial_commit_anomaly_total").increment(1);
    }

    pub fn record_compensation(&self, what: &str) {
        counter!("orchestrator_compensations_total", "what" => what.to_string()).increment(1);
    }

    pub fn record_event_published(&self, event_type: &str) {
        counter!("orchestrator_events_published_total", "event_type" => event_type.to_string()).increment(1);
    }
}

pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn init_metrics() -> PrometheusHandle {
    let handle = METRICS_HANDLE.get_or_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus recorder");

        describe_metrics();
        handle
    });

    METRICS.get_or_init(Metrics::new);

    handle.clone()
}

fn describe_metrics() {
    describe_counter!(
        "orchestrator_calls_total",
        Unit::Count,
        "Total CreatePayment/ProcessPayment/CancelPayment calls by operation and outcome"
    );
    describe_histogram!(
        "orchestrator_call_duration_ms",
        Unit::Milliseconds,
        "Orchestrator call latency in milliseconds"
    );
    describe_counter!(
        "orchestrator_payments_total",
        Unit::Count,
        "Total payments by terminal/intermediate status"
    );
    describe_counter!(
        "orchestrator_partial_commit_anomaly_total",
        Unit::Count,
        "Total saga runs that hit the partial-commit anomaly (credit applied, commit failed)"
    );
    describe_counter!(
        "orchestrator_compensations_total",
        Unit::Count,
        "Total compensating actions attempted, by what was compensated"
    );
    describe_counter!(
        "orchestrator_events_published_total",
        Unit::Count,
        "Total domain events published, by event type"
    );
}

pub fn get_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_timer_measures_elapsed_time() {
        let timer = LatencyTimer::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.elapsed_ms() >= 5.0);
    }
}
