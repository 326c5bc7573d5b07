use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics collector for the Ledger RPC server, keyed by operation name and
/// outcome per SPEC_FULL §4's observability additions.
#[derive(Debug, Clone, Default)]
pub struct Metrics;

impl Metrics {
    pub fn new() -> Self {
        Self
    }

    /// Records one call to a `LedgerService` operation (§4.3).
    pub fn record_rpc(&self, operation: &str, outcome: &str, duration_ms: f64) {
        counter!(
            "ledger_rpc_requests_total",
            "operation" => operation.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);
        histogram!(
            "ledger_rpc_duration_ms",
            "operation" => operation.to_string()
        )
        .record(duration_ms);
    }

    pub fn record_reservation_created(&self) {
        counter!("ledger_reservations_created_total").increment(1);
    }

    pub fn record_reservation_committed(&self) {
        counter!("ledger_reservations_committed_total").increment(1);
    }

    pub fn record_reservation_released(&self, reason: &str) {
        counter!("ledger_reservations_released_total", "reason" => reason.to_string()).increment(1);
    }

    pub fn record_insufficient_funds(&self) {
        counter!("ledger_insufficient_funds_total").increment(1);
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
        "ledger_rpc_requests_total",
        Unit::Count,
        "Total LedgerService RPC requests by operation and outcome"
    );
    describe_histogram!(
        "ledger_rpc_duration_ms",
        Unit::Milliseconds,
        "LedgerService RPC latency in milliseconds"
    );
    describe_counter!(
        "ledger_reservations_created_total",
        Unit::Count,
        "Total reservations created"
    );
    describe_counter!(
        "ledger_reservations_committed_total",
        Unit::Count,
        "Total reservations committed"
    );
    describe_counter!(
        "ledger_reservations_released_total",
        Unit::Count,
        "Total reservations released, by reason"
    );
    describe_counter!(
        "ledger_insufficient_funds_total",
        Unit::Count,
        "Total ReserveBalance calls rejected for insufficient funds"
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
