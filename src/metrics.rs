//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder,
};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Submission counters
    pub submissions_total: IntCounter,
    pub submissions_failed: IntCounter,
    pub blockhash_retries: IntCounter,
    pub rate_limited_total: IntCounter,

    // Confirmation counters
    pub confirmations_succeeded: IntCounter,
    pub confirmations_timed_out: IntCounter,
    pub confirmations_failed: IntCounter,

    // Gauges
    pub polls_in_flight: IntGauge,

    // Histograms
    pub confirmation_latency: Histogram,
    pub rpc_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let submissions_total = IntCounter::with_opts(Opts::new(
            "submissions_total",
            "Transactions handed to the submitter",
        ))?;

        let submissions_failed = IntCounter::with_opts(Opts::new(
            "submissions_failed",
            "Submissions that ended without a signature",
        ))?;

        let blockhash_retries = IntCounter::with_opts(Opts::new(
            "blockhash_retries",
            "Blockhash fetches repeated after an error or a reused hash",
        ))?;

        let rate_limited_total = IntCounter::with_opts(Opts::new(
            "rate_limited_total",
            "RPC responses classified as rate limited",
        ))?;

        let confirmations_succeeded = IntCounter::with_opts(Opts::new(
            "confirmations_succeeded",
            "Signatures that reached their target level",
        ))?;

        let confirmations_timed_out = IntCounter::with_opts(Opts::new(
            "confirmations_timed_out",
            "Signatures abandoned after the attempt limit",
        ))?;

        let confirmations_failed = IntCounter::with_opts(Opts::new(
            "confirmations_failed",
            "Signatures rejected, failed on chain or cancelled",
        ))?;

        let polls_in_flight = IntGauge::with_opts(Opts::new(
            "polls_in_flight",
            "Confirmation polls currently running",
        ))?;

        let confirmation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "confirmation_latency_seconds",
                "Time from the start of status polling to the target level",
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 40.0, 80.0]),
        )?;

        let rpc_latency = Histogram::with_opts(
            HistogramOpts::new("rpc_latency_seconds", "RPC call latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(submissions_failed.clone()))?;
        registry.register(Box::new(blockhash_retries.clone()))?;
        registry.register(Box::new(rate_limited_total.clone()))?;
        registry.register(Box::new(confirmations_succeeded.clone()))?;
        registry.register(Box::new(confirmations_timed_out.clone()))?;
        registry.register(Box::new(confirmations_failed.clone()))?;
        registry.register(Box::new(polls_in_flight.clone()))?;
        registry.register(Box::new(confirmation_latency.clone()))?;
        registry.register(Box::new(rpc_latency.clone()))?;

        Ok(Self {
            registry,
            submissions_total,
            submissions_failed,
            blockhash_retries,
            rate_limited_total,
            confirmations_succeeded,
            confirmations_timed_out,
            confirmations_failed,
            polls_in_flight,
            confirmation_latency,
            rpc_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every registered metric
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Increments `polls_in_flight` for its lifetime
pub struct InFlightGuard;

impl InFlightGuard {
    pub fn enter() -> Self {
        metrics().polls_in_flight.inc();
        Self
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        metrics().polls_in_flight.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_registered_names() {
        let m = Metrics::new().unwrap();
        m.submissions_total.inc();
        m.rpc_latency.observe(0.02);

        let text = m.render().unwrap();
        assert!(text.contains("submissions_total 1"));
        assert!(text.contains("rpc_latency_seconds_bucket"));
    }

    #[test]
    fn test_confirmation_latency_help_names_polling_start() {
        let m = Metrics::new().unwrap();
        m.confirmation_latency.observe(1.5);

        let text = m.render().unwrap();
        assert!(text.contains(
            "# HELP confirmation_latency_seconds Time from the start of status polling"
        ));
    }

    #[test]
    fn test_in_flight_guard_counts_while_alive() {
        let _guard = InFlightGuard::enter();
        assert!(metrics().polls_in_flight.get() >= 1);
    }
}
