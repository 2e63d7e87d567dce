//! Metrics instrumentation for the autoscaling engine
//!
//! ## Table of Contents
//! - **AutoscalerMetrics**: Prometheus registry of tick/scale/placement metrics
//! - **Timer**: Small helper for measuring tick duration

use crate::error::{AutoscalerError, Result};
use prometheus::{CounterVec, GaugeVec, Opts, Registry};

/// Prometheus-compatible metrics for the autoscaling engine.
///
/// This type only builds and fills a [`Registry`]; it never binds a socket
/// or HTTP route. An embedding controller scrapes it by calling
/// [`AutoscalerMetrics::gather_text`] from whatever networking stack it
/// already runs.
pub struct AutoscalerMetrics {
    registry: Registry,

    /// Total evaluation ticks run, labeled by service.
    pub ticks_total: CounterVec,
    /// Total scale-up/scale-down decisions emitted, labeled by service and direction.
    pub scale_events_total: CounterVec,
    /// Current replica count as observed at the last tick, labeled by service.
    pub current_replicas: GaugeVec,
    /// Current requests-per-second, labeled by service.
    pub requests_per_second: GaugeVec,
    /// Current requests-per-second-per-replica, labeled by service.
    pub requests_per_replica: GaugeVec,
    /// Ticks skipped because the cooldown window had not elapsed, labeled by service.
    pub cooldown_gated_total: CounterVec,
    /// Spot placement choices, labeled by service and zone.
    pub spot_placements_total: CounterVec,
    /// Spot preemptions observed, labeled by service and zone.
    pub spot_preemptions_total: CounterVec,
}

impl AutoscalerMetrics {
    /// Create a new metrics registry.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let ticks_total = CounterVec::new(
            Opts::new("autoscaler_ticks_total", "Total evaluation ticks run"),
            &["service"],
        )?;
        let scale_events_total = CounterVec::new(
            Opts::new("autoscaler_scale_events_total", "Total scaling decisions emitted"),
            &["service", "direction"],
        )?;
        let current_replicas = GaugeVec::new(
            Opts::new("autoscaler_current_replicas", "Replica count observed at the last tick"),
            &["service"],
        )?;
        let requests_per_second = GaugeVec::new(
            Opts::new("autoscaler_requests_per_second", "Current request rate"),
            &["service"],
        )?;
        let requests_per_replica = GaugeVec::new(
            Opts::new(
                "autoscaler_requests_per_replica",
                "Current request rate per replica",
            ),
            &["service"],
        )?;
        let cooldown_gated_total = CounterVec::new(
            Opts::new(
                "autoscaler_cooldown_gated_total",
                "Ticks skipped because the cooldown window had not elapsed",
            ),
            &["service"],
        )?;
        let spot_placements_total = CounterVec::new(
            Opts::new("autoscaler_spot_placements_total", "Spot zone placement choices"),
            &["service", "zone"],
        )?;
        let spot_preemptions_total = CounterVec::new(
            Opts::new("autoscaler_spot_preemptions_total", "Spot preemptions observed"),
            &["service", "zone"],
        )?;

        registry.register(Box::new(ticks_total.clone()))?;
        registry.register(Box::new(scale_events_total.clone()))?;
        registry.register(Box::new(current_replicas.clone()))?;
        registry.register(Box::new(requests_per_second.clone()))?;
        registry.register(Box::new(requests_per_replica.clone()))?;
        registry.register(Box::new(cooldown_gated_total.clone()))?;
        registry.register(Box::new(spot_placements_total.clone()))?;
        registry.register(Box::new(spot_preemptions_total.clone()))?;

        Ok(Self {
            registry,
            ticks_total,
            scale_events_total,
            current_replicas,
            requests_per_second,
            requests_per_replica,
            cooldown_gated_total,
            spot_placements_total,
            spot_preemptions_total,
        })
    }

    /// The underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record one evaluation tick for `service`.
    pub fn record_tick(&self, service: &str) {
        self.ticks_total.with_label_values(&[service]).inc();
    }

    /// Record a scaling decision for `service` in `direction` ("up" or "down").
    pub fn record_scale_event(&self, service: &str, direction: &str) {
        self.scale_events_total
            .with_label_values(&[service, direction])
            .inc();
    }

    /// Update the replica-count gauge for `service`.
    pub fn set_current_replicas(&self, service: &str, count: u32) {
        self.current_replicas
            .with_label_values(&[service])
            .set(count as f64);
    }

    /// Update the request-rate gauges for `service`.
    pub fn set_request_rate(&self, service: &str, rps: f64, requests_per_replica: f64) {
        self.requests_per_second.with_label_values(&[service]).set(rps);
        self.requests_per_replica
            .with_label_values(&[service])
            .set(requests_per_replica);
    }

    /// Record a tick skipped due to the cooldown gate for `service`.
    pub fn record_cooldown_gated(&self, service: &str) {
        self.cooldown_gated_total.with_label_values(&[service]).inc();
    }

    /// Record a spot placement decision for `service` in `zone`.
    pub fn record_spot_placement(&self, service: &str, zone: &str) {
        self.spot_placements_total
            .with_label_values(&[service, zone])
            .inc();
    }

    /// Record a spot preemption for `service` in `zone`.
    pub fn record_spot_preemption(&self, service: &str, zone: &str) {
        self.spot_preemptions_total
            .with_label_values(&[service, zone])
            .inc();
    }

    /// Render the registry in the Prometheus exposition text format.
    pub fn gather_text(&self) -> Result<String> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| AutoscalerError::metrics(format!("encode error: {e}")))?;
        String::from_utf8(buffer).map_err(|e| AutoscalerError::metrics(format!("utf8 error: {e}")))
    }
}

impl Default for AutoscalerMetrics {
    fn default() -> Self {
        match Self::new() {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(error = %e, "failed to construct autoscaler metrics registry");
                panic!("AutoscalerMetrics::default() failed: {e}");
            }
        }
    }
}

/// Measures the wall-clock duration of one evaluation tick.
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Elapsed seconds since the timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Consume the timer and return the elapsed seconds.
    pub fn stop(self) -> f64 {
        self.elapsed_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = AutoscalerMetrics::new().unwrap();
        assert!(metrics.gather_text().is_ok());
    }

    #[test]
    fn test_tick_and_scale_event_counters() {
        let metrics = AutoscalerMetrics::new().unwrap();
        metrics.record_tick("svc-a");
        metrics.record_tick("svc-a");
        metrics.record_scale_event("svc-a", "up");

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("autoscaler_ticks_total"));
        assert!(text.contains("autoscaler_scale_events_total"));
    }

    #[test]
    fn test_spot_placement_counter_labeled_by_zone() {
        let metrics = AutoscalerMetrics::new().unwrap();
        metrics.record_spot_placement("svc-a", "us-east-a");
        metrics.record_spot_placement("svc-a", "us-east-a");
        metrics.record_spot_placement("svc-a", "us-east-b");

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("us-east-a"));
        assert!(text.contains("us-east-b"));
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let elapsed = timer.stop();
        assert!(elapsed >= 0.01);
    }
}
