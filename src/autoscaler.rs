//! Request-rate autoscaling engines
//!
//! ## Table of Contents
//! - **Hysteresis**: Cooldown and consecutive-period gating shared by both engines
//! - **ScalingEngine**: Trait implemented by each autoscaling strategy
//! - **RequestRateAutoscaler**: Fixed-threshold autoscaler
//! - **SpotRequestRateAutoscaler**: Target-QPS, spot-placement-aware autoscaler

use crate::decision::{AutoscalerDecision, ReplicaOverride};
use crate::meter::{RequestBatch, RequestRateMeter};
use crate::placer::SpotPlacer;
use crate::types::{ReplicaInfo, ReplicaStatus, ServiceSpec};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::info;

/// Default number of spare replicas the spot autoscaler keeps provisioned
/// above the target, to absorb a preemption without an immediate gap.
const DEFAULT_OVER_PROVISION_NUM: u32 = 1;

/// Cooldown and consecutive-period gating shared by both autoscaler variants.
///
/// The consecutive-period counters track how many evaluation ticks in a row
/// have asked for the same direction of change; a tick asking for the
/// opposite direction resets the other counter, and a tick asking for no
/// change leaves both counters untouched.
#[derive(Debug, Clone)]
pub struct Hysteresis {
    cooldown_secs: f64,
    last_scale_operation: f64,
    upscale_counter: u32,
    downscale_counter: u32,
}

impl Hysteresis {
    /// Create a new hysteresis tracker with the given cooldown, in seconds.
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown_secs: cooldown_secs as f64,
            last_scale_operation: 0.0,
            upscale_counter: 0,
            downscale_counter: 0,
        }
    }

    /// Whether the cooldown window has elapsed since the last recorded scaling operation.
    pub fn cooldown_elapsed(&self, now: f64) -> bool {
        now - self.last_scale_operation >= self.cooldown_secs
    }

    /// Record that a scaling operation happened at `now`.
    pub fn record_scale_operation(&mut self, now: f64) {
        self.last_scale_operation = now;
    }

    /// Advance the consecutive-period counters toward `target` relative to
    /// `current`. Returns `true` once the streak required for the direction
    /// `target` moved in has been reached.
    pub fn advance(&mut self, target: i64, current: i64, required_up: u32, required_down: u32) -> bool {
        match target.cmp(&current) {
            Ordering::Greater => {
                self.upscale_counter += 1;
                self.downscale_counter = 0;
                self.upscale_counter >= required_up
            }
            Ordering::Less => {
                self.downscale_counter += 1;
                self.upscale_counter = 0;
                self.downscale_counter >= required_down
            }
            Ordering::Equal => false,
        }
    }
}

/// A pluggable autoscaling strategy.
///
/// Implementations are `Send + Sync` so one engine instance can be shared
/// behind an `Arc` across the task that ingests request info and the task
/// that runs evaluation ticks. Methods are declared `async` to match the
/// crate's convention for swappable strategy traits even though no
/// implementation here performs real I/O inside the trait method bodies —
/// `evaluate` in particular must return without ever suspending.
#[async_trait]
pub trait ScalingEngine: Send + Sync {
    /// Absorb a batch of request timestamps observed at `now`.
    async fn ingest_request_info(&self, batch: RequestBatch, now: f64);

    /// Evaluate the current replica set and return zero or more decisions,
    /// in the order the controller must execute them.
    async fn evaluate(&self, replica_infos: &[ReplicaInfo], now: f64) -> Vec<AutoscalerDecision>;

    /// Replay a history of spot preemption events, oldest first. Ignored by
    /// engines that do not place spot capacity.
    async fn handle_preemption_history(&self, _history: &[String]) {}

    /// Engine name, for logging and metrics labels.
    fn name(&self) -> &str;
}

/// Choose `num_to_remove` replica IDs to scale down: all `FAILED` replicas
/// first (in input order), then the remaining replicas in input order,
/// until `num_to_remove` distinct IDs have been chosen.
fn choose_scale_down_ids(
    replica_infos: &[ReplicaInfo],
    num_to_remove: usize,
) -> Vec<crate::types::ReplicaId> {
    let mut chosen = Vec::with_capacity(num_to_remove);
    for info in replica_infos {
        if chosen.len() >= num_to_remove {
            return chosen;
        }
        if info.status == ReplicaStatus::Failed {
            chosen.push(info.replica_id);
        }
    }
    for info in replica_infos {
        if chosen.len() >= num_to_remove {
            return chosen;
        }
        if !chosen.contains(&info.replica_id) {
            chosen.push(info.replica_id);
        }
    }
    chosen
}

/// Autoscales a service by comparing its current request rate per replica
/// against fixed upper/lower thresholds.
pub struct RequestRateAutoscaler {
    min_replicas: u32,
    max_replicas: u32,
    upper_threshold: Option<f64>,
    lower_threshold: Option<f64>,
    meter: Mutex<RequestRateMeter>,
    hysteresis: Mutex<Hysteresis>,
}

impl RequestRateAutoscaler {
    /// Construct a threshold autoscaler from a service spec.
    pub fn new(spec: &ServiceSpec, cooldown_secs: u64, rps_window_size_secs: u64) -> Self {
        Self {
            min_replicas: spec.min_replicas,
            max_replicas: spec.max_replicas(),
            upper_threshold: spec.qps_upper_threshold,
            lower_threshold: spec.qps_lower_threshold,
            meter: Mutex::new(RequestRateMeter::new(rps_window_size_secs)),
            hysteresis: Mutex::new(Hysteresis::new(cooldown_secs)),
        }
    }
}

#[async_trait]
impl ScalingEngine for RequestRateAutoscaler {
    async fn ingest_request_info(&self, batch: RequestBatch, now: f64) {
        self.meter.lock().ingest(batch, now);
    }

    async fn evaluate(&self, replica_infos: &[ReplicaInfo], now: f64) -> Vec<AutoscalerDecision> {
        let num_replicas = replica_infos.len() as u32;
        let hysteresis = self.hysteresis.lock();

        if num_replicas >= self.min_replicas && !hysteresis.cooldown_elapsed(now) {
            info!(
                num_replicas,
                min_replicas = self.min_replicas,
                "cooldown period has not passed since last scaling operation, skipping"
            );
            return Vec::new();
        }
        drop(hysteresis);

        let rps = self.meter.lock().current_rps();
        let requests_per_replica = if num_replicas > 0 {
            rps / num_replicas as f64
        } else {
            rps
        };
        info!(requests_per_replica, num_replicas, "evaluating threshold autoscaler");

        let target_num_replicas: u32 = if num_replicas < self.min_replicas {
            self.min_replicas
        } else if self.upper_threshold.is_some_and(|u| requests_per_replica > u) {
            let upper = self.upper_threshold.expect("checked by is_some_and");
            ((requests_per_replica / upper) * num_replicas as f64) as u32
        } else if self.lower_threshold.is_some_and(|l| requests_per_replica < l) {
            let lower = self.lower_threshold.expect("checked by is_some_and");
            ((requests_per_replica / lower) * num_replicas as f64) as u32
        } else {
            num_replicas
        };
        let target_num_replicas = target_num_replicas.clamp(self.min_replicas, self.max_replicas);

        let delta = target_num_replicas as i64 - num_replicas as i64;
        match delta.cmp(&0) {
            Ordering::Equal => {
                info!("no scaling needed");
                Vec::new()
            }
            Ordering::Greater => {
                info!(delta, "scaling up");
                self.hysteresis.lock().record_scale_operation(now);
                vec![AutoscalerDecision::scale_up(delta as u32)]
            }
            Ordering::Less => {
                let num_to_remove = (-delta) as usize;
                let ids = choose_scale_down_ids(replica_infos, num_to_remove);
                info!(?ids, "scaling down");
                self.hysteresis.lock().record_scale_operation(now);
                vec![AutoscalerDecision::scale_down(ids)]
            }
        }
    }

    fn name(&self) -> &str {
        "request-rate"
    }
}

/// Autoscales a service toward a target requests-per-second-per-replica
/// figure, placing new capacity on spot instances with an on-demand
/// fallback when spot supply falls short, and applying consecutive-period
/// hysteresis before committing to a new target.
pub struct SpotRequestRateAutoscaler {
    min_replicas: u32,
    max_replicas: u32,
    target_qps_per_replica: f64,
    over_provision_num: u32,
    scale_up_consecutive_periods: u32,
    scale_down_consecutive_periods: u32,
    meter: Mutex<RequestRateMeter>,
    hysteresis: Mutex<Hysteresis>,
    target_num_replicas: Mutex<u32>,
    placer: Arc<dyn SpotPlacer>,
}

impl SpotRequestRateAutoscaler {
    /// Construct a spot-aware target-QPS autoscaler from a service spec.
    ///
    /// Panics if `spec` has no `target_qps_per_replica`, mirroring the
    /// assertion the source autoscaler makes at construction time: this
    /// variant is never built for a service that wasn't configured for it.
    pub fn new(
        spec: &ServiceSpec,
        placer: Arc<dyn SpotPlacer>,
        frequency_secs: u64,
        cooldown_secs: u64,
        rps_window_size_secs: u64,
        upscale_delay_secs: u64,
        downscale_delay_secs: u64,
        over_provision_num: u32,
    ) -> Self {
        let target_qps_per_replica = spec
            .target_qps_per_replica
            .expect("SpotRequestRateAutoscaler requires target_qps_per_replica");
        Self {
            min_replicas: spec.min_replicas,
            max_replicas: spec.max_replicas(),
            target_qps_per_replica,
            over_provision_num,
            scale_up_consecutive_periods: (upscale_delay_secs / frequency_secs).max(1) as u32,
            scale_down_consecutive_periods: (downscale_delay_secs / frequency_secs).max(1) as u32,
            meter: Mutex::new(RequestRateMeter::new(rps_window_size_secs)),
            hysteresis: Mutex::new(Hysteresis::new(cooldown_secs)),
            target_num_replicas: Mutex::new(spec.min_replicas),
            placer,
        }
    }

    fn desired_num_replicas(&self, current_num_replicas: u32) -> u32 {
        let rps = self.meter.lock().current_rps();
        let requests_per_replica = if current_num_replicas > 0 {
            rps / current_num_replicas as f64
        } else {
            rps
        };
        info!(requests_per_replica, "computing desired replica count");

        let raw_target = (requests_per_replica / self.target_qps_per_replica).ceil() as u32;
        let raw_target = raw_target.clamp(self.min_replicas, self.max_replicas);

        let mut target_num_replicas = self.target_num_replicas.lock();
        let advanced = self.hysteresis.lock().advance(
            raw_target as i64,
            *target_num_replicas as i64,
            self.scale_up_consecutive_periods,
            self.scale_down_consecutive_periods,
        );
        if advanced {
            *target_num_replicas = raw_target;
        }
        *target_num_replicas
    }

    fn spot_override(&self, zone: String) -> ReplicaOverride {
        ReplicaOverride::Spot { zone }
    }
}

#[async_trait]
impl ScalingEngine for SpotRequestRateAutoscaler {
    async fn ingest_request_info(&self, batch: RequestBatch, now: f64) {
        self.meter.lock().ingest(batch, now);
    }

    async fn handle_preemption_history(&self, history: &[String]) {
        self.placer.handle_preemption_history(history);
    }

    async fn evaluate(&self, replica_infos: &[ReplicaInfo], now: f64) -> Vec<AutoscalerDecision> {
        let alive_replica_infos: Vec<&ReplicaInfo> =
            replica_infos.iter().filter(|info| info.counts_as_alive()).collect();
        let num_replicas = alive_replica_infos.len() as u32;

        if num_replicas >= self.min_replicas {
            if !self.hysteresis.lock().cooldown_elapsed(now) {
                info!(
                    num_replicas,
                    min_replicas = self.min_replicas,
                    "cooldown period has not passed since last scaling operation, skipping"
                );
                return Vec::new();
            }
        } else {
            // Bootstrap: burst straight to target + over-provisioning, one
            // replica per decision, each pinned to a freshly chosen zone.
            // Counters and cooldown are untouched.
            let target = *self.target_num_replicas.lock();
            let burst = target + self.over_provision_num;
            let mut decisions = Vec::with_capacity(burst as usize);
            for _ in 0..burst {
                match self.placer.select() {
                    Ok(zone) => {
                        info!(zone = %zone, "chosen zone for bootstrap replica");
                        decisions.push(AutoscalerDecision::scale_up_with(1, self.spot_override(zone)));
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "spot placer failed during bootstrap, skipping replica");
                    }
                }
            }
            return decisions;
        }

        let target_num_replicas = self.desired_num_replicas(num_replicas);
        info!(target_num_replicas, "current target number of replicas");

        let (mut num_alive_spot, mut num_ready_spot, mut num_on_demand) = (0u32, 0u32, 0u32);
        for info in &alive_replica_infos {
            if info.is_spot {
                if info.status == ReplicaStatus::Ready {
                    num_ready_spot += 1;
                }
                num_alive_spot += 1;
            } else {
                num_on_demand += 1;
            }
        }
        info!(num_alive_spot, num_ready_spot, num_on_demand, "replica composition");

        let mut decisions = Vec::new();
        let num_to_provision = target_num_replicas + self.over_provision_num;

        if num_alive_spot < num_to_provision {
            let shortfall = num_to_provision - num_alive_spot;
            decisions.push(AutoscalerDecision::scale_up_with(shortfall, ReplicaOverride::OnDemand));
            for _ in 0..shortfall {
                match self.placer.select() {
                    Ok(zone) => {
                        info!(zone = %zone, "chosen zone for spot replica");
                        decisions.push(AutoscalerDecision::scale_up_with(1, self.spot_override(zone)));
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "spot placer failed, relying on on-demand fallback");
                    }
                }
            }
        } else if num_alive_spot > num_to_provision {
            let num_spot_to_scale_down = (num_alive_spot - num_to_provision) as usize;
            let spot_infos: Vec<ReplicaInfo> = alive_replica_infos
                .iter()
                .filter(|info| info.is_spot)
                .map(|info| (*info).clone())
                .collect();
            let ids = choose_scale_down_by_alive_order(&spot_infos, num_spot_to_scale_down);
            if !ids.is_empty() {
                decisions.push(AutoscalerDecision::scale_down(ids));
            }
        } else if num_ready_spot + num_on_demand >= num_to_provision {
            let num_on_demand_to_scale_down =
                (num_ready_spot + num_on_demand - num_to_provision) as usize;
            let on_demand_infos: Vec<ReplicaInfo> = alive_replica_infos
                .iter()
                .filter(|info| !info.is_spot)
                .map(|info| (*info).clone())
                .collect();
            let ids = choose_scale_down_by_alive_order(&on_demand_infos, num_on_demand_to_scale_down);
            if !ids.is_empty() {
                decisions.push(AutoscalerDecision::scale_down(ids));
            }
        }

        if !decisions.is_empty() {
            self.hysteresis.lock().record_scale_operation(now);
        }
        decisions
    }

    fn name(&self) -> &str {
        "spot-request-rate"
    }
}

/// Choose `num_limit` replica IDs from `infos`, preferring the order of
/// [`ReplicaStatus::ALIVE_STATUSES`] (least-invested first), falling back to
/// input order for any status outside that set.
fn choose_scale_down_by_alive_order(
    infos: &[ReplicaInfo],
    num_limit: usize,
) -> Vec<crate::types::ReplicaId> {
    let mut chosen = Vec::with_capacity(num_limit);
    for target_status in ReplicaStatus::ALIVE_STATUSES {
        for info in infos {
            if chosen.len() >= num_limit {
                return chosen;
            }
            if info.status == target_status && !chosen.contains(&info.replica_id) {
                chosen.push(info.replica_id);
            }
        }
    }
    for info in infos {
        if chosen.len() >= num_limit {
            return chosen;
        }
        if !info.status.is_alive_status() && !chosen.contains(&info.replica_id) {
            chosen.push(info.replica_id);
        }
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placer::FallbackPlacer;
    use crate::types::{ReplicaId, ServiceSpec, SpotPlacerKind};

    fn ready(id: u64) -> ReplicaInfo {
        ReplicaInfo::new(id, ReplicaStatus::Ready).with_alive(true)
    }

    #[test]
    fn test_hysteresis_requires_consecutive_streak() {
        let mut h = Hysteresis::new(0);
        assert!(!h.advance(10, 5, 3, 3));
        assert!(!h.advance(10, 5, 3, 3));
        assert!(h.advance(10, 5, 3, 3));
    }

    #[test]
    fn test_hysteresis_opposite_tick_resets_counter() {
        let mut h = Hysteresis::new(0);
        assert!(!h.advance(10, 5, 3, 3));
        assert!(!h.advance(2, 5, 3, 3));
        assert!(!h.advance(10, 5, 3, 3));
        assert!(!h.advance(10, 5, 3, 3));
        assert!(h.advance(10, 5, 3, 3));
    }

    #[test]
    fn test_choose_scale_down_prefers_failed_first() {
        let infos = vec![
            ready(1),
            ReplicaInfo::new(2u64, ReplicaStatus::Failed).with_alive(false),
            ready(3),
            ready(4),
        ];
        let ids = choose_scale_down_ids(&infos, 2);
        assert_eq!(ids, vec![ReplicaId::new(2), ReplicaId::new(1)]);
    }

    #[tokio::test]
    async fn test_no_op_within_band() {
        // window=60, rps=10 -> 600 timestamps in-window; 5 replicas -> 2 req/s/replica,
        // within the [1.0, 3.0] band, and 5 is within [min=1, max=5] so no clamp kicks in.
        let spec = ServiceSpec::fixed(5).with_bounds(1, 5).with_thresholds(Some(3.0), Some(1.0));
        let autoscaler = RequestRateAutoscaler::new(&spec, 0, 60);
        let now = 1_000_000.0;
        let timestamps: Vec<f64> = (0..600).map(|_| now - 1.0).collect();
        autoscaler.ingest_request_info(RequestBatch::new(timestamps), now).await;
        let infos: Vec<ReplicaInfo> = (1..=5).map(ready).collect();
        let decisions = autoscaler.evaluate(&infos, now).await;
        assert!(decisions.is_empty());
    }

    #[tokio::test]
    async fn test_scale_down_with_failed_priority() {
        // window=4, 4 timestamps in-window -> rps=1; n=4 -> per_replica=0.25 < lower(1).
        let spec = ServiceSpec::fixed(4).with_bounds(1, 10).with_thresholds(Some(5.0), Some(1.0));
        let autoscaler = RequestRateAutoscaler::new(&spec, 0, 4);
        autoscaler
            .ingest_request_info(RequestBatch::new(vec![1.0, 2.0, 3.0, 4.0]), 4.0)
            .await;
        let infos = vec![
            ready(11),
            ReplicaInfo::new(12u64, ReplicaStatus::Failed).with_alive(false),
            ready(13),
            ready(14),
        ];
        let decisions = autoscaler.evaluate(&infos, 4.0).await;
        assert_eq!(decisions.len(), 1);
        match &decisions[0] {
            AutoscalerDecision::ScaleDown { replica_ids } => {
                assert_eq!(
                    replica_ids,
                    &vec![ReplicaId::new(12), ReplicaId::new(11), ReplicaId::new(13)]
                );
            }
            other => panic!("expected ScaleDown, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bootstrap_bypasses_cooldown() {
        let spec = ServiceSpec::fixed(2)
            .with_bounds(2, 10)
            .with_spot(5.0, vec!["us-east-a"], SpotPlacerKind::Fallback);
        let placer: Arc<dyn SpotPlacer> = Arc::new(FallbackPlacer::new(vec!["us-east-a".to_string()]));
        let autoscaler =
            SpotRequestRateAutoscaler::new(&spec, placer, 60, 600, 60, 300, 6000, 1);
        let decisions = autoscaler.evaluate(&[], 1_000_000.0).await;
        // target_num_replicas starts at min_replicas=2, plus over-provision 1.
        assert_eq!(decisions.len(), 3);
        assert!(decisions.iter().all(|d| d.is_scale_up()));
    }
}
