//! AutoscalerBuilder for configuring and constructing scaling engines
//!
//! ## Table of Contents
//! - **AutoscalerBuilder**: Builder pattern for tuning constants + service spec

use crate::autoscaler::{RequestRateAutoscaler, ScalingEngine, SpotRequestRateAutoscaler};
use crate::error::{AutoscalerError, Result};
use crate::placer::{build_placer, SpotPlacer};
use crate::types::ServiceSpec;
use std::sync::Arc;
use tracing::info;

const DEFAULT_FREQUENCY_SECS: u64 = 60;
const DEFAULT_COOLDOWN_SECS: u64 = 60;
const DEFAULT_RPS_WINDOW_SIZE_SECS: u64 = 60;
const DEFAULT_UPSCALE_DELAY_SECS: u64 = 300;
const DEFAULT_DOWNSCALE_DELAY_SECS: u64 = 6000;
const DEFAULT_OVER_PROVISION_NUM: u32 = 1;

/// Builds a [`ScalingEngine`] from a [`ServiceSpec`] and a set of tuning
/// constants, choosing the fixed-threshold or spot-aware variant based on
/// whether the spec carries `target_qps_per_replica`.
pub struct AutoscalerBuilder {
    spec: ServiceSpec,
    frequency_secs: u64,
    cooldown_secs: u64,
    rps_window_size_secs: u64,
    upscale_delay_secs: u64,
    downscale_delay_secs: u64,
    over_provision_num: u32,
    placer: Option<Arc<dyn SpotPlacer>>,
}

impl AutoscalerBuilder {
    /// Start building an autoscaler for the given service spec.
    pub fn new(spec: ServiceSpec) -> Self {
        Self {
            spec,
            frequency_secs: DEFAULT_FREQUENCY_SECS,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            rps_window_size_secs: DEFAULT_RPS_WINDOW_SIZE_SECS,
            upscale_delay_secs: DEFAULT_UPSCALE_DELAY_SECS,
            downscale_delay_secs: DEFAULT_DOWNSCALE_DELAY_SECS,
            over_provision_num: DEFAULT_OVER_PROVISION_NUM,
            placer: None,
        }
    }

    /// Set the evaluation frequency in seconds.
    pub fn with_frequency(mut self, secs: u64) -> Self {
        self.frequency_secs = secs;
        self
    }

    /// Set the cooldown between scaling operations in seconds.
    pub fn with_cooldown(mut self, secs: u64) -> Self {
        self.cooldown_secs = secs;
        self
    }

    /// Set the request-rate window size in seconds.
    pub fn with_rps_window_size(mut self, secs: u64) -> Self {
        self.rps_window_size_secs = secs;
        self
    }

    /// Set the upscale hysteresis delay in seconds (spot variant only).
    pub fn with_upscale_delay(mut self, secs: u64) -> Self {
        self.upscale_delay_secs = secs;
        self
    }

    /// Set the downscale hysteresis delay in seconds (spot variant only).
    pub fn with_downscale_delay(mut self, secs: u64) -> Self {
        self.downscale_delay_secs = secs;
        self
    }

    /// Set the number of spare replicas provisioned above target (spot variant only).
    pub fn with_over_provision_num(mut self, n: u32) -> Self {
        self.over_provision_num = n;
        self
    }

    /// Supply a pre-built spot placer instead of constructing one from
    /// `spec.spot_placer_kind`/`spec.spot_zones`.
    pub fn with_placer(mut self, placer: Arc<dyn SpotPlacer>) -> Self {
        self.placer = Some(placer);
        self
    }

    /// Validate the spec and tuning constants and construct the engine.
    pub fn build(self) -> Result<Arc<dyn ScalingEngine>> {
        self.spec.validate()?;
        if self.frequency_secs == 0 {
            return Err(AutoscalerError::config("frequency must be greater than zero"));
        }

        match self.spec.target_qps_per_replica {
            Some(_) => {
                let zones = self.spec.spot_zones.clone().unwrap_or_default();
                if zones.is_empty() {
                    return Err(AutoscalerError::config(
                        "spot autoscaler requires at least one configured zone",
                    ));
                }
                let placer = match self.placer {
                    Some(placer) => placer,
                    None => Arc::from(build_placer(self.spec.spot_placer_kind.unwrap_or_default(), zones)),
                };
                info!(
                    min_replicas = self.spec.min_replicas,
                    max_replicas = self.spec.max_replicas(),
                    "building spot-aware target-QPS autoscaler"
                );
                Ok(Arc::new(SpotRequestRateAutoscaler::new(
                    &self.spec,
                    placer,
                    self.frequency_secs,
                    self.cooldown_secs,
                    self.rps_window_size_secs,
                    self.upscale_delay_secs,
                    self.downscale_delay_secs,
                    self.over_provision_num,
                )))
            }
            None => {
                info!(
                    min_replicas = self.spec.min_replicas,
                    max_replicas = self.spec.max_replicas(),
                    "building fixed-threshold request-rate autoscaler"
                );
                Ok(Arc::new(RequestRateAutoscaler::new(
                    &self.spec,
                    self.cooldown_secs,
                    self.rps_window_size_secs,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpotPlacerKind;

    #[test]
    fn test_builder_default_threshold_autoscaler() {
        let spec = ServiceSpec::fixed(2).with_bounds(1, 5).with_thresholds(Some(5.0), Some(1.0));
        let engine = AutoscalerBuilder::new(spec).build();
        assert!(engine.is_ok());
        assert_eq!(engine.unwrap().name(), "request-rate");
    }

    #[test]
    fn test_builder_spot_autoscaler_requires_zones() {
        let spec = ServiceSpec::fixed(2).with_bounds(1, 5).with_spot(
            5.0,
            Vec::<String>::new(),
            SpotPlacerKind::PreemptionAware,
        );
        let engine = AutoscalerBuilder::new(spec).build();
        assert!(engine.is_err());
    }

    #[test]
    fn test_builder_spot_autoscaler_builds_with_zones() {
        let spec = ServiceSpec::fixed(2).with_bounds(1, 5).with_spot(
            5.0,
            vec!["us-east-a"],
            SpotPlacerKind::PreemptionAware,
        );
        let engine = AutoscalerBuilder::new(spec).build();
        assert!(engine.is_ok());
        assert_eq!(engine.unwrap().name(), "spot-request-rate");
    }

    #[test]
    fn test_builder_rejects_invalid_spec() {
        let spec = ServiceSpec::fixed(5).with_bounds(5, 2);
        let engine = AutoscalerBuilder::new(spec).build();
        assert!(engine.is_err());
    }

    #[test]
    fn test_builder_rejects_zero_frequency() {
        let spec = ServiceSpec::fixed(2).with_bounds(1, 5).with_thresholds(Some(5.0), Some(1.0));
        let engine = AutoscalerBuilder::new(spec).with_frequency(0).build();
        assert!(engine.is_err());
    }
}
