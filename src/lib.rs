//! # Replica Autoscaler
//!
//! A decision engine for scaling a replicated service: a sliding-window
//! request-rate meter, a fixed-threshold autoscaler, and a spot-placement-aware
//! target-QPS autoscaler with consecutive-period hysteresis and an on-demand
//! fallback.
//!
//! ## Features
//!
//! - **Request-rate meter**: trailing-window request timestamp tracking
//! - **Threshold autoscaler**: scale on upper/lower RPS-per-replica bounds
//! - **Spot autoscaler**: target-QPS scaling with zone placement and preemption memory
//! - **Hysteresis**: consecutive-period gating to avoid oscillation
//! - **Metrics**: Prometheus-compatible counters and gauges
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use replica_autoscaler::{AutoscalerBuilder, AutoscalerRegistry, ServiceSpec};
//!
//! #[tokio::main]
//! async fn main() -> replica_autoscaler::Result<()> {
//!     let spec = ServiceSpec::fixed(2)
//!         .with_bounds(1, 10)
//!         .with_thresholds(Some(5.0), Some(1.0));
//!
//!     let engine = AutoscalerBuilder::new(spec).with_cooldown(60).build()?;
//!
//!     let registry = AutoscalerRegistry::new();
//!     registry.register("my-service", engine).await;
//!
//!     let decisions = registry.evaluate("my-service", &[], 0.0).await?;
//!     println!("{decisions:?}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod autoscaler;
pub mod builder;
pub mod decision;
pub mod error;
pub mod meter;
pub mod metrics;
pub mod placer;
pub mod registry;
pub mod types;

// Re-exports for ergonomic API
pub use autoscaler::{Hysteresis, RequestRateAutoscaler, ScalingEngine, SpotRequestRateAutoscaler};
pub use builder::AutoscalerBuilder;
pub use decision::{AutoscalerDecision, ReplicaOverride};
pub use error::{AutoscalerError, Result};
pub use meter::{RequestBatch, RequestRateMeter};
pub use metrics::AutoscalerMetrics;
pub use placer::{build_placer, EvenSpreadPlacer, FallbackPlacer, PreemptionAwarePlacer, SpotPlacer};
pub use registry::AutoscalerRegistry;
pub use types::{ReplicaId, ReplicaInfo, ReplicaStatus, ServiceSpec, SpotPlacerKind};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::autoscaler::ScalingEngine;
    pub use crate::builder::AutoscalerBuilder;
    pub use crate::decision::{AutoscalerDecision, ReplicaOverride};
    pub use crate::error::Result;
    pub use crate::meter::RequestBatch;
    pub use crate::registry::AutoscalerRegistry;
    pub use crate::types::{ReplicaInfo, ReplicaStatus, ServiceSpec};
}
