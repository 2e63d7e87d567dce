//! Multi-service autoscaler registry
//!
//! ## Table of Contents
//! - **AutoscalerRegistry**: Owns one boxed [`ScalingEngine`] per named service

use crate::autoscaler::ScalingEngine;
use crate::decision::AutoscalerDecision;
use crate::error::{AutoscalerError, Result};
use crate::meter::RequestBatch;
use crate::types::ReplicaInfo;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Owns one autoscaling engine per service name and dispatches ticks to it.
///
/// Mirrors the shape of a per-key state map shared across concurrent
/// callers: request ingestion happens on one task, evaluation ticks on
/// another, both keyed by service name.
pub struct AutoscalerRegistry {
    engines: RwLock<HashMap<String, Arc<dyn ScalingEngine>>>,
}

impl AutoscalerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            engines: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) the engine for `service_name`.
    pub async fn register(&self, service_name: impl Into<String>, engine: Arc<dyn ScalingEngine>) {
        let service_name = service_name.into();
        info!(service = %service_name, engine = engine.name(), "registered autoscaling engine");
        self.engines.write().await.insert(service_name, engine);
    }

    /// Remove the engine for `service_name`, if any.
    pub async fn deregister(&self, service_name: &str) {
        self.engines.write().await.remove(service_name);
    }

    /// Ingest a batch of request timestamps for `service_name`.
    pub async fn ingest_request_info(
        &self,
        service_name: &str,
        batch: RequestBatch,
        now: f64,
    ) -> Result<()> {
        let engine = self.engine_for(service_name).await?;
        engine.ingest_request_info(batch, now).await;
        Ok(())
    }

    /// Replay a spot preemption history for `service_name`.
    pub async fn handle_preemption_history(
        &self,
        service_name: &str,
        history: &[String],
    ) -> Result<()> {
        let engine = self.engine_for(service_name).await?;
        engine.handle_preemption_history(history).await;
        Ok(())
    }

    /// Evaluate `service_name`'s engine against the given replica snapshot.
    pub async fn evaluate(
        &self,
        service_name: &str,
        replica_infos: &[ReplicaInfo],
        now: f64,
    ) -> Result<Vec<AutoscalerDecision>> {
        let engine = self.engine_for(service_name).await?;
        let decisions = engine.evaluate(replica_infos, now).await;
        if !decisions.is_empty() {
            info!(
                service = %service_name,
                engine = engine.name(),
                count = decisions.len(),
                "autoscaling decisions emitted"
            );
        }
        Ok(decisions)
    }

    /// Number of registered services.
    pub async fn len(&self) -> usize {
        self.engines.read().await.len()
    }

    /// Whether the registry has no registered services.
    pub async fn is_empty(&self) -> bool {
        self.engines.read().await.is_empty()
    }

    async fn engine_for(&self, service_name: &str) -> Result<Arc<dyn ScalingEngine>> {
        self.engines
            .read()
            .await
            .get(service_name)
            .cloned()
            .ok_or_else(|| {
                warn!(service = %service_name, "no autoscaling engine registered for service");
                AutoscalerError::config(format!("no autoscaler registered for service '{service_name}'"))
            })
    }
}

impl Default for AutoscalerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autoscaler::RequestRateAutoscaler;
    use crate::types::ServiceSpec;

    #[tokio::test]
    async fn test_register_and_evaluate() {
        let registry = AutoscalerRegistry::new();
        let spec = ServiceSpec::fixed(1);
        let engine = Arc::new(RequestRateAutoscaler::new(&spec, 0, 60));
        registry.register("svc-a", engine).await;

        assert_eq!(registry.len().await, 1);
        let decisions = registry.evaluate("svc-a", &[], 100.0).await.unwrap();
        // n=0 < min_replicas=1 -> bootstrap to min_replicas, scale up by 1.
        assert_eq!(decisions, vec![AutoscalerDecision::scale_up(1)]);
    }

    #[tokio::test]
    async fn test_evaluate_unknown_service_errors() {
        let registry = AutoscalerRegistry::new();
        let result = registry.evaluate("missing", &[], 0.0).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_deregister_removes_engine() {
        let registry = AutoscalerRegistry::new();
        let spec = ServiceSpec::fixed(1);
        let engine = Arc::new(RequestRateAutoscaler::new(&spec, 0, 60));
        registry.register("svc-a", engine).await;
        registry.deregister("svc-a").await;
        assert!(registry.is_empty().await);
    }
}
