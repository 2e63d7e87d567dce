//! Autoscaling decision model
//!
//! ## Table of Contents
//! - **ReplicaOverride**: Typed override merged into a new replica's launch template
//! - **AutoscalerDecision**: The two decisions a tick can emit

use crate::types::ReplicaId;
use serde::{Deserialize, Serialize};

/// Override merged into the service's default replica template when
/// launching new capacity.
///
/// Modeled as a proper sum type of the shapes the engine actually produces,
/// rather than an untyped `map<string, any>`: a fixed-threshold scale-up
/// carries no override, a spot scale-up pins the placement zone, and an
/// on-demand fallback just disables spot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplicaOverride {
    /// No override; use the service's default template unchanged.
    None,
    /// Launch on a specific spot zone.
    Spot {
        /// Placement zone chosen by the spot placer.
        zone: String,
    },
    /// Launch on-demand (non-preemptible) capacity.
    OnDemand,
}

impl ReplicaOverride {
    /// Whether this override requests spot capacity.
    pub fn uses_spot(&self) -> bool {
        matches!(self, Self::Spot { .. })
    }

    /// Render as a `serde_json::Value` map the way a controller merging this
    /// into an external launch template would expect to receive it.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::None => serde_json::json!({}),
            Self::Spot { zone } => serde_json::json!({
                "use_spot": true,
                "spot_recovery": serde_json::Value::Null,
                "zone": zone,
            }),
            Self::OnDemand => serde_json::json!({
                "use_spot": false,
                "spot_recovery": serde_json::Value::Null,
            }),
        }
    }
}

/// A single autoscaling decision emitted by one `evaluate` tick.
///
/// Decisions within one tick's returned list are ordered and MUST be
/// executed by the controller in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AutoscalerDecision {
    /// Launch `count` new replicas, merging `override_` into the template.
    ScaleUp {
        /// Number of replicas to create. Always `>= 1`.
        count: u32,
        /// Override to merge into the replica launch template.
        override_: ReplicaOverride,
    },
    /// Terminate exactly these replica IDs, in the given order.
    ScaleDown {
        /// Non-empty, duplicate-free list of replica IDs to terminate.
        replica_ids: Vec<ReplicaId>,
    },
}

impl AutoscalerDecision {
    /// Construct a scale-up decision with no override.
    pub fn scale_up(count: u32) -> Self {
        Self::ScaleUp {
            count,
            override_: ReplicaOverride::None,
        }
    }

    /// Construct a scale-up decision with an override.
    pub fn scale_up_with(count: u32, override_: ReplicaOverride) -> Self {
        Self::ScaleUp { count, override_ }
    }

    /// Construct a scale-down decision.
    pub fn scale_down(replica_ids: Vec<ReplicaId>) -> Self {
        Self::ScaleDown { replica_ids }
    }

    /// Whether this decision is a scale-up.
    pub fn is_scale_up(&self) -> bool {
        matches!(self, Self::ScaleUp { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replica_override_json_spot() {
        let o = ReplicaOverride::Spot {
            zone: "us-east-a".to_string(),
        };
        let json = o.to_json();
        assert_eq!(json["use_spot"], true);
        assert_eq!(json["zone"], "us-east-a");
    }

    #[test]
    fn test_replica_override_json_on_demand() {
        let o = ReplicaOverride::OnDemand;
        assert_eq!(o.to_json()["use_spot"], false);
    }

    #[test]
    fn test_decision_constructors() {
        let up = AutoscalerDecision::scale_up(3);
        assert!(up.is_scale_up());

        let down = AutoscalerDecision::scale_down(vec![ReplicaId::new(1), ReplicaId::new(2)]);
        assert!(!down.is_scale_up());
    }
}
