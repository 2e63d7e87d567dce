//! Core data model consumed by the autoscaler
//!
//! ## Table of Contents
//! - **ReplicaId**: Unique identifier for a service replica
//! - **ReplicaStatus**: Closed lifecycle enum for a replica
//! - **ReplicaInfo**: Read-only snapshot of one replica, as seen by a tick
//! - **ServiceSpec**: Read-only service configuration the autoscaler is built from

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a service replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReplicaId(pub u64);

impl ReplicaId {
    /// Create a new replica ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "replica-{}", self.0)
    }
}

impl From<u64> for ReplicaId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Lifecycle status of a replica.
///
/// This is a closed enum: any wire value outside it is rejected by
/// [`ReplicaStatus::parse`] rather than represented, and the caller treats the
/// rejection as a non-alive, non-`Failed` replica (see `InvalidReplicaStatus`
/// in the crate's error handling design).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaStatus {
    /// Replica record created, not yet provisioned.
    Pending,
    /// Cloud resources are being provisioned.
    Provisioning,
    /// Resources exist, workload is starting.
    Starting,
    /// Workload is up but not yet passing health checks.
    NotReady,
    /// Workload is up and healthy.
    Ready,
    /// Workload is being shut down.
    ShuttingDown,
    /// Replica failed and will not recover on its own.
    Failed,
    /// Wire value outside the known set. Never produced by constructing code
    /// in this crate; only [`ReplicaStatus::parse`] returns it, for a status
    /// string the replica manager reported that this closed enum has no
    /// variant for. Treated as non-alive, non-`Failed`.
    #[serde(other)]
    Unknown,
}

impl ReplicaStatus {
    /// The ordered subset of statuses considered "alive but not yet warm",
    /// in least-invested-first order. Used to prioritize scale-down
    /// candidates: a `Pending` replica is cheaper to discard than a `Ready` one.
    pub const ALIVE_STATUSES: [ReplicaStatus; 4] = [
        ReplicaStatus::Pending,
        ReplicaStatus::Provisioning,
        ReplicaStatus::Starting,
        ReplicaStatus::Ready,
    ];

    /// Whether this status is one of [`Self::ALIVE_STATUSES`].
    pub fn is_alive_status(&self) -> bool {
        Self::ALIVE_STATUSES.contains(self)
    }

    /// Parse a wire status string from the replica manager.
    ///
    /// Unrecognized values are logged and mapped to [`Self::Unknown`] rather
    /// than rejected: a bad or newly-added status string on one replica must
    /// not fail the whole tick (see `InvalidReplicaStatus` in the crate's
    /// error handling design).
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PENDING" => Self::Pending,
            "PROVISIONING" => Self::Provisioning,
            "STARTING" => Self::Starting,
            "NOT_READY" => Self::NotReady,
            "READY" => Self::Ready,
            "SHUTTING_DOWN" => Self::ShuttingDown,
            "FAILED" => Self::Failed,
            other => {
                tracing::warn!(status = other, "unrecognized replica status, treating as non-alive");
                Self::Unknown
            }
        }
    }
}

impl fmt::Display for ReplicaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Provisioning => "PROVISIONING",
            Self::Starting => "STARTING",
            Self::NotReady => "NOT_READY",
            Self::Ready => "READY",
            Self::ShuttingDown => "SHUTTING_DOWN",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

/// Read-only snapshot of one replica as reported to the autoscaler for a tick.
///
/// This mirrors the read-shape of the externally persisted replica state;
/// the autoscaler never writes it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaInfo {
    /// Unique replica identifier.
    pub replica_id: ReplicaId,
    /// Current lifecycle status.
    pub status: ReplicaStatus,
    /// Whether this replica runs on a spot/preemptible instance.
    pub is_spot: bool,
    /// Whether the replica manager still considers this replica alive
    /// (distinct from `status`; a replica can be alive and `NotReady`).
    pub is_alive: bool,
    /// Availability zone the replica was placed in, if known.
    pub zone: Option<String>,
}

impl ReplicaInfo {
    /// Create a new replica snapshot.
    pub fn new(replica_id: impl Into<ReplicaId>, status: ReplicaStatus) -> Self {
        Self {
            replica_id: replica_id.into(),
            status,
            is_spot: false,
            is_alive: matches!(status, ReplicaStatus::Ready | ReplicaStatus::NotReady)
                || status.is_alive_status(),
            zone: None,
        }
    }

    /// Mark this replica as running on spot capacity.
    pub fn with_spot(mut self, is_spot: bool) -> Self {
        self.is_spot = is_spot;
        self
    }

    /// Override the alive flag explicitly.
    pub fn with_alive(mut self, is_alive: bool) -> Self {
        self.is_alive = is_alive;
        self
    }

    /// Set the placement zone.
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Whether the spot autoscaler should count this replica as alive:
    /// either the replica manager says so, or it's `NotReady` (still
    /// booting, but not yet failed).
    pub fn counts_as_alive(&self) -> bool {
        self.is_alive || self.status == ReplicaStatus::NotReady
    }
}

/// Which spot placement strategy a service should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpotPlacerKind {
    /// Spread new capacity evenly across zones by least-used count.
    EvenSpread,
    /// Avoid zones with a recent history of preemptions.
    PreemptionAware,
    /// Always place in the first configured zone.
    Fallback,
}

impl Default for SpotPlacerKind {
    fn default() -> Self {
        Self::PreemptionAware
    }
}

/// Read-only service configuration the autoscaler is constructed from.
///
/// Corresponds to the subset of a service's spec the autoscaling core reads;
/// YAML parsing and the rest of the service definition are out of scope here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Minimum number of replicas to maintain.
    pub min_replicas: u32,
    /// Maximum number of replicas. Defaults to `min_replicas` if unset.
    pub max_replicas: Option<u32>,
    /// Upper RPS-per-replica threshold that triggers scale-up.
    pub qps_upper_threshold: Option<f64>,
    /// Lower RPS-per-replica threshold that triggers scale-down.
    pub qps_lower_threshold: Option<f64>,
    /// Target RPS per replica for the spot autoscaler.
    pub target_qps_per_replica: Option<f64>,
    /// Spot placement strategy, if this service uses spot capacity.
    pub spot_placer_kind: Option<SpotPlacerKind>,
    /// Candidate zones for spot placement.
    pub spot_zones: Option<Vec<String>>,
}

impl ServiceSpec {
    /// Create a fixed-replica-count spec with no thresholds configured.
    pub fn fixed(replicas: u32) -> Self {
        Self {
            min_replicas: replicas,
            max_replicas: None,
            qps_upper_threshold: None,
            qps_lower_threshold: None,
            target_qps_per_replica: None,
            spot_placer_kind: None,
            spot_zones: None,
        }
    }

    /// Set bounds.
    pub fn with_bounds(mut self, min: u32, max: u32) -> Self {
        self.min_replicas = min;
        self.max_replicas = Some(max);
        self
    }

    /// Set request-rate thresholds.
    pub fn with_thresholds(mut self, upper: Option<f64>, lower: Option<f64>) -> Self {
        self.qps_upper_threshold = upper;
        self.qps_lower_threshold = lower;
        self
    }

    /// Configure spot placement.
    pub fn with_spot(
        mut self,
        target_qps_per_replica: f64,
        zones: Vec<impl Into<String>>,
        kind: SpotPlacerKind,
    ) -> Self {
        self.target_qps_per_replica = Some(target_qps_per_replica);
        self.spot_zones = Some(zones.into_iter().map(|z| z.into()).collect());
        self.spot_placer_kind = Some(kind);
        self
    }

    /// Resolved max replicas, defaulting to `min_replicas`.
    pub fn max_replicas(&self) -> u32 {
        self.max_replicas.unwrap_or(self.min_replicas).max(self.min_replicas)
    }

    /// Validate the invariants this spec must satisfy before constructing an autoscaler.
    pub fn validate(&self) -> crate::error::Result<()> {
        if let Some(max) = self.max_replicas {
            if max < self.min_replicas {
                return Err(crate::error::AutoscalerError::config(format!(
                    "max_replicas ({max}) cannot be less than min_replicas ({})",
                    self.min_replicas
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replica_id_display() {
        assert_eq!(ReplicaId::new(42).to_string(), "replica-42");
    }

    #[test]
    fn test_alive_statuses_order() {
        let order = ReplicaStatus::ALIVE_STATUSES;
        assert_eq!(order[0], ReplicaStatus::Pending);
        assert_eq!(order[3], ReplicaStatus::Ready);
        assert!(!ReplicaStatus::Failed.is_alive_status());
    }

    #[test]
    fn test_parse_known_statuses() {
        assert_eq!(ReplicaStatus::parse("READY"), ReplicaStatus::Ready);
        assert_eq!(ReplicaStatus::parse("FAILED"), ReplicaStatus::Failed);
    }

    #[test]
    fn test_parse_unknown_status_is_non_alive_non_failed() {
        let status = ReplicaStatus::parse("TOTALLY_MADE_UP");
        assert_eq!(status, ReplicaStatus::Unknown);
        assert!(!status.is_alive_status());
        assert_ne!(status, ReplicaStatus::Failed);
    }

    #[test]
    fn test_counts_as_alive() {
        let info = ReplicaInfo::new(1u64, ReplicaStatus::NotReady).with_alive(false);
        assert!(info.counts_as_alive());

        let info = ReplicaInfo::new(2u64, ReplicaStatus::Failed).with_alive(false);
        assert!(!info.counts_as_alive());
    }

    #[test]
    fn test_service_spec_max_defaults_to_min() {
        let spec = ServiceSpec::fixed(3);
        assert_eq!(spec.max_replicas(), 3);
    }

    #[test]
    fn test_service_spec_validate_rejects_max_below_min() {
        let spec = ServiceSpec::fixed(5).with_bounds(5, 2);
        assert!(spec.validate().is_err());
    }
}
