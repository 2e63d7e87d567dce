//! Spot zone placement with preemption memory
//!
//! ## Table of Contents
//! - **SpotPlacer**: Trait for choosing a zone for new spot capacity
//! - **EvenSpreadPlacer**: Round-robin/least-count placement
//! - **PreemptionAwarePlacer**: Avoids zones with a recent preemption history
//! - **FallbackPlacer**: Always picks the first configured zone

use crate::error::{AutoscalerError, Result};
use crate::types::SpotPlacerKind;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Chooses availability zones for new spot capacity and remembers which
/// zones have recently preempted replicas.
///
/// Implementations must be `Send + Sync`: a single placer instance is shared
/// (via `Arc`) by the autoscaler that owns it, the same way this codebase's
/// region router shares lock-guarded routing state across call sites.
pub trait SpotPlacer: Send + Sync {
    /// Choose a zone to place the next spot replica in.
    ///
    /// Returns [`AutoscalerError::EmptyZoneSet`] if no zones are configured.
    fn select(&self) -> Result<String>;

    /// Record a preemption observed in `zone`.
    fn handle_preemption(&self, zone: &str);

    /// Apply a history of preemption events in order.
    fn handle_preemption_history(&self, history: &[String]) {
        for zone in history {
            self.handle_preemption(zone);
        }
    }

    /// Placer name, for logging.
    fn name(&self) -> &str;

    /// The configured zone set.
    fn zones(&self) -> &[String];
}

/// Construct a placer of the requested kind over the given zones.
pub fn build_placer(kind: SpotPlacerKind, zones: Vec<String>) -> Box<dyn SpotPlacer> {
    match kind {
        SpotPlacerKind::EvenSpread => Box::new(EvenSpreadPlacer::new(zones)),
        SpotPlacerKind::PreemptionAware => Box::new(PreemptionAwarePlacer::new(zones)),
        SpotPlacerKind::Fallback => Box::new(FallbackPlacer::new(zones)),
    }
}

/// Per-zone preemption bookkeeping shared by all placer variants below.
struct ZoneState {
    zones: Vec<String>,
    preemption_counts: RwLock<HashMap<String, u64>>,
}

impl ZoneState {
    fn new(zones: Vec<String>) -> Self {
        let preemption_counts = zones.iter().map(|z| (z.clone(), 0)).collect();
        Self {
            zones,
            preemption_counts: RwLock::new(preemption_counts),
        }
    }

    fn record_preemption(&self, zone: &str) {
        let mut counts = self.preemption_counts.write();
        *counts.entry(zone.to_string()).or_insert(0) += 1;
    }

    fn count(&self, zone: &str) -> u64 {
        self.preemption_counts.read().get(zone).copied().unwrap_or(0)
    }
}

/// Spreads new spot capacity across zones by picking the zone with the
/// fewest replicas placed so far (tracked here as a round-robin counter,
/// since the placer itself does not observe live replica counts).
pub struct EvenSpreadPlacer {
    state: ZoneState,
    next: RwLock<usize>,
}

impl EvenSpreadPlacer {
    /// Create a new even-spread placer over the given zones.
    pub fn new(zones: Vec<String>) -> Self {
        Self {
            state: ZoneState::new(zones),
            next: RwLock::new(0),
        }
    }
}

impl SpotPlacer for EvenSpreadPlacer {
    fn select(&self) -> Result<String> {
        if self.state.zones.is_empty() {
            warn!("even-spread placer asked to select with no zones configured");
            return Err(AutoscalerError::EmptyZoneSet);
        }
        let mut next = self.next.write();
        let zone = self.state.zones[*next % self.state.zones.len()].clone();
        *next = next.wrapping_add(1);
        debug!(zone = %zone, placer = self.name(), "selected zone");
        Ok(zone)
    }

    fn handle_preemption(&self, zone: &str) {
        self.state.record_preemption(zone);
    }

    fn name(&self) -> &str {
        "even_spread"
    }

    fn zones(&self) -> &[String] {
        &self.state.zones
    }
}

/// Picks the zone with the fewest recorded preemptions, tie-broken
/// lexicographically by zone name for determinism.
pub struct PreemptionAwarePlacer {
    state: ZoneState,
}

impl PreemptionAwarePlacer {
    /// Create a new preemption-aware placer over the given zones.
    pub fn new(zones: Vec<String>) -> Self {
        Self {
            state: ZoneState::new(zones),
        }
    }
}

impl SpotPlacer for PreemptionAwarePlacer {
    fn select(&self) -> Result<String> {
        if self.state.zones.is_empty() {
            warn!("preemption-aware placer asked to select with no zones configured");
            return Err(AutoscalerError::EmptyZoneSet);
        }
        let zone = self
            .state
            .zones
            .iter()
            .map(|z| (z, self.state.count(z)))
            .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(z, _)| z.clone())
            .expect("zones is non-empty");
        debug!(zone = %zone, placer = self.name(), "selected zone");
        Ok(zone)
    }

    fn handle_preemption(&self, zone: &str) {
        self.state.record_preemption(zone);
    }

    fn name(&self) -> &str {
        "preemption_aware"
    }

    fn zones(&self) -> &[String] {
        &self.state.zones
    }
}

/// Always places in the first configured zone; preemption history is
/// still recorded for observability but never changes the selection.
pub struct FallbackPlacer {
    state: ZoneState,
}

impl FallbackPlacer {
    /// Create a new fallback placer over the given zones.
    pub fn new(zones: Vec<String>) -> Self {
        Self {
            state: ZoneState::new(zones),
        }
    }
}

impl SpotPlacer for FallbackPlacer {
    fn select(&self) -> Result<String> {
        self.state
            .zones
            .first()
            .cloned()
            .ok_or(AutoscalerError::EmptyZoneSet)
    }

    fn handle_preemption(&self, zone: &str) {
        self.state.record_preemption(zone);
    }

    fn name(&self) -> &str {
        "fallback"
    }

    fn zones(&self) -> &[String] {
        &self.state.zones
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_spread_round_robins() {
        let placer = EvenSpreadPlacer::new(vec!["a".into(), "b".into()]);
        assert_eq!(placer.select().unwrap(), "a");
        assert_eq!(placer.select().unwrap(), "b");
        assert_eq!(placer.select().unwrap(), "a");
    }

    #[test]
    fn test_empty_zone_set_errors() {
        let placer = EvenSpreadPlacer::new(vec![]);
        assert!(matches!(placer.select(), Err(AutoscalerError::EmptyZoneSet)));
    }

    #[test]
    fn test_preemption_aware_avoids_preempted_zone() {
        let placer = PreemptionAwarePlacer::new(vec!["us-east-a".into(), "us-east-b".into()]);
        placer.handle_preemption_history(&["us-east-a".into(), "us-east-a".into()]);
        assert_eq!(placer.select().unwrap(), "us-east-b");
    }

    #[test]
    fn test_preemption_aware_tie_break_is_lexicographic() {
        let placer = PreemptionAwarePlacer::new(vec!["z-zone".into(), "a-zone".into()]);
        assert_eq!(placer.select().unwrap(), "a-zone");
    }

    #[test]
    fn test_fallback_always_picks_first_zone() {
        let placer = FallbackPlacer::new(vec!["us-east-a".into(), "us-east-b".into()]);
        placer.handle_preemption("us-east-a");
        assert_eq!(placer.select().unwrap(), "us-east-a");
    }

    #[test]
    fn test_zone_never_outside_configured_set() {
        let placer = PreemptionAwarePlacer::new(vec!["a".into(), "b".into(), "c".into()]);
        for _ in 0..10 {
            let zone = placer.select().unwrap();
            assert!(placer.zones().contains(&zone));
            placer.handle_preemption(&zone);
        }
    }
}
