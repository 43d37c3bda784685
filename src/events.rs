// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Elastic Pathway Simulation Suite - Timed Environmental Events
//
// Transaction storms scale the main pathway's arrival rate inside their
// window. Degradations divide a pathway's capacity inside their window;
// the pre-degradation capacity is kept in a side map and written back
// exactly when the last overlapping window on that pathway closes.

use std::collections::{BTreeSet, HashMap};

use crate::config::{EventsConfig, PathwayDegradation, TransactionStorm};
use crate::network::PathwayNetwork;

#[derive(Debug, Clone, Default)]
pub struct EventSchedule {
    storms: Vec<TransactionStorm>,
    degradations: Vec<PathwayDegradation>,
    /// Capacity before the first still-open degradation window, by pathway name.
    original_capacity: HashMap<String, f64>,
}

impl EventSchedule {
    pub fn new(events: &EventsConfig) -> Self {
        Self {
            storms: events.transaction_storms.clone(),
            degradations: events.pathway_degradations.clone(),
            original_capacity: HashMap::new(),
        }
    }

    /// First storm whose window contains `tick`.
    pub fn active_storm(&self, tick: u64) -> Option<&TransactionStorm> {
        self.storms.iter().find(|s| s.is_active(tick))
    }

    /// First degradation whose window contains `tick`.
    pub fn active_degradation(&self, tick: u64) -> Option<&PathwayDegradation> {
        self.degradations.iter().find(|d| d.is_active(tick))
    }

    /// Combined arrival multiplier for the main pathway; overlapping storms compound.
    pub fn storm_multiplier(&self, tick: u64) -> f64 {
        self.storms
            .iter()
            .filter(|s| s.is_active(tick))
            .map(|s| s.multiplier)
            .product()
    }

    pub fn is_degraded(&self, name: &str) -> bool {
        self.original_capacity.contains_key(name)
    }

    /// Apply the event boundaries that fall on `tick`.
    pub fn apply(&mut self, tick: u64, net: &mut PathwayNetwork) {
        for storm in self.storms.iter().filter(|s| s.start_tick == tick) {
            tracing::error!(tick, multiplier = storm.multiplier, duration = storm.duration, "transaction storm started");
        }
        for storm in self.storms.iter().filter(|s| s.start_tick.saturating_add(s.duration) == tick) {
            tracing::info!(tick, multiplier = storm.multiplier, "transaction storm ended");
        }

        let changed: BTreeSet<String> = self
            .degradations
            .iter()
            .filter(|d| d.start_tick == tick || d.end_tick() == Some(tick))
            .map(|d| d.target.clone())
            .collect();

        for target in changed {
            self.recompute_capacity(tick, &target, net);
        }
    }

    fn recompute_capacity(&mut self, tick: u64, target: &str, net: &mut PathwayNetwork) {
        let Some(pathway) = net.pathway_mut(target) else {
            tracing::warn!(tick, pathway = target, "degradation target not found");
            return;
        };

        let factors: Vec<f64> = self
            .degradations
            .iter()
            .filter(|d| d.target == target && d.is_active(tick))
            .map(|d| d.factor)
            .collect();

        if factors.is_empty() {
            if let Some(original) = self.original_capacity.remove(target) {
                pathway.set_capacity_tps(original);
                tracing::warn!(tick, pathway = target, capacity_tps = original, "degradation ended, capacity restored");
            }
            return;
        }

        let original = *self
            .original_capacity
            .entry(target.to_string())
            .or_insert_with(|| pathway.capacity_tps());
        let degraded = original / factors.iter().product::<f64>();
        pathway.set_capacity_tps(degraded);
        tracing::error!(
            tick,
            pathway = target,
            original_tps = original,
            capacity_tps = degraded,
            "pathway degradation in effect"
        );
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
