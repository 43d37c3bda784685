// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Elastic Pathway Simulation Suite - Pathway Network State
//
// The mutable state the controller reads and commands: the main pathway,
// the alternatives, their activation bookkeeping, running statistics and
// the transfers made during the current tick.

use std::collections::HashMap;

use crate::config::{PathwayParams, SimulationConfig};
use crate::pathway::Pathway;
use crate::types::{ActivationState, SimStats, Transfer};

#[derive(Debug, Clone)]
pub struct PathwayNetwork {
    pub(crate) current_tick: u64,
    pub(crate) main: Pathway,
    pub(crate) alternatives: Vec<Pathway>,
    pub(crate) activation: HashMap<String, ActivationState>,
    pub(crate) stats: SimStats,
    pub(crate) tick_transfers: Vec<Transfer>,
}

impl PathwayNetwork {
    pub fn new(config: &SimulationConfig) -> Self {
        let main = Pathway::new(
            config.main_pathway.name.clone(),
            PathwayParams::from(&config.main_pathway),
        );
        let alternatives: Vec<Pathway> = config
            .alternative_pathways
            .iter()
            .map(|alt| Pathway::new(alt.name.clone(), PathwayParams::from(alt)))
            .collect();
        let activation = alternatives
            .iter()
            .map(|p| (p.name().to_string(), ActivationState::default()))
            .collect();
        let stats = SimStats::new(alternatives.iter().map(|p| p.name()));

        Self {
            current_tick: 0,
            main,
            alternatives,
            activation,
            stats,
            tick_transfers: Vec::new(),
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn main(&self) -> &Pathway {
        &self.main
    }

    pub fn main_mut(&mut self) -> &mut Pathway {
        &mut self.main
    }

    pub fn alternatives(&self) -> &[Pathway] {
        &self.alternatives
    }

    pub fn alternative(&self, name: &str) -> Option<&Pathway> {
        self.alternatives.iter().find(|p| p.name() == name)
    }

    pub fn alternative_mut(&mut self, name: &str) -> Option<&mut Pathway> {
        self.alternatives.iter_mut().find(|p| p.name() == name)
    }

    /// Main pathway or any alternative, by name.
    pub fn pathway_mut(&mut self, name: &str) -> Option<&mut Pathway> {
        if self.main.name() == name {
            return Some(&mut self.main);
        }
        self.alternative_mut(name)
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn tick_transfers(&self) -> &[Transfer] {
        &self.tick_transfers
    }

    pub fn activation_state(&self, name: &str) -> Option<&ActivationState> {
        self.activation.get(name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.activation.get(name).is_some_and(|s| s.is_active)
    }

    /// Active and past its activation delay.
    pub fn is_ready(&self, pathway: &Pathway) -> bool {
        self.activation
            .get(pathway.name())
            .is_some_and(|s| s.is_ready(self.current_tick, pathway.params().activation_delay))
    }

    pub fn active_alternatives(&self) -> impl Iterator<Item = &Pathway> {
        self.alternatives.iter().filter(move |p| self.is_active(p.name()))
    }

    pub fn ready_alternatives(&self) -> impl Iterator<Item = &Pathway> {
        self.alternatives.iter().filter(move |p| self.is_ready(p))
    }

    // ─── Commands ────────────────────────────────────────────────────────────

    /// Bring an inactive alternative online. Returns `false` if unknown or already active.
    pub fn activate(&mut self, name: &str) -> bool {
        let tick = self.current_tick;
        match self.activation.get_mut(name) {
            Some(state) if !state.is_active => {
                state.is_active = true;
                state.activation_tick = tick;
                self.stats.path_switches += 1;
                tracing::warn!(tick, pathway = name, "alternative pathway activated to relieve the main pathway");
                true
            }
            _ => false,
        }
    }

    /// Retire an active alternative. Returns `false` if unknown or already inactive.
    pub fn deactivate(&mut self, name: &str) -> bool {
        let tick = self.current_tick;
        match self.activation.get_mut(name) {
            Some(state) if state.is_active => {
                state.is_active = false;
                state.deactivated_tick = Some(tick);
                self.stats.path_deactivations += 1;
                tracing::info!(tick, pathway = name, "alternative pathway no longer needed");
                true
            }
            _ => false,
        }
    }

    /// Move up to `count` transactions from the head of the main queue to the
    /// tail of `target`, preserving arrival order. Returns how many moved.
    pub fn move_to_alternative(&mut self, count: usize, target: &str) -> usize {
        if count == 0 {
            return 0;
        }
        let Some(index) = self.alternatives.iter().position(|p| p.name() == target) else {
            return 0;
        };

        let moved = self.main.dequeue_up_to(count);
        let n = moved.len();
        if n > 0 {
            self.alternatives[index].enqueue_all(moved);
            tracing::debug!(tick = self.current_tick, pathway = target, count = n, "moved transactions off the main pathway");
            self.tick_transfers.push(Transfer {
                to: target.to_string(),
                count: n,
            });
        }
        n
    }

    pub fn record_glitch(&mut self) {
        self.stats.glitch_count += 1;
    }

    // ─── Tick Mechanics ──────────────────────────────────────────────────────

    pub(crate) fn begin_tick(&mut self) {
        self.tick_transfers.clear();
    }

    /// Advance every pathway by one tick and fold completions into statistics.
    pub(crate) fn process_all(&mut self) {
        self.stats.total_transactions_processed_main += self.main.advance_one_tick().len() as u64;
        for pathway in &mut self.alternatives {
            let done = pathway.advance_one_tick().len() as u64;
            *self
                .stats
                .total_transactions_processed_alt
                .entry(pathway.name().to_string())
                .or_insert(0) += done;
        }
    }

    pub(crate) fn update_dynamic_stats(&mut self) {
        self.stats.max_main_queue_length = self.stats.max_main_queue_length.max(self.main.len());
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
