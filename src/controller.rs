// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Elastic Pathway Simulation Suite - Adaptive Pathway Controller
//
// Classifies main-pathway congestion each tick and reacts: trips or
// recovers the circuit breaker, activates helper pathways, redirects
// queued load to them round-robin, and retires helpers under hysteresis.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ControllerSettings;
use crate::network::PathwayNetwork;
use crate::pathway::Pathway;
use crate::types::{DistributionStrategy, GlitchLevel};

// ─── Controller Outcome ──────────────────────────────────────────────────────

/// What a single `check_and_react` call did, for tests and tracing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reaction {
    /// Breaker tripped earlier; waiting for the recovery check.
    BreakerHolding,
    /// Recovery check fired and every alternative was healthy.
    BreakerRecovered,
    /// Recovery check fired but some alternative was still congested.
    BreakerRecoveryFailed,
    /// Breaker tripped this tick; nothing else happened.
    BreakerTripped,
    /// No glitch; `deactivated` lists helpers retired this tick.
    Normal { deactivated: Vec<String> },
    /// Glitch handled.
    Glitch {
        level: GlitchLevel,
        activated: Option<String>,
        target: Option<String>,
        moved: usize,
    },
}

// ─── Controller ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Controller {
    settings: ControllerSettings,
    circuit_breaker_tripped: bool,
    recovery_check_ticker: u64,
    /// Round-robin cursor over ready candidates. Persists across ticks and
    /// only wraps, never resets.
    last_distribution_index: usize,
}

impl Controller {
    pub fn new(settings: ControllerSettings) -> Self {
        Self {
            settings,
            circuit_breaker_tripped: false,
            recovery_check_ticker: 0,
            last_distribution_index: 0,
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn is_circuit_breaker_tripped(&self) -> bool {
        self.circuit_breaker_tripped
    }

    pub fn last_distribution_index(&self) -> usize {
        self.last_distribution_index
    }

    /// Current main-pathway severity under the configured thresholds.
    pub fn classify(&self, main_queue_length: usize) -> GlitchLevel {
        let levels = &self.settings.glitch_severity_levels;
        GlitchLevel::classify(main_queue_length, levels.warning_threshold, levels.critical_threshold)
    }

    /// One controller decision for the current tick.
    pub fn check_and_react(&mut self, net: &mut PathwayNetwork) -> Reaction {
        if self.circuit_breaker_tripped {
            return self.handle_circuit_breaker_active(net);
        }

        let level = self.classify(net.main().len());
        if level.is_glitch() {
            net.record_glitch();
            self.handle_glitch(level, net)
        } else {
            Reaction::Normal {
                deactivated: self.handle_normal_condition(net),
            }
        }
    }

    // ─── Circuit Breaker ─────────────────────────────────────────────────────

    fn handle_circuit_breaker_active(&mut self, net: &PathwayNetwork) -> Reaction {
        self.recovery_check_ticker += 1;
        let interval = self.settings.circuit_breaker.recovery_check_interval_ticks;
        tracing::debug!(
            tick = net.current_tick(),
            waited = self.recovery_check_ticker,
            interval,
            "circuit breaker active, waiting for recovery"
        );

        if self.recovery_check_ticker < interval {
            return Reaction::BreakerHolding;
        }
        self.recovery_check_ticker = 0;
        self.attempt_recovery(net)
    }

    fn attempt_recovery(&mut self, net: &PathwayNetwork) -> Reaction {
        let tick = net.current_tick();
        let threshold = self.settings.circuit_breaker.recovery_threshold_queue_size;
        tracing::info!(tick, "attempting circuit breaker recovery");

        if net.alternatives().iter().all(|p| p.len() < threshold) {
            self.circuit_breaker_tripped = false;
            tracing::info!(tick, "network stable, circuit breaker reset");
            Reaction::BreakerRecovered
        } else {
            tracing::warn!(
                tick,
                next_check_in = self.settings.circuit_breaker.recovery_check_interval_ticks,
                "recovery failed, alternative pathways still congested"
            );
            Reaction::BreakerRecoveryFailed
        }
    }

    fn trip_circuit_breaker(&mut self, tick: u64) {
        tracing::error!(tick, "circuit breaker tripped, all active alternatives critical; suspending adaptive action");
        self.circuit_breaker_tripped = true;
        self.recovery_check_ticker = 0;
    }

    /// Every active alternative has reached the critical queue threshold.
    fn all_active_at_risk(&self, net: &PathwayNetwork) -> bool {
        let cb = &self.settings.circuit_breaker;
        if !cb.enabled {
            return false;
        }
        let Some(critical) = cb.critical_alt_queue_threshold else {
            return false;
        };
        let mut active = net.active_alternatives().peekable();
        active.peek().is_some() && active.all(|p| p.len() >= critical)
    }

    // ─── Glitch Handling ─────────────────────────────────────────────────────

    fn handle_glitch(&mut self, level: GlitchLevel, net: &mut PathwayNetwork) -> Reaction {
        let tick = net.current_tick();
        tracing::warn!(tick, ?level, main_queue = net.main().len(), "glitch detected");

        if self.all_active_at_risk(net) {
            self.trip_circuit_breaker(tick);
            return Reaction::BreakerTripped;
        }

        let strategy = self.strategy_for(level);
        let activated = self.try_activate_new_pathway(net);

        let Some(target) = self.select_pathway_for_distribution(strategy, net) else {
            tracing::warn!(tick, "glitch detected but no active alternative is ready to take load");
            return Reaction::Glitch {
                level,
                activated,
                target: None,
                moved: 0,
            };
        };

        let moved = self.proceed_to_move_transactions(level, &target, net);
        Reaction::Glitch {
            level,
            activated,
            target: Some(target),
            moved,
        }
    }

    fn strategy_for(&self, level: GlitchLevel) -> DistributionStrategy {
        let adaptive = &self.settings.adaptive_strategy;
        if adaptive.enabled && level == GlitchLevel::Critical {
            adaptive.on_critical
        } else {
            adaptive.default
        }
    }

    /// Rank ready alternatives by `strategy` and take the one under the
    /// round-robin cursor, then advance the cursor.
    fn select_pathway_for_distribution(
        &mut self,
        strategy: DistributionStrategy,
        net: &PathwayNetwork,
    ) -> Option<String> {
        let mut candidates: Vec<&Pathway> = net.ready_alternatives().collect();
        if candidates.is_empty() {
            return None;
        }

        // Stable sort: ties keep configuration order.
        match strategy {
            DistributionStrategy::MostEconomical => {
                candidates.sort_by(|a, b| cmp_gas_fee(a.params().gas_fee, b.params().gas_fee))
            }
            DistributionStrategy::LeastCongested => candidates.sort_by_key(|p| p.len()),
        }

        if self.last_distribution_index >= candidates.len() {
            self.last_distribution_index = 0;
        }
        let chosen = candidates[self.last_distribution_index].name().to_string();

        tracing::debug!(
            strategy = strategy.label(),
            candidates = ?candidates.iter().map(|c| c.name()).collect::<Vec<_>>(),
            index = self.last_distribution_index,
            chosen = %chosen,
            "round-robin distribution pick"
        );

        self.last_distribution_index += 1;
        Some(chosen)
    }

    /// Move `ceil(main × pct)` transactions, clamped to the per-tick maximum
    /// and the main queue, halved when the target is already congested.
    fn proceed_to_move_transactions(
        &self,
        level: GlitchLevel,
        target: &str,
        net: &mut PathwayNetwork,
    ) -> usize {
        let main_len = net.main().len();
        if main_len == 0 {
            return 0;
        }
        let Some(target_pathway) = net.alternative(target) else {
            return 0;
        };
        let target_len = target_pathway.len();
        let target_threshold = target_pathway.params().congestion_threshold;

        let amount = self.transfer_amount(level, main_len, target_len, target_threshold);
        if target_threshold.is_some_and(|t| target_len >= t) {
            tracing::warn!(
                tick = net.current_tick(),
                pathway = target,
                queue = target_len,
                "target pathway congested, reducing transfer"
            );
        }

        if amount > 0 {
            net.move_to_alternative(amount, target)
        } else {
            0
        }
    }

    /// Number of transactions to redirect this tick.
    pub fn transfer_amount(
        &self,
        level: GlitchLevel,
        main_len: usize,
        target_len: usize,
        target_threshold: Option<usize>,
    ) -> usize {
        let general = &self.settings.glitch_condition;
        let mut pct = general.percentage_to_move;
        if level == GlitchLevel::Critical {
            if let Some(critical) = self.settings.glitch_severity_levels.percentage_to_move_critical {
                pct = critical;
            }
        }

        let mut amount = (main_len as f64 * pct).ceil() as usize;
        if let Some(max) = general.max_transactions_to_move_in_one_go {
            amount = amount.min(max);
        }
        amount = amount.min(main_len);

        if target_threshold.is_some_and(|t| target_len >= t) {
            amount /= 2;
        }
        amount
    }

    // ─── Activation / Deactivation ───────────────────────────────────────────

    /// Activate the fastest inactive alternative whose cooldown has elapsed.
    fn try_activate_new_pathway(&self, net: &mut PathwayNetwork) -> Option<String> {
        let tick = net.current_tick();
        let min_cooldown = self.settings.alternative_pathway_smart_cooldown.min_cool_down_ticks;

        let best = net
            .alternatives()
            .iter()
            .filter(|p| {
                net.activation_state(p.name())
                    .is_some_and(|s| !s.is_active && s.cooled_down(tick, min_cooldown))
            })
            // min_by keeps the first of equal elements: ties go to configuration order.
            .min_by(|a, b| {
                a.processing_time_per_transaction()
                    .partial_cmp(&b.processing_time_per_transaction())
                    .unwrap_or(Ordering::Equal)
            })
            .map(|p| p.name().to_string());

        match best {
            Some(name) => {
                tracing::debug!(tick, pathway = %name, "selected new alternative pathway for activation");
                net.activate(&name);
                Some(name)
            }
            None => {
                tracing::debug!(tick, "no alternative pathway eligible for activation");
                None
            }
        }
    }

    /// Retire helpers once the main queue is calm, the helper is drained,
    /// and it has served its minimum active duration.
    fn handle_normal_condition(&self, net: &mut PathwayNetwork) -> Vec<String> {
        let tick = net.current_tick();
        let normal = &self.settings.normal_condition;
        let main_len = net.main().len();

        let retiring: Vec<String> = net
            .alternatives()
            .iter()
            .filter_map(|p| {
                let state = net.activation_state(p.name())?;
                if !state.is_active {
                    return None;
                }
                let active_for = tick.saturating_sub(state.activation_tick);
                let calm = main_len <= normal.deactivate_threshold_main_queue;
                let drained = p.is_empty();
                let served = active_for >= normal.min_active_duration_ticks_alternative;
                (calm && drained && served).then(|| p.name().to_string())
            })
            .collect();

        for name in &retiring {
            net.deactivate(name);
        }
        retiring
    }
}

/// Ascending fee; a missing fee ranks last.
fn cmp_gas_fee(a: Option<Decimal>, b: Option<Decimal>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
