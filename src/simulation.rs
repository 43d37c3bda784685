// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Elastic Pathway Simulation Suite - Simulation Core

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wasm_bindgen::prelude::*;

use crate::config::SimulationConfig;
use crate::controller::{Controller, Reaction};
use crate::error::{SimError, SimResult};
use crate::events::EventSchedule;
use crate::network::PathwayNetwork;
use crate::types::*;

// ─── Run Phase ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    NotStarted,
    Running,
    /// Tick limit passed; a summary was produced.
    Finished,
    /// Stopped early; no summary.
    Stopped,
}

/// How a blocking [`PathwaySimulation::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Finished,
    Stopped,
}

/// Cooperative cancellation flag, honoured at the next tick boundary.
/// Exported to JS so a running callback can stop the loop without
/// re-entering the simulation.
#[wasm_bindgen]
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ─── PathwaySimulation struct ────────────────────────────────────────────────

#[wasm_bindgen]
pub struct PathwaySimulation {
    pub(crate) config: SimulationConfig,
    pub(crate) network: PathwayNetwork,
    pub(crate) controller: Controller,
    pub(crate) events: EventSchedule,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) phase: RunPhase,
    pub(crate) stop: StopHandle,
    pub(crate) headline: Headline,
    pub(crate) last_reaction: Option<Reaction>,
}

impl PathwaySimulation {
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Self {
            network: PathwayNetwork::new(&config),
            controller: Controller::new(config.epp_controller_settings.clone()),
            events: EventSchedule::new(&config.events),
            rng,
            phase: RunPhase::NotStarted,
            stop: StopHandle::default(),
            headline: Headline::standby(),
            last_reaction: None,
            config,
        })
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn network(&self) -> &PathwayNetwork {
        &self.network
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn current_tick(&self) -> u64 {
        self.network.current_tick
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    pub fn headline(&self) -> &Headline {
        &self.headline
    }

    pub fn stats(&self) -> &SimStats {
        self.network.stats()
    }

    /// Controller decision taken during the most recent tick.
    pub fn last_reaction(&self) -> Option<&Reaction> {
        self.last_reaction.as_ref()
    }

    /// A cloneable handle that stops this run from another thread or a callback.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn summary(&self) -> SimSummary {
        SimSummary {
            total_ticks: self.network.current_tick,
            final_stats: self.network.stats.clone(),
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Transition *not started → running*. A run is one-shot per instance.
    pub fn start(&mut self) -> SimResult<()> {
        match self.phase {
            RunPhase::NotStarted => {}
            RunPhase::Running => return Err(SimError::AlreadyRunning),
            RunPhase::Finished | RunPhase::Stopped => return Err(SimError::AlreadyFinished),
        }
        self.phase = RunPhase::Running;
        self.network.current_tick = 0;
        self.headline = Headline::starting_up();
        tracing::info!(
            ticks = self.config.total_simulation_ticks,
            alternatives = self.network.alternatives().len(),
            "simulation started"
        );
        Ok(())
    }

    /// Request a stop; no summary is produced.
    pub fn stop(&mut self) {
        self.stop.stop();
        if self.phase == RunPhase::Running {
            self.phase = RunPhase::Stopped;
            tracing::info!(tick = self.network.current_tick, "simulation stopped");
        }
    }

    /// Advance the tick loop by one iteration.
    pub fn step(&mut self) -> StepOutcome {
        if self.phase != RunPhase::Running {
            return StepOutcome::Idle;
        }
        if self.stop.is_stopped() {
            self.stop();
            return StepOutcome::Idle;
        }
        if self.network.current_tick > self.config.total_simulation_ticks {
            return StepOutcome::Finished(self.finalize());
        }

        self.headline = self.determine_headline();
        let snapshot = self.snapshot();

        self.perform_tick();
        self.network.current_tick += 1;
        StepOutcome::Tick(snapshot)
    }

    /// Drive the loop to completion, emitting one snapshot per tick.
    ///
    /// Sleeps `simulation_delay_ms` between ticks. Returns `Stopped` without
    /// calling `on_finish` if a [`StopHandle`] fires first.
    pub fn run<T, F>(&mut self, mut on_tick: T, on_finish: F) -> SimResult<RunOutcome>
    where
        T: FnMut(&TickSnapshot),
        F: FnOnce(SimSummary),
    {
        self.start()?;
        loop {
            match self.step() {
                StepOutcome::Tick(snapshot) => {
                    on_tick(&snapshot);
                    self.pause();
                }
                StepOutcome::Finished(summary) => {
                    on_finish(summary);
                    return Ok(RunOutcome::Finished);
                }
                StepOutcome::Idle => return Ok(RunOutcome::Stopped),
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn pause(&self) {
        if self.config.simulation_delay_ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(self.config.simulation_delay_ms));
        }
    }

    // No blocking sleep in the browser; hosts pace `tick()` with a timer.
    #[cfg(target_arch = "wasm32")]
    fn pause(&self) {}

    fn finalize(&mut self) -> SimSummary {
        self.phase = RunPhase::Finished;
        let summary = self.summary();
        tracing::info!(
            total_ticks = summary.total_ticks,
            generated = summary.final_stats.total_transactions_generated,
            processed = summary.final_stats.total_processed(),
            max_main_queue = summary.final_stats.max_main_queue_length,
            glitches = summary.final_stats.glitch_count,
            "simulation finished"
        );
        summary
    }

    // ─── Tick Internals ──────────────────────────────────────────────────────

    fn perform_tick(&mut self) {
        let tick = self.network.current_tick;
        self.network.begin_tick();
        self.events.apply(tick, &mut self.network);
        self.last_reaction = Some(self.controller.check_and_react(&mut self.network));
        self.network.process_all();
        self.network.update_dynamic_stats();
        self.generate_new_transactions();
    }

    /// Integer part of the rate always arrives; one more arrives with
    /// probability equal to the fractional remainder.
    fn arrivals(rng: &mut ChaCha8Rng, rate: f64) -> u64 {
        if !(rate > 0.0) {
            return 0;
        }
        let base = rate.floor();
        let extra = rate - base;
        let bonus = if extra > 0.0 && rng.gen::<f64>() < extra { 1 } else { 0 };
        base as u64 + bonus
    }

    fn generate_new_transactions(&mut self) {
        let tick = self.network.current_tick;
        let main_rate = self.network.main.params().load_tps * self.events.storm_multiplier(tick);

        let main_count = Self::arrivals(&mut self.rng, main_rate);
        for _ in 0..main_count {
            let tx = self.next_transaction(tick);
            self.network.main.enqueue(tx);
        }

        for index in 0..self.network.alternatives.len() {
            let rate = self.network.alternatives[index].params().load_tps;
            let count = Self::arrivals(&mut self.rng, rate);
            for _ in 0..count {
                let tx = self.next_transaction(tick);
                self.network.alternatives[index].enqueue(tx);
            }
        }
    }

    fn next_transaction(&mut self, tick: u64) -> Transaction {
        let stats = &mut self.network.stats;
        stats.total_transactions_generated += 1;
        Transaction::new(tick, stats.total_transactions_generated)
    }

    /// Priority-ordered classification of the current state. No side effects.
    pub fn determine_headline(&self) -> Headline {
        let tick = self.network.current_tick;
        if self.controller.is_circuit_breaker_tripped() {
            return Headline::circuit_breaker();
        }
        if let Some(storm) = self.events.active_storm(tick) {
            return Headline::storm(storm.multiplier);
        }
        if let Some(degradation) = self.events.active_degradation(tick) {
            return Headline::degradation(&degradation.target);
        }
        match self.controller.classify(self.network.main.len()) {
            GlitchLevel::Critical => Headline::critical(),
            GlitchLevel::Warning => Headline::warning(),
            GlitchLevel::None => Headline::nominal(),
        }
    }

    /// Public view of the current state.
    pub fn snapshot(&self) -> TickSnapshot {
        let net = &self.network;
        let pathways = net
            .alternatives()
            .iter()
            .map(|p| PathwayStatus {
                name: p.name().to_string(),
                queue_length: p.len(),
                is_active: net.is_active(p.name()),
                is_ready: net.is_ready(p),
            })
            .collect();
        TickSnapshot {
            tick: net.current_tick,
            main_queue: net.main().len(),
            pathways,
            circuit_breaker_tripped: self.controller.is_circuit_breaker_tripped(),
            moved_transactions: net.tick_transfers().to_vec(),
            headline: self.headline.clone(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
