// Per-Tick Metric Trackers: congestion exposure and queue conservation

use epp_engine::*;

// ─── Severity Tracker ───────────────────────────────────────────────────────

/// Accumulates per-snapshot exposure to congestion and breaker activity.
pub struct SeverityTracker {
    warning: Option<usize>,
    critical: Option<usize>,
    pub warning_ticks: u64,
    pub critical_ticks: u64,
    pub breaker_trips: u64,
    pub breaker_ticks: u64,
    pub transferred: u64,
    breaker_was_tripped: bool,
}

impl SeverityTracker {
    pub fn new(settings: &ControllerSettings) -> Self {
        Self {
            warning: settings.glitch_severity_levels.warning_threshold,
            critical: settings.glitch_severity_levels.critical_threshold,
            warning_ticks: 0,
            critical_ticks: 0,
            breaker_trips: 0,
            breaker_ticks: 0,
            transferred: 0,
            breaker_was_tripped: false,
        }
    }

    pub fn record_tick(&mut self, snapshot: &TickSnapshot) {
        match GlitchLevel::classify(snapshot.main_queue, self.warning, self.critical) {
            GlitchLevel::Warning => self.warning_ticks += 1,
            GlitchLevel::Critical => self.critical_ticks += 1,
            GlitchLevel::None => {}
        }

        if snapshot.circuit_breaker_tripped {
            self.breaker_ticks += 1;
            if !self.breaker_was_tripped {
                self.breaker_trips += 1;
            }
        }
        self.breaker_was_tripped = snapshot.circuit_breaker_tripped;

        self.transferred += snapshot.moved_transactions.iter().map(|t| t.count as u64).sum::<u64>();
    }
}

// ─── Conservation Tracker ───────────────────────────────────────────────────

/// Every generated transaction is either completed or still queued somewhere.
pub struct ConservationTracker {
    pub violations: u64,
    pub max_discrepancy: u64,
}

impl ConservationTracker {
    pub fn new() -> Self {
        Self { violations: 0, max_discrepancy: 0 }
    }

    pub fn record_tick(&mut self, sim: &PathwaySimulation) {
        let net = sim.network();
        let queued = net.main().len() as u64 + net.alternatives().iter().map(|p| p.len() as u64).sum::<u64>();
        let accounted = sim.stats().total_processed() + queued;
        let generated = sim.stats().total_transactions_generated;
        let discrepancy = generated.abs_diff(accounted);
        if discrepancy > 0 {
            self.violations += 1;
            self.max_discrepancy = self.max_discrepancy.max(discrepancy);
        }
    }

    pub fn holds(&self) -> bool {
        self.violations == 0
    }
}
