// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Elastic Pathway Simulation Suite - Type Definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ─── Transaction ─────────────────────────────────────────────────────────────

/// Synthetic transaction identifier: creation tick plus a run-wide sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId {
    pub tick: u64,
    pub seq: u64,
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}-{}", self.tick, self.seq)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub created_at_tick: u64,
}

impl Transaction {
    pub fn new(tick: u64, seq: u64) -> Self {
        Self {
            id: TransactionId { tick, seq },
            created_at_tick: tick,
        }
    }
}

// ─── Glitch Severity ─────────────────────────────────────────────────────────

/// Congestion severity of the main pathway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GlitchLevel {
    None,
    Warning,
    Critical,
}

impl GlitchLevel {
    /// Classify a main-queue length against ascending thresholds.
    /// A missing threshold can never be reached.
    pub fn classify(queue_length: usize, warning: Option<usize>, critical: Option<usize>) -> Self {
        if critical.is_some_and(|t| queue_length >= t) {
            Self::Critical
        } else if warning.is_some_and(|t| queue_length >= t) {
            Self::Warning
        } else {
            Self::None
        }
    }

    pub fn is_glitch(&self) -> bool {
        !matches!(self, Self::None)
    }
}

// ─── Distribution Strategy ───────────────────────────────────────────────────

/// How ready alternative pathways are ranked before the round-robin pick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DistributionStrategy {
    /// Ascending gas fee.
    #[default]
    MostEconomical,
    /// Ascending queue length.
    LeastCongested,
}

impl DistributionStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MostEconomical => "mostEconomical",
            Self::LeastCongested => "leastCongested",
        }
    }
}

// ─── Transfer ────────────────────────────────────────────────────────────────

/// A batch of queued transactions redirected from the main pathway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub to: String,
    pub count: usize,
}

// ─── Activation State ────────────────────────────────────────────────────────

/// Activation bookkeeping for one alternative pathway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationState {
    pub is_active: bool,
    pub activation_tick: u64,
    /// `None` means never deactivated, so cooldown cannot block the first activation.
    pub deactivated_tick: Option<u64>,
}

impl Default for ActivationState {
    fn default() -> Self {
        Self {
            is_active: false,
            activation_tick: 0,
            deactivated_tick: None,
        }
    }
}

impl ActivationState {
    /// Active and past its activation delay.
    pub fn is_ready(&self, current_tick: u64, activation_delay: u64) -> bool {
        self.is_active && current_tick >= self.activation_tick.saturating_add(activation_delay)
    }

    /// Whether the cooldown since the last deactivation has elapsed.
    pub fn cooled_down(&self, current_tick: u64, min_cooldown: u64) -> bool {
        match self.deactivated_tick {
            None => true,
            Some(at) => current_tick.saturating_sub(at) >= min_cooldown,
        }
    }
}

// ─── Headline ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeadlineLevel {
    Breaker,
    Storm,
    Critical,
    Warning,
    Nominal,
}

/// Human-facing summary of the dominant condition at a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub subtitle: String,
    pub level: HeadlineLevel,
}

impl Headline {
    pub fn new(title: &str, subtitle: impl Into<String>, level: HeadlineLevel) -> Self {
        Self {
            title: title.to_string(),
            subtitle: subtitle.into(),
            level,
        }
    }

    pub fn standby() -> Self {
        Self::new("STANDBY", "Waiting for the simulation to start.", HeadlineLevel::Nominal)
    }

    pub fn starting_up() -> Self {
        Self::new("STARTING UP", "Bringing pathways online.", HeadlineLevel::Nominal)
    }

    pub fn circuit_breaker() -> Self {
        Self::new(
            "CIRCUIT BREAKER TRIPPED",
            "System protection protocol is active.",
            HeadlineLevel::Breaker,
        )
    }

    pub fn storm(multiplier: f64) -> Self {
        Self::new(
            "TRANSACTION STORM",
            format!("Network load multiplied by {}x.", multiplier),
            HeadlineLevel::Storm,
        )
    }

    pub fn degradation(target: &str) -> Self {
        Self::new(
            "PATHWAY SABOTAGE",
            format!("{} performance is degraded.", target),
            HeadlineLevel::Storm,
        )
    }

    pub fn critical() -> Self {
        Self::new(
            "CRITICAL GLITCH",
            "Aggressively rerouting transactions to alternative pathways.",
            HeadlineLevel::Critical,
        )
    }

    pub fn warning() -> Self {
        Self::new(
            "GLITCH WARNING",
            "Activating alternative pathways to manage load.",
            HeadlineLevel::Warning,
        )
    }

    pub fn nominal() -> Self {
        Self::new("NETWORK NOMINAL", "All systems are running smoothly.", HeadlineLevel::Nominal)
    }
}

// ─── TickSnapshot ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayStatus {
    pub name: String,
    pub queue_length: usize,
    pub is_active: bool,
    pub is_ready: bool,
}

/// State as it stood going into a tick, before that tick's processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickSnapshot {
    pub tick: u64,
    pub main_queue: usize,
    pub pathways: Vec<PathwayStatus>,
    pub circuit_breaker_tripped: bool,
    pub moved_transactions: Vec<Transfer>,
    pub headline: Headline,
}

// ─── SimStats ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimStats {
    pub total_transactions_generated: u64,
    pub total_transactions_processed_main: u64,
    /// Completed transactions per alternative pathway, keyed by name.
    pub total_transactions_processed_alt: BTreeMap<String, u64>,
    pub glitch_count: u64,
    /// Number of activations.
    pub path_switches: u64,
    pub path_deactivations: u64,
    pub max_main_queue_length: usize,
}

impl SimStats {
    pub fn new<'a>(alternative_names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            total_transactions_processed_alt: alternative_names
                .into_iter()
                .map(|name| (name.to_string(), 0))
                .collect(),
            ..Default::default()
        }
    }

    pub fn total_processed(&self) -> u64 {
        self.total_transactions_processed_main
            + self.total_transactions_processed_alt.values().sum::<u64>()
    }
}

// ─── SimSummary ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimSummary {
    pub total_ticks: u64,
    pub final_stats: SimStats,
}

impl SimSummary {
    /// Multi-line terminal report.
    pub fn render(&self) -> String {
        let s = &self.final_stats;
        let mut out = String::new();
        out.push_str("=================== SIMULATION SUMMARY ===================\n");
        out.push_str(&format!("Total ticks run:              {}\n", self.total_ticks));
        out.push_str(&format!("Total transactions generated: {}\n", s.total_transactions_generated));
        out.push_str(&format!("- Processed on main pathway:  {}\n", s.total_transactions_processed_main));
        for (name, count) in &s.total_transactions_processed_alt {
            out.push_str(&format!("- Processed on {}: {}\n", name, count));
        }
        out.push_str(&format!("Max main queue length:        {}\n", s.max_main_queue_length));
        out.push_str(&format!("Pathway activations:          {}\n", s.path_switches));
        out.push_str(&format!("Pathway deactivations:        {}\n", s.path_deactivations));
        out.push_str(&format!("Glitches detected:            {}\n", s.glitch_count));
        out.push_str("==========================================================");
        out
    }
}

// ─── Step Outcome ────────────────────────────────────────────────────────────

/// Result of advancing the tick loop by one iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A tick ran; carries the snapshot emitted before its processing.
    Tick(TickSnapshot),
    /// The tick limit was passed; the run is over.
    Finished(SimSummary),
    /// Not running (never started, stopped, or already finished).
    Idle,
}
