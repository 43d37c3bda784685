// Scenario Definitions: one SimulationConfig builder plus pass criteria each

use epp_engine::*;
use rust_decimal_macros::dec;

// ─── Scenario Configuration ─────────────────────────────────────────────────

pub struct Scenario {
    pub name: &'static str,
    pub label: &'static str,
    pub category: &'static str,
    pub build: fn() -> SimulationConfig,
    pub criteria: PassCriteria,
}

pub struct PassCriteria {
    /// Main queue must never reach this length.
    pub max_main_queue: Option<usize>,
    pub max_glitches: Option<u64>,
    /// The scenario must actually stress the main pathway this far.
    pub min_peak_main_queue: Option<usize>,
    pub min_path_switches: Option<u64>,
    pub require_breaker_trip: bool,
    /// generated == processed + still queued, at every tick.
    pub require_conservation: bool,
}

impl Default for PassCriteria {
    fn default() -> Self {
        Self {
            max_main_queue: None,
            max_glitches: None,
            min_peak_main_queue: None,
            min_path_switches: None,
            require_breaker_trip: false,
            require_conservation: true,
        }
    }
}

// ─── Config Builders ────────────────────────────────────────────────────────

fn baseline_no_storm() -> SimulationConfig {
    let mut config = SimulationConfig::default().with_delay_ms(0);
    config.events.transaction_storms.clear();
    config
}

fn evm_storm() -> SimulationConfig {
    SimulationConfig::default().with_delay_ms(0)
}

fn l2_sabotage() -> SimulationConfig {
    SimulationConfig::default()
        .with_delay_ms(0)
        .with_degradation(PathwayDegradation {
            target: "Arbitrum (Fast Rollup)".to_string(),
            start_tick: 180,
            duration: Some(150),
            factor: 2.0,
        })
        .with_degradation(PathwayDegradation {
            target: "Base (OP Stack)".to_string(),
            start_tick: 240,
            duration: Some(60),
            factor: 4.0,
        })
}

fn breaker_stress() -> SimulationConfig {
    let mut settings = SimulationConfig::default().epp_controller_settings;
    settings.circuit_breaker.critical_alt_queue_threshold = Some(40);
    settings.circuit_breaker.recovery_check_interval_ticks = 10;
    settings.circuit_breaker.recovery_threshold_queue_size = 5;
    settings.alternative_pathway_smart_cooldown.min_cool_down_ticks = 0;

    SimulationConfig::single_pathway(400, 15.0, 14.0)
        .with_alternative(AlternativePathwayConfig::new("Helper A", 5.0, 4.0, dec!(3)).with_congestion_threshold(20))
        .with_alternative(AlternativePathwayConfig::new("Helper B", 5.0, 4.0, dec!(4)).with_congestion_threshold(20))
        .with_controller(settings)
        .with_storm(TransactionStorm { start_tick: 50, duration: 60, multiplier: 6.0 })
}

fn no_helpers_storm() -> SimulationConfig {
    let base = SimulationConfig::default();
    SimulationConfig::single_pathway(base.total_simulation_ticks, 15.0, 14.0)
        .with_controller(base.epp_controller_settings)
        .with_storm(TransactionStorm { start_tick: 200, duration: 90, multiplier: 4.0 })
}

// ─── Scenario Table ─────────────────────────────────────────────────────────

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "BASELINE_NO_STORM",
            label: "Baseline (no storm)",
            category: "regression",
            build: baseline_no_storm,
            criteria: PassCriteria {
                max_main_queue: Some(60),
                max_glitches: Some(0),
                ..Default::default()
            },
        },
        Scenario {
            name: "EVM_STORM",
            label: "EVM 4x storm, 7 helpers",
            category: "stress",
            build: evm_storm,
            criteria: PassCriteria {
                min_peak_main_queue: Some(60),
                min_path_switches: Some(1),
                ..Default::default()
            },
        },
        Scenario {
            name: "L2_SABOTAGE",
            label: "Storm + degraded L2s",
            category: "sabotage",
            build: l2_sabotage,
            criteria: PassCriteria {
                min_path_switches: Some(1),
                ..Default::default()
            },
        },
        Scenario {
            name: "BREAKER_STRESS",
            label: "6x storm, undersized helpers",
            category: "safety",
            build: breaker_stress,
            criteria: PassCriteria {
                require_breaker_trip: true,
                ..Default::default()
            },
        },
        Scenario {
            name: "NO_HELPERS_STORM",
            label: "4x storm, no helpers",
            category: "control",
            build: no_helpers_storm,
            criteria: PassCriteria {
                min_peak_main_queue: Some(1_000),
                ..Default::default()
            },
        },
    ]
}
