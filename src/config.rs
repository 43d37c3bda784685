// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Elastic Pathway Simulation Suite - Configuration
//
// Field names follow the JSON parameter file consumed by the viewer
// (camelCase). Optional knobs are `Option`; a missing threshold is
// treated as unreachable.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{SimError, SimResult};
use crate::types::DistributionStrategy;

// ─── Defaults ────────────────────────────────────────────────────────────────

const DEFAULT_PERCENTAGE_TO_MOVE: f64 = 0.5;
const DEFAULT_MIN_ACTIVE_DURATION: u64 = 10;
const DEFAULT_RECOVERY_CHECK_INTERVAL: u64 = 10;
const DEFAULT_RECOVERY_THRESHOLD: usize = 5;
pub const DEFAULT_MAIN_NAME: &str = "Main Pathway";

fn default_percentage_to_move() -> f64 {
    DEFAULT_PERCENTAGE_TO_MOVE
}
fn default_min_active_duration() -> u64 {
    DEFAULT_MIN_ACTIVE_DURATION
}
fn default_recovery_check_interval() -> u64 {
    DEFAULT_RECOVERY_CHECK_INTERVAL
}
fn default_recovery_threshold() -> usize {
    DEFAULT_RECOVERY_THRESHOLD
}
fn default_main_name() -> String {
    DEFAULT_MAIN_NAME.to_string()
}
fn default_on_critical() -> DistributionStrategy {
    DistributionStrategy::LeastCongested
}

// ─── Pathways ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainPathwayConfig {
    #[serde(default = "default_main_name")]
    pub name: String,
    #[serde(rename = "capacityTPS")]
    pub capacity_tps: f64,
    #[serde(rename = "loadTPS")]
    pub load_tps: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativePathwayConfig {
    pub name: String,
    #[serde(rename = "capacityTPS")]
    pub capacity_tps: f64,
    #[serde(rename = "loadTPS", default)]
    pub load_tps: f64,
    /// Selection criterion only; a missing fee ranks after every priced pathway.
    #[serde(default)]
    pub gas_fee: Option<Decimal>,
    /// Queue length at which this pathway counts as saturated as a redirect target.
    #[serde(default)]
    pub congestion_threshold: Option<usize>,
    /// Ticks between the activation command and readiness.
    #[serde(default)]
    pub activation_delay: Option<u64>,
}

impl AlternativePathwayConfig {
    pub fn new(name: &str, capacity_tps: f64, load_tps: f64, gas_fee: Decimal) -> Self {
        Self {
            name: name.to_string(),
            capacity_tps,
            load_tps,
            gas_fee: Some(gas_fee),
            congestion_threshold: None,
            activation_delay: None,
        }
    }

    pub fn with_congestion_threshold(mut self, threshold: usize) -> Self {
        self.congestion_threshold = Some(threshold);
        self
    }

    pub fn with_activation_delay(mut self, delay: u64) -> Self {
        self.activation_delay = Some(delay);
        self
    }
}

/// Capacity and load of any pathway, main or alternative.
#[derive(Debug, Clone, PartialEq)]
pub struct PathwayParams {
    pub capacity_tps: f64,
    pub load_tps: f64,
    pub gas_fee: Option<Decimal>,
    pub congestion_threshold: Option<usize>,
    pub activation_delay: u64,
}

impl From<&MainPathwayConfig> for PathwayParams {
    fn from(cfg: &MainPathwayConfig) -> Self {
        Self {
            capacity_tps: cfg.capacity_tps,
            load_tps: cfg.load_tps,
            gas_fee: None,
            congestion_threshold: None,
            activation_delay: 0,
        }
    }
}

impl From<&AlternativePathwayConfig> for PathwayParams {
    fn from(cfg: &AlternativePathwayConfig) -> Self {
        Self {
            capacity_tps: cfg.capacity_tps,
            load_tps: cfg.load_tps,
            gas_fee: cfg.gas_fee,
            congestion_threshold: cfg.congestion_threshold,
            activation_delay: cfg.activation_delay.unwrap_or(0),
        }
    }
}

// ─── Controller Settings ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlitchSeverityLevels {
    #[serde(default)]
    pub warning_threshold: Option<usize>,
    #[serde(default)]
    pub critical_threshold: Option<usize>,
    /// Overrides `percentageToMove` while severity is critical.
    #[serde(default)]
    pub percentage_to_move_critical: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlitchCondition {
    #[serde(default = "default_percentage_to_move")]
    pub percentage_to_move: f64,
    #[serde(default)]
    pub max_transactions_to_move_in_one_go: Option<usize>,
}

impl Default for GlitchCondition {
    fn default() -> Self {
        Self {
            percentage_to_move: DEFAULT_PERCENTAGE_TO_MOVE,
            max_transactions_to_move_in_one_go: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveStrategy {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub default: DistributionStrategy,
    #[serde(default = "default_on_critical")]
    pub on_critical: DistributionStrategy,
}

impl Default for AdaptiveStrategy {
    fn default() -> Self {
        Self {
            enabled: false,
            default: DistributionStrategy::MostEconomical,
            on_critical: DistributionStrategy::LeastCongested,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalCondition {
    #[serde(default)]
    pub deactivate_threshold_main_queue: usize,
    #[serde(default = "default_min_active_duration")]
    pub min_active_duration_ticks_alternative: u64,
}

impl Default for NormalCondition {
    fn default() -> Self {
        Self {
            deactivate_threshold_main_queue: 0,
            min_active_duration_ticks_alternative: DEFAULT_MIN_ACTIVE_DURATION,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartCooldown {
    #[serde(default)]
    pub min_cool_down_ticks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub critical_alt_queue_threshold: Option<usize>,
    #[serde(default = "default_recovery_check_interval")]
    pub recovery_check_interval_ticks: u64,
    #[serde(default = "default_recovery_threshold")]
    pub recovery_threshold_queue_size: usize,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            critical_alt_queue_threshold: None,
            recovery_check_interval_ticks: DEFAULT_RECOVERY_CHECK_INTERVAL,
            recovery_threshold_queue_size: DEFAULT_RECOVERY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSettings {
    #[serde(default)]
    pub glitch_severity_levels: GlitchSeverityLevels,
    #[serde(default)]
    pub glitch_condition: GlitchCondition,
    #[serde(default)]
    pub adaptive_strategy: AdaptiveStrategy,
    #[serde(default)]
    pub normal_condition: NormalCondition,
    #[serde(default)]
    pub alternative_pathway_smart_cooldown: SmartCooldown,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// Multiplies the main pathway's arrival rate during `[start_tick, start_tick + duration)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStorm {
    pub start_tick: u64,
    pub duration: u64,
    pub multiplier: f64,
}

impl TransactionStorm {
    pub fn is_active(&self, tick: u64) -> bool {
        tick >= self.start_tick && tick < self.start_tick.saturating_add(self.duration)
    }
}

/// Divides the target's capacity by `factor` during its window. A missing
/// duration never ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayDegradation {
    pub target: String,
    pub start_tick: u64,
    #[serde(default)]
    pub duration: Option<u64>,
    pub factor: f64,
}

impl PathwayDegradation {
    pub fn end_tick(&self) -> Option<u64> {
        self.duration.map(|d| self.start_tick.saturating_add(d))
    }

    pub fn is_active(&self, tick: u64) -> bool {
        tick >= self.start_tick && self.end_tick().map_or(true, |end| tick < end)
    }
}

/// Event lists. The singular keys `transactionStorm` / `pathwayDegradation`
/// are accepted too, holding one object; an empty object means none.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventsConfig {
    #[serde(default, alias = "transactionStorm", deserialize_with = "one_or_many")]
    pub transaction_storms: Vec<TransactionStorm>,
    #[serde(default, alias = "pathwayDegradation", deserialize_with = "one_or_many")]
    pub pathway_degradations: Vec<PathwayDegradation>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EmptyObject {}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
    Empty(EmptyObject),
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
        Some(OneOrMany::Empty(_)) | None => Vec::new(),
    })
}

// ─── SimulationConfig ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub total_simulation_ticks: u64,
    #[serde(default)]
    pub simulation_delay_ms: u64,
    /// Seed for the arrival draw; `None` seeds from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    pub main_pathway: MainPathwayConfig,
    #[serde(default)]
    pub alternative_pathways: Vec<AlternativePathwayConfig>,
    #[serde(default)]
    pub epp_controller_settings: ControllerSettings,
    #[serde(default)]
    pub events: EventsConfig,
}

impl Default for SimulationConfig {
    /// EVM market conditions 2024/2025: a main chain loaded just under
    /// capacity, seven rollups and sidechains, and a 4x storm at tick 200.
    fn default() -> Self {
        let alt = |name: &str, capacity: f64, load: f64, fee: Decimal| {
            AlternativePathwayConfig::new(name, capacity, load, fee).with_congestion_threshold(500)
        };
        Self {
            total_simulation_ticks: 600,
            simulation_delay_ms: 30,
            seed: None,
            main_pathway: MainPathwayConfig {
                name: "Ethereum L1 (Simulated)".to_string(),
                capacity_tps: 15.0,
                load_tps: 14.0,
            },
            alternative_pathways: vec![
                alt("Arbitrum (Fast Rollup)", 48.0, 35.0, dec!(22)),
                alt("Polygon (Sidechain)", 55.0, 38.0, dec!(18)),
                alt("Base (OP Stack)", 40.0, 32.0, dec!(12)),
                alt("Optimism (Stable Rollup)", 42.0, 25.0, dec!(16)),
                alt("zkSync Era (ZK-Rollup)", 35.0, 20.0, dec!(28)),
                alt("Starknet (ZK-Rollup)", 30.0, 15.0, dec!(30)),
                alt("Scroll (zkEVM)", 28.0, 12.0, dec!(26)),
            ],
            epp_controller_settings: ControllerSettings {
                glitch_severity_levels: GlitchSeverityLevels {
                    warning_threshold: Some(60),
                    critical_threshold: Some(180),
                    percentage_to_move_critical: None,
                },
                glitch_condition: GlitchCondition {
                    percentage_to_move: 0.6,
                    max_transactions_to_move_in_one_go: Some(1500),
                },
                adaptive_strategy: AdaptiveStrategy {
                    enabled: true,
                    default: DistributionStrategy::MostEconomical,
                    on_critical: DistributionStrategy::LeastCongested,
                },
                normal_condition: NormalCondition {
                    deactivate_threshold_main_queue: 25,
                    min_active_duration_ticks_alternative: 60,
                },
                alternative_pathway_smart_cooldown: SmartCooldown { min_cool_down_ticks: 45 },
                circuit_breaker: CircuitBreakerSettings {
                    enabled: true,
                    critical_alt_queue_threshold: Some(480),
                    recovery_check_interval_ticks: 15,
                    recovery_threshold_queue_size: 60,
                },
            },
            events: EventsConfig {
                transaction_storms: vec![TransactionStorm {
                    start_tick: 200,
                    duration: 90,
                    multiplier: 4.0,
                }],
                pathway_degradations: Vec::new(),
            },
        }
    }
}

impl SimulationConfig {
    /// A bare main pathway with no helpers, no events and default controller settings.
    pub fn single_pathway(total_ticks: u64, capacity_tps: f64, load_tps: f64) -> Self {
        Self {
            total_simulation_ticks: total_ticks,
            simulation_delay_ms: 0,
            seed: None,
            main_pathway: MainPathwayConfig {
                name: DEFAULT_MAIN_NAME.to_string(),
                capacity_tps,
                load_tps,
            },
            alternative_pathways: Vec::new(),
            epp_controller_settings: ControllerSettings::default(),
            events: EventsConfig::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.simulation_delay_ms = delay_ms;
        self
    }

    pub fn with_alternative(mut self, pathway: AlternativePathwayConfig) -> Self {
        self.alternative_pathways.push(pathway);
        self
    }

    pub fn with_controller(mut self, settings: ControllerSettings) -> Self {
        self.epp_controller_settings = settings;
        self
    }

    pub fn with_storm(mut self, storm: TransactionStorm) -> Self {
        self.events.transaction_storms.push(storm);
        self
    }

    pub fn with_degradation(mut self, degradation: PathwayDegradation) -> Self {
        self.events.pathway_degradations.push(degradation);
        self
    }

    /// Parse and validate a JSON parameter document.
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> SimResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Reject configurations the engine cannot run meaningfully.
    ///
    /// Zero or negative capacity is accepted: such a pathway simply never
    /// completes work.
    pub fn validate(&self) -> SimResult<()> {
        let invalid = |msg: String| Err(SimError::InvalidConfig(msg));

        let mut names = HashSet::new();
        names.insert(self.main_pathway.name.as_str());
        check_rates(&self.main_pathway.name, self.main_pathway.capacity_tps, self.main_pathway.load_tps)?;

        for alt in &self.alternative_pathways {
            if !names.insert(alt.name.as_str()) {
                return invalid(format!("duplicate pathway name '{}'", alt.name));
            }
            check_rates(&alt.name, alt.capacity_tps, alt.load_tps)?;
        }

        let settings = &self.epp_controller_settings;
        let pct = settings.glitch_condition.percentage_to_move;
        if !(pct > 0.0 && pct <= 1.0) {
            return invalid(format!("percentageToMove must be in (0, 1], got {}", pct));
        }
        if let Some(pct) = settings.glitch_severity_levels.percentage_to_move_critical {
            if !(pct > 0.0 && pct <= 1.0) {
                return invalid(format!("percentageToMoveCritical must be in (0, 1], got {}", pct));
            }
        }
        if settings.circuit_breaker.recovery_check_interval_ticks == 0 {
            return invalid("recoveryCheckIntervalTicks must be at least 1".to_string());
        }

        for storm in &self.events.transaction_storms {
            if !storm.multiplier.is_finite() || storm.multiplier < 0.0 {
                return invalid(format!("storm multiplier must be finite and >= 0, got {}", storm.multiplier));
            }
        }
        for degradation in &self.events.pathway_degradations {
            if !degradation.factor.is_finite() || degradation.factor <= 0.0 {
                return invalid(format!(
                    "degradation factor for '{}' must be finite and > 0, got {}",
                    degradation.target, degradation.factor
                ));
            }
            if !names.contains(degradation.target.as_str()) {
                return invalid(format!("degradation target '{}' is not a known pathway", degradation.target));
            }
        }
        Ok(())
    }
}

fn check_rates(name: &str, capacity: f64, load: f64) -> SimResult<()> {
    if !capacity.is_finite() {
        return Err(SimError::InvalidConfig(format!("capacityTPS of '{}' must be finite", name)));
    }
    if !load.is_finite() || load < 0.0 {
        return Err(SimError::InvalidConfig(format!(
            "loadTPS of '{}' must be finite and >= 0, got {}",
            name, load
        )));
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.alternative_pathways.len(), 7);
        assert_eq!(config.events.transaction_storms[0].multiplier, 4.0);
    }

    #[test]
    fn test_parse_original_parameter_shape() {
        let json = r#"{
            "totalSimulationTicks": 100,
            "simulationDelayMs": 0,
            "mainPathway": { "name": "L1", "capacityTPS": 15, "loadTPS": 14 },
            "alternativePathways": [
                { "name": "Base", "capacityTPS": 40, "loadTPS": 32, "gasFee": 12, "congestionThreshold": 500 }
            ],
            "eppControllerSettings": {
                "glitchSeverityLevels": { "warningThreshold": 60, "criticalThreshold": 180 },
                "adaptiveStrategy": { "enabled": true, "default": "mostEconomical", "onCritical": "leastCongested" },
                "circuitBreaker": { "enabled": true, "criticalAltQueueThreshold": 480 }
            },
            "events": {
                "transactionStorm": { "startTick": 20, "duration": 10, "multiplier": 4 },
                "pathwayDegradation": {}
            }
        }"#;
        let config = SimulationConfig::from_json_str(json).expect("valid config");
        assert_eq!(config.main_pathway.name, "L1");
        assert_eq!(config.alternative_pathways[0].gas_fee, Some(dec!(12)));
        assert_eq!(config.alternative_pathways[0].activation_delay, None);
        let cb = &config.epp_controller_settings.circuit_breaker;
        assert_eq!(cb.recovery_check_interval_ticks, 10);
        assert_eq!(cb.recovery_threshold_queue_size, 5);
        let normal = &config.epp_controller_settings.normal_condition;
        assert_eq!(normal.min_active_duration_ticks_alternative, 10);
        assert_eq!(config.epp_controller_settings.glitch_condition.percentage_to_move, 0.5);
        assert_eq!(config.events.transaction_storms.len(), 1);
        assert_eq!(config.events.transaction_storms[0].start_tick, 20);
        assert!(config.events.pathway_degradations.is_empty());
    }

    #[test]
    fn test_event_lists_and_single_degradation() {
        let json = r#"{
            "totalSimulationTicks": 50,
            "mainPathway": { "capacityTPS": 15, "loadTPS": 14 },
            "events": {
                "transactionStorms": [
                    { "startTick": 5, "duration": 10, "multiplier": 2 },
                    { "startTick": 8, "duration": 4, "multiplier": 3 }
                ],
                "pathwayDegradation": { "target": "Main Pathway", "startTick": 10, "duration": 5, "factor": 2 }
            }
        }"#;
        let config = SimulationConfig::from_json_str(json).expect("valid config");
        assert_eq!(config.events.transaction_storms.len(), 2);
        assert_eq!(config.events.pathway_degradations.len(), 1);
        assert_eq!(config.events.pathway_degradations[0].duration, Some(5));
    }

    #[test]
    fn test_unknown_event_key_is_rejected() {
        let json = r#"{
            "totalSimulationTicks": 50,
            "mainPathway": { "capacityTPS": 15, "loadTPS": 14 },
            "events": { "transactionSurge": { "startTick": 5, "duration": 10, "multiplier": 2 } }
        }"#;
        assert!(SimulationConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_missing_sections_fall_back_to_empty() {
        let json = r#"{ "totalSimulationTicks": 5, "mainPathway": { "capacityTPS": 1, "loadTPS": 1 } }"#;
        let config = SimulationConfig::from_json_str(json).expect("valid config");
        assert_eq!(config.main_pathway.name, DEFAULT_MAIN_NAME);
        assert!(config.alternative_pathways.is_empty());
        assert!(config.events.transaction_storms.is_empty());
        assert!(!config.epp_controller_settings.circuit_breaker.enabled);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = SimulationConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let config = SimulationConfig::single_pathway(10, 5.0, 1.0)
            .with_alternative(AlternativePathwayConfig::new("A", 10.0, 0.0, dec!(1)))
            .with_alternative(AlternativePathwayConfig::new("A", 20.0, 0.0, dec!(2)));
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_capacity_is_accepted() {
        let config = SimulationConfig::single_pathway(10, 0.0, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_degradation_target_rejected() {
        let config = SimulationConfig::single_pathway(10, 5.0, 1.0).with_degradation(PathwayDegradation {
            target: "Nowhere".to_string(),
            start_tick: 1,
            duration: Some(2),
            factor: 2.0,
        });
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_percentage_out_of_range_rejected() {
        let mut config = SimulationConfig::single_pathway(10, 5.0, 1.0);
        config.epp_controller_settings.glitch_condition.percentage_to_move = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_event_windows() {
        let storm = TransactionStorm { start_tick: 200, duration: 90, multiplier: 4.0 };
        assert!(!storm.is_active(199));
        assert!(storm.is_active(200));
        assert!(storm.is_active(289));
        assert!(!storm.is_active(290));

        let open_ended = PathwayDegradation {
            target: "x".to_string(),
            start_tick: 5,
            duration: None,
            factor: 2.0,
        };
        assert!(open_ended.is_active(1_000_000));
        assert_eq!(open_ended.end_tick(), None);
    }
}
