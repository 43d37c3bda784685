// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Elastic Pathway Simulation Suite - Errors

/// Usage and configuration faults raised by the simulation engine.
///
/// Runtime conditions inside a tick (zero-capacity pathways, no ready
/// redirect target, a tripped circuit breaker) are not errors; they degrade
/// to a logged no-op for that tick.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("simulation is already running")]
    AlreadyRunning,

    #[error("simulation has already finished; create a new instance to run again")]
    AlreadyFinished,

    #[error("start requires a `{0}` callback")]
    MissingCallback(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;
