// Monte Carlo Infrastructure: N runs per scenario with statistical aggregation
// Each scenario runs N times with seeds base..base+N, computing mean ± 95% CI

use epp_engine::*;

use crate::metrics::{ConservationTracker, SeverityTracker};
use crate::report::*;
use crate::scenarios::Scenario;
use crate::time_series::TimeSeriesRecorder;

use std::time::Instant;

/// Run a single scenario iteration with a specific seed.
pub fn run_single(
    scenario: &Scenario,
    seed: u64,
    time_series_dir: Option<&std::path::Path>,
) -> SimResult<BenchResult> {
    let start = Instant::now();
    let config = (scenario.build)().with_seed(seed).with_delay_ms(0);
    let mut severity = SeverityTracker::new(&config.epp_controller_settings);
    let mut conservation = ConservationTracker::new();
    let mut time_series = time_series_dir.map(|_| TimeSeriesRecorder::new());

    let mut sim = PathwaySimulation::new(config)?;
    sim.start()?;

    let summary = loop {
        match sim.step() {
            StepOutcome::Tick(snapshot) => {
                severity.record_tick(&snapshot);
                conservation.record_tick(&sim);
                if let Some(ts) = time_series.as_mut() {
                    ts.record(&snapshot);
                }
            }
            StepOutcome::Finished(summary) => break summary,
            StepOutcome::Idle => break sim.summary(),
        }
    };

    if let (Some(ts), Some(dir)) = (&time_series, time_series_dir) {
        let path = dir.join(format!("seed-{}.jsonl", seed));
        if let Err(e) = ts.write_jsonl(&path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write time series");
        }
    }

    let elapsed = start.elapsed();
    let elapsed_secs = elapsed.as_secs_f64().max(0.001);

    let stats = &summary.final_stats;
    let processed_alt: u64 = stats.total_transactions_processed_alt.values().sum();
    let processed = stats.total_processed();
    let offload_pct = if processed > 0 {
        processed_alt as f64 / processed as f64 * 100.0
    } else {
        0.0
    };

    // Evaluate pass/fail
    let criteria = &scenario.criteria;
    let mut failures = Vec::new();
    if let Some(max) = criteria.max_main_queue {
        if stats.max_main_queue_length >= max {
            failures.push(format!("main queue peaked at {} (limit {})", stats.max_main_queue_length, max));
        }
    }
    if let Some(max) = criteria.max_glitches {
        if stats.glitch_count > max {
            failures.push(format!("{} glitches (limit {})", stats.glitch_count, max));
        }
    }
    if let Some(min) = criteria.min_peak_main_queue {
        if stats.max_main_queue_length < min {
            failures.push(format!("main queue only peaked at {} (expected {})", stats.max_main_queue_length, min));
        }
    }
    if let Some(min) = criteria.min_path_switches {
        if stats.path_switches < min {
            failures.push(format!("{} activations (expected {})", stats.path_switches, min));
        }
    }
    if criteria.require_breaker_trip && severity.breaker_trips == 0 && !sim.controller().is_circuit_breaker_tripped() {
        failures.push("circuit breaker never tripped".to_string());
    }
    if criteria.require_conservation && !conservation.holds() {
        failures.push(format!(
            "conservation violated on {} ticks (max discrepancy {})",
            conservation.violations, conservation.max_discrepancy
        ));
    }

    Ok(BenchResult {
        scenario: scenario.label.to_string(),
        name: scenario.name.to_string(),
        category: scenario.category.to_string(),
        seed,
        pass: failures.is_empty(),
        failures,
        total_ticks: summary.total_ticks,
        generated: stats.total_transactions_generated,
        processed_main: stats.total_transactions_processed_main,
        processed_alt,
        offload_pct,
        max_main_queue: stats.max_main_queue_length,
        final_main_queue: sim.network().main().len(),
        glitch_count: stats.glitch_count,
        path_switches: stats.path_switches,
        path_deactivations: stats.path_deactivations,
        warning_ticks: severity.warning_ticks,
        critical_ticks: severity.critical_ticks,
        breaker_trips: severity.breaker_trips,
        breaker_ticks: severity.breaker_ticks,
        transferred: severity.transferred,
        conservation_holds: conservation.holds(),
        elapsed_ms: elapsed.as_millis(),
        throughput_per_sec: summary.total_ticks as f64 / elapsed_secs,
    })
}

/// Run Monte Carlo: N runs of a scenario, aggregate stats.
pub fn run_monte_carlo(
    scenario: &Scenario,
    n_runs: usize,
    base_seed: u64,
    time_series_base: Option<&std::path::Path>,
) -> SimResult<MonteCarloReport> {
    let ts_dir = time_series_base.map(|base| base.join(scenario.name.to_lowercase()));

    let mut results = Vec::with_capacity(n_runs);
    for i in 0..n_runs {
        let seed = base_seed + i as u64;
        results.push(run_single(scenario, seed, ts_dir.as_deref())?);
    }

    Ok(aggregate(scenario, results))
}

fn sample<F: Fn(&BenchResult) -> f64>(results: &[BenchResult], f: F) -> Stats {
    Stats::from_samples(&results.iter().map(f).collect::<Vec<_>>())
}

/// Aggregate individual runs into a MonteCarloReport.
fn aggregate(scenario: &Scenario, results: Vec<BenchResult>) -> MonteCarloReport {
    let n = results.len();
    let passed = results.iter().filter(|r| r.pass).count();
    let pass_rate = if n > 0 { passed as f64 / n as f64 } else { 0.0 };

    MonteCarloReport {
        scenario_name: scenario.name.to_string(),
        label: scenario.label.to_string(),
        category: scenario.category.to_string(),
        n_runs: n,
        pass_rate,
        max_main_queue: sample(&results, |r| r.max_main_queue as f64),
        glitch_count: sample(&results, |r| r.glitch_count as f64),
        offload_pct: sample(&results, |r| r.offload_pct),
        path_switches: sample(&results, |r| r.path_switches as f64),
        breaker_trips: sample(&results, |r| r.breaker_trips as f64),
        elapsed_ms: sample(&results, |r| r.elapsed_ms as f64),
        throughput_per_sec: sample(&results, |r| r.throughput_per_sec),
        individual_runs: results,
    }
}
