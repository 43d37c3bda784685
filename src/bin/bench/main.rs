// EPP Benchmark Runner v0.7.0: controller behaviour under storms and sabotage
// Monte Carlo over seeds, ChaCha8Rng arrivals, optional per-tick JSONL trail
//
// Usage:
//   cargo run --release --bin bench                     # Run all scenarios (30 runs each)
//   cargo run --release --bin bench -- --runs 5         # Quick mode (5 runs each)
//   cargo run --release --bin bench -- STORM            # Filter by name
//   cargo run --release --bin bench -- --time-series    # Enable JSONL output
//   cargo run --release --bin bench -- --seed 42        # Custom base seed
//   cargo run --release --bin bench -- --config p.json  # One run of a parameter file
//   RUST_LOG=epp_engine=warn cargo run --bin bench      # Engine logs

mod metrics;
mod monte_carlo;
mod report;
mod scenarios;
mod time_series;

use epp_engine::{PathwaySimulation, SimResult, SimulationConfig};
use report::*;
use scenarios::*;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    runs: usize,
    seed: u64,
    time_series: bool,
    config: Option<PathBuf>,
    filter: Option<String>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs {
        runs: 30,
        seed: 0,
        time_series: false,
        config: None,
        filter: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--runs" => {
                i += 1;
                if i < args.len() {
                    cli.runs = args[i].parse().unwrap_or(30);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    cli.seed = args[i].parse().unwrap_or(0);
                }
            }
            "--config" => {
                i += 1;
                if i < args.len() {
                    cli.config = Some(PathBuf::from(&args[i]));
                }
            }
            "--time-series" => {
                cli.time_series = true;
            }
            arg if !arg.starts_with('-') => {
                cli.filter = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    cli
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ─── Single Parameter File ──────────────────────────────────────────────────

/// Run one parameter file to completion and print the summary.
fn run_config_file(path: &Path, seed: u64) -> SimResult<()> {
    let mut config = SimulationConfig::from_json_file(path)?;
    if config.seed.is_none() {
        config.seed = Some(seed);
    }
    let mut sim = PathwaySimulation::new(config)?;
    let mut summary = None;
    sim.run(
        |snapshot| {
            if snapshot.tick % 50 == 0 {
                println!(
                    "  tick {:>4}  main {:>5}  {:<24} moved {:>4}",
                    snapshot.tick,
                    snapshot.main_queue,
                    snapshot.headline.title,
                    snapshot.moved_transactions.iter().map(|t| t.count).sum::<usize>(),
                );
            }
        },
        |s| summary = Some(s),
    )?;
    if let Some(summary) = summary {
        println!("\n{}\n", summary.render());
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    init_tracing();
    let cli = parse_args();

    if let Some(path) = &cli.config {
        if let Err(e) = run_config_file(path, cli.seed) {
            eprintln!("  {}: {}", path.display(), e);
            std::process::exit(1);
        }
        return;
    }

    let all_scenarios = scenarios();

    let to_run: Vec<&Scenario> = match &cli.filter {
        Some(f) => {
            let f_lower = f.to_lowercase();
            all_scenarios.iter()
                .filter(|s| s.name.to_lowercase().contains(&f_lower)
                          || s.label.to_lowercase().contains(&f_lower)
                          || s.category.to_lowercase().contains(&f_lower))
                .collect()
        }
        None => all_scenarios.iter().collect(),
    };

    if to_run.is_empty() {
        eprintln!("No scenarios match filter: {:?}", cli.filter);
        std::process::exit(1);
    }

    let ts_dir = if cli.time_series {
        Some(Path::new("benchmark-results/time-series").to_path_buf())
    } else {
        None
    };

    println!("\n  EPP Benchmark Runner v0.7.0");
    println!("  PRNG: ChaCha8Rng | Runs/scenario: {} | Base seed: {}", cli.runs, cli.seed);
    println!("  Running {} scenario(s)...\n", to_run.len());
    println!("  {:<32} {:>5} {:>13} {:>9} {:>10} {:>6} {:>7}",
        "Scenario", "Pass%", "PeakMain", "Glitch", "Offload%", "Trips", "Time");
    println!("  {}", "-".repeat(92));

    let suite_start = Instant::now();
    let mut mc_reports = Vec::new();

    for scenario in &to_run {
        let report = match monte_carlo::run_monte_carlo(scenario, cli.runs, cli.seed, ts_dir.as_deref()) {
            Ok(report) => report,
            Err(e) => {
                eprintln!("  {}: {}", scenario.name, e);
                std::process::exit(1);
            }
        };

        let pass_pct = report.pass_rate * 100.0;
        let status = if pass_pct >= 93.3 { "PASS" } else { "FAIL" };

        println!("  {:<32} {:>4}% {:>7.0}±{:<5.0} {:>9.0} {:>9.1}% {:>6.1} {:>5.0}ms  {}",
            report.label,
            pass_pct as u32,
            report.max_main_queue.mean, report.max_main_queue.half_width(),
            report.glitch_count.mean,
            report.offload_pct.mean,
            report.breaker_trips.mean,
            report.elapsed_ms.mean,
            status,
        );

        if pass_pct < 93.3 {
            if let Some(failure) = report.individual_runs.iter().flat_map(|r| r.failures.iter()).next() {
                println!("      first failure: {}", failure);
            }
        }

        mc_reports.push(report);
    }

    let suite_elapsed = suite_start.elapsed();

    // ─── Summary ────────────────────────────────────────────────────────

    let total = mc_reports.len();
    let passed = mc_reports.iter().filter(|r| r.pass_rate >= 0.933).count();
    let failed = total - passed;

    println!("  {}", "-".repeat(92));
    println!("  Total: {}  Passed: {}  Failed: {}  Suite time: {:.1}s\n",
        total, passed, failed, suite_elapsed.as_secs_f64());

    // ─── Write JSON Report ──────────────────────────────────────────────

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let timestamp = format!("{}", ts);

    let report = BenchReport {
        timestamp: timestamp.clone(),
        version: "0.7.0",
        prng: "ChaCha8Rng",
        n_runs_per_scenario: cli.runs,
        summary: Summary {
            total,
            passed,
            failed,
            pass_rate: passed as f64 / total as f64,
        },
        scenarios: mc_reports,
    };

    if let Err(e) = write_report(&report, &timestamp) {
        eprintln!("  Failed to write benchmark report: {}", e);
        std::process::exit(1);
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

fn write_report(report: &BenchReport, timestamp: &str) -> std::io::Result<()> {
    let dir = Path::new("benchmark-results");
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("bench-{}.json", timestamp));
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    std::fs::write(&path, json)?;
    println!("  Results saved to: {}\n", path.display());
    Ok(())
}
