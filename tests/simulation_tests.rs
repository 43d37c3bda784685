#[cfg(test)]
mod tests {
    use epp_engine::*;
    use rust_decimal_macros::dec;

    /// Step a started simulation to completion, collecting every snapshot.
    fn drive(sim: &mut PathwaySimulation) -> (Vec<TickSnapshot>, SimSummary) {
        let mut snapshots = Vec::new();
        loop {
            match sim.step() {
                StepOutcome::Tick(s) => snapshots.push(s),
                StepOutcome::Finished(summary) => return (snapshots, summary),
                StepOutcome::Idle => panic!("simulation went idle before finishing"),
            }
        }
    }

    fn queued(sim: &PathwaySimulation) -> u64 {
        let net = sim.network();
        net.main().len() as u64 + net.alternatives().iter().map(|p| p.len() as u64).sum::<u64>()
    }

    fn default_controller() -> ControllerSettings {
        SimulationConfig::default().epp_controller_settings
    }

    // ========== Baseline Regression ==========

    #[test]
    fn test_baseline_never_breaches_warning() {
        let config = SimulationConfig::single_pathway(600, 15.0, 14.0)
            .with_seed(11)
            .with_controller(default_controller());
        let mut sim = PathwaySimulation::new(config).expect("valid config");
        sim.start().expect("start");
        let (snapshots, summary) = drive(&mut sim);

        assert_eq!(snapshots.len(), 601);
        assert!(snapshots.iter().all(|s| s.headline.level == HeadlineLevel::Nominal));
        assert!(summary.final_stats.max_main_queue_length < 60);
        assert_eq!(summary.final_stats.glitch_count, 0);
        assert_eq!(summary.final_stats.path_switches, 0);
        assert_eq!(summary.final_stats.total_transactions_generated, 601 * 14);
    }

    #[test]
    fn test_default_scenario_without_storm_stays_calm() {
        let mut config = SimulationConfig::default().with_delay_ms(0).with_seed(5);
        config.events.transaction_storms.clear();
        let mut sim = PathwaySimulation::new(config).expect("valid config");
        sim.start().expect("start");
        let (_, summary) = drive(&mut sim);
        assert_eq!(summary.final_stats.glitch_count, 0);
        assert_eq!(summary.final_stats.total_transactions_processed_alt.len(), 7);
    }

    // ========== Transaction Storm ==========

    #[test]
    fn test_storm_crosses_warning_and_recedes() {
        let config = SimulationConfig::default().with_delay_ms(0).with_seed(42);
        let mut sim = PathwaySimulation::new(config).expect("valid config");
        sim.start().expect("start");
        let (snapshots, summary) = drive(&mut sim);

        let before: Vec<&TickSnapshot> = snapshots.iter().filter(|s| s.tick < 200).collect();
        assert!(before.iter().all(|s| s.main_queue < 60), "no congestion before the storm");

        assert_eq!(snapshots[200].headline.level, HeadlineLevel::Storm);
        assert_eq!(snapshots[200].headline.title, "TRANSACTION STORM");
        assert!(snapshots[200..290]
            .iter()
            .all(|s| matches!(s.headline.level, HeadlineLevel::Storm | HeadlineLevel::Breaker)));
        assert!(snapshots[200..=290].iter().any(|s| s.main_queue >= 60), "storm must cross warning");

        let stats = &summary.final_stats;
        assert!(stats.glitch_count > 0);
        assert!(stats.path_switches >= 1);
        assert!(stats.total_transactions_processed_alt.values().sum::<u64>() > 0);

        let last = snapshots.last().expect("at least one snapshot");
        assert!(last.main_queue < 60, "main queue must recede after the storm, got {}", last.main_queue);
    }

    #[test]
    fn test_storm_without_helpers_builds_backlog() {
        let config = SimulationConfig::single_pathway(300, 15.0, 14.0)
            .with_seed(3)
            .with_controller(default_controller())
            .with_storm(TransactionStorm { start_tick: 200, duration: 90, multiplier: 4.0 });
        let mut sim = PathwaySimulation::new(config).expect("valid config");
        sim.start().expect("start");
        let (_, summary) = drive(&mut sim);

        // 41 net arrivals per storm tick with nowhere to go
        assert!(summary.final_stats.max_main_queue_length > 3_000);
        assert!(summary.final_stats.glitch_count > 0);
        assert_eq!(summary.final_stats.path_switches, 0);
    }

    // ========== Redirection ==========

    #[test]
    fn test_unbounded_transfer_clamped_to_main_queue() {
        let mut settings = ControllerSettings::default();
        settings.glitch_severity_levels.warning_threshold = Some(1);
        settings.glitch_condition = GlitchCondition {
            percentage_to_move: 1.0,
            max_transactions_to_move_in_one_go: Some(10_000),
        };
        // main never completes work, so its queue is exactly the arrivals
        let config = SimulationConfig::single_pathway(5, 0.0, 5.0)
            .with_seed(1)
            .with_alternative(AlternativePathwayConfig::new("Rollup", 100.0, 0.0, dec!(1)))
            .with_controller(settings);
        let mut sim = PathwaySimulation::new(config).expect("valid config");
        sim.start().expect("start");
        let (snapshots, _) = drive(&mut sim);

        assert_eq!(snapshots[1].main_queue, 5);
        assert_eq!(
            snapshots[2].moved_transactions,
            vec![Transfer { to: "Rollup".to_string(), count: 5 }]
        );
        assert_eq!(snapshots[2].main_queue, 5, "only the next batch of arrivals remains");
    }

    #[test]
    fn test_queue_conservation_every_tick() {
        let config = SimulationConfig::default()
            .with_delay_ms(0)
            .with_seed(9)
            .with_degradation(PathwayDegradation {
                target: "Polygon (Sidechain)".to_string(),
                start_tick: 150,
                duration: Some(100),
                factor: 3.0,
            });
        let mut sim = PathwaySimulation::new(config).expect("valid config");
        sim.start().expect("start");

        while let StepOutcome::Tick(_) = sim.step() {
            let stats = sim.stats();
            assert_eq!(
                stats.total_transactions_generated,
                stats.total_processed() + queued(&sim),
                "transactions lost or duplicated at tick {}",
                sim.current_tick()
            );
        }
    }

    fn queue_lengths(sim: &PathwaySimulation) -> Vec<(String, usize)> {
        let net = sim.network();
        std::iter::once(net.main())
            .chain(net.alternatives().iter())
            .map(|p| (p.name().to_string(), p.len()))
            .collect()
    }

    fn completions(stats: &SimStats, name: &str, main: &str) -> u64 {
        if name == main {
            stats.total_transactions_processed_main
        } else {
            stats.total_transactions_processed_alt.get(name).copied().unwrap_or_default()
        }
    }

    #[test]
    fn test_each_pathway_balances_every_tick() {
        let config = SimulationConfig::default().with_delay_ms(0).with_seed(21);
        let main_name = config.main_pathway.name.clone();
        let main_load = config.main_pathway.load_tps as i64;
        let alt_loads: Vec<(String, i64)> = config
            .alternative_pathways
            .iter()
            .map(|a| (a.name.clone(), a.load_tps as i64))
            .collect();
        let storm = config.events.transaction_storms[0].clone();

        let mut sim = PathwaySimulation::new(config).expect("valid config");
        sim.start().expect("start");

        let mut before = queue_lengths(&sim);
        let mut stats_before = sim.stats().clone();
        let mut pending_transfers: Vec<Transfer> = Vec::new();
        let mut total_moved = 0;

        while let StepOutcome::Tick(snapshot) = sim.step() {
            assert_eq!(snapshot.moved_transactions, pending_transfers, "tick {}", snapshot.tick);

            let after = queue_lengths(&sim);
            let stats_after = sim.stats().clone();
            let transfers = sim.network().tick_transfers().to_vec();
            let moved_out: i64 = transfers.iter().map(|t| t.count as i64).sum();
            total_moved += moved_out;

            for ((name, len_before), (_, len_after)) in before.iter().zip(after.iter()) {
                let completed = (completions(&stats_after, name, &main_name)
                    - completions(&stats_before, name, &main_name)) as i64;
                let (arrived, moved) = if *name == main_name {
                    let multiplier = if storm.is_active(snapshot.tick) { storm.multiplier as i64 } else { 1 };
                    (main_load * multiplier, -moved_out)
                } else {
                    let load = alt_loads.iter().find(|(n, _)| n == name).map(|(_, l)| *l).unwrap_or_default();
                    let moved_in: i64 = transfers.iter().filter(|t| &t.to == name).map(|t| t.count as i64).sum();
                    (load, moved_in)
                };
                assert_eq!(
                    *len_after as i64,
                    *len_before as i64 + arrived - completed + moved,
                    "{} out of balance at tick {}",
                    name,
                    snapshot.tick
                );
            }

            before = after;
            stats_before = stats_after;
            pending_transfers = transfers;
        }

        assert!(total_moved > 0, "the storm must trigger redirection");
    }

    #[test]
    fn test_fractional_load_is_reproducible_per_seed() {
        let build = |seed| {
            SimulationConfig::single_pathway(200, 10.0, 7.3)
                .with_seed(seed)
                .with_alternative(AlternativePathwayConfig::new("Side", 12.0, 4.6, dec!(2)))
        };
        let run = |seed| {
            let mut sim = PathwaySimulation::new(build(seed)).expect("valid config");
            sim.start().expect("start");
            drive(&mut sim).1
        };
        let a = run(77);
        let b = run(77);
        assert_eq!(a, b);
        // 201 ticks at 7.3 + 4.6 per tick on average
        let generated = a.final_stats.total_transactions_generated as f64;
        assert!((generated - 201.0 * 11.9).abs() < 150.0, "generated {}", generated);
    }

    // ========== Pathway Degradation ==========

    #[test]
    fn test_degradation_window_restores_capacity() {
        let target = "Base (OP Stack)";
        let config = SimulationConfig::default()
            .with_delay_ms(0)
            .with_seed(2)
            .with_degradation(PathwayDegradation {
                target: target.to_string(),
                start_tick: 100,
                duration: Some(50),
                factor: 4.0,
            });
        let mut sim = PathwaySimulation::new(config).expect("valid config");
        sim.start().expect("start");

        let capacity = |sim: &PathwaySimulation| {
            sim.network().alternative(target).map(|p| p.capacity_tps()).unwrap_or_default()
        };

        while let StepOutcome::Tick(snapshot) = sim.step() {
            match snapshot.tick {
                0..=99 => assert_eq!(capacity(&sim), 40.0),
                100..=149 => {
                    assert_eq!(capacity(&sim), 10.0);
                    assert_eq!(snapshot.headline.title, "PATHWAY SABOTAGE");
                }
                150..=199 => assert_eq!(capacity(&sim), 40.0),
                _ => break,
            }
        }
    }

    #[test]
    fn test_main_pathway_can_be_degraded() {
        let config = SimulationConfig::single_pathway(50, 20.0, 0.0)
            .with_seed(4)
            .with_degradation(PathwayDegradation {
                target: DEFAULT_MAIN_NAME.to_string(),
                start_tick: 10,
                duration: Some(5),
                factor: 2.0,
            });
        let mut sim = PathwaySimulation::new(config).expect("valid config");
        sim.start().expect("start");
        for _ in 0..=10 {
            sim.step();
        }
        assert_eq!(sim.network().main().capacity_tps(), 10.0);
        for _ in 0..5 {
            sim.step();
        }
        assert_eq!(sim.network().main().capacity_tps(), 20.0);
    }

    // ========== Circuit Breaker ==========

    fn breaker_config() -> SimulationConfig {
        let mut settings = default_controller();
        settings.circuit_breaker.critical_alt_queue_threshold = Some(40);
        settings.circuit_breaker.recovery_check_interval_ticks = 10;
        settings.circuit_breaker.recovery_threshold_queue_size = 5;
        SimulationConfig::single_pathway(200, 15.0, 14.0)
            .with_seed(8)
            .with_alternative(AlternativePathwayConfig::new("Helper A", 5.0, 4.0, dec!(3)))
            .with_alternative(AlternativePathwayConfig::new("Helper B", 5.0, 4.0, dec!(4)))
            .with_controller(settings)
            .with_storm(TransactionStorm { start_tick: 50, duration: 60, multiplier: 6.0 })
    }

    #[test]
    fn test_breaker_suspends_adaptive_action() {
        let mut sim = PathwaySimulation::new(breaker_config()).expect("valid config");
        sim.start().expect("start");

        let mut tripped_at = None;
        let mut holding_ticks = 0;
        let mut glitches = 0;
        while let StepOutcome::Tick(_) = sim.step() {
            match sim.last_reaction() {
                Some(Reaction::BreakerTripped) => {
                    tripped_at.get_or_insert(sim.current_tick());
                    assert!(sim.network().tick_transfers().is_empty());
                }
                Some(Reaction::BreakerHolding) | Some(Reaction::BreakerRecoveryFailed) => {
                    holding_ticks += 1;
                    assert!(sim.network().tick_transfers().is_empty(), "no redirection while tripped");
                    assert!(sim.controller().is_circuit_breaker_tripped());
                    assert_eq!(sim.stats().glitch_count, glitches, "no glitch accounting while tripped");
                }
                _ => {}
            }
            glitches = sim.stats().glitch_count;
        }

        assert!(tripped_at.is_some(), "undersized helpers must trip the breaker");
        assert!(holding_ticks >= 9);
    }

    #[test]
    fn test_breaker_headline_outranks_storm() {
        let mut sim = PathwaySimulation::new(breaker_config()).expect("valid config");
        sim.start().expect("start");
        let (snapshots, _) = drive(&mut sim);

        let tripped: Vec<&TickSnapshot> = snapshots.iter().filter(|s| s.circuit_breaker_tripped).collect();
        assert!(!tripped.is_empty());
        assert!(tripped.iter().all(|s| s.headline.level == HeadlineLevel::Breaker));
        assert!(tripped.iter().any(|s| (50..110).contains(&s.tick)), "trip happens during the storm");
    }

    // ========== Lifecycle ==========

    #[test]
    fn test_run_emits_inclusive_ticks_and_summary() {
        let config = SimulationConfig::single_pathway(20, 10.0, 3.0).with_seed(6);
        let mut sim = PathwaySimulation::new(config).expect("valid config");
        let mut ticks = Vec::new();
        let mut summary = None;
        let outcome = sim
            .run(|s| ticks.push(s.tick), |s| summary = Some(s))
            .expect("run");

        assert_eq!(outcome, RunOutcome::Finished);
        assert_eq!(ticks, (0..=20).collect::<Vec<u64>>());
        let summary = summary.expect("finish callback fired");
        assert_eq!(summary.total_ticks, 21);
        assert_eq!(summary.final_stats.total_transactions_generated, 63);
        assert!(summary.render().contains("Total ticks run:              21"));

        assert!(matches!(sim.run(|_| {}, |_| {}), Err(SimError::AlreadyFinished)));
    }

    #[test]
    fn test_run_on_started_instance_is_rejected() {
        let mut sim = PathwaySimulation::new(SimulationConfig::single_pathway(5, 1.0, 1.0)).expect("valid config");
        sim.start().expect("start");
        assert!(matches!(sim.run(|_| {}, |_| {}), Err(SimError::AlreadyRunning)));
    }

    #[test]
    fn test_stop_produces_no_summary() {
        let config = SimulationConfig::single_pathway(500, 10.0, 3.0).with_seed(6).with_delay_ms(1);
        let mut sim = PathwaySimulation::new(config).expect("valid config");
        let handle = sim.stop_handle();
        let mut seen = 0u64;
        let mut finished = false;
        let outcome = sim
            .run(
                |s| {
                    seen += 1;
                    if s.tick == 4 {
                        handle.stop();
                    }
                },
                |_| finished = true,
            )
            .expect("run");

        assert_eq!(outcome, RunOutcome::Stopped);
        assert_eq!(seen, 5);
        assert!(!finished);
        assert!(!sim.is_running());
        assert!(matches!(sim.start(), Err(SimError::AlreadyFinished)));
    }

    #[test]
    fn test_instances_are_isolated() {
        let config = SimulationConfig::default().with_delay_ms(0).with_seed(1);
        let mut a = PathwaySimulation::new(config.clone()).expect("valid config");
        let b = PathwaySimulation::new(config).expect("valid config");
        a.start().expect("start");
        for _ in 0..50 {
            a.step();
        }
        assert!(a.stats().total_transactions_generated > 0);
        assert_eq!(b.stats().total_transactions_generated, 0);
        assert_eq!(b.current_tick(), 0);
    }

    // ========== Configuration ==========

    #[test]
    fn test_json_parameters_drive_a_run() {
        let json = r#"{
            "totalSimulationTicks": 30,
            "seed": 12,
            "mainPathway": { "capacityTPS": 5, "loadTPS": 12 },
            "alternativePathways": [
                { "name": "Rollup", "capacityTPS": 40, "loadTPS": 0, "gasFee": 3, "congestionThreshold": 100 }
            ],
            "eppControllerSettings": {
                "glitchSeverityLevels": { "warningThreshold": 10 },
                "glitchCondition": { "percentageToMove": 0.5 }
            }
        }"#;
        let config = SimulationConfig::from_json_str(json).expect("valid json");
        let mut sim = PathwaySimulation::new(config).expect("valid config");
        sim.start().expect("start");
        let (_, summary) = drive(&mut sim);

        assert_eq!(summary.total_ticks, 31);
        assert_eq!(summary.final_stats.path_switches, 1);
        assert!(summary.final_stats.total_transactions_processed_alt["Rollup"] > 0);
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let config = SimulationConfig::single_pathway(10, 1.0, 1.0).with_degradation(PathwayDegradation {
            target: "Nowhere".to_string(),
            start_tick: 1,
            duration: None,
            factor: 2.0,
        });
        assert!(matches!(PathwaySimulation::new(config), Err(SimError::InvalidConfig(_))));
    }
}
