use anyhow::Result;
use habitat_thermal::io::parse_settlement;
use habitat_thermal::sim::coupling::{AirlockDischarges, ThermalStepSummary};
use habitat_thermal::sim::framework::{Bus, Pipeline, SimContext, SimModule};
use habitat_thermal::sim::thermal::{
    ChangeTracker, EnvironmentModule, ThermalEvent, ThermalModule, ThermalRecorderModule,
};
use habitat_thermal::{EnvironmentSnapshot, SolCycleEnvironment};

const OUTPOST: &str = r#"{
    "name": "Outpost",
    "buildings": [
        {
            "name": "Hab",
            "category": "living",
            "construction": "solid",
            "length_m": 9.0,
            "width_m": 9.0,
            "occupants": 3,
            "sources": [
                {"kind": "electric", "max_heat_kw": 8.0},
                {"kind": "nuclear", "max_heat_kw": 4.0}
            ]
        },
        {
            "name": "Airlock",
            "category": "eva",
            "construction": "solid",
            "length_m": 4.0,
            "width_m": 4.0,
            "sources": [{"kind": "electric", "max_heat_kw": 3.0}]
        },
        {
            "name": "Greenhouse",
            "category": "farming",
            "construction": "inflatable",
            "length_m": 12.0,
            "width_m": 6.0,
            "water": {"fish_tank_kg": 1200.0},
            "sources": [
                {"kind": "solar", "max_heat_kw": 6.0},
                {"kind": "fuel", "max_heat_kw": 4.0, "fuel": "methane", "fuel_kg": 40.0}
            ]
        }
    ],
    "adjacency": [["Hab", "Airlock"], ["Hab", "Greenhouse"]]
}"#;

#[test]
fn test_settlement_runs_through_a_sol() -> Result<()> {
    let system = parse_settlement(OUTPOST)?.build()?;
    let cfg = system.config().clone();
    let ctx = SimContext::new(&cfg, 10.0);

    let mut bus = Bus::new();
    let mut pipeline = Pipeline::new()
        .with_module(EnvironmentModule::sol_cycle(SolCycleEnvironment::new(-63.0, 20.0)))
        .with_module(ThermalModule::new(system))
        .with_module(ThermalRecorderModule::new());

    pipeline.init(&ctx, &mut bus)?;
    for _ in 0..100 {
        pipeline.step(&ctx, &mut bus)?;
        let summary = bus.get::<ThermalStepSummary>().unwrap();
        for b in &summary.buildings {
            assert!(b.temperature_c >= cfg.min_indoor_c && b.temperature_c <= cfg.max_indoor_c);
            assert!(b.generated_heat_kw >= 0.0);
        }
    }

    let record = ThermalRecorderModule::take_result(&mut bus)?;
    assert_eq!(record.steps, 100);
    assert!((record.total_millisols - 1000.0).abs() < 1e-9);
    for name in ["Hab", "Airlock", "Greenhouse"] {
        let b = record.building(name).unwrap();
        assert_eq!(b.temperatures_c.len(), 100);
        assert!(b.generated_kwh > 0.0, "{name} was never heated");
    }
    Ok(())
}

#[test]
fn test_airlock_discharge_payload_costs_heat_once() -> Result<()> {
    let mut file = parse_settlement(OUTPOST)?;
    file.adjacency.clear();
    let (mut system, uids) = file.build_with_uids()?;
    let airlock = uids["Airlock"];
    let conditions = system
        .building(&airlock)
        .map(|b| b.conditions().with_eva(1, 0.0))
        .unwrap();
    system.set_conditions(&airlock, conditions)?;

    let cfg = system.config().clone();
    let ctx = SimContext::new(&cfg, 1.0);
    let mut module = ThermalModule::new(system);
    let mut bus = Bus::new();
    let mut environment = EnvironmentModule::fixed(EnvironmentSnapshot::new(-60.0, 0.0, 5.0));

    environment.step(&ctx, &mut bus)?;
    bus.put(AirlockDischarges {
        building_uids: vec![airlock],
    });
    module.step(&ctx, &mut bus)?;
    let first = module.system().building(&airlock).unwrap().last_step().loss.airlock;
    assert!(first < 0.0);
    assert!(bus.get::<AirlockDischarges>().is_none());

    module.step(&ctx, &mut bus)?;
    let second = module.system().building(&airlock).unwrap().last_step().loss.airlock;
    assert_eq!(second, 0.0);
    Ok(())
}

#[test]
fn test_change_tracker_reports_only_new_changes() -> Result<()> {
    let (mut system, uids) = parse_settlement(OUTPOST)?.build_with_uids()?;
    let mut tracker = ChangeTracker::new(&system);
    assert!(tracker.collect(&system).is_empty());

    let night = EnvironmentSnapshot::new(-60.0, 0.0, 5.0);
    system.advance(&night, 2.0);
    let events = tracker.collect(&system);
    let hab = uids["Hab"];
    assert!(
        events
            .iter()
            .any(|(uid, e)| *uid == hab && matches!(e, ThermalEvent::Temperature(_)))
    );
    assert!(
        events
            .iter()
            .any(|(uid, e)| *uid == hab && matches!(e, ThermalEvent::SourceMode { .. }))
    );

    // A zero-length advance changes nothing.
    system.advance(&night, 0.0);
    assert!(tracker.collect(&system).is_empty());
    Ok(())
}
