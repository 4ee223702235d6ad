use anyhow::Result;
use habitat_thermal::sim::framework::{Bus, Pipeline, SimContext};
use habitat_thermal::sim::thermal::{
    EnvironmentModule, ThermalModule, ThermalRecorderModule,
};
use habitat_thermal::{
    BuildingCategory, BuildingSpec, ConstructionType, FuelSupply, FuelType, HeatSource,
    SolCycleEnvironment, ThermalConfig, ThermalSystem, WaterBodies,
};
use std::path::Path;

/// Simulated time per pipeline step [millisols].
const STEP_MILLISOLS: f64 = 10.0;

fn demo_settlement(cfg: &ThermalConfig) -> Result<ThermalSystem> {
    let mut system = ThermalSystem::new(cfg.clone())?;
    let hab = system.add_building(
        BuildingSpec::new("Lander Hab", BuildingCategory::Living, ConstructionType::Solid, 9.0, 9.0),
        vec![
            HeatSource::electric(10.0),
            HeatSource::fuel(6.0, FuelSupply::new(FuelType::Methane, 50.0)),
        ],
    )?;
    let tunnel = system.add_building(
        BuildingSpec::new("Hallway", BuildingCategory::Connection, ConstructionType::Solid, 6.0, 2.0),
        vec![HeatSource::electric(2.0)],
    )?;
    let greenhouse = system.add_building(
        BuildingSpec::new("Greenhouse", BuildingCategory::Farming, ConstructionType::Inflatable, 18.0, 9.0)
            .with_water(WaterBodies {
                algae_water_kg: 800.0,
                ..WaterBodies::default()
            }),
        vec![HeatSource::solar(12.0), HeatSource::electric(8.0)],
    )?;
    system.connect(&hab, &tunnel)?;
    system.connect(&tunnel, &greenhouse)?;
    Ok(system)
}

fn main() -> Result<()> {
    // Optional settlement file as first argument; built-in demo otherwise.
    let system = match std::env::args().nth(1) {
        Some(path) => habitat_thermal::io::read_settlement(Path::new(&path))?.build()?,
        None => demo_settlement(&ThermalConfig::default())?,
    };
    let cfg = system.config().clone();
    let ctx = SimContext::new(&cfg, STEP_MILLISOLS);

    let mut bus = Bus::new();
    let mut pipeline = Pipeline::new()
        .with_module(EnvironmentModule::sol_cycle(SolCycleEnvironment::new(-63.0, 20.0)))
        .with_module(ThermalModule::new(system))
        .with_module(ThermalRecorderModule::new());

    pipeline.init(&ctx, &mut bus)?;
    let steps = (1000.0 / STEP_MILLISOLS) as usize;
    for _ in 0..steps {
        pipeline.step(&ctx, &mut bus)?;
    }

    let record = ThermalRecorderModule::take_result(&mut bus)?;
    println!("Simulated {:.0} millisols in {} steps", record.total_millisols, record.steps);
    for b in &record.buildings {
        println!(
            "{:<12} T min/mean/max = {:5.1} / {:5.1} / {:5.1} °C, peak demand {:5.2} kW, heat delivered {:6.2} kWh",
            b.name,
            b.min_temperature_c,
            b.mean_temperature_c,
            b.max_temperature_c,
            b.peak_required_kw,
            b.generated_kwh
        );
    }
    Ok(())
}
