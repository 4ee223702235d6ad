use anyhow::{Context, Result};

use crate::sim::coupling::{
    AirlockDischarges, BuildingThermalSample, ElapsedMillisols, ExcessHeatKwByBuilding,
    MeanSolarIrradianceWPerM2, OutdoorAirTemperatureC, OutdoorWindSpeedMPerS,
    SolarIrradianceWPerM2, ThermalStepSummary,
};
use crate::sim::framework::{Bus, SimContext, SimModule};

use super::environment::EnvironmentSnapshot;
use super::heat_source::HeatSourceType;
use super::system::ThermalSystem;

/// Step-based settlement thermal module.
///
/// Inputs (via [`Bus`]):
/// - [`OutdoorAirTemperatureC`] (required)
/// - [`SolarIrradianceWPerM2`], [`MeanSolarIrradianceWPerM2`],
///   [`OutdoorWindSpeedMPerS`] (optional; dark, configured mean, calm)
/// - [`ElapsedMillisols`] (optional; falls back to `ctx.millisols_per_step`)
/// - [`ExcessHeatKwByBuilding`], [`AirlockDischarges`] (optional; consumed)
///
/// Outputs (via [`Bus`]):
/// - [`ThermalStepSummary`] for the latest step
pub struct ThermalModule {
    system: ThermalSystem,
}

impl ThermalModule {
    pub fn new(system: ThermalSystem) -> Self {
        Self { system }
    }

    pub fn system(&self) -> &ThermalSystem {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut ThermalSystem {
        &mut self.system
    }

    pub fn into_system(self) -> ThermalSystem {
        self.system
    }

    fn environment(&self, ctx: &SimContext, bus: &Bus) -> Result<EnvironmentSnapshot> {
        let outdoor = ctx.require::<OutdoorAirTemperatureC>(bus, "ThermalModule")?.0;
        Ok(EnvironmentSnapshot {
            outdoor_temperature_c: outdoor,
            solar_irradiance_w_m2: bus.get::<SolarIrradianceWPerM2>().map_or(0.0, |v| v.0),
            mean_solar_irradiance_w_m2: bus
                .get::<MeanSolarIrradianceWPerM2>()
                .map_or(self.system.config().mean_solar_irradiance_w_m2, |v| v.0),
            wind_speed_m_s: bus.get::<OutdoorWindSpeedMPerS>().map_or(0.0, |v| v.0),
        })
    }

    /// Applies the one-shot inputs on the Bus.
    ///
    /// Every uid is checked before anything is applied, so a bad payload
    /// leaves the buildings untouched.
    fn apply_inputs(&mut self, bus: &mut Bus) -> Result<()> {
        let excess = bus.take::<ExcessHeatKwByBuilding>();
        let discharges = bus.take::<AirlockDischarges>();

        if let Some(excess) = &excess {
            for uid in excess.kw_by_building_uid.keys() {
                self.system
                    .building(uid)
                    .with_context(|| format!("ThermalModule: excess heat for unknown building {uid}"))?;
            }
        }
        if let Some(discharges) = &discharges {
            for uid in &discharges.building_uids {
                self.system.building(uid).with_context(|| {
                    format!("ThermalModule: airlock discharge for unknown building {uid}")
                })?;
            }
        }

        for (uid, kw) in excess.map(|e| e.kw_by_building_uid).unwrap_or_default() {
            self.system.insert_excess_heat(&uid, kw)?;
        }
        for uid in discharges.map(|d| d.building_uids).unwrap_or_default() {
            self.system.flag_airlock_discharge(&uid)?;
        }
        Ok(())
    }

    /// Summary of the current state of every building.
    pub fn summary(&self, env: &EnvironmentSnapshot, elapsed_millisols: f64) -> ThermalStepSummary {
        let buildings = self
            .system
            .buildings()
            .iter()
            .map(|b| BuildingThermalSample {
                uid: b.uid(),
                name: b.name().to_string(),
                temperature_c: b.current_temperature(),
                required_heat_kw: b.required_heat(),
                generated_heat_kw: b.generated_heat(),
                heat_surplus_kw: b.heat_surplus(),
                stored_heat_kw: b.profile().sinks().total_stored(),
                power_by_kind: HeatSourceType::PRIORITY
                    .iter()
                    .map(|&kind| (kind, b.power_by_kind(kind, env)))
                    .collect(),
            })
            .collect();
        ThermalStepSummary {
            elapsed_millisols,
            outdoor_temperature_c: env.outdoor_temperature_c,
            buildings,
        }
    }
}

impl SimModule for ThermalModule {
    fn name(&self) -> &'static str {
        "thermal"
    }

    fn step(&mut self, ctx: &SimContext, bus: &mut Bus) -> Result<()> {
        let env = self.environment(ctx, bus)?;
        let elapsed = bus
            .get::<ElapsedMillisols>()
            .map_or(ctx.millisols_per_step, |v| v.0);
        anyhow::ensure!(
            elapsed.is_finite(),
            "ThermalModule: non-finite elapsed time {elapsed}"
        );

        self.apply_inputs(bus)?;
        self.system.advance(&env, elapsed);
        bus.put(self.summary(&env, elapsed));
        Ok(())
    }
}
