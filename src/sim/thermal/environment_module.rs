use anyhow::Result;

use crate::sim::coupling::{
    ElapsedMillisols, MeanSolarIrradianceWPerM2, OutdoorAirTemperatureC, OutdoorWindSpeedMPerS,
    SolarIrradianceWPerM2,
};
use crate::sim::framework::{Bus, SimContext, SimModule};

use super::environment::{Environment, EnvironmentSnapshot, SolCycleEnvironment};

/// Where the published outdoor conditions come from.
#[derive(Debug, Clone)]
pub enum EnvironmentSource {
    /// Constant conditions.
    Fixed(EnvironmentSnapshot),
    /// Synthetic diurnal cycle, advanced by every step.
    SolCycle(SolCycleEnvironment),
}

/// Step-based publisher of the outdoor conditions.
///
/// Each step publishes the conditions at the current time together with the
/// step length, then moves the clock forward.
pub struct EnvironmentModule {
    source: EnvironmentSource,
}

impl EnvironmentModule {
    pub fn new(source: EnvironmentSource) -> Self {
        Self { source }
    }

    pub fn fixed(snapshot: EnvironmentSnapshot) -> Self {
        Self::new(EnvironmentSource::Fixed(snapshot))
    }

    pub fn sol_cycle(env: SolCycleEnvironment) -> Self {
        Self::new(EnvironmentSource::SolCycle(env))
    }

    pub fn snapshot(&self) -> EnvironmentSnapshot {
        match &self.source {
            EnvironmentSource::Fixed(s) => *s,
            EnvironmentSource::SolCycle(env) => env.snapshot(),
        }
    }

    fn publish(&self, bus: &mut Bus, millisols: f64) -> Result<()> {
        let s = self.snapshot();
        anyhow::ensure!(
            s.outdoor_temperature_c.is_finite() && s.solar_irradiance_w_m2.is_finite(),
            "EnvironmentModule: non-finite outdoor conditions {s:?}"
        );
        bus.put(OutdoorAirTemperatureC(s.outdoor_temperature_c));
        bus.put(SolarIrradianceWPerM2(s.solar_irradiance_w_m2));
        bus.put(MeanSolarIrradianceWPerM2(s.mean_solar_irradiance_w_m2));
        bus.put(OutdoorWindSpeedMPerS(s.wind_speed_m_s));
        bus.put(ElapsedMillisols(millisols));
        Ok(())
    }
}

impl SimModule for EnvironmentModule {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn step(&mut self, ctx: &SimContext, bus: &mut Bus) -> Result<()> {
        self.publish(bus, ctx.millisols_per_step)?;
        if let EnvironmentSource::SolCycle(env) = &mut self.source {
            env.advance(ctx.millisols_per_step);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::thermal::config::ThermalConfig;

    #[test]
    fn test_environment_module_publishes_conditions() -> Result<()> {
        let cfg = ThermalConfig::default();
        let ctx = SimContext::new(&cfg, 250.0);

        let mut module = EnvironmentModule::sol_cycle(SolCycleEnvironment::new(-60.0, 20.0));
        let mut bus = Bus::new();

        module.init(&ctx, &mut bus)?;
        module.step(&ctx, &mut bus)?;
        // Midnight: dark.
        assert_eq!(bus.get::<SolarIrradianceWPerM2>().map(|v| v.0), Some(0.0));
        assert_eq!(bus.get::<ElapsedMillisols>().map(|v| v.0), Some(250.0));

        module.step(&ctx, &mut bus)?;
        module.step(&ctx, &mut bus)?;
        // Millisol 500: noon.
        let irr = bus.get::<SolarIrradianceWPerM2>().unwrap().0;
        assert!(irr > 500.0, "noon irradiance {irr}");

        let t = bus.get::<OutdoorAirTemperatureC>().unwrap().0;
        assert!(t.is_finite());
        Ok(())
    }

    #[test]
    fn test_fixed_source_never_changes() -> Result<()> {
        let cfg = ThermalConfig::default();
        let ctx = SimContext::new(&cfg, 10.0);
        let mut module = EnvironmentModule::fixed(EnvironmentSnapshot::new(-80.0, 0.0, 3.0));
        let mut bus = Bus::new();
        for _ in 0..3 {
            module.step(&ctx, &mut bus)?;
            assert_eq!(bus.get::<OutdoorAirTemperatureC>().map(|v| v.0), Some(-80.0));
            assert_eq!(bus.get::<OutdoorWindSpeedMPerS>().map(|v| v.0), Some(3.0));
        }
        Ok(())
    }
}
