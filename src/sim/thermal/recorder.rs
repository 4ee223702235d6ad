use anyhow::Result;
use serde::Serialize;

use crate::BuildingUid;
use crate::sim::coupling::ThermalStepSummary;
use crate::sim::framework::{Bus, SimContext, SimModule};

use super::config::SECONDS_PER_MILLISOL;

/// Mutable, Bus-stored history of thermal steps.
///
/// The intended workflow is:
/// 1) `ThermalRecorderModule` initializes this on the Bus,
/// 2) the recorder appends one sample per step,
/// 3) the caller takes the data from the Bus and finalizes it into a
///    [`ThermalRecord`].
#[derive(Debug, Default)]
pub struct ThermalRecorderData {
    building_uids: Vec<BuildingUid>,
    building_names: Vec<String>,
    elapsed_millisols: Vec<f64>,
    temperatures_c: Vec<Vec<f64>>,
    required_kw: Vec<Vec<f64>>,
    generated_kw: Vec<Vec<f64>>,
}

impl ThermalRecorderData {
    fn ensure_buildings_initialized(&mut self, step: &ThermalStepSummary) {
        if !self.building_uids.is_empty() {
            return;
        }
        self.building_uids = step.buildings.iter().map(|b| b.uid).collect();
        self.building_names = step.buildings.iter().map(|b| b.name.clone()).collect();

        let n = self.building_uids.len();
        self.temperatures_c = vec![Vec::new(); n];
        self.required_kw = vec![Vec::new(); n];
        self.generated_kw = vec![Vec::new(); n];
    }

    pub fn push_step(&mut self, step: &ThermalStepSummary) -> Result<()> {
        self.ensure_buildings_initialized(step);

        let n = self.building_uids.len();
        anyhow::ensure!(
            step.buildings.len() == n
                && step
                    .buildings
                    .iter()
                    .zip(&self.building_uids)
                    .all(|(b, uid)| b.uid == *uid),
            "ThermalRecorderData::push_step: building set changed \
             (expected {n}, got {})",
            step.buildings.len()
        );

        self.elapsed_millisols.push(step.elapsed_millisols);
        for (i, b) in step.buildings.iter().enumerate() {
            self.temperatures_c[i].push(b.temperature_c);
            self.required_kw[i].push(b.required_heat_kw);
            self.generated_kw[i].push(b.generated_heat_kw);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.elapsed_millisols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elapsed_millisols.is_empty()
    }

    pub fn finalize(self) -> ThermalRecord {
        let total_millisols: f64 = self.elapsed_millisols.iter().sum();
        let buildings = (0..self.building_uids.len())
            .map(|i| {
                let temps = &self.temperatures_c[i];
                let n = temps.len().max(1) as f64;
                let min = temps.iter().copied().fold(f64::INFINITY, f64::min);
                let max = temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                // kW over millisols -> kWh.
                let generated_kwh = self.generated_kw[i]
                    .iter()
                    .zip(&self.elapsed_millisols)
                    .map(|(kw, ms)| kw * ms * SECONDS_PER_MILLISOL / 3600.0)
                    .sum();
                BuildingRecord {
                    uid: self.building_uids[i],
                    name: self.building_names[i].clone(),
                    min_temperature_c: if temps.is_empty() { 0.0 } else { min },
                    max_temperature_c: if temps.is_empty() { 0.0 } else { max },
                    mean_temperature_c: temps.iter().sum::<f64>() / n,
                    peak_required_kw: self.required_kw[i].iter().copied().fold(0.0, f64::max),
                    generated_kwh,
                    temperatures_c: self.temperatures_c[i].clone(),
                    required_kw: self.required_kw[i].clone(),
                    generated_kw: self.generated_kw[i].clone(),
                }
            })
            .collect();
        ThermalRecord {
            steps: self.elapsed_millisols.len(),
            total_millisols,
            buildings,
        }
    }
}

/// Summary of one building over a recorded run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingRecord {
    pub uid: BuildingUid,
    pub name: String,
    pub min_temperature_c: f64,
    pub max_temperature_c: f64,
    pub mean_temperature_c: f64,
    pub peak_required_kw: f64,
    /// Heat delivered by the sources over the run [kWh].
    pub generated_kwh: f64,
    pub temperatures_c: Vec<f64>,
    pub required_kw: Vec<f64>,
    pub generated_kw: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThermalRecord {
    pub steps: usize,
    pub total_millisols: f64,
    pub buildings: Vec<BuildingRecord>,
}

impl ThermalRecord {
    pub fn building(&self, name: &str) -> Option<&BuildingRecord> {
        self.buildings.iter().find(|b| b.name == name)
    }
}

/// Records [`ThermalStepSummary`] samples into a [`ThermalRecorderData`] stored on the Bus.
#[derive(Debug, Default)]
pub struct ThermalRecorderModule;

impl ThermalRecorderModule {
    pub fn new() -> Self {
        Self
    }

    /// Removes the recorder data from the Bus and converts it into a finalized result.
    pub fn take_result(bus: &mut Bus) -> Result<ThermalRecord> {
        let Some(data) = bus.take::<ThermalRecorderData>() else {
            anyhow::bail!("ThermalRecorderData not found on Bus");
        };
        Ok(data.finalize())
    }
}

impl SimModule for ThermalRecorderModule {
    fn name(&self) -> &'static str {
        "thermal_recorder"
    }

    fn init(&mut self, _ctx: &SimContext, bus: &mut Bus) -> Result<()> {
        if bus.get_or_default::<ThermalRecorderData>().is_none() {
            anyhow::bail!("ThermalRecorderData slot on Bus holds another type");
        }
        Ok(())
    }

    fn step(&mut self, ctx: &SimContext, bus: &mut Bus) -> Result<()> {
        let step = ctx
            .require::<ThermalStepSummary>(bus, "ThermalRecorderModule")?
            .clone();
        let Some(data) = bus.get_mut::<ThermalRecorderData>() else {
            anyhow::bail!("ThermalRecorderData not initialized on Bus");
        };
        data.push_step(&step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::framework::Pipeline;
    use crate::sim::thermal::building::{BuildingCategory, BuildingSpec, ConstructionType};
    use crate::sim::thermal::config::ThermalConfig;
    use crate::sim::thermal::environment::EnvironmentSnapshot;
    use crate::sim::thermal::environment_module::EnvironmentModule;
    use crate::sim::thermal::heat_source::HeatSource;
    use crate::sim::thermal::module::ThermalModule;
    use crate::sim::thermal::system::ThermalSystem;

    #[test]
    fn test_thermal_recorder_pipeline_smoke() -> Result<()> {
        let cfg = ThermalConfig::default();
        let ctx = SimContext::new(&cfg, 2.0);

        let mut system = ThermalSystem::new(cfg.clone())?;
        system.add_building(
            BuildingSpec::new("Lab", BuildingCategory::Laboratory, ConstructionType::Solid, 9.0, 9.0),
            vec![HeatSource::electric(15.0)],
        )?;

        let mut bus = Bus::new();
        let mut pipeline = Pipeline::new()
            .with_module(EnvironmentModule::fixed(EnvironmentSnapshot::new(-70.0, 0.0, 4.0)))
            .with_module(ThermalModule::new(system))
            .with_module(ThermalRecorderModule::new());

        pipeline.init(&ctx, &mut bus)?;
        for _ in 0..4 {
            pipeline.step(&ctx, &mut bus)?;
        }

        let record = ThermalRecorderModule::take_result(&mut bus)?;
        assert_eq!(record.steps, 4);
        assert!((record.total_millisols - 8.0).abs() < 1e-12);
        let lab = record.building("Lab").unwrap();
        assert_eq!(lab.temperatures_c.len(), 4);
        assert_eq!(lab.required_kw.len(), 4);
        assert!(lab.generated_kw.iter().all(|&kw| (0.0..=15.0 + 1e-9).contains(&kw)));
        assert!(lab.min_temperature_c <= lab.mean_temperature_c);
        assert!(lab.mean_temperature_c <= lab.max_temperature_c);
        assert!(lab.generated_kwh > 0.0);
        Ok(())
    }

    #[test]
    fn test_take_result_without_data_fails() {
        let mut bus = Bus::new();
        assert!(ThermalRecorderModule::take_result(&mut bus).is_err());
    }
}
