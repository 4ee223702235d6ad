//! Coupling payloads exchanged between simulation modules.
//!
//! These types are the small, stable contracts that the environment, the
//! thermal core and any host module exchange via the
//! [`crate::sim::framework::Bus`].
//!
//! Conventions:
//! - per-building values are keyed by [`BuildingUid`], never by name,
//! - heat rates are in kW, temperatures in °C, time in millisols.

use std::collections::HashMap;

use crate::BuildingUid;
use crate::sim::thermal::heat_source::HeatSourceType;

/// Outdoor air temperature [°C].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutdoorAirTemperatureC(pub f64);

/// Solar irradiance at the surface [W/m²].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarIrradianceWPerM2(pub f64);

/// Long-term mean solar irradiance at the settlement [W/m²].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanSolarIrradianceWPerM2(pub f64);

/// Outdoor wind speed [m/s].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutdoorWindSpeedMPerS(pub f64);

/// Simulated time the thermal core should advance this step [millisols].
///
/// When absent, modules fall back to `SimContext::millisols_per_step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElapsedMillisols(pub f64);

/// Heat dumped into buildings by other subsystems (e.g. power plants), keyed by
/// building uid [kW]. Consumed by the thermal module on its next step.
#[derive(Debug, Clone, Default)]
pub struct ExcessHeatKwByBuilding {
    pub kw_by_building_uid: HashMap<BuildingUid, f64>,
}

/// Airlock cycles that vented air since the last step.
#[derive(Debug, Clone, Default)]
pub struct AirlockDischarges {
    pub building_uids: Vec<BuildingUid>,
}

/// Per-building result of the latest thermal step.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingThermalSample {
    pub uid: BuildingUid,
    pub name: String,
    pub temperature_c: f64,
    pub required_heat_kw: f64,
    pub generated_heat_kw: f64,
    pub heat_surplus_kw: f64,
    pub stored_heat_kw: f64,
    /// Electric draw of the heat sources, by class [kW].
    pub power_by_kind: Vec<(HeatSourceType, f64)>,
}

/// Settlement-wide result of the latest thermal step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThermalStepSummary {
    pub elapsed_millisols: f64,
    pub outdoor_temperature_c: f64,
    pub buildings: Vec<BuildingThermalSample>,
}

impl ThermalStepSummary {
    pub fn total_generated_kw(&self) -> f64 {
        self.buildings.iter().map(|b| b.generated_heat_kw).sum()
    }

    pub fn total_power_kw(&self) -> f64 {
        self.buildings
            .iter()
            .flat_map(|b| b.power_by_kind.iter().map(|(_, kw)| kw))
            .sum()
    }
}
