use serde::{Deserialize, Serialize};

use super::config::{C_TO_K, GAS_CONSTANT};

/// Molar mass of a nitrogen/oxygen/argon habitat atmosphere [kg/mol].
const AIR_MOLAR_MASS_KG: f64 = 0.0289;

/// Occupancy and life-support state of a building for the current tick.
///
/// Supplied by the surrounding simulation; the thermal core only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingConditions {
    /// People inside the building.
    pub occupants: u32,
    /// People cycling through the building's airlock.
    pub eva_occupants: u32,
    /// Power drawn by EVA suit heaters while the airlock is in use [kW].
    pub eva_heater_kw: f64,
    /// Moles of air in the building.
    pub air_moles: f64,
    /// Mass of air in the building [kg].
    pub air_mass_kg: f64,
    /// Water vapor share of the air [%].
    pub moisture_percent: f64,
    /// Grow-lighting power drawn by crops [kW].
    pub grow_lighting_kw: f64,
}

impl BuildingConditions {
    /// Unoccupied building filled with habitat air at `pressure_kpa` and `temperature_c`.
    pub fn nominal(volume_m3: f64, pressure_kpa: f64, temperature_c: f64) -> Self {
        let t_k = (temperature_c + C_TO_K).max(1.0);
        let air_moles = (pressure_kpa * 1000.0 * volume_m3.max(0.0)) / (GAS_CONSTANT * t_k);
        Self {
            air_moles,
            air_mass_kg: air_moles * AIR_MOLAR_MASS_KG,
            ..Self::default()
        }
    }

    pub fn with_occupants(mut self, occupants: u32) -> Self {
        self.occupants = occupants;
        self
    }

    pub fn with_eva(mut self, eva_occupants: u32, eva_heater_kw: f64) -> Self {
        self.eva_occupants = eva_occupants;
        self.eva_heater_kw = eva_heater_kw;
        self
    }

    pub fn with_grow_lighting(mut self, grow_lighting_kw: f64) -> Self {
        self.grow_lighting_kw = grow_lighting_kw;
        self
    }
}

impl Default for BuildingConditions {
    fn default() -> Self {
        Self {
            occupants: 0,
            eva_occupants: 0,
            eva_heater_kw: 0.0,
            air_moles: 0.0,
            air_mass_kg: 0.0,
            moisture_percent: 1.0,
            grow_lighting_kw: 0.0,
        }
    }
}
