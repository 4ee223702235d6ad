//! Static description of a building and the envelope values derived from it.

use serde::{Deserialize, Serialize};

/// Interior height shared by all modules [m].
pub const INTERIOR_HEIGHT_M: f64 = 2.5;
/// Conduction coefficient applied to wall and ceiling/floor areas [W/(m^2*K)].
pub const U_VALUE: f64 = 0.1;
/// Solar transmittance of greenhouse glazing.
pub const TRANSMITTANCE_GREENHOUSE: f64 = 0.55;
/// Solar transmittance of ordinary windows.
pub const TRANSMITTANCE_WINDOW: f64 = 0.75;

const AIR_CHANGE_PER_HR: f64 = 0.5;
const WIND_FACTOR: f64 = 2.14;

/// Functional category of a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingCategory {
    Connection,
    Farming,
    Eva,
    Command,
    Communication,
    Workshop,
    Laboratory,
    Living,
    Medical,
    Erv,
    Storage,
    Power,
    Processing,
}

impl BuildingCategory {
    /// Constant heat released by installed equipment [kW].
    pub fn equipment_heat_kw(self) -> f64 {
        match self {
            Self::Connection => 0.0879,
            Self::Farming => 0.25,
            Self::Eva => 0.586,
            Self::Command => 0.4,
            Self::Communication => 0.586,
            Self::Workshop => 0.7034,
            Self::Laboratory => 0.4396,
            Self::Living => 0.7034,
            Self::Medical => 0.586,
            Self::Erv => 0.586,
            Self::Storage | Self::Power | Self::Processing => 0.117,
        }
    }

    /// Share of transmitted sunlight that ends up as interior heat.
    pub fn solar_gain_coefficient(self) -> f64 {
        match self {
            Self::Farming => 0.12,
            Self::Connection => 0.045,
            _ => 0.04,
        }
    }

    pub fn is_greenhouse(self) -> bool {
        self == Self::Farming
    }
}

/// Shell construction; decides the insulation canopy that can be deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionType {
    Inflatable,
    SemiSolid,
    Solid,
    Sedimentary,
}

impl ConstructionType {
    /// Insulation canopy coefficient [kW].
    pub fn canopy_coefficient(self) -> f64 {
        match self {
            Self::Inflatable => 0.7,
            Self::SemiSolid => 0.5,
            Self::Solid | Self::Sedimentary => 0.3,
        }
    }
}

/// Liquid water stored in the building outside of the life-support loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterBodies {
    /// Fish farm tank content [kg].
    pub fish_tank_kg: f64,
    /// Algae pond water [kg].
    pub algae_water_kg: f64,
}

/// Static configuration of a building, as supplied by the settlement layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSpec {
    pub name: String,
    pub category: BuildingCategory,
    pub construction: ConstructionType,
    /// Length [m].
    pub length: f64,
    /// Width [m].
    pub width: f64,
    /// Target indoor temperature [°C].
    #[serde(default = "default_preset_temperature")]
    pub preset_temperature: f64,
    #[serde(default)]
    pub water: WaterBodies,
}

fn default_preset_temperature() -> f64 {
    22.5
}

impl BuildingSpec {
    pub fn new(
        name: &str,
        category: BuildingCategory,
        construction: ConstructionType,
        length: f64,
        width: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            category,
            construction,
            length,
            width,
            preset_temperature: default_preset_temperature(),
            water: WaterBodies::default(),
        }
    }

    pub fn with_preset(mut self, preset_temperature: f64) -> Self {
        self.preset_temperature = preset_temperature;
        self
    }

    pub fn with_water(mut self, water: WaterBodies) -> Self {
        self.water = water;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.name.is_empty(), "Building name must not be empty");
        anyhow::ensure!(
            self.length > 0.0 && self.width > 0.0,
            "Building '{}': dimensions must be positive (length={}, width={})",
            self.name,
            self.length,
            self.width
        );
        anyhow::ensure!(
            self.preset_temperature.is_finite(),
            "Building '{}': preset temperature must be finite",
            self.name
        );
        anyhow::ensure!(
            self.water.fish_tank_kg >= 0.0 && self.water.algae_water_kg >= 0.0,
            "Building '{}': water masses must not be negative",
            self.name
        );
        Ok(())
    }

    pub fn envelope(&self) -> Envelope {
        Envelope::from_spec(self)
    }
}

/// Geometry-derived values used every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub floor_area: f64,
    /// Fourth root of the floor area.
    pub area_factor: f64,
    /// Sun-exposed shell area [m^2].
    pub hull_area: f64,
    pub transmittance: f64,
    pub ua_wall: f64,
    pub ua_ceiling_floor: f64,
    /// Crack-length infiltration term, no open airlock.
    pub ua_crack: f64,
    /// Crack-length infiltration term while an airlock is cycling.
    pub ua_crack_airlock: f64,
    pub volume_m3: f64,
    pub equipment_heat_kw: f64,
    pub solar_gain_coefficient: f64,
    pub canopy_coefficient: f64,
    /// Thermal mass of standing water [kg].
    pub water_mass_kg: f64,
    pub greenhouse: bool,
}

impl Envelope {
    pub fn from_spec(spec: &BuildingSpec) -> Self {
        let (l, w) = (spec.length.max(0.0), spec.width.max(0.0));
        let floor_area = l * w;
        let h = INTERIOR_HEIGHT_M;
        let greenhouse = spec.category.is_greenhouse();

        let (hull_area, transmittance) = if greenhouse {
            (w * h * 2.0 + l * h + floor_area, TRANSMITTANCE_GREENHOUSE)
        } else {
            ((w + l) * h * 2.0 + floor_area, TRANSMITTANCE_WINDOW)
        };

        let crack_base = 0.244 * 0.075 * AIR_CHANGE_PER_HR * WIND_FACTOR;

        Self {
            floor_area,
            area_factor: floor_area.sqrt().sqrt(),
            hull_area,
            transmittance,
            ua_wall: U_VALUE * 2.0 * (w + l) * h,
            ua_ceiling_floor: U_VALUE * floor_area,
            ua_crack: crack_base * 4.0,
            ua_crack_airlock: crack_base * (2.0 * (2.0 + 6.0) + 4.0),
            volume_m3: floor_area * h,
            equipment_heat_kw: spec.category.equipment_heat_kw(),
            solar_gain_coefficient: spec.category.solar_gain_coefficient(),
            canopy_coefficient: spec.construction.canopy_coefficient(),
            water_mass_kg: water_mass(spec, floor_area),
            greenhouse,
        }
    }

    pub fn has_water(&self) -> bool {
        self.water_mass_kg > 0.0
    }
}

/// Standing water estimate: tanks plus per-category plumbing heuristics.
fn water_mass(spec: &BuildingSpec, floor_area: f64) -> f64 {
    use BuildingCategory::*;

    let mut mass = if spec.water.fish_tank_kg > 0.0 {
        spec.water.fish_tank_kg / 4.0
    } else {
        spec.water.algae_water_kg / 4.0
    };

    match spec.category {
        Connection | Eva => mass = floor_area,
        Farming => mass += floor_area / 2.0,
        Command => mass = floor_area / 3.0,
        Living => mass += floor_area / 5.0,
        Medical => mass += floor_area / 6.0,
        Laboratory => mass += floor_area / 7.0,
        _ => {}
    }
    mass
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_of_a_lander_hab() {
        let spec = BuildingSpec::new(
            "Lander Hab",
            BuildingCategory::Living,
            ConstructionType::Solid,
            10.0,
            10.0,
        );
        let env = spec.envelope();
        assert!((env.floor_area - 100.0).abs() < 1e-12);
        assert!((env.area_factor - 10.0_f64.sqrt()).abs() < 1e-12);
        assert!((env.hull_area - (20.0 * 2.5 * 2.0 + 100.0)).abs() < 1e-12);
        assert!((env.ua_wall - 0.1 * 2.0 * 20.0 * 2.5).abs() < 1e-12);
        assert!((env.water_mass_kg - 20.0).abs() < 1e-12);
        assert_eq!(env.transmittance, TRANSMITTANCE_WINDOW);
        assert!(env.ua_crack_airlock > env.ua_crack);
    }

    #[test]
    fn test_greenhouse_hull_and_water() {
        let spec = BuildingSpec::new(
            "Inflatable Greenhouse",
            BuildingCategory::Farming,
            ConstructionType::Inflatable,
            9.0,
            6.0,
        )
        .with_water(WaterBodies {
            fish_tank_kg: 400.0,
            algae_water_kg: 0.0,
        });
        let env = spec.envelope();
        assert!((env.hull_area - (6.0 * 2.5 * 2.0 + 9.0 * 2.5 + 54.0)).abs() < 1e-12);
        assert!((env.water_mass_kg - (100.0 + 27.0)).abs() < 1e-12);
        assert!(env.greenhouse);
        assert_eq!(env.canopy_coefficient, 0.7);
        assert_eq!(env.solar_gain_coefficient, 0.12);
    }

    #[test]
    fn test_storage_has_no_water() {
        let spec = BuildingSpec::new(
            "Storage Shed",
            BuildingCategory::Storage,
            ConstructionType::Solid,
            5.0,
            5.0,
        );
        assert!(!spec.envelope().has_water());
        assert_eq!(spec.envelope().equipment_heat_kw, 0.117);
    }

    #[test]
    fn test_validate_rejects_bad_dimensions() {
        let spec = BuildingSpec::new(
            "Bad",
            BuildingCategory::Storage,
            ConstructionType::Solid,
            0.0,
            5.0,
        );
        assert!(spec.validate().is_err());
    }
}
