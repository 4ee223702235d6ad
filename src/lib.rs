pub mod io;
pub mod sim;
mod uid;

// Prelude
pub use sim::thermal::{
    BuildingCategory, BuildingConditions, BuildingSpec, ConstructionType, Environment,
    EnvironmentSnapshot, FuelSupply, FuelType, HeatMode, HeatSource, HeatSourceType,
    SolCycleEnvironment, ThermalConfig, ThermalProfile, ThermalSystem, WaterBodies,
};
pub use uid::BuildingUid;
