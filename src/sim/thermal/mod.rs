//! Heat balance of pressurized settlement buildings.
//!
//! Each building keeps a [`ThermalProfile`]. Every sub-step the
//! [`ThermalBalanceEngine`] sums gains and losses, exchanges air with
//! neighbors, buffers heat in the air and water sinks and moves the indoor
//! temperature. The [`HeatGenerationArbiter`] then picks output levels for
//! the building's heat sources to meet the estimated requirement.
//! [`ThermalSystem`] drives all of this for a whole settlement.

pub mod arbiter;
pub mod balance;
pub mod building;
pub mod conditions;
pub mod config;
pub mod environment;
pub mod environment_module;
pub mod events;
pub mod fault;
pub mod heat_mode;
pub mod heat_sink;
pub mod heat_source;
pub mod module;
pub mod profile;
pub mod recorder;
pub mod system;
pub mod ventilation;

pub use arbiter::{Arbitration, HeatGenerationArbiter, SourceOutputs};
pub use balance::{BalanceContext, SettleOutcome, StepOutcome, ThermalBalanceEngine};
pub use building::{BuildingCategory, BuildingSpec, ConstructionType, Envelope, WaterBodies};
pub use conditions::BuildingConditions;
pub use config::ThermalConfig;
pub use environment::{Environment, EnvironmentSnapshot, SolCycleEnvironment};
pub use environment_module::{EnvironmentModule, EnvironmentSource};
pub use events::{ChangeTracker, ThermalEvent};
pub use fault::{FaultLog, SourceFault, ThermalFault};
pub use heat_mode::HeatMode;
pub use heat_sink::{HeatSink, HeatSinks, SinkMedium};
pub use heat_source::{FuelSupply, FuelType, HeatSource, HeatSourceKind, HeatSourceType};
pub use module::ThermalModule;
pub use profile::ThermalProfile;
pub use recorder::{ThermalRecord, ThermalRecorderModule};
pub use system::{AdvanceSummary, BuildingThermal, ThermalSystem};
pub use ventilation::{NeighborState, VentilationOutcome};
