//! Settlement description format.
//!
//! A settlement file is JSON listing the buildings with their heat sources,
//! which buildings share a wall or a tunnel, and optionally a
//! [`ThermalConfig`] override. [`SettlementFile::build`] turns it into a ready
//! [`ThermalSystem`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::BuildingUid;
use crate::sim::thermal::building::{BuildingCategory, BuildingSpec, ConstructionType, WaterBodies};
use crate::sim::thermal::config::ThermalConfig;
use crate::sim::thermal::heat_source::{FuelSupply, FuelType, HeatSource, HeatSourceKind, HeatSourceType};
use crate::sim::thermal::system::ThermalSystem;

fn default_true() -> bool {
    true
}

/// One heat generation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub kind: HeatSourceType,
    /// Nameplate thermal capacity [kW].
    pub max_heat_kw: f64,
    /// Required for `fuel` sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel: Option<FuelType>,
    #[serde(default)]
    pub fuel_kg: f64,
    /// Operator switch of a fuel heater.
    #[serde(default = "default_true")]
    pub toggle: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_efficiency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electric_efficiency: Option<f64>,
}

impl SourceRecord {
    pub fn new(kind: HeatSourceType, max_heat_kw: f64) -> Self {
        Self {
            kind,
            max_heat_kw,
            fuel: None,
            fuel_kg: 0.0,
            toggle: true,
            thermal_efficiency: None,
            electric_efficiency: None,
        }
    }

    pub fn with_fuel(mut self, fuel: FuelType, fuel_kg: f64) -> Self {
        self.fuel = Some(fuel);
        self.fuel_kg = fuel_kg;
        self
    }

    fn to_source(&self, building: &str) -> Result<HeatSource> {
        anyhow::ensure!(
            self.max_heat_kw.is_finite() && self.max_heat_kw >= 0.0,
            "Building '{building}': {} source capacity must be non-negative (got {})",
            self.kind,
            self.max_heat_kw
        );
        let kind = match self.kind {
            HeatSourceType::Electric => HeatSourceKind::Electric,
            HeatSourceType::Solar => HeatSourceKind::Solar,
            HeatSourceType::Nuclear => HeatSourceKind::Nuclear,
            HeatSourceType::Fuel => {
                let Some(fuel) = self.fuel else {
                    anyhow::bail!("Building '{building}': fuel source without a fuel type");
                };
                anyhow::ensure!(
                    self.fuel_kg >= 0.0,
                    "Building '{building}': fuel stock must not be negative"
                );
                let mut supply = FuelSupply::new(fuel, self.fuel_kg);
                supply.toggle = self.toggle;
                HeatSourceKind::Fuel(supply)
            }
        };

        let mut source = HeatSource::new(kind, self.max_heat_kw);
        if self.thermal_efficiency.is_some() || self.electric_efficiency.is_some() {
            let (thermal, electric) = self.kind.default_efficiencies();
            source = source.with_efficiencies(
                self.thermal_efficiency.unwrap_or(thermal),
                self.electric_efficiency.unwrap_or(electric),
            );
        }
        Ok(source)
    }
}

/// One building of the settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingRecord {
    pub name: String,
    pub category: BuildingCategory,
    pub construction: ConstructionType,
    pub length_m: f64,
    pub width_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_temperature_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water: Option<WaterBodies>,
    #[serde(default)]
    pub occupants: u32,
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
}

impl BuildingRecord {
    pub fn spec(&self) -> BuildingSpec {
        let mut spec = BuildingSpec::new(
            &self.name,
            self.category,
            self.construction,
            self.length_m,
            self.width_m,
        );
        if let Some(t) = self.preset_temperature_c {
            spec = spec.with_preset(t);
        }
        if let Some(water) = self.water {
            spec = spec.with_water(water);
        }
        spec
    }
}

/// Root of a settlement file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettlementFile {
    #[serde(default)]
    pub name: String,
    pub buildings: Vec<BuildingRecord>,
    /// Pairs of adjacent building names.
    #[serde(default)]
    pub adjacency: Vec<[String; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ThermalConfig>,
}

impl SettlementFile {
    /// Builds the thermal system, returning it with the uid of every building
    /// keyed by name.
    pub fn build_with_uids(&self) -> Result<(ThermalSystem, HashMap<String, BuildingUid>)> {
        let cfg = self.config.clone().unwrap_or_default();
        let mut system = ThermalSystem::new(cfg).context("Invalid thermal configuration")?;

        let mut uids: HashMap<String, BuildingUid> = HashMap::new();
        for record in &self.buildings {
            anyhow::ensure!(
                !uids.contains_key(&record.name),
                "Duplicate building name '{}'",
                record.name
            );
            let sources = record
                .sources
                .iter()
                .map(|s| s.to_source(&record.name))
                .collect::<Result<Vec<_>>>()?;
            let uid = system
                .add_building(record.spec(), sources)
                .with_context(|| format!("Invalid building '{}'", record.name))?;
            if record.occupants > 0 {
                let conditions = system
                    .building(&uid)
                    .map(|b| *b.conditions())
                    .unwrap_or_default()
                    .with_occupants(record.occupants);
                system.set_conditions(&uid, conditions)?;
            }
            uids.insert(record.name.clone(), uid);
        }

        for [a, b] in &self.adjacency {
            let ua = uids
                .get(a)
                .with_context(|| format!("Adjacency refers to unknown building '{a}'"))?;
            let ub = uids
                .get(b)
                .with_context(|| format!("Adjacency refers to unknown building '{b}'"))?;
            system.connect(ua, ub)?;
        }

        Ok((system, uids))
    }

    pub fn build(&self) -> Result<ThermalSystem> {
        Ok(self.build_with_uids()?.0)
    }
}

/// Parses a settlement from a JSON string.
pub fn parse_settlement(json: &str) -> Result<SettlementFile> {
    serde_json::from_str(json).context("Failed to deserialize settlement from string")
}

/// Reads a settlement from a JSON file.
pub fn read_settlement(path: &Path) -> Result<SettlementFile> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let settlement: SettlementFile = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to deserialize settlement from: {}", path.display()))?;

    Ok(settlement)
}

/// Writes a settlement to a JSON file.
pub fn write_settlement(path: &Path, settlement: &SettlementFile) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, settlement)
        .with_context(|| format!("Failed to serialize settlement to: {}", path.display()))?;

    Ok(())
}
