//! Settlement-wide driver for the thermal core.
//!
//! [`ThermalSystem::advance`] splits the elapsed time into bounded sub-steps
//! and, for each one, runs the balance and arbitration of every building in
//! insertion order. Ventilation heat queued on neighbors is staged and only
//! delivered once the whole settlement finished the sub-step, so the result
//! does not depend on the processing order.

use std::collections::HashMap;

use anyhow::{Result, bail};

use crate::BuildingUid;

use super::arbiter::{Arbitration, HeatGenerationArbiter};
use super::balance::{BalanceContext, StepOutcome, ThermalBalanceEngine};
use super::building::{BuildingSpec, Envelope};
use super::conditions::BuildingConditions;
use super::config::ThermalConfig;
use super::environment::{Environment, EnvironmentSnapshot};
use super::fault::{FaultLog, ThermalFault};
use super::heat_source::{HeatSource, HeatSourceType};
use super::profile::ThermalProfile;
use super::ventilation::NeighborState;

/// Thermal state and equipment of one building.
#[derive(Debug, Clone)]
pub struct BuildingThermal {
    uid: BuildingUid,
    spec: BuildingSpec,
    envelope: Envelope,
    profile: ThermalProfile,
    sources: Vec<HeatSource>,
    arbiter: HeatGenerationArbiter,
    conditions: BuildingConditions,
    faults: FaultLog,
    last_step: StepOutcome,
    last_arbitration: Arbitration,
}

impl BuildingThermal {
    fn new(spec: BuildingSpec, sources: Vec<HeatSource>, cfg: &ThermalConfig) -> Self {
        let envelope = spec.envelope();
        let conditions = BuildingConditions::nominal(
            envelope.volume_m3,
            cfg.nominal_air_pressure_kpa,
            spec.preset_temperature,
        );
        Self {
            uid: BuildingUid::new(),
            faults: FaultLog::new(&spec.name, cfg.fault_log_interval_ticks),
            profile: ThermalProfile::new(spec.preset_temperature),
            envelope,
            spec,
            sources,
            arbiter: HeatGenerationArbiter::new(),
            conditions,
            last_step: StepOutcome::default(),
            last_arbitration: Arbitration::default(),
        }
    }

    pub fn uid(&self) -> BuildingUid {
        self.uid
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &BuildingSpec {
        &self.spec
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn profile(&self) -> &ThermalProfile {
        &self.profile
    }

    pub fn sources(&self) -> &[HeatSource] {
        &self.sources
    }

    /// Mutable access to the sources, e.g. to flip a fuel heater's toggle
    /// or refill its tank.
    pub fn sources_mut(&mut self) -> &mut [HeatSource] {
        &mut self.sources
    }

    pub fn conditions(&self) -> &BuildingConditions {
        &self.conditions
    }

    pub fn fault_count(&self) -> u64 {
        self.faults.count()
    }

    pub fn last_step(&self) -> &StepOutcome {
        &self.last_step
    }

    pub fn last_arbitration(&self) -> &Arbitration {
        &self.last_arbitration
    }

    pub fn current_temperature(&self) -> f64 {
        self.profile.current_temperature()
    }

    pub fn required_heat(&self) -> f64 {
        self.profile.required_heat()
    }

    pub fn generated_heat(&self) -> f64 {
        self.profile.generated_heat()
    }

    pub fn heat_surplus(&self) -> f64 {
        self.profile.heat_surplus()
    }

    pub fn delta_temperature(&self) -> f64 {
        self.profile.delta_temperature()
    }

    pub fn deviation_temperature(&self) -> f64 {
        self.profile.deviation_temperature()
    }

    pub fn air_heat_sink(&self) -> f64 {
        self.profile.air_heat_sink()
    }

    pub fn air_heat_sink_limit(&self) -> f64 {
        self.profile.air_heat_sink_limit()
    }

    pub fn water_heat_sink(&self) -> f64 {
        self.profile.water_heat_sink()
    }

    pub fn water_heat_sink_limit(&self) -> f64 {
        self.profile.water_heat_sink_limit()
    }

    pub fn add_passive_vent_heat(&mut self, kw: f64) {
        self.profile.add_passive_vent_heat(kw);
    }

    pub fn flag_airlock_discharge(&mut self) {
        self.profile.flag_airlock_discharge();
    }

    pub fn insert_excess_heat(&mut self, kw: f64) {
        self.profile.insert_excess_heat(kw);
    }

    /// Sum of nameplate capacities of all configured sources [kW].
    pub fn heat_generation_capacity(&self) -> f64 {
        self.sources.iter().map(HeatSource::max_heat).sum()
    }

    /// Output committed by the last arbitration for one source class [kW].
    pub fn heat_by_kind(&self, kind: HeatSourceType) -> f64 {
        self.arbiter.last_outputs().get(kind)
    }

    /// Electric power associated with one source class at its current mode [kW].
    pub fn power_by_kind(&self, kind: HeatSourceType, env: &EnvironmentSnapshot) -> f64 {
        let cond = env.source_conditions();
        self.sources
            .iter()
            .filter(|s| s.source_type() == kind)
            .map(|s| s.current_power(&cond))
            .sum()
    }
}

/// Summary of one [`ThermalSystem::advance`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AdvanceSummary {
    pub substeps: usize,
    /// Length of each sub-step [millisols].
    pub substep_millisols: f64,
    /// Part of the requested span beyond the sub-step limit, not simulated [millisols].
    pub dropped_millisols: f64,
}

/// All thermally simulated buildings of a settlement.
#[derive(Debug, Clone)]
pub struct ThermalSystem {
    cfg: ThermalConfig,
    buildings: Vec<BuildingThermal>,
    index_by_uid: HashMap<BuildingUid, usize>,
    adjacency: Vec<Vec<usize>>,
    faults: FaultLog,
}

impl ThermalSystem {
    pub fn new(cfg: ThermalConfig) -> Result<Self> {
        cfg.validate()?;
        let faults = FaultLog::new("settlement", cfg.fault_log_interval_ticks);
        Ok(Self {
            cfg,
            buildings: Vec::new(),
            index_by_uid: HashMap::new(),
            adjacency: Vec::new(),
            faults,
        })
    }

    pub fn config(&self) -> &ThermalConfig {
        &self.cfg
    }

    /// Settlement-level faults (truncated advances), logged or suppressed.
    pub fn fault_count(&self) -> u64 {
        self.faults.count()
    }

    /// Registers a building with its heat sources and returns its uid.
    pub fn add_building(&mut self, spec: BuildingSpec, sources: Vec<HeatSource>) -> Result<BuildingUid> {
        spec.validate()?;
        if self.buildings.iter().any(|b| b.spec.name == spec.name) {
            bail!("Building '{}' already exists", spec.name);
        }
        let building = BuildingThermal::new(spec, sources, &self.cfg);
        let uid = building.uid;
        self.index_by_uid.insert(uid, self.buildings.len());
        self.buildings.push(building);
        self.adjacency.push(Vec::new());
        Ok(uid)
    }

    fn index(&self, uid: &BuildingUid) -> Result<usize> {
        match self.index_by_uid.get(uid) {
            Some(&i) => Ok(i),
            None => bail!("Unknown building uid {uid}"),
        }
    }

    /// Declares two buildings as adjacent (symmetric, idempotent).
    pub fn connect(&mut self, a: &BuildingUid, b: &BuildingUid) -> Result<()> {
        let (ia, ib) = (self.index(a)?, self.index(b)?);
        if ia == ib {
            bail!("Building {a} cannot be adjacent to itself");
        }
        if !self.adjacency[ia].contains(&ib) {
            self.adjacency[ia].push(ib);
        }
        if !self.adjacency[ib].contains(&ia) {
            self.adjacency[ib].push(ia);
        }
        Ok(())
    }

    /// Uids of the buildings adjacent to `uid`.
    pub fn neighbors(&self, uid: &BuildingUid) -> Result<Vec<BuildingUid>> {
        let i = self.index(uid)?;
        Ok(self.adjacency[i]
            .iter()
            .map(|&j| self.buildings[j].uid)
            .collect())
    }

    /// Replaces the occupancy/life-support state of a building.
    ///
    /// Missing air amounts are filled in from the building volume at nominal
    /// cabin pressure.
    pub fn set_conditions(&mut self, uid: &BuildingUid, conditions: BuildingConditions) -> Result<()> {
        let i = self.index(uid)?;
        let b = &mut self.buildings[i];
        let mut conditions = conditions;
        if !(conditions.air_moles > 0.0) || !(conditions.air_mass_kg > 0.0) {
            let nominal = BuildingConditions::nominal(
                b.envelope.volume_m3,
                self.cfg.nominal_air_pressure_kpa,
                b.profile.current_temperature(),
            );
            conditions.air_moles = nominal.air_moles;
            conditions.air_mass_kg = nominal.air_mass_kg;
        }
        b.conditions = conditions;
        Ok(())
    }

    pub fn building(&self, uid: &BuildingUid) -> Option<&BuildingThermal> {
        self.index_by_uid.get(uid).map(|&i| &self.buildings[i])
    }

    pub fn building_mut(&mut self, uid: &BuildingUid) -> Option<&mut BuildingThermal> {
        self.index_by_uid.get(uid).map(|&i| &mut self.buildings[i])
    }

    pub fn find_by_name(&self, name: &str) -> Option<&BuildingThermal> {
        self.buildings.iter().find(|b| b.spec.name == name)
    }

    /// Buildings in processing order.
    pub fn buildings(&self) -> &[BuildingThermal] {
        &self.buildings
    }

    /// Overrides the indoor temperature, e.g. when restoring a saved state.
    /// The value is clamped into the indoor bounds.
    pub fn set_current_temperature(&mut self, uid: &BuildingUid, temperature_c: f64) -> Result<()> {
        let i = self.index(uid)?;
        anyhow::ensure!(
            temperature_c.is_finite(),
            "Temperature of {uid} must be finite (got {temperature_c})"
        );
        self.buildings[i].profile.current_temperature = self.cfg.clamp_indoor(temperature_c);
        Ok(())
    }

    pub fn add_passive_vent_heat(&mut self, uid: &BuildingUid, kw: f64) -> Result<()> {
        let i = self.index(uid)?;
        self.buildings[i].add_passive_vent_heat(kw);
        Ok(())
    }

    pub fn flag_airlock_discharge(&mut self, uid: &BuildingUid) -> Result<()> {
        let i = self.index(uid)?;
        self.buildings[i].flag_airlock_discharge();
        Ok(())
    }

    pub fn insert_excess_heat(&mut self, uid: &BuildingUid, kw: f64) -> Result<()> {
        let i = self.index(uid)?;
        self.buildings[i].insert_excess_heat(kw);
        Ok(())
    }

    /// Splits `elapsed_millisols` into equal sub-steps within the configured bounds.
    ///
    /// At most `max_substeps` sub-steps are planned; whatever does not fit is
    /// reported in [`AdvanceSummary::dropped_millisols`].
    pub fn substeps(&self, elapsed_millisols: f64) -> AdvanceSummary {
        if !(elapsed_millisols > 0.0) || !elapsed_millisols.is_finite() {
            return AdvanceSummary::default();
        }
        let max = self.cfg.max_substep_millisols;
        let limit = self.cfg.max_substeps;
        let wanted = (elapsed_millisols / max).ceil().max(1.0);
        let n = if wanted > limit as f64 {
            limit
        } else {
            wanted as usize
        };
        let dt = (elapsed_millisols / n as f64).clamp(self.cfg.min_substep_millisols, max);
        AdvanceSummary {
            substeps: n,
            substep_millisols: dt,
            dropped_millisols: (elapsed_millisols - n as f64 * dt).max(0.0),
        }
    }

    /// Advances every building by `elapsed_millisols`. Non-positive spans are a no-op.
    pub fn advance(&mut self, env: &dyn Environment, elapsed_millisols: f64) -> AdvanceSummary {
        let plan = self.substeps(elapsed_millisols);
        if plan.substeps == 0 {
            return plan;
        }
        self.faults.tick();
        if plan.dropped_millisols > 0.0 {
            self.faults.record(&ThermalFault::Range {
                quantity: "elapsed_millisols",
                value: elapsed_millisols,
                bound: plan.substeps as f64 * plan.substep_millisols,
            });
        }
        let snapshot = env.snapshot();
        for _ in 0..plan.substeps {
            self.substep(&snapshot, plan.substep_millisols);
        }
        plan
    }

    fn substep(&mut self, env: &EnvironmentSnapshot, millisols: f64) {
        let cfg = &self.cfg;
        let engine = ThermalBalanceEngine::new(cfg);
        let source_cond = env.source_conditions();

        let states: Vec<(f64, f64)> = self
            .buildings
            .iter()
            .map(|b| (b.profile.current_temperature(), b.profile.preset_temperature()))
            .collect();
        let mut staged: Vec<f64> = vec![0.0; self.buildings.len()];

        for (i, b) in self.buildings.iter_mut().enumerate() {
            b.faults.tick();

            let neighbors: Vec<NeighborState> = self.adjacency[i]
                .iter()
                .map(|&j| NeighborState {
                    index: j,
                    temperature_c: states[j].0,
                    preset_c: states[j].1,
                })
                .collect();

            let ctx = BalanceContext {
                envelope: &b.envelope,
                conditions: &b.conditions,
                environment: env,
                millisols,
            };
            let outcome = engine.step(&mut b.profile, &ctx, &neighbors, &mut b.faults);
            for t in &outcome.settle.ventilation.transfers {
                staged[t.neighbor] -= t.kw;
            }

            let ask = HeatGenerationArbiter::damped_ask(
                b.profile.required_heat(),
                b.profile.sinks(),
                cfg,
            );
            let arbitration =
                b.arbiter
                    .arbitrate(&mut b.sources, ask, &source_cond, millisols, cfg, &mut b.faults);
            b.profile.generated_heat = arbitration.generated;
            b.profile.heat_surplus = arbitration.surplus;
            for s in b.sources.iter_mut() {
                s.age(millisols);
            }

            b.last_step = outcome;
            b.last_arbitration = arbitration;
        }

        for (b, kw) in self.buildings.iter_mut().zip(staged) {
            if kw != 0.0 {
                b.profile.add_passive_vent_heat(kw);
            }
        }
    }
}
