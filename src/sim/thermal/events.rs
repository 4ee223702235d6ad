//! Change notifications for UI or telemetry adapters.
//!
//! The thermal core only updates its own state. Whoever needs to react to
//! changes keeps a [`ChangeTracker`] next to the [`ThermalSystem`] and asks it
//! for the differences after each advance.

use std::collections::HashMap;

use crate::BuildingUid;

use super::heat_mode::HeatMode;
use super::heat_source::HeatSourceType;
use super::profile::ThermalProfile;
use super::system::{BuildingThermal, ThermalSystem};

/// A value of a building's thermal state that changed, carrying the new value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThermalEvent {
    Temperature(f64),
    DeltaTemperature(f64),
    DeviationTemperature(f64),
    RequiredHeat(f64),
    GeneratedHeat(f64),
    HeatSurplus(f64),
    PreNetHeat(f64),
    PostNetHeat(f64),
    AirHeatSink(f64),
    WaterHeatSink(f64),
    /// Heat this building exchanged with its neighbors [kW].
    VentOut(f64),
    /// Heat neighbors queued on this building [kW].
    VentIn(f64),
    SourceMode { kind: HeatSourceType, mode: HeatMode },
}

/// Lists every cached profile value that differs between `old` and `new`.
pub fn diff(old: &ThermalProfile, new: &ThermalProfile) -> Vec<ThermalEvent> {
    let pairs: [(f64, f64, fn(f64) -> ThermalEvent); 12] = [
        (old.current_temperature(), new.current_temperature(), ThermalEvent::Temperature),
        (old.delta_temperature(), new.delta_temperature(), ThermalEvent::DeltaTemperature),
        (old.deviation_temperature(), new.deviation_temperature(), ThermalEvent::DeviationTemperature),
        (old.required_heat(), new.required_heat(), ThermalEvent::RequiredHeat),
        (old.generated_heat(), new.generated_heat(), ThermalEvent::GeneratedHeat),
        (old.heat_surplus(), new.heat_surplus(), ThermalEvent::HeatSurplus),
        (old.pre_net_heat(), new.pre_net_heat(), ThermalEvent::PreNetHeat),
        (old.post_net_heat(), new.post_net_heat(), ThermalEvent::PostNetHeat),
        (old.air_heat_sink(), new.air_heat_sink(), ThermalEvent::AirHeatSink),
        (old.water_heat_sink(), new.water_heat_sink(), ThermalEvent::WaterHeatSink),
        (old.active_vent_heat(), new.active_vent_heat(), ThermalEvent::VentOut),
        (old.passive_vent_heat(), new.passive_vent_heat(), ThermalEvent::VentIn),
    ];
    pairs
        .into_iter()
        .filter(|(a, b, _)| a != b)
        .map(|(_, b, make)| make(b))
        .collect()
}

/// Lists source mode changes; `old` and `new` are per-source modes in
/// configuration order.
pub fn diff_modes(kinds: &[HeatSourceType], old: &[HeatMode], new: &[HeatMode]) -> Vec<ThermalEvent> {
    kinds
        .iter()
        .zip(old.iter().zip(new))
        .filter(|(_, (a, b))| a != b)
        .map(|(&kind, (_, &mode))| ThermalEvent::SourceMode { kind, mode })
        .collect()
}

#[derive(Debug, Clone)]
struct Snapshot {
    profile: ThermalProfile,
    modes: Vec<HeatMode>,
}

impl Snapshot {
    fn of(building: &BuildingThermal) -> Self {
        Self {
            profile: building.profile().clone(),
            modes: building.sources().iter().map(|s| s.mode()).collect(),
        }
    }
}

/// Remembers the last seen state of every building and reports what changed.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    last: HashMap<BuildingUid, Snapshot>,
}

impl ChangeTracker {
    /// Tracker primed with the current state, so the first `collect` only
    /// reports changes made after this call.
    pub fn new(system: &ThermalSystem) -> Self {
        let mut tracker = Self::default();
        for b in system.buildings() {
            tracker.last.insert(b.uid(), Snapshot::of(b));
        }
        tracker
    }

    /// Events since the previous call, grouped by building in processing order.
    ///
    /// Buildings seen for the first time are diffed against a fresh profile
    /// at their preset.
    pub fn collect(&mut self, system: &ThermalSystem) -> Vec<(BuildingUid, ThermalEvent)> {
        let mut events = Vec::new();
        for b in system.buildings() {
            let current = Snapshot::of(b);
            let previous = self.last.remove(&b.uid()).unwrap_or_else(|| Snapshot {
                profile: ThermalProfile::new(b.profile().preset_temperature()),
                modes: vec![HeatMode::Offline; current.modes.len()],
            });
            let kinds: Vec<HeatSourceType> = b.sources().iter().map(|s| s.source_type()).collect();
            events.extend(
                diff(&previous.profile, &current.profile)
                    .into_iter()
                    .chain(diff_modes(&kinds, &previous.modes, &current.modes))
                    .map(|e| (b.uid(), e)),
            );
            self.last.insert(b.uid(), current);
        }
        events
    }
}
