use serde::{Deserialize, Serialize};

use super::heat_sink::HeatSinks;

/// Thermal state of one building, including the last tick's cached outputs.
///
/// Only the balance engine and the arbiter write the cached values; callers
/// can feed inputs through the `add_*`/`flag_*`/`insert_*` methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalProfile {
    pub(crate) current_temperature: f64,
    pub(crate) preset_temperature: f64,
    pub(crate) heat_gain: f64,
    pub(crate) heat_loss: f64,
    pub(crate) pre_net_heat: f64,
    pub(crate) post_net_heat: f64,
    pub(crate) delta_temperature: f64,
    pub(crate) deviation_temperature: f64,
    pub(crate) required_heat: f64,
    pub(crate) generated_heat: f64,
    pub(crate) heat_surplus: f64,
    pub(crate) sinks: HeatSinks,
    pub(crate) active_vent_heat: f64,
    pub(crate) passive_vent_heat: f64,
    pub(crate) airlock_discharge_pending: bool,
    pub(crate) excess_heat: f64,
}

impl ThermalProfile {
    /// New profile sitting at its preset temperature.
    pub fn new(preset_temperature: f64) -> Self {
        Self {
            current_temperature: preset_temperature,
            preset_temperature,
            heat_gain: 0.0,
            heat_loss: 0.0,
            pre_net_heat: 0.0,
            post_net_heat: 0.0,
            delta_temperature: 0.0,
            deviation_temperature: 0.0,
            required_heat: 0.0,
            generated_heat: 0.0,
            heat_surplus: 0.0,
            sinks: HeatSinks::default(),
            active_vent_heat: 0.0,
            passive_vent_heat: 0.0,
            airlock_discharge_pending: false,
            excess_heat: 0.0,
        }
    }

    /// Indoor temperature [°C].
    pub fn current_temperature(&self) -> f64 {
        self.current_temperature
    }

    pub fn preset_temperature(&self) -> f64 {
        self.preset_temperature
    }

    pub fn heat_gain(&self) -> f64 {
        self.heat_gain
    }

    pub fn heat_loss(&self) -> f64 {
        self.heat_loss
    }

    pub fn pre_net_heat(&self) -> f64 {
        self.pre_net_heat
    }

    pub fn post_net_heat(&self) -> f64 {
        self.post_net_heat
    }

    /// Temperature change during the last tick [°C].
    pub fn delta_temperature(&self) -> f64 {
        self.delta_temperature
    }

    /// `preset - current` after the last tick [°C].
    pub fn deviation_temperature(&self) -> f64 {
        self.deviation_temperature
    }

    /// Heat asked of the generators for the next tick [kW].
    pub fn required_heat(&self) -> f64 {
        self.required_heat
    }

    /// Heat committed by the generators for the next tick [kW].
    pub fn generated_heat(&self) -> f64 {
        self.generated_heat
    }

    /// Generated minus required heat [kW].
    pub fn heat_surplus(&self) -> f64 {
        self.heat_surplus
    }

    pub fn sinks(&self) -> &HeatSinks {
        &self.sinks
    }

    pub fn air_heat_sink(&self) -> f64 {
        self.sinks.air.stored
    }

    pub fn air_heat_sink_limit(&self) -> f64 {
        self.sinks.air.limit
    }

    pub fn water_heat_sink(&self) -> f64 {
        self.sinks.water.stored
    }

    pub fn water_heat_sink_limit(&self) -> f64 {
        self.sinks.water.limit
    }

    /// Heat this building moved to (negative) or from (positive) neighbors [kW].
    pub fn active_vent_heat(&self) -> f64 {
        self.active_vent_heat
    }

    /// Heat pushed in by neighbors, pending consumption [kW].
    pub fn passive_vent_heat(&self) -> f64 {
        self.passive_vent_heat
    }

    pub fn airlock_discharge_pending(&self) -> bool {
        self.airlock_discharge_pending
    }

    pub fn excess_heat(&self) -> f64 {
        self.excess_heat
    }

    /// Accumulates heat pushed in by a neighbor, consumed on the next tick.
    pub fn add_passive_vent_heat(&mut self, kw: f64) {
        if kw.is_finite() {
            self.passive_vent_heat += kw;
        }
    }

    /// Marks that an outer airlock door was opened under pressure.
    pub fn flag_airlock_discharge(&mut self) {
        self.airlock_discharge_pending = true;
    }

    /// Adds waste heat from unrelated equipment, consumed on the next tick.
    pub fn insert_excess_heat(&mut self, kw: f64) {
        if kw.is_finite() {
            self.excess_heat += kw;
        }
    }

    pub(crate) fn take_passive_vent_heat(&mut self) -> f64 {
        std::mem::take(&mut self.passive_vent_heat)
    }

    pub(crate) fn take_excess_heat(&mut self) -> f64 {
        std::mem::take(&mut self.excess_heat)
    }

    pub(crate) fn take_airlock_discharge(&mut self) -> bool {
        std::mem::take(&mut self.airlock_discharge_pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile_starts_at_preset() {
        let p = ThermalProfile::new(21.0);
        assert_eq!(p.current_temperature(), 21.0);
        assert_eq!(p.required_heat(), 0.0);
        assert!(p.sinks().is_empty());
    }

    #[test]
    fn test_inputs_are_consumed_once() {
        let mut p = ThermalProfile::new(21.0);
        p.add_passive_vent_heat(1.5);
        p.add_passive_vent_heat(-0.5);
        p.add_passive_vent_heat(f64::NAN);
        p.flag_airlock_discharge();
        p.insert_excess_heat(2.0);

        assert!((p.take_passive_vent_heat() - 1.0).abs() < 1e-12);
        assert_eq!(p.take_passive_vent_heat(), 0.0);
        assert!(p.take_airlock_discharge());
        assert!(!p.take_airlock_discharge());
        assert_eq!(p.take_excess_heat(), 2.0);
        assert_eq!(p.excess_heat(), 0.0);
    }
}
