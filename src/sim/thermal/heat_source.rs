//! Heat generation units.
//!
//! A [`HeatSource`] is a single configured unit on a building. The variant
//! specific data lives in [`HeatSourceKind`]; output is computed by one
//! `match` in [`HeatSource::request_heat`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::SECONDS_PER_MILLISOL;
use super::fault::SourceFault;
use super::heat_mode::HeatMode;

/// Source class without variant data. Declaration order is arbitration priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatSourceType {
    Solar,
    Nuclear,
    Electric,
    Fuel,
}

impl HeatSourceType {
    /// Fixed arbitration order, highest priority first.
    pub const PRIORITY: [HeatSourceType; 4] = [
        HeatSourceType::Solar,
        HeatSourceType::Nuclear,
        HeatSourceType::Electric,
        HeatSourceType::Fuel,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Solar => "solar",
            Self::Nuclear => "nuclear",
            Self::Electric => "electric",
            Self::Fuel => "fuel",
        }
    }

    /// (thermal, electric) efficiency of a new unit.
    pub fn default_efficiencies(self) -> (f64, f64) {
        match self {
            Self::Electric => (0.90, 0.95),
            Self::Solar => (0.68, 0.55),
            Self::Nuclear => (0.70, 0.33),
            Self::Fuel => (0.75, 0.40),
        }
    }

    /// Thermal efficiency lost per millisol of operation.
    pub fn default_drift_per_millisol(self) -> f64 {
        match self {
            // Panel darkening from dust and UV.
            Self::Solar => 1.0e-7,
            _ => 0.0,
        }
    }
}

impl fmt::Display for HeatSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fuel burned by a combustion heater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Methane,
    Methanol,
    Hydrogen,
}

impl FuelType {
    /// Lower heating value [kJ/kg].
    pub fn energy_density_kj_per_kg(self) -> f64 {
        match self {
            Self::Methane => 50_000.0,
            Self::Methanol => 19_900.0,
            Self::Hydrogen => 120_000.0,
        }
    }
}

/// Fuel store and ignition switch of a combustion heater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelSupply {
    pub fuel: FuelType,
    /// Fuel on hand [kg].
    pub stored_kg: f64,
    /// Operator switch; an untoggled heater never runs.
    pub toggle: bool,
}

impl FuelSupply {
    pub fn new(fuel: FuelType, stored_kg: f64) -> Self {
        Self {
            fuel,
            stored_kg: stored_kg.max(0.0),
            toggle: true,
        }
    }
}

/// Variant-specific part of a heat source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeatSourceKind {
    Electric,
    Solar,
    Nuclear,
    Fuel(FuelSupply),
}

impl HeatSourceKind {
    pub fn source_type(&self) -> HeatSourceType {
        match self {
            Self::Electric => HeatSourceType::Electric,
            Self::Solar => HeatSourceType::Solar,
            Self::Nuclear => HeatSourceType::Nuclear,
            Self::Fuel(_) => HeatSourceType::Fuel,
        }
    }
}

/// Environment a source sees when asked for output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceConditions {
    /// Solar irradiance at the building [W/m^2].
    pub irradiance_w_m2: f64,
    /// Long-term mean irradiance at the location [W/m^2].
    pub mean_irradiance_w_m2: f64,
}

/// A heat generation unit mounted on a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatSource {
    kind: HeatSourceKind,
    /// Nameplate thermal capacity [kW].
    max_heat: f64,
    thermal_efficiency: f64,
    rated_thermal_efficiency: f64,
    electric_efficiency: f64,
    drift_per_millisol: f64,
    mode: HeatMode,
}

impl HeatSource {
    /// Creates a unit with the default efficiencies of its class.
    pub fn new(kind: HeatSourceKind, max_heat: f64) -> Self {
        let source_type = kind.source_type();
        let (thermal, electric) = source_type.default_efficiencies();
        Self {
            kind,
            max_heat: max_heat.max(0.0),
            thermal_efficiency: thermal,
            rated_thermal_efficiency: thermal,
            electric_efficiency: electric,
            drift_per_millisol: source_type.default_drift_per_millisol(),
            mode: HeatMode::Offline,
        }
    }

    pub fn electric(max_heat: f64) -> Self {
        Self::new(HeatSourceKind::Electric, max_heat)
    }

    pub fn solar(max_heat: f64) -> Self {
        Self::new(HeatSourceKind::Solar, max_heat)
    }

    pub fn nuclear(max_heat: f64) -> Self {
        Self::new(HeatSourceKind::Nuclear, max_heat)
    }

    pub fn fuel(max_heat: f64, supply: FuelSupply) -> Self {
        Self::new(HeatSourceKind::Fuel(supply), max_heat)
    }

    /// Overrides the efficiencies; the thermal one becomes the new rating.
    pub fn with_efficiencies(mut self, thermal: f64, electric: f64) -> Self {
        self.thermal_efficiency = thermal.clamp(0.0, 1.0);
        self.rated_thermal_efficiency = self.thermal_efficiency;
        self.electric_efficiency = electric.clamp(0.0, 1.0);
        self
    }

    pub fn kind(&self) -> &HeatSourceKind {
        &self.kind
    }

    pub fn source_type(&self) -> HeatSourceType {
        self.kind.source_type()
    }

    pub fn max_heat(&self) -> f64 {
        self.max_heat
    }

    pub fn mode(&self) -> HeatMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: HeatMode) {
        self.mode = mode;
    }

    pub fn thermal_efficiency(&self) -> f64 {
        self.thermal_efficiency
    }

    pub fn electric_efficiency(&self) -> f64 {
        self.electric_efficiency
    }

    pub fn fuel_supply(&self) -> Option<&FuelSupply> {
        match &self.kind {
            HeatSourceKind::Fuel(supply) => Some(supply),
            _ => None,
        }
    }

    pub fn fuel_supply_mut(&mut self) -> Option<&mut FuelSupply> {
        match &mut self.kind {
            HeatSourceKind::Fuel(supply) => Some(supply),
            _ => None,
        }
    }

    fn unavailable(&self, reason: &'static str) -> SourceFault {
        SourceFault::Unavailable {
            kind: self.source_type().label(),
            reason,
        }
    }

    /// Returns an error if the source cannot run under `cond` at all.
    pub fn check_available(&self, cond: &SourceConditions) -> Result<(), SourceFault> {
        match &self.kind {
            HeatSourceKind::Solar if cond.irradiance_w_m2 <= 0.0 => {
                Err(self.unavailable("no sunlight"))
            }
            HeatSourceKind::Fuel(supply) if !supply.toggle => Err(self.unavailable("toggled off")),
            HeatSourceKind::Fuel(supply) if supply.stored_kg <= 0.0 => {
                Err(self.unavailable("out of fuel"))
            }
            _ => Ok(()),
        }
    }

    pub fn is_available(&self, cond: &SourceConditions) -> bool {
        self.check_available(cond).is_ok()
    }

    /// Fraction of output scaled by the environment (irradiance for solar).
    fn environment_factor(&self, cond: &SourceConditions) -> f64 {
        match self.kind {
            HeatSourceKind::Solar => cond.irradiance_w_m2 / cond.mean_irradiance_w_m2,
            _ => 1.0,
        }
    }

    /// Heat this source would deliver at `percent` [kW], without changing state.
    pub fn request_heat(&self, percent: f64, cond: &SourceConditions) -> Result<f64, SourceFault> {
        self.check_available(cond)?;
        let efficiency_ratio = if self.rated_thermal_efficiency > 0.0 {
            self.thermal_efficiency / self.rated_thermal_efficiency
        } else {
            0.0
        };
        let kw = self.max_heat
            * (percent / 100.0)
            * efficiency_ratio
            * self.environment_factor(cond);
        if !kw.is_finite() {
            return Err(SourceFault::NonFinite {
                kind: self.source_type().label(),
                value: kw,
            });
        }
        Ok(kw.clamp(0.0, self.max_heat))
    }

    /// Share of capacity left for electricity at `percent` heat output.
    pub fn percent_electricity(&self, percent: f64) -> f64 {
        match self.kind {
            HeatSourceKind::Nuclear | HeatSourceKind::Solar => (100.0 - percent).max(0.0),
            HeatSourceKind::Electric => 100.0,
            HeatSourceKind::Fuel(_) => 0.0,
        }
    }

    /// Electric power associated with running at `percent` [kW].
    ///
    /// Electric heaters report the power they draw; cogenerating sources
    /// (solar, nuclear) report the electricity produced from the capacity
    /// not used for heat.
    pub fn request_power(&self, percent: f64, cond: &SourceConditions) -> Result<f64, SourceFault> {
        match self.kind {
            HeatSourceKind::Electric => {
                let heat = self.request_heat(percent, cond)?;
                if self.electric_efficiency > 0.0 {
                    Ok(heat / self.electric_efficiency)
                } else {
                    Ok(0.0)
                }
            }
            HeatSourceKind::Nuclear | HeatSourceKind::Solar => {
                let full = self.request_heat(100.0, cond)?;
                Ok(full * self.percent_electricity(percent) / 100.0 * self.electric_efficiency)
            }
            HeatSourceKind::Fuel(_) => Ok(0.0),
        }
    }

    /// Heat delivered at the currently set mode [kW].
    pub fn current_heat(&self, cond: &SourceConditions) -> f64 {
        if self.mode.is_offline() {
            return 0.0;
        }
        self.request_heat(self.mode.percentage(), cond)
            .unwrap_or(0.0)
    }

    /// Electric power at the currently set mode [kW].
    pub fn current_power(&self, cond: &SourceConditions) -> f64 {
        if self.mode.is_offline() {
            return 0.0;
        }
        self.request_power(self.mode.percentage(), cond)
            .unwrap_or(0.0)
    }

    /// Largest steady output the stored fuel can sustain over `millisols` [kW].
    ///
    /// `None` when nothing limits the output: non-fuel kinds, or a span in
    /// which no fuel is burned.
    pub fn fuel_limited_heat(&self, millisols: f64) -> Option<f64> {
        let supply = self.fuel_supply()?;
        if millisols <= 0.0 {
            return None;
        }
        let energy_kj =
            supply.stored_kg.max(0.0) * supply.fuel.energy_density_kj_per_kg() * self.thermal_efficiency;
        Some(energy_kj / (millisols * SECONDS_PER_MILLISOL))
    }

    /// Burns fuel for delivering `heat_kw` over `millisols`. Returns kg burned.
    ///
    /// Other kinds consume nothing. Callers cap `heat_kw` with
    /// [`HeatSource::fuel_limited_heat`]; the tank never goes negative.
    pub fn consume_fuel(&mut self, heat_kw: f64, millisols: f64) -> f64 {
        let efficiency = self.thermal_efficiency;
        let Some(supply) = self.fuel_supply_mut() else {
            return 0.0;
        };
        if heat_kw <= 0.0 || millisols <= 0.0 || efficiency <= 0.0 {
            return 0.0;
        }
        let energy_kj = heat_kw * millisols * SECONDS_PER_MILLISOL;
        let needed = energy_kj / (supply.fuel.energy_density_kj_per_kg() * efficiency);
        // A rounding residue left in the tank is burned along with the rest.
        let burned = if needed >= supply.stored_kg * (1.0 - 1e-9) {
            supply.stored_kg
        } else {
            needed
        };
        supply.stored_kg -= burned;
        burned
    }

    /// Applies efficiency drift for `millisols` of operation.
    ///
    /// Only running units age. Efficiency never drops below half the rating.
    pub fn age(&mut self, millisols: f64) {
        if self.mode.is_offline() || millisols <= 0.0 {
            return;
        }
        let floor = 0.5 * self.rated_thermal_efficiency;
        self.thermal_efficiency =
            (self.thermal_efficiency - self.drift_per_millisol * millisols).max(floor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> SourceConditions {
        SourceConditions {
            irradiance_w_m2: 586.0,
            mean_irradiance_w_m2: 586.0,
        }
    }

    fn night() -> SourceConditions {
        SourceConditions {
            irradiance_w_m2: 0.0,
            mean_irradiance_w_m2: 586.0,
        }
    }

    #[test]
    fn test_electric_scales_with_percent() {
        let s = HeatSource::electric(10.0);
        assert!((s.request_heat(50.0, &night()).unwrap() - 5.0).abs() < 1e-12);
        assert!((s.request_heat(100.0, &night()).unwrap() - 10.0).abs() < 1e-12);
        assert_eq!(s.request_heat(0.0, &night()).unwrap(), 0.0);
    }

    #[test]
    fn test_solar_is_gated_by_irradiance() {
        let s = HeatSource::solar(8.0);
        assert!(matches!(
            s.request_heat(50.0, &night()),
            Err(SourceFault::Unavailable { .. })
        ));
        assert!((s.request_heat(50.0, &day()).unwrap() - 4.0).abs() < 1e-12);

        let dim = SourceConditions {
            irradiance_w_m2: 293.0,
            ..day()
        };
        assert!((s.request_heat(100.0, &dim).unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_output_never_exceeds_capacity() {
        let s = HeatSource::solar(8.0);
        let bright = SourceConditions {
            irradiance_w_m2: 2000.0,
            ..day()
        };
        assert!((s.request_heat(100.0, &bright).unwrap() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_output_is_a_fault() {
        let s = HeatSource::solar(8.0);
        let broken = SourceConditions {
            irradiance_w_m2: 100.0,
            mean_irradiance_w_m2: 0.0,
        };
        assert!(matches!(
            s.request_heat(50.0, &broken),
            Err(SourceFault::NonFinite { .. })
        ));
        assert_eq!(s.current_heat(&broken), 0.0);
    }

    #[test]
    fn test_fuel_needs_toggle_and_fuel() {
        let mut s = HeatSource::fuel(5.0, FuelSupply::new(FuelType::Methane, 1.0));
        assert!(s.is_available(&night()));

        if let Some(supply) = s.fuel_supply_mut() {
            supply.toggle = false;
        }
        assert!(!s.is_available(&night()));

        if let Some(supply) = s.fuel_supply_mut() {
            supply.toggle = true;
            supply.stored_kg = 0.0;
        }
        assert!(s.request_heat(50.0, &night()).is_err());
    }

    #[test]
    fn test_consume_fuel() {
        let mut s = HeatSource::fuel(5.0, FuelSupply::new(FuelType::Methane, 1.0));
        let burned = s.consume_fuel(5.0, 1.0);
        let expected = 5.0 * SECONDS_PER_MILLISOL / (50_000.0 * 0.75);
        assert!((burned - expected).abs() < 1e-12);
        let left = s.fuel_supply().map(|f| f.stored_kg).unwrap();
        assert!((left - (1.0 - expected)).abs() < 1e-12);

        // Cannot burn more than is stored.
        let burned = s.consume_fuel(5.0, 1.0e6);
        assert!((burned - left).abs() < 1e-12);
        assert!(!s.is_available(&night()));

        let mut e = HeatSource::electric(5.0);
        assert_eq!(e.consume_fuel(5.0, 1.0), 0.0);
    }

    #[test]
    fn test_fuel_limited_heat() {
        let s = HeatSource::fuel(5.0, FuelSupply::new(FuelType::Methane, 1.0e-3));
        let cap = s.fuel_limited_heat(2.0).unwrap();
        let expected = 1.0e-3 * 50_000.0 * 0.75 / (2.0 * SECONDS_PER_MILLISOL);
        assert!((cap - expected).abs() < 1e-12);
        assert_eq!(s.fuel_limited_heat(0.0), None);
        assert_eq!(HeatSource::electric(5.0).fuel_limited_heat(2.0), None);

        // Running at the cap empties the tank exactly.
        let mut s = s;
        let burned = s.consume_fuel(cap, 2.0);
        assert_eq!(burned, 1.0e-3);
        assert_eq!(s.fuel_supply().map(|f| f.stored_kg), Some(0.0));
    }

    #[test]
    fn test_current_heat_follows_mode() {
        let mut s = HeatSource::nuclear(20.0);
        assert_eq!(s.current_heat(&night()), 0.0);
        s.set_mode(HeatMode::Level25);
        assert!((s.current_heat(&night()) - 5.0).abs() < 1e-12);
        s.set_mode(HeatMode::Level0);
        assert_eq!(s.current_heat(&night()), 0.0);
    }

    #[test]
    fn test_power_by_kind() {
        let mut n = HeatSource::nuclear(20.0);
        n.set_mode(HeatMode::Level25);
        // 75% of capacity left for electricity at 33% efficiency.
        assert!((n.current_power(&night()) - 20.0 * 0.75 * 0.33).abs() < 1e-9);

        let mut e = HeatSource::electric(10.0);
        e.set_mode(HeatMode::Level50);
        assert!((e.current_power(&night()) - 5.0 / 0.95).abs() < 1e-9);

        e.set_mode(HeatMode::Offline);
        assert_eq!(e.current_power(&night()), 0.0);
    }

    #[test]
    fn test_aging_is_floored() {
        let mut s = HeatSource::solar(8.0);
        s.set_mode(HeatMode::Level100);
        s.age(1.0e9);
        assert!((s.thermal_efficiency() - 0.34).abs() < 1e-12);
        assert!((s.request_heat(100.0, &day()).unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_priority_order_is_fixed() {
        let mut sorted = HeatSourceType::PRIORITY;
        sorted.sort();
        assert_eq!(sorted, HeatSourceType::PRIORITY);
        assert_eq!(HeatSourceType::PRIORITY[0], HeatSourceType::Solar);
        assert_eq!(HeatSourceType::PRIORITY[3], HeatSourceType::Fuel);
    }
}
