//! Bounded heat reservoirs that damp temperature swings.
//!
//! A building has an air-moisture sink (always) and a standing-water sink
//! (only when it holds liquid water). Each stores heat in `[0, limit]` kW.

use serde::{Deserialize, Serialize};

use super::config::ThermalConfig;
use super::fault::{FaultLog, ThermalFault};

/// Specific heat of dry air at 300 K [kJ/(kg*°C)].
pub const SPECIFIC_HEAT_AIR: f64 = 1.005;
/// Specific heat of water vapor [kJ/(kg*°C)].
pub const SPECIFIC_HEAT_VAPOR: f64 = 1.82;
/// Specific heat of liquid water at 300 K [kJ/(kg*°C)].
pub const SPECIFIC_HEAT_WATER: f64 = 4.184;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkMedium {
    Air,
    Water,
}

impl SinkMedium {
    pub fn label(self) -> &'static str {
        match self {
            Self::Air => "air",
            Self::Water => "water",
        }
    }
}

/// One reservoir.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatSink {
    /// Heat currently held [kW].
    pub stored: f64,
    /// Capacity [kW].
    pub limit: f64,
}

impl HeatSink {
    pub fn remaining(&self) -> f64 {
        (self.limit - self.stored).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.stored <= 0.0
    }

    /// Replaces the capacity, clipping stored heat that no longer fits.
    pub fn set_limit(&mut self, medium: SinkMedium, limit: f64, faults: &mut FaultLog) {
        self.limit = if limit.is_finite() { limit.max(0.0) } else { 0.0 };
        if self.stored > self.limit {
            faults.record(&ThermalFault::Capacity {
                sink: medium.label(),
                requested: self.stored,
                limit: self.limit,
            });
            self.stored = self.limit;
        }
        if !(self.stored >= 0.0) {
            self.stored = 0.0;
        }
    }

    /// Stores up to `kw`, returning the amount actually absorbed.
    pub fn absorb(&mut self, kw: f64) -> f64 {
        let taken = kw.max(0.0).min(self.remaining());
        self.stored += taken;
        taken
    }

    /// Releases up to `kw`, returning the amount actually released.
    pub fn release(&mut self, kw: f64) -> f64 {
        let given = kw.max(0.0).min(self.stored.max(0.0));
        self.stored -= given;
        given
    }
}

/// The pair of reservoirs carried by every building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatSinks {
    pub air: HeatSink,
    pub water: HeatSink,
}

impl HeatSinks {
    pub fn get(&self, medium: SinkMedium) -> &HeatSink {
        match medium {
            SinkMedium::Air => &self.air,
            SinkMedium::Water => &self.water,
        }
    }

    pub fn get_mut(&mut self, medium: SinkMedium) -> &mut HeatSink {
        match medium {
            SinkMedium::Air => &mut self.air,
            SinkMedium::Water => &mut self.water,
        }
    }

    pub fn total_stored(&self) -> f64 {
        self.air.stored + self.water.stored
    }

    pub fn is_empty(&self) -> bool {
        self.air.is_empty() && self.water.is_empty()
    }

    /// Fills air first, then spills into water. Returns the total absorbed.
    pub fn absorb_round_robin(&mut self, kw: f64) -> f64 {
        let a = self.air.absorb(kw);
        a + self.water.absorb(kw - a)
    }

    /// Draws from air first, then water. Returns the total released.
    pub fn release_round_robin(&mut self, kw: f64) -> f64 {
        let a = self.air.release(kw);
        a + self.water.release(kw - a)
    }
}

/// Heat capacity of humid air [kJ/°C].
pub fn air_heat_capacity(air_mass_kg: f64, moisture_percent: f64) -> f64 {
    (SPECIFIC_HEAT_AIR + SPECIFIC_HEAT_VAPOR * moisture_percent / 100.0) * air_mass_kg.max(0.0)
}

/// Heat capacity of standing water [kJ/°C].
pub fn water_heat_capacity(water_mass_kg: f64) -> f64 {
    SPECIFIC_HEAT_WATER * water_mass_kg.max(0.0)
}

/// Inputs for one buffering pass.
#[derive(Debug, Clone, Copy)]
pub struct SinkStep {
    pub medium: SinkMedium,
    /// Heat capacity of the medium [kJ/°C].
    pub heat_capacity: f64,
    /// Length of the sub-step [s].
    pub seconds: f64,
    /// Sub-step length as a fraction of the largest sub-step.
    pub elapsed_fraction: f64,
    /// Fourth root of the floor area.
    pub area_factor: f64,
    /// Indoor temperature at the start of the sub-step [°C].
    pub temperature_c: f64,
    /// Preset temperature [°C].
    pub preset_c: f64,
}

impl SinkStep {
    pub fn efficiency(&self, cfg: &ThermalConfig) -> f64 {
        match self.medium {
            SinkMedium::Air => cfg.air_sink_efficiency,
            SinkMedium::Water => cfg.water_sink_efficiency,
        }
    }

    /// Capacity of the reservoir for this sub-step [kW].
    pub fn limit(&self, cfg: &ThermalConfig) -> f64 {
        if self.seconds <= 0.0 {
            return 0.0;
        }
        self.heat_capacity / self.seconds * self.temperature_c.max(0.0) * self.efficiency(cfg)
    }

    /// Seconds per unit heat capacity [s*°C/kJ].
    pub fn conversion_factor(&self) -> f64 {
        if self.heat_capacity > 0.0 {
            self.seconds / self.heat_capacity
        } else {
            0.0
        }
    }
}

/// Result of one buffering pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkTransfer {
    /// Heat moved into the sink [kW]; negative when released.
    pub absorbed: f64,
    /// Net heat after buffering [kW].
    pub net_heat: f64,
    pub conversion_factor: f64,
}

/// Buffers `net_heat` through `sink` according to the current deviation.
///
/// Too hot: the sink soaks up heat and net heat drops. Too cold: the sink
/// gives heat back and net heat rises. The sink limit is refreshed first.
pub fn buffer(
    sink: &mut HeatSink,
    net_heat: f64,
    step: &SinkStep,
    cfg: &ThermalConfig,
    faults: &mut FaultLog,
) -> SinkTransfer {
    sink.set_limit(step.medium, step.limit(cfg), faults);

    let clamp = cfg.sink_deviation_clamp_c;
    let dt = (step.temperature_c - step.preset_c).clamp(-clamp, clamp);
    let upper_bound =
        (step.elapsed_fraction * step.efficiency(cfg) * step.area_factor * 3.0).min(1.0);
    let transfer = dt * upper_bound;

    let mut net = net_heat;
    let mut absorbed = 0.0;
    if dt > 0.0 {
        let taken = sink.absorb(transfer);
        net -= taken;
        absorbed = taken;
    } else if dt < 0.0 {
        let given = sink.release(-transfer);
        net += given;
        absorbed = -given;
    }

    SinkTransfer {
        absorbed,
        net_heat: net,
        conversion_factor: step.conversion_factor(),
    }
}
