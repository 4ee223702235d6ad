//! Outdoor conditions seen by the thermal core.
//!
//! The balance computation never queries a global provider; the caller hands
//! in an [`Environment`] for each advance.

use serde::{Deserialize, Serialize};

use super::heat_source::SourceConditions;

/// Read-only outdoor conditions at the settlement.
pub trait Environment {
    /// Outdoor air temperature [°C].
    fn outdoor_temperature_c(&self) -> f64;

    /// Solar irradiance on the surface [W/m^2].
    fn solar_irradiance_w_m2(&self) -> f64;

    /// Long-term mean irradiance at the location [W/m^2].
    fn mean_solar_irradiance_w_m2(&self) -> f64;

    /// Wind speed [m/s].
    fn wind_speed_m_s(&self) -> f64;

    fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            outdoor_temperature_c: self.outdoor_temperature_c(),
            solar_irradiance_w_m2: self.solar_irradiance_w_m2(),
            mean_solar_irradiance_w_m2: self.mean_solar_irradiance_w_m2(),
            wind_speed_m_s: self.wind_speed_m_s(),
        }
    }
}

/// Frozen copy of the outdoor conditions for one advance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub outdoor_temperature_c: f64,
    pub solar_irradiance_w_m2: f64,
    pub mean_solar_irradiance_w_m2: f64,
    pub wind_speed_m_s: f64,
}

impl EnvironmentSnapshot {
    pub fn new(outdoor_temperature_c: f64, solar_irradiance_w_m2: f64, wind_speed_m_s: f64) -> Self {
        Self {
            outdoor_temperature_c,
            solar_irradiance_w_m2,
            mean_solar_irradiance_w_m2: 586.0,
            wind_speed_m_s,
        }
    }

    /// Irradiance in kW/m^2, the unit the gain/loss formulas use.
    pub fn irradiance_kw_m2(&self) -> f64 {
        self.solar_irradiance_w_m2.max(0.0) / 1000.0
    }

    pub fn source_conditions(&self) -> SourceConditions {
        SourceConditions {
            irradiance_w_m2: self.solar_irradiance_w_m2,
            mean_irradiance_w_m2: self.mean_solar_irradiance_w_m2,
        }
    }
}

impl Default for EnvironmentSnapshot {
    fn default() -> Self {
        Self::new(-60.0, 0.0, 5.0)
    }
}

impl Environment for EnvironmentSnapshot {
    fn outdoor_temperature_c(&self) -> f64 {
        self.outdoor_temperature_c
    }

    fn solar_irradiance_w_m2(&self) -> f64 {
        self.solar_irradiance_w_m2
    }

    fn mean_solar_irradiance_w_m2(&self) -> f64 {
        self.mean_solar_irradiance_w_m2
    }

    fn wind_speed_m_s(&self) -> f64 {
        self.wind_speed_m_s
    }
}

/// Synthetic diurnal cycle for demos and tests.
///
/// Temperature follows a cosine peaking in the early afternoon; sunlight is a
/// parabola between sunrise (millisol 250) and sunset (millisol 750).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolCycleEnvironment {
    pub mean_temperature_c: f64,
    pub temperature_amplitude_c: f64,
    pub peak_irradiance_w_m2: f64,
    pub wind_speed_m_s: f64,
    /// Time of day [millisols, 0..1000).
    pub millisol: f64,
}

impl SolCycleEnvironment {
    const SUNRISE: f64 = 250.0;
    const SUNSET: f64 = 750.0;
    const WARMEST: f64 = 600.0;

    pub fn new(mean_temperature_c: f64, temperature_amplitude_c: f64) -> Self {
        Self {
            mean_temperature_c,
            temperature_amplitude_c,
            peak_irradiance_w_m2: 590.0,
            wind_speed_m_s: 5.0,
            millisol: 0.0,
        }
    }

    /// Moves the clock forward, wrapping at the end of the sol.
    pub fn advance(&mut self, millisols: f64) {
        self.millisol = (self.millisol + millisols.max(0.0)).rem_euclid(1000.0);
    }

    pub fn is_daylight(&self) -> bool {
        (Self::SUNRISE..Self::SUNSET).contains(&self.millisol)
    }
}

impl Environment for SolCycleEnvironment {
    fn outdoor_temperature_c(&self) -> f64 {
        let phase = 2.0 * std::f64::consts::PI * (self.millisol - Self::WARMEST) / 1000.0;
        self.mean_temperature_c + self.temperature_amplitude_c * phase.cos()
    }

    fn solar_irradiance_w_m2(&self) -> f64 {
        if !self.is_daylight() {
            return 0.0;
        }
        let half_day = (Self::SUNSET - Self::SUNRISE) / 2.0;
        let x = (self.millisol - (Self::SUNRISE + half_day)) / half_day;
        self.peak_irradiance_w_m2 * (1.0 - x * x).max(0.0)
    }

    fn mean_solar_irradiance_w_m2(&self) -> f64 {
        // Mean of a half-sol parabola.
        self.peak_irradiance_w_m2 * (2.0 / 3.0)
    }

    fn wind_speed_m_s(&self) -> f64 {
        self.wind_speed_m_s
    }
}
