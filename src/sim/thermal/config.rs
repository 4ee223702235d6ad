use serde::{Deserialize, Serialize};

/// Seconds in one millisol (1/1000 of a Martian solar day).
pub const SECONDS_PER_MILLISOL: f64 = 88.775244;

/// Offset between °C and K.
pub const C_TO_K: f64 = 273.15;

/// Universal gas constant [J/(mol*K)].
pub const GAS_CONSTANT: f64 = 8.314462618;

/// Stefan–Boltzmann constant [W/(m^2*K^4)].
pub const STEFAN_BOLTZMANN: f64 = 5.67e-8;

/// Tunable constants for the thermal balance core.
///
/// Every threshold the balance, ventilation, buffering and arbitration steps
/// use lives here so that calibration runs do not need code changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// Lower clamp for indoor temperature [°C].
    pub min_indoor_c: f64,
    /// Upper clamp for indoor temperature [°C].
    pub max_indoor_c: f64,
    /// Sanity bound on |pre/post net heat| [kW].
    pub net_heat_bound_kw: f64,
    /// Sanity bound on |deviation temperature| [°C].
    pub deviation_bound_c: f64,
    /// Sanity bound for generic inputs (outdoor temperature, injected heat).
    pub max_error_value: f64,

    /// Smallest sub-step [millisols].
    pub min_substep_millisols: f64,
    /// Largest sub-step [millisols].
    pub max_substep_millisols: f64,
    /// Most sub-steps a single advance may run; longer spans are truncated.
    pub max_substeps: usize,

    /// Thermostat sensitivity [°C].
    pub sensitivity_c: f64,
    /// Multiplier applied to the sensitivity to get the comfort band half-width.
    pub sensitivity_step: f64,

    /// Ventilation airflow [cubic feet per minute].
    pub ventilation_cfm: f64,
    /// Clamp on the net heat imbalance term used by ventilation [kW].
    pub vent_net_heat_cap_kw: f64,
    /// Floor on the net heat imbalance term used by ventilation [kW].
    pub vent_net_heat_floor_kw: f64,
    /// Clamp on the half temperature gaps used by ventilation [°C].
    pub vent_delta_cap_c: f64,
    /// Minimum temperature gap to a neighbor before air is exchanged [°C].
    pub vent_min_gap_c: f64,
    /// Upper bound on the ventilation speed factor.
    pub vent_speed_cap: f64,

    /// Absorption efficiency of the air-moisture sink.
    pub air_sink_efficiency: f64,
    /// Absorption efficiency of the standing-water sink.
    pub water_sink_efficiency: f64,
    /// Clamp on the deviation seen by the sinks [°C].
    pub sink_deviation_clamp_c: f64,

    /// Deviation above which the entropy estimate is considered [°C].
    pub entropy_gate_c: f64,
    /// Clamp on the linear required-heat multiplier [kW/°C].
    pub linear_bound: f64,
    /// Overflow threshold as a multiple of the building area factor [kW].
    pub overflow_factor: f64,
    /// Deviation below which the building counts as strongly overheated [°C].
    pub strong_negative_deviation_c: f64,
    /// Share of the required heat diverted to the sinks when overheated.
    pub overflow_diversion_fraction: f64,
    /// Adds the standing gain/loss imbalance (without generation) to the
    /// required heat so that generators cover ongoing losses.
    pub carry_imbalance: bool,

    /// Requirements at or below this are arbitrated as zero [kW].
    pub arbitration_threshold_kw: f64,
    /// Fraction of stored sink heat subtracted from the ask.
    pub sink_draw_factor: f64,
    /// Ask added when both sinks are empty and heat is needed [kW].
    pub empty_sink_ask_kw: f64,
    /// Remaining unmet demand that triggers a warning [kW].
    pub unmet_warning_kw: f64,

    /// Irradiance below which the thermal canopy is deployed [kW/m^2].
    pub canopy_light_threshold: f64,
    /// Irradiance below which general lighting is switched on [kW/m^2].
    pub lighting_threshold: f64,
    /// Fraction of general lighting floor load turned into heat.
    pub general_lighting_fraction: f64,
    /// Fraction of grow-lighting power lost as heat (high pressure sodium).
    pub grow_lamp_loss_factor: f64,

    /// Volume of an airlock chamber [m^3].
    pub airlock_volume_m3: f64,
    /// Cabin pressure used when no life-support state is supplied [kPa].
    pub nominal_air_pressure_kpa: f64,
    /// Mean surface irradiance used to normalize solar heaters [W/m^2].
    pub mean_solar_irradiance_w_m2: f64,

    /// Minimum ticks between two log lines with the same key.
    pub fault_log_interval_ticks: u64,
}

impl ThermalConfig {
    pub fn new() -> Self {
        Self {
            min_indoor_c: 0.0,
            max_indoor_c: 40.0,
            net_heat_bound_kw: 30.0,
            deviation_bound_c: 40.0,
            max_error_value: 100.0,

            min_substep_millisols: 0.011,
            max_substep_millisols: 2.0,
            max_substeps: 1000,

            sensitivity_c: 1.0,
            sensitivity_step: 2.5,

            ventilation_cfm: 50.0,
            vent_net_heat_cap_kw: 5.0,
            vent_net_heat_floor_kw: 0.1,
            vent_delta_cap_c: 7.0,
            vent_min_gap_c: 1.5,
            vent_speed_cap: 0.5,

            air_sink_efficiency: 0.3,
            water_sink_efficiency: 0.5,
            sink_deviation_clamp_c: 20.0,

            entropy_gate_c: 0.2,
            linear_bound: 3.0,
            overflow_factor: 3.0,
            strong_negative_deviation_c: -2.5,
            overflow_diversion_fraction: 0.5,
            carry_imbalance: true,

            arbitration_threshold_kw: 0.1,
            sink_draw_factor: 0.1,
            empty_sink_ask_kw: 0.05,
            unmet_warning_kw: 0.5,

            canopy_light_threshold: 0.05,
            lighting_threshold: 0.1,
            general_lighting_fraction: 0.1,
            grow_lamp_loss_factor: 0.6,

            airlock_volume_m3: 12.0,
            nominal_air_pressure_kpa: 34.0,
            mean_solar_irradiance_w_m2: 586.0,

            fault_log_interval_ticks: 200,
        }
    }

    /// Half-width of the comfort band around the preset [°C].
    pub fn comfort_band_c(&self) -> f64 {
        self.sensitivity_c * self.sensitivity_step
    }

    /// Clamps an indoor temperature into `[min_indoor_c, max_indoor_c]`.
    pub fn clamp_indoor(&self, t: f64) -> f64 {
        t.clamp(self.min_indoor_c, self.max_indoor_c)
    }

    /// Checks internal consistency (used when a config is loaded from a file).
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.min_indoor_c < self.max_indoor_c,
            "ThermalConfig: min_indoor_c ({}) must be below max_indoor_c ({})",
            self.min_indoor_c,
            self.max_indoor_c
        );
        anyhow::ensure!(
            self.min_substep_millisols > 0.0
                && self.min_substep_millisols <= self.max_substep_millisols,
            "ThermalConfig: invalid sub-step range [{}, {}]",
            self.min_substep_millisols,
            self.max_substep_millisols
        );
        anyhow::ensure!(
            self.max_substeps > 0,
            "ThermalConfig: max_substeps must be at least 1"
        );
        anyhow::ensure!(
            self.net_heat_bound_kw > 0.0 && self.deviation_bound_c > 0.0,
            "ThermalConfig: sanity bounds must be positive"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.air_sink_efficiency)
                && (0.0..=1.0).contains(&self.water_sink_efficiency),
            "ThermalConfig: sink efficiencies must be within [0, 1]"
        );
        anyhow::ensure!(
            self.mean_solar_irradiance_w_m2 > 0.0,
            "ThermalConfig: mean_solar_irradiance_w_m2 must be positive"
        );
        Ok(())
    }
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self::new()
    }
}
