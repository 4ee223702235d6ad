//! Greedy, priority-ordered selection of heat source output levels.

use serde::{Deserialize, Serialize};

use super::config::ThermalConfig;
use super::fault::FaultLog;
use super::heat_mode::HeatMode;
use super::heat_sink::HeatSinks;
use super::heat_source::{HeatSource, HeatSourceType, SourceConditions};

/// Last committed output per source class [kW].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceOutputs {
    pub solar: f64,
    pub nuclear: f64,
    pub electric: f64,
    pub fuel: f64,
}

impl SourceOutputs {
    pub fn get(&self, kind: HeatSourceType) -> f64 {
        match kind {
            HeatSourceType::Solar => self.solar,
            HeatSourceType::Nuclear => self.nuclear,
            HeatSourceType::Electric => self.electric,
            HeatSourceType::Fuel => self.fuel,
        }
    }

    fn get_mut(&mut self, kind: HeatSourceType) -> &mut f64 {
        match kind {
            HeatSourceType::Solar => &mut self.solar,
            HeatSourceType::Nuclear => &mut self.nuclear,
            HeatSourceType::Electric => &mut self.electric,
            HeatSourceType::Fuel => &mut self.fuel,
        }
    }

    pub fn total(&self) -> f64 {
        self.solar + self.nuclear + self.electric + self.fuel
    }
}

/// Outcome of one arbitration round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arbitration {
    /// Requirement the sources were asked to meet [kW].
    pub ask: f64,
    /// Sum of committed outputs [kW].
    pub generated: f64,
    /// `generated - ask` [kW].
    pub surplus: f64,
    /// Committed mode per configured source, in configuration order.
    pub modes: Vec<HeatMode>,
    pub outputs: SourceOutputs,
}

/// Decides which sources run, and how hard, to meet a required heat.
#[derive(Debug, Clone, Default)]
pub struct HeatGenerationArbiter {
    last: SourceOutputs,
}

impl HeatGenerationArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outputs committed by the last arbitration.
    pub fn last_outputs(&self) -> &SourceOutputs {
        &self.last
    }

    /// Required heat corrected by the heat held in the sinks.
    ///
    /// Stored heat is drawn down first; with both sinks empty a heating ask is
    /// nudged up slightly.
    pub fn damped_ask(required: f64, sinks: &HeatSinks, cfg: &ThermalConfig) -> f64 {
        let stored = sinks.total_stored();
        if stored > 0.0 {
            required - cfg.sink_draw_factor * stored
        } else if required > 0.0 {
            required + cfg.empty_sink_ask_kw
        } else {
            required
        }
    }

    /// Runs one arbitration round over `sources`, mutating their modes.
    ///
    /// Sources are visited in [`HeatSourceType::PRIORITY`] order (ties keep
    /// configuration order). Each one climbs its levels until one covers what
    /// is still missing; everything below it is switched off. A source that
    /// cannot cover it runs at its highest working level and the next one is
    /// tried. Fuel for committed output is burned over `millisols`.
    pub fn arbitrate(
        &mut self,
        sources: &mut [HeatSource],
        required: f64,
        cond: &SourceConditions,
        millisols: f64,
        cfg: &ThermalConfig,
        faults: &mut FaultLog,
    ) -> Arbitration {
        let required = faults.finite_or("required_heat", required, 0.0);
        let ask = if required <= cfg.arbitration_threshold_kw {
            0.0
        } else {
            required
        };

        let mut order: Vec<usize> = (0..sources.len()).collect();
        order.sort_by_key(|&i| sources[i].source_type());

        let mut outputs = SourceOutputs::default();
        let mut remaining = ask;
        let mut satisfied = false;

        for i in order {
            let source = &mut sources[i];
            if satisfied {
                source.set_mode(HeatMode::Offline);
                continue;
            }

            // Fuel heaters cannot deliver more than the tank holds this step.
            let fuel_cap = source.fuel_limited_heat(millisols).unwrap_or(f64::INFINITY);
            let mut best: Option<(HeatMode, f64)> = None;
            for level in HeatMode::LEVELS {
                match source.request_heat(level.percentage(), cond) {
                    Ok(kw) => {
                        let kw = kw.min(fuel_cap);
                        best = Some((level, kw));
                        if remaining - kw <= 0.0 {
                            satisfied = true;
                            break;
                        }
                    }
                    Err(fault) => faults.record_source(&fault),
                }
            }

            match best {
                Some((level, kw)) => {
                    source.set_mode(level);
                    source.consume_fuel(kw, millisols);
                    remaining -= kw;
                    *outputs.get_mut(source.source_type()) += kw;
                }
                None => source.set_mode(HeatMode::Offline),
            }
        }

        if remaining > cfg.unmet_warning_kw {
            faults.warn(
                "unmet_heat",
                format_args!("heat sources fall {remaining:.2} kW short of {ask:.2} kW"),
            );
        }

        self.last = outputs;
        let generated = outputs.total();
        Arbitration {
            ask,
            generated,
            surplus: -remaining,
            modes: sources.iter().map(|s| s.mode()).collect(),
            outputs,
        }
    }
}
