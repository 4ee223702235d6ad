//! Air exchange with adjacent buildings.
//!
//! A building outside its comfort band pulls warm air from (or pushes warm
//! air to) each neighbor. The result is applied to this building's own net
//! heat right away; the negated amount is queued on the neighbor and only
//! consumed on the neighbor's next tick, so processing order does not matter.

use super::config::ThermalConfig;

/// Share of the transfer cap used when the neighbor is off-band the other way.
const OPPOSITE_SHARE: f64 = 0.9;
/// Share used when the neighbor sits inside its own comfort band.
const NEUTRAL_SHARE: f64 = 0.6;

/// Temperature state of an adjacent building at the start of the tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborState {
    /// Position of the neighbor in the settlement.
    pub index: usize,
    pub temperature_c: f64,
    pub preset_c: f64,
}

/// Heat exchanged with a single neighbor, signed from the initiator's side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VentTransfer {
    pub neighbor: usize,
    /// Positive: heat drawn in. Negative: heat pushed out [kW].
    pub kw: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VentilationOutcome {
    /// Sum of all transfers [kW].
    pub total_kw: f64,
    pub transfers: Vec<VentTransfer>,
}

/// Comfort-band position of a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandState {
    TooCold,
    Neutral,
    TooHot,
}

impl BandState {
    pub fn classify(temperature_c: f64, preset_c: f64, cfg: &ThermalConfig) -> Self {
        let band = cfg.comfort_band_c();
        if temperature_c < preset_c - band {
            Self::TooCold
        } else if temperature_c > preset_c + band {
            Self::TooHot
        } else {
            Self::Neutral
        }
    }
}

/// Dimensionless airflow factor for a sub-step of `millisols`.
pub fn speed_factor(millisols: f64, area_factor: f64, cfg: &ThermalConfig) -> f64 {
    if area_factor <= 0.0 {
        return 0.0;
    }
    (0.005 * millisols.max(0.0) * cfg.ventilation_cfm / area_factor).clamp(0.0, cfg.vent_speed_cap)
}

/// Largest magnitude a single neighbor transfer can reach for this step [kW].
pub fn transfer_cap(millisols: f64, area_factor: f64, cfg: &ThermalConfig) -> f64 {
    cfg.vent_net_heat_cap_kw * speed_factor(millisols, area_factor, cfg)
}

/// Computes the exchange of one building with all its neighbors.
pub fn exchange(
    temperature_c: f64,
    preset_c: f64,
    net_heat: f64,
    area_factor: f64,
    millisols: f64,
    neighbors: &[NeighborState],
    cfg: &ThermalConfig,
) -> VentilationOutcome {
    let state = BandState::classify(temperature_c, preset_c, cfg);
    if state == BandState::Neutral || neighbors.is_empty() {
        return VentilationOutcome::default();
    }

    let cap = cfg.vent_delta_cap_c;
    let net_term = net_heat
        .abs()
        .clamp(cfg.vent_net_heat_floor_kw, cfg.vent_net_heat_cap_kw);
    let dev_term = ((temperature_c - preset_c).abs() / 2.0).min(cap) / cap;
    let speed = speed_factor(millisols, area_factor, cfg);

    let mut outcome = VentilationOutcome::default();
    for n in neighbors {
        let gap = n.temperature_c - temperature_c;
        let gap_term = (gap.abs() / 2.0).min(cap) / cap;
        let max_heat = net_term * dev_term * gap_term * speed;
        let other = BandState::classify(n.temperature_c, n.preset_c, cfg);

        let kw = match (state, other) {
            (BandState::TooCold, BandState::TooHot) if gap > cfg.vent_min_gap_c => {
                max_heat * OPPOSITE_SHARE
            }
            (BandState::TooCold, BandState::Neutral) if gap > cfg.vent_min_gap_c => {
                max_heat * NEUTRAL_SHARE
            }
            (BandState::TooHot, BandState::TooCold) if -gap > cfg.vent_min_gap_c => {
                -max_heat * OPPOSITE_SHARE
            }
            (BandState::TooHot, BandState::Neutral) if -gap > cfg.vent_min_gap_c => {
                -max_heat * NEUTRAL_SHARE
            }
            _ => 0.0,
        };

        if kw != 0.0 && kw.is_finite() {
            log::debug!(
                "At {temperature_c:.1} °C, venting {} {:.3} kW with neighbor #{} at {:.1} °C",
                if kw > 0.0 { "in" } else { "out" },
                kw.abs(),
                n.index,
                n.temperature_c
            );
            outcome.total_kw += kw;
            outcome.transfers.push(VentTransfer {
                neighbor: n.index,
                kw,
            });
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neighbor(index: usize, temperature_c: f64) -> NeighborState {
        NeighborState {
            index,
            temperature_c,
            preset_c: 22.5,
        }
    }

    #[test]
    fn test_inside_band_does_nothing() {
        let cfg = ThermalConfig::default();
        let out = exchange(23.0, 22.5, 3.0, 3.0, 2.0, &[neighbor(1, 10.0)], &cfg);
        assert_eq!(out, VentilationOutcome::default());
    }

    #[test]
    fn test_hot_building_pushes_heat_to_cold_neighbor() {
        let cfg = ThermalConfig::default();
        let out = exchange(27.5, 22.5, 3.0, 3.0, 2.0, &[neighbor(1, 17.5)], &cfg);
        assert_eq!(out.transfers.len(), 1);
        assert!(out.total_kw < 0.0);
        assert!(out.total_kw.abs() <= transfer_cap(2.0, 3.0, &cfg));
    }

    #[test]
    fn test_cold_building_pulls_more_from_hot_than_neutral() {
        let cfg = ThermalConfig::default();
        let hot = exchange(17.5, 22.5, 3.0, 3.0, 2.0, &[neighbor(1, 27.5)], &cfg);
        let neutral = exchange(17.5, 22.5, 3.0, 3.0, 2.0, &[neighbor(1, 24.5)], &cfg);
        assert!(hot.total_kw > 0.0);
        assert!(neutral.total_kw > 0.0);

        // Same gap gives the same raw magnitude; only the share differs.
        let hot_same_gap = exchange(17.5, 22.5, 3.0, 3.0, 2.0, &[neighbor(1, 24.5)], &{
            let mut c = cfg.clone();
            c.sensitivity_c = 0.5;
            c
        });
        assert!(hot_same_gap.total_kw > neutral.total_kw);
    }

    #[test]
    fn test_no_exchange_with_neighbor_on_same_side() {
        let cfg = ThermalConfig::default();
        let out = exchange(17.5, 22.5, 3.0, 3.0, 2.0, &[neighbor(1, 15.0)], &cfg);
        assert!(out.transfers.is_empty());
        // Gap too small.
        let out = exchange(17.5, 22.5, 3.0, 3.0, 2.0, &[neighbor(1, 18.5)], &cfg);
        assert!(out.transfers.is_empty());
    }

    #[test]
    fn test_speed_factor_is_capped() {
        let cfg = ThermalConfig::default();
        assert_eq!(speed_factor(1.0e6, 1.0, &cfg), cfg.vent_speed_cap);
        assert_eq!(speed_factor(1.0, 0.0, &cfg), 0.0);
        assert!(speed_factor(0.1, 3.0, &cfg) > 0.0);
    }
}
