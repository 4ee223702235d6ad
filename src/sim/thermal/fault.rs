//! Fault taxonomy and rate-limited fault logging.
//!
//! Nothing in the thermal core aborts a tick. Faults are detected where a
//! value is produced, recorded through [`FaultLog`], and the value is
//! replaced by the nearest valid one.

use std::collections::HashMap;

use thiserror::Error;

/// A numeric problem detected during a balance computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThermalFault {
    #[error("{quantity} is not finite ({value})")]
    Numeric { quantity: &'static str, value: f64 },
    #[error("{quantity} = {value:.3} exceeds sanity bound ±{bound}")]
    Range {
        quantity: &'static str,
        value: f64,
        bound: f64,
    },
    #[error("{sink} sink asked for {requested:.3} kW beyond its limit {limit:.3} kW")]
    Capacity {
        sink: &'static str,
        requested: f64,
        limit: f64,
    },
}

impl ThermalFault {
    pub fn quantity(&self) -> &'static str {
        match self {
            Self::Numeric { quantity, .. } | Self::Range { quantity, .. } => quantity,
            Self::Capacity { sink, .. } => sink,
        }
    }
}

/// Why a heat source could not produce a number for a requested level.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceFault {
    #[error("{kind} heat source produced a non-finite output ({value})")]
    NonFinite { kind: &'static str, value: f64 },
    #[error("{kind} heat source is unavailable: {reason}")]
    Unavailable {
        kind: &'static str,
        reason: &'static str,
    },
}

/// Returns `value` if it is finite.
pub fn check_finite(quantity: &'static str, value: f64) -> Result<f64, ThermalFault> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ThermalFault::Numeric { quantity, value })
    }
}

/// Returns `value` if it is finite and within `±bound`.
pub fn check_bounded(quantity: &'static str, value: f64, bound: f64) -> Result<f64, ThermalFault> {
    let value = check_finite(quantity, value)?;
    if value.abs() > bound {
        Err(ThermalFault::Range {
            quantity,
            value,
            bound,
        })
    } else {
        Ok(value)
    }
}

/// Per-building fault recorder with per-key rate limiting.
///
/// Rate limiting is expressed in simulation ticks so that runs stay
/// reproducible regardless of wall-clock speed.
#[derive(Debug, Clone)]
pub struct FaultLog {
    owner: String,
    interval_ticks: u64,
    tick: u64,
    last_logged: HashMap<&'static str, u64>,
    count: u64,
}

impl FaultLog {
    pub fn new(owner: &str, interval_ticks: u64) -> Self {
        Self {
            owner: owner.to_string(),
            interval_ticks,
            tick: 0,
            last_logged: HashMap::new(),
            count: 0,
        }
    }

    /// Advances the internal tick counter.
    pub fn tick(&mut self) {
        self.tick += 1;
    }

    /// Total number of faults recorded so far, logged or suppressed.
    pub fn count(&self) -> u64 {
        self.count
    }

    fn should_emit(&mut self, key: &'static str) -> bool {
        match self.last_logged.get(key) {
            Some(&last) if self.tick.saturating_sub(last) < self.interval_ticks => false,
            _ => {
                self.last_logged.insert(key, self.tick);
                true
            }
        }
    }

    /// Records a fault and logs it unless the same key was logged recently.
    pub fn record(&mut self, fault: &ThermalFault) {
        self.count += 1;
        if !self.should_emit(fault.quantity()) {
            return;
        }
        match fault {
            ThermalFault::Numeric { .. } => log::error!("{}: {fault}", self.owner),
            ThermalFault::Range { .. } => log::warn!("{}: {fault}", self.owner),
            ThermalFault::Capacity { .. } => log::debug!("{}: {fault}", self.owner),
        }
    }

    /// Records a heat source fault.
    pub fn record_source(&mut self, fault: &SourceFault) {
        let key = match fault {
            SourceFault::NonFinite { kind, .. } => *kind,
            // Unavailability (night, empty tank) is routine; not counted.
            SourceFault::Unavailable { .. } => return,
        };
        self.count += 1;
        if self.should_emit(key) {
            log::error!("{}: {fault}", self.owner);
        }
    }

    /// Logs a rate-limited warning that is not a fault (e.g. unmet demand).
    pub fn warn(&mut self, key: &'static str, message: std::fmt::Arguments<'_>) {
        if self.should_emit(key) {
            log::warn!("{}: {message}", self.owner);
        }
    }

    /// Unwraps a checked value, falling back to `fallback` and recording the fault.
    pub fn recover(&mut self, checked: Result<f64, ThermalFault>, fallback: f64) -> f64 {
        match checked {
            Ok(v) => v,
            Err(fault) => {
                self.record(&fault);
                fallback
            }
        }
    }

    /// Checks `value` against `±bound` and clamps it into range on failure.
    ///
    /// Non-finite values become `0.0`.
    pub fn clamp_bounded(&mut self, quantity: &'static str, value: f64, bound: f64) -> f64 {
        let fallback = if value.is_finite() {
            value.clamp(-bound, bound)
        } else {
            0.0
        };
        self.recover(check_bounded(quantity, value, bound), fallback)
    }

    /// Replaces a non-finite value with `fallback`.
    pub fn finite_or(&mut self, quantity: &'static str, value: f64, fallback: f64) -> f64 {
        self.recover(check_finite(quantity, value), fallback)
    }
}
