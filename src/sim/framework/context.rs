use anyhow::Result;

use crate::sim::thermal::config::ThermalConfig;

use super::Bus;

/// Shared read-only context passed to simulation modules.
///
/// Per-building state lives inside the modules themselves (keyed by
/// `BuildingUid`); the context only carries what every module agrees on.
pub struct SimContext<'a> {
    pub config: &'a ThermalConfig,
    /// Simulated time covered by one pipeline step [millisols].
    pub millisols_per_step: f64,
}

impl<'a> SimContext<'a> {
    pub fn new(config: &'a ThermalConfig, millisols_per_step: f64) -> Self {
        Self {
            config,
            millisols_per_step,
        }
    }

    /// Reads a payload that an upstream module must have published.
    pub fn require<'b, T: 'static>(&self, bus: &'b Bus, consumer: &str) -> Result<&'b T> {
        match bus.get::<T>() {
            Some(v) => Ok(v),
            None => anyhow::bail!(
                "{consumer} requires {} on the Bus",
                std::any::type_name::<T>()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_reports_missing_payload() {
        let cfg = ThermalConfig::default();
        let ctx = SimContext::new(&cfg, 1.0);
        let mut bus = Bus::new();
        let err = ctx.require::<u8>(&bus, "probe").unwrap_err();
        assert!(err.to_string().contains("probe requires u8"));

        bus.put(7_u8);
        assert_eq!(*ctx.require::<u8>(&bus, "probe").unwrap(), 7);
    }
}
