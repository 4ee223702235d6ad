use anyhow::Result;

use super::{Bus, SimContext};

/// A composable simulation module.
///
/// The thermal core, the outdoor environment and any recorder run as separate
/// modules that only talk through the [`Bus`].
pub trait SimModule {
    /// Human-readable identifier for debugging / telemetry.
    fn name(&self) -> &'static str;

    /// Optional one-time initialization hook.
    fn init(&mut self, _ctx: &SimContext, _bus: &mut Bus) -> Result<()> {
        Ok(())
    }

    /// Advances the module by one step.
    fn step(&mut self, ctx: &SimContext, bus: &mut Bus) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::thermal::config::ThermalConfig;

    struct Dummy;
    impl SimModule for Dummy {
        fn name(&self) -> &'static str {
            "dummy"
        }

        fn step(&mut self, _ctx: &SimContext, bus: &mut Bus) -> Result<()> {
            bus.put(42_u32);
            Ok(())
        }
    }

    #[test]
    fn test_default_init_is_ok() {
        let cfg = ThermalConfig::default();
        let ctx = SimContext::new(&cfg, 1.0);

        let mut bus = Bus::new();
        let mut m = Dummy;

        m.init(&ctx, &mut bus).unwrap();
        m.step(&ctx, &mut bus).unwrap();
        assert_eq!(bus.get::<u32>(), Some(&42));
    }
}
