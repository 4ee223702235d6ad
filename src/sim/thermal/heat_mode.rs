use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete output setpoint of a heat source.
///
/// `Offline` means the source is switched off; `Level0` means it is available
/// but asked for nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeatMode {
    Offline,
    Level0,
    Level12,
    Level25,
    Level37,
    Level50,
    Level62,
    Level75,
    Level87,
    Level100,
}

impl HeatMode {
    /// All selectable levels, ascending. `Offline` is not a level.
    pub const LEVELS: [HeatMode; 9] = [
        HeatMode::Level0,
        HeatMode::Level12,
        HeatMode::Level25,
        HeatMode::Level37,
        HeatMode::Level50,
        HeatMode::Level62,
        HeatMode::Level75,
        HeatMode::Level87,
        HeatMode::Level100,
    ];

    /// Output percentage of this mode; `Offline` is 0.
    pub fn percentage(self) -> f64 {
        match self {
            Self::Offline | Self::Level0 => 0.0,
            Self::Level12 => 12.5,
            Self::Level25 => 25.0,
            Self::Level37 => 37.5,
            Self::Level50 => 50.0,
            Self::Level62 => 62.5,
            Self::Level75 => 75.0,
            Self::Level87 => 87.5,
            Self::Level100 => 100.0,
        }
    }

    pub fn is_offline(self) -> bool {
        self == Self::Offline
    }
}

impl fmt::Display for HeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => write!(f, "offline"),
            m => write!(f, "{}%", m.percentage()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ascending_in_steps_of_12_5() {
        for (i, mode) in HeatMode::LEVELS.iter().enumerate() {
            assert!((mode.percentage() - 12.5 * i as f64).abs() < 1e-12);
        }
        assert!(HeatMode::LEVELS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_offline_is_distinct_from_zero() {
        assert_ne!(HeatMode::Offline, HeatMode::Level0);
        assert_eq!(HeatMode::Offline.percentage(), HeatMode::Level0.percentage());
        assert!(!HeatMode::LEVELS.contains(&HeatMode::Offline));
        assert_eq!(HeatMode::Offline.to_string(), "offline");
        assert_eq!(HeatMode::Level37.to_string(), "37.5%");
    }
}
