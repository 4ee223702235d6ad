use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a building inside a settlement.
///
/// Bus payloads and cross-module lookups are keyed by this rather than by
/// building names, which players may rename.
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingUid(Uuid);

impl BuildingUid {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let uuid = Uuid::parse_str(text)
            .map_err(|e| anyhow::anyhow!("Invalid building uid '{text}': {e}"))?;
        Ok(Self(uuid))
    }

    /// First block of the uuid, enough to tell buildings apart in logs.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for BuildingUid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BuildingUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
