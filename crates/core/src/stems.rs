//! Canonical stem names.
//!
//! Every completed job reports exactly these four stems, whichever engine
//! mode produced them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Prefix the engine puts in front of the target name for the
/// "everything else" file in two-stem mode (`no_vocals`, `no_drums`, ...).
pub const COMPLEMENT_PREFIX: &str = "no_";

/// One of the four canonical stems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stem {
    Vocals,
    Drums,
    Bass,
    Other,
}

impl Stem {
    /// All canonical stems, in result order.
    pub const ALL: [Stem; 4] = [Stem::Vocals, Stem::Drums, Stem::Bass, Stem::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vocals => "vocals",
            Self::Drums => "drums",
            Self::Bass => "bass",
            Self::Other => "other",
        }
    }

    /// File stem of the complement artifact when `self` is the reduction target.
    pub fn complement_name(self) -> String {
        format!("{COMPLEMENT_PREFIX}{}", self.as_str())
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a canonical stem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown stem '{0}'")]
pub struct UnknownStem(pub String);

impl FromStr for Stem {
    type Err = UnknownStem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stem| stem.as_str() == s)
            .ok_or_else(|| UnknownStem(s.to_string()))
    }
}
