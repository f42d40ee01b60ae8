//! Supported separation models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A pretrained Demucs model the engine can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeparationModel {
    #[serde(rename = "htdemucs")]
    Htdemucs,
    #[serde(rename = "htdemucs_ft")]
    HtdemucsFt,
    #[serde(rename = "mdx_extra")]
    MdxExtra,
    #[serde(rename = "mdx_q")]
    MdxQ,
}

impl SeparationModel {
    /// Every supported model, in the order `GET /models` lists them.
    pub const ALL: [SeparationModel; 4] = [
        SeparationModel::Htdemucs,
        SeparationModel::HtdemucsFt,
        SeparationModel::MdxExtra,
        SeparationModel::MdxQ,
    ];

    /// Identifier passed to the engine (`-n <id>`) and used as the first
    /// path segment of its output layout.
    pub fn id(self) -> &'static str {
        match self {
            Self::Htdemucs => "htdemucs",
            Self::HtdemucsFt => "htdemucs_ft",
            Self::MdxExtra => "mdx_extra",
            Self::MdxQ => "mdx_q",
        }
    }

    pub fn all_ids() -> Vec<&'static str> {
        Self::ALL.iter().map(|m| m.id()).collect()
    }
}

impl Default for SeparationModel {
    fn default() -> Self {
        Self::Htdemucs
    }
}

impl fmt::Display for SeparationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown model '{0}'")]
pub struct UnknownModel(pub String);

impl FromStr for SeparationModel {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.id() == s)
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_htdemucs() {
        assert_eq!(SeparationModel::default().id(), "htdemucs");
    }

    #[test]
    fn ids_round_trip_through_from_str() {
        for model in SeparationModel::ALL {
            assert_eq!(model.id().parse::<SeparationModel>(), Ok(model));
        }
    }

    #[test]
    fn unknown_model_is_rejected() {
        assert_eq!(
            "demucs_v1".parse::<SeparationModel>(),
            Err(UnknownModel("demucs_v1".into()))
        );
    }

    #[test]
    fn serde_uses_engine_ids() {
        let json = serde_json::to_value(SeparationModel::ALL).unwrap();
        assert_eq!(
            json,
            serde_json::json!(["htdemucs", "htdemucs_ft", "mdx_extra", "mdx_q"])
        );
    }
}
