//! Engine output layout and result reconciliation.
//!
//! The engine writes its stems to `<output_dir>/<model>/<input base name>/`.
//! Which files appear there depends on the mode:
//!
//! - full mode: `vocals`, `drums`, `bass`, `other`
//! - reduced mode (target `T`): `T` and the complement `no_T`
//!
//! [`OutputLayout`] names the artifacts to expect and [`reconcile`] folds
//! the published references back into a four-stem [`StemReferences`],
//! replicating the complement under every non-target key in reduced mode.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::audio::AudioFormat;
use crate::job::StemReferences;
use crate::models::SeparationModel;
use crate::request::SeparationRequest;
use crate::stems::Stem;

/// What a single engine output file represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactRole {
    /// An isolated canonical stem.
    Stem(Stem),
    /// Everything except the given target, mixed together.
    Complement(Stem),
}

impl ArtifactRole {
    /// File name without extension, as the engine writes it.
    pub fn file_stem(self) -> String {
        match self {
            Self::Stem(stem) => stem.as_str().to_string(),
            Self::Complement(target) => target.complement_name(),
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_stem())
    }
}

/// An artifact the engine is expected to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedArtifact {
    pub role: ArtifactRole,
    pub path: PathBuf,
}

/// Output layout for one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    Full,
    Reduced { target: Stem },
}

impl OutputLayout {
    pub fn for_request(request: &SeparationRequest) -> Self {
        match request.reduction_target {
            Some(target) => Self::Reduced { target },
            None => Self::Full,
        }
    }

    /// Roles the engine must produce for the result to be valid.
    pub fn expected_roles(self) -> Vec<ArtifactRole> {
        match self {
            Self::Full => Stem::ALL.into_iter().map(ArtifactRole::Stem).collect(),
            Self::Reduced { target } => {
                vec![ArtifactRole::Stem(target), ArtifactRole::Complement(target)]
            }
        }
    }

    /// Directory the engine writes this input's stems into.
    pub fn track_dir(output_dir: &Path, model: SeparationModel, input_path: &Path) -> PathBuf {
        let track_name = input_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        output_dir.join(model.id()).join(track_name)
    }

    /// Full paths of every artifact this layout expects under `track_dir`.
    pub fn expected_artifacts(self, track_dir: &Path, format: AudioFormat) -> Vec<ExpectedArtifact> {
        self.expected_roles()
            .into_iter()
            .map(|role| ExpectedArtifact {
                role,
                path: track_dir.join(format!("{}.{}", role.file_stem(), format.extension())),
            })
            .collect()
    }
}

/// Artifacts a layout required but that were not produced or published.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing stems: {}", .0.join(", "))]
pub struct MissingStems(pub Vec<String>);

/// Fold published references into the uniform four-stem result.
///
/// `published` pairs each artifact role with its public reference. Roles the
/// layout does not ask for are ignored. Any role the layout requires but
/// `published` lacks yields [`MissingStems`] naming it.
pub fn reconcile(
    layout: OutputLayout,
    published: &[(ArtifactRole, String)],
) -> Result<StemReferences, MissingStems> {
    let lookup = |role: ArtifactRole| {
        published
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, reference)| reference.clone())
    };

    let missing: Vec<String> = layout
        .expected_roles()
        .into_iter()
        .filter(|role| lookup(*role).is_none())
        .map(ArtifactRole::file_stem)
        .collect();
    if !missing.is_empty() {
        return Err(MissingStems(missing));
    }

    let result = match layout {
        OutputLayout::Full => {
            StemReferences::from_fn(|stem| lookup(ArtifactRole::Stem(stem)).unwrap_or_default())
        }
        OutputLayout::Reduced { target } => {
            let isolated = lookup(ArtifactRole::Stem(target)).unwrap_or_default();
            let complement = lookup(ArtifactRole::Complement(target)).unwrap_or_default();
            StemReferences::from_fn(|stem| {
                if stem == target {
                    isolated.clone()
                } else {
                    complement.clone()
                }
            })
        }
    };

    Ok(result)
}
