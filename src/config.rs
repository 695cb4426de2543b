//! Workflow configuration files.
//!
//! A [`WorkflowConfig`] gathers every tunable of the workflows in one
//! serializable struct, so it can be read from TOML. Missing keys take their
//! defaults.
//!
//! ```toml
//! sharp_angle = 0.523599
//! ratio = 0.4
//! normals = { weighted = "angle" }
//! mark_seams = true
//!
//! [bevel]
//! width = 0.05
//! segments = 3
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::algo::classify::ClassifyOptions;
use crate::algo::weights::{WeightSource, DEFAULT_SHARP_ANGLE};
use crate::error::{MeshError, Result};
use crate::workflow::{BevelParams, NormalMode, WorkflowOptions};

/// Default classification ratio.
pub const DEFAULT_RATIO: f64 = 0.5;

/// Serializable settings for both workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Dihedral threshold in radians for angle-based weights.
    pub sharp_angle: f64,
    /// Area ratio for tag-less classification.
    pub ratio: f64,
    /// Normal synthesis mode.
    pub normals: NormalMode,
    /// Weighted mode only: restrict to selected faces.
    pub selected_only: bool,
    /// Mark weighted edges as seams.
    pub mark_seams: bool,
    /// Triangulate generated n-gons.
    pub fix_ngons: bool,
    /// Use parallel per-face computation.
    pub parallel: bool,
    /// Generator parameters.
    pub bevel: BevelParams,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            sharp_angle: DEFAULT_SHARP_ANGLE,
            ratio: DEFAULT_RATIO,
            normals: NormalMode::default(),
            selected_only: false,
            mark_seams: false,
            fix_ngons: true,
            parallel: true,
            bevel: BevelParams::default(),
        }
    }
}

impl WorkflowConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| MeshError::Config {
            message: e.to_string(),
        })
    }

    /// Read and parse a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| MeshError::Config {
            message: e.to_string(),
        })
    }

    /// Classifier options.
    pub fn classify_options(&self) -> ClassifyOptions {
        ClassifyOptions::default().with_ratio(self.ratio)
    }

    /// Workflow options.
    pub fn workflow_options(&self) -> WorkflowOptions {
        WorkflowOptions::default()
            .with_normals(self.normals)
            .with_seams(self.mark_seams)
            .with_ngon_fix(self.fix_ngons)
            .selected_only(self.selected_only)
            .with_params(self.bevel.clone())
            .with_parallel(self.parallel)
    }

    /// Angle-based weight source using the configured threshold.
    pub fn angle_source(&self) -> WeightSource {
        WeightSource::Angle(self.sharp_angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::normals::WeightMode;
    use crate::workflow::OffsetType;

    #[test]
    fn test_empty_document_is_default() {
        let config = WorkflowConfig::from_toml_str("").unwrap();
        assert_eq!(config, WorkflowConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = WorkflowConfig::from_toml_str(
            r#"
            ratio = 0.25
            normals = { weighted = "angle" }
            mark_seams = true
            fix_ngons = false

            [bevel]
            segments = 3
            offset_type = "percent"
            "#,
        )
        .unwrap();

        assert_eq!(config.ratio, 0.25);
        assert_eq!(config.normals, NormalMode::Weighted(WeightMode::Angle));
        assert!(config.mark_seams);
        assert_eq!(config.bevel.segments, 3);
        assert_eq!(config.bevel.offset_type, OffsetType::Percent);
        assert_eq!(config.bevel.width, 0.02);
        assert_eq!(config.sharp_angle, DEFAULT_SHARP_ANGLE);

        let options = config.workflow_options();
        assert!(options.mark_seams);
        assert!(!options.fix_ngons);
        assert_eq!(options.params.segments, 3);
        assert_eq!(config.classify_options().ratio, 0.25);
    }

    #[test]
    fn test_face_copy_mode_string() {
        let config = WorkflowConfig::from_toml_str(r#"normals = "facecopy""#).unwrap();
        assert_eq!(config.normals, NormalMode::FaceCopy);
    }

    #[test]
    fn test_rejects_unknown_mode() {
        let err = WorkflowConfig::from_toml_str(r#"normals = "smooth""#).unwrap_err();
        assert!(matches!(err, MeshError::Config { .. }));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = WorkflowConfig::default();
        config.ratio = 0.3;
        config.bevel.segments = 4;
        let text = config.to_toml_string().unwrap();
        assert_eq!(WorkflowConfig::from_toml_str(&text).unwrap(), config);
    }
}
