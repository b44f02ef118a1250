//! Associator configuration.
//!
//! Controls which subsystems are associated, which simulated-hit collections
//! are read and how strict the strip charge-fraction cut is.

use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrkError};

/// Simulated-hit collections read when no list is configured.
pub const DEFAULT_ROU_LIST: [&str; 12] = [
    "TrackerHitsTIBLowTof",
    "TrackerHitsTIBHighTof",
    "TrackerHitsTIDLowTof",
    "TrackerHitsTIDHighTof",
    "TrackerHitsTOBLowTof",
    "TrackerHitsTOBHighTof",
    "TrackerHitsTECLowTof",
    "TrackerHitsTECHighTof",
    "TrackerHitsPixelBarrelLowTof",
    "TrackerHitsPixelBarrelHighTof",
    "TrackerHitsPixelEndcapLowTof",
    "TrackerHitsPixelEndcapHighTof",
];

pub const DEFAULT_STRIP_LINK_LABEL: &str = "siStripDigis";
pub const DEFAULT_PIXEL_LINK_LABEL: &str = "siPixelDigis";

/// Minimum charge fraction (exclusive) a track needs on a strip cluster.
pub const DEFAULT_CHARGE_FRACTION_CUT: f32 = 0.5;

/// Configuration of a `TrackerHitAssociator`.
///
/// Missing fields in a config file take their default value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociatorConfig {
    pub associate_strip: bool,
    pub associate_pixel: bool,

    // Simulated-hit collection labels
    pub rou_list: Vec<String>,

    // Digi-sim link product labels
    pub strip_link_label: String,
    pub pixel_link_label: String,

    // Strict lower bound on a track's share of the strip cluster charge
    pub charge_fraction_cut: f32,

    // |PDG id| values whose sim hits are dropped from associated hits
    pub excluded_pdg_ids: Vec<i32>,
}

impl Default for AssociatorConfig {
    fn default() -> Self {
        Self {
            associate_strip: true,
            associate_pixel: true,
            rou_list: DEFAULT_ROU_LIST.iter().map(|s| s.to_string()).collect(),
            strip_link_label: DEFAULT_STRIP_LINK_LABEL.to_string(),
            pixel_link_label: DEFAULT_PIXEL_LINK_LABEL.to_string(),
            charge_fraction_cut: DEFAULT_CHARGE_FRACTION_CUT,
            excluded_pdg_ids: Vec::new(),
        }
    }
}

impl AssociatorConfig {
    /// Associate strip hits only.
    pub fn strip_only() -> Self {
        Self {
            associate_pixel: false,
            ..Self::default()
        }
    }

    /// Associate pixel hits only.
    pub fn pixel_only() -> Self {
        Self {
            associate_strip: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.charge_fraction_cut) {
            return Err(TrkError::Config(format!(
                "charge_fraction_cut must be within [0, 1), got {}",
                self.charge_fraction_cut
            )));
        }
        if !self.associate_strip && !self.associate_pixel {
            return Err(TrkError::Config(
                "at least one of associate_strip and associate_pixel must be set".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AssociatorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AssociatorConfig::default();
        assert!(config.associate_strip && config.associate_pixel);
        assert_eq!(config.rou_list.len(), 12);
        assert_eq!(config.strip_link_label, "siStripDigis");
        assert_eq!(config.pixel_link_label, "siPixelDigis");
        assert!(config.charge_fraction_cut == 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        assert!(!AssociatorConfig::strip_only().associate_pixel);
        assert!(AssociatorConfig::strip_only().associate_strip);
        assert!(!AssociatorConfig::pixel_only().associate_strip);
        assert!(AssociatorConfig::pixel_only().associate_pixel);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AssociatorConfig::from_json_str(
            r#"{"associate_pixel": false, "rou_list": ["TrackerHitsTOBLowTof"]}"#,
        )
        .unwrap();
        assert!(config.associate_strip);
        assert!(!config.associate_pixel);
        assert_eq!(config.rou_list, vec!["TrackerHitsTOBLowTof".to_string()]);
        assert!(config.charge_fraction_cut == 0.5);
    }

    #[test]
    fn test_validation_rejects_bad_configs() {
        let mut config = AssociatorConfig::default();
        config.charge_fraction_cut = 1.0;
        assert!(matches!(config.validate(), Err(TrkError::Config(_))));

        let config = AssociatorConfig {
            associate_strip: false,
            associate_pixel: false,
            ..AssociatorConfig::default()
        };
        assert!(config.validate().is_err());

        assert!(matches!(
            AssociatorConfig::from_json_str(r#"{"charge_fraction_cut": -0.1}"#),
            Err(TrkError::Config(_))
        ));
        assert!(matches!(AssociatorConfig::from_json_str("not json"), Err(TrkError::Json(_))));
    }
}
