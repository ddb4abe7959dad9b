//! Extraction tunables.
//!
//! A plain struct with a [`Default`] impl carrying sensible defaults, plus
//! optional on-disk JSON persistence of the numeric knobs. Unlike an
//! app-level config, this crate has no opinion on *where* a config file
//! lives; callers supply the path.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Root directory containing `survivors/`, `hunters/`, and legacy
    /// top-level template PNGs. Required: there is no sane default.
    pub templates_path: std::path::PathBuf,

    pub ocr_timeout_seconds: u64,
    pub match_threshold: f32,
    pub ambiguity_margin: f32,
    pub aspect_tolerance: f64,
    pub position_tolerance: f64,

    /// Map names recognized by step 4 of [`crate::match_parser::MatchParser`].
    /// Plain strings consumed as-is; the core has no opinion on their source.
    #[serde(default)]
    pub map_names: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            templates_path: std::path::PathBuf::new(),
            ocr_timeout_seconds: 60,
            match_threshold: 0.40,
            ambiguity_margin: 0.05,
            aspect_tolerance: 0.05,
            position_tolerance: 0.01,
            map_names: Vec::new(),
        }
    }
}

impl ExtractorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let cfg = serde_json::from_slice(&bytes)?;
        Ok(cfg)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = ExtractorConfig::default();
        assert_eq!(cfg.ocr_timeout_seconds, 60);
        assert_eq!(cfg.match_threshold, 0.40);
        assert_eq!(cfg.ambiguity_margin, 0.05);
        assert_eq!(cfg.aspect_tolerance, 0.05);
        assert_eq!(cfg.position_tolerance, 0.01);
    }

    #[test]
    fn round_trips_through_json() {
        let mut cfg = ExtractorConfig::default();
        cfg.templates_path = "/tmp/templates".into();
        cfg.map_names = vec!["Asylum".to_string()];

        let dir = std::env::temp_dir().join("resultshot_config_test.json");
        cfg.save(&dir).unwrap();
        let loaded = ExtractorConfig::from_file(&dir).unwrap();
        assert_eq!(loaded, cfg);
        let _ = std::fs::remove_file(&dir);
    }
}
