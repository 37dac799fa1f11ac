// src/config.rs

use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        let config: Config =
            serde_yaml::from_str(&contents).with_context(|| format!("parsing {path}"))?;
        Ok(config)
    }

    /// Load `path` when it exists, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.pipeline.noise_threshold_seconds, 60.0);
        assert!(config.pipeline.consolidate_self_transitions);
        assert_eq!(config.shift.day_start, "08:00");
        assert_eq!(config.shift.night_start, "20:00");
        assert_eq!(config.zones.speed_threshold_kmh, 5.0);
        assert_eq!(config.zones.min_episode_minutes, 10.0);
        assert_eq!(config.zones.clustering_radius_m, 10.0);
        assert_eq!(config.travel.min_travel_seconds, 30.0);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "pipeline:\n  noise_threshold_seconds: 45.0\n  consolidate_self_transitions: false\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.pipeline.noise_threshold_seconds, 45.0);
        assert!(!config.pipeline.consolidate_self_transitions);
        // Untouched sections keep their defaults
        assert_eq!(config.shift.day_start, "08:00");
        assert_eq!(config.zones.min_episode_points, 3);
    }
}
