//! Demo configuration.
//!
//! Controls the simulated world the demo drives and the scheduler tunables.
//! Configuration can be loaded from and saved to a TOML file.

use ambience_common::{AmbienceResult, ConfigError};
use ambience_kernel::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "ambience.toml";

/// Demo configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    // === Run Settings ===
    /// Frames to simulate
    pub frames: u32,
    /// Pace frames at the scheduler frame rate instead of running flat out
    pub realtime: bool,
    /// RNG seed (None = random)
    pub seed: Option<u64>,

    // === World Settings ===
    /// Number of orbiting emitters
    pub emitters: u32,
    /// Orbit radius in world units
    pub orbit_radius: i32,
    /// Hearing radius of each emitter
    pub hearing_radius: i32,
    /// Half-width of the camera view in world units
    pub view_half_extent: f32,

    // === Event Settings ===
    /// Frames between an emitter switching sound (0 = never)
    pub swap_interval: u32,
    /// Frames between ducking toggles (0 = never)
    pub duck_interval: u32,
    /// Frames between simulated rollbacks (0 = never)
    pub rollback_interval: u32,
    /// Frames between menu pauses (0 = never)
    pub pause_interval: u32,
    /// Length of each menu pause in frames
    pub pause_length: u32,

    // === Scheduler ===
    /// Scheduler tunables
    pub scheduler: SchedulerConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            // Run
            frames: 600,
            realtime: false,
            seed: None,

            // World
            emitters: 6,
            orbit_radius: 400,
            hearing_radius: 600,
            view_half_extent: 320.0,

            // Events
            swap_interval: 150,
            duck_interval: 240,
            rollback_interval: 300,
            pause_interval: 0,
            pause_length: 30,

            scheduler: SchedulerConfig::default(),
        }
    }
}

impl DemoConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let mut contents = String::new();
        if let Err(e) = fs::File::open(path).and_then(|mut f| f.read_to_string(&mut contents)) {
            warn!("Failed to read config file: {e}");
            return Self::default();
        }

        match Self::parse(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("{e}; using defaults");
                Self::default()
            },
        }
    }

    /// Parse and validate TOML text.
    pub fn parse(contents: &str) -> AmbienceResult<Self> {
        let mut config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate();
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> AmbienceResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.emitters = self.emitters.clamp(1, 64);
        self.orbit_radius = self.orbit_radius.clamp(0, 100_000);
        self.hearing_radius = self.hearing_radius.clamp(1, 100_000);
        if !self.view_half_extent.is_finite() {
            self.view_half_extent = Self::default().view_half_extent;
        }
        self.view_half_extent = self.view_half_extent.clamp(1.0, 100_000.0);
        self.pause_length = self.pause_length.max(1);
        self.scheduler.validate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = DemoConfig::default();
        assert_eq!(config.frames, 600);
        assert_eq!(config.emitters, 6);
        assert_eq!(config.scheduler.expire_frames, 60);
    }

    #[test]
    fn test_config_validation() {
        let mut config = DemoConfig::default();
        config.emitters = 0;
        config.hearing_radius = -5;
        config.scheduler.duck_floor = 3.0;

        config.validate();

        assert_eq!(config.emitters, 1);
        assert_eq!(config.hearing_radius, 1);
        assert!((config.scheduler.duck_floor - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join(CONFIG_FILE);

        let mut config = DemoConfig::default();
        config.frames = 42;
        config.seed = Some(7);
        config.scheduler.expire_frames = 30;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = DemoConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = DemoConfig::load_from("/nonexistent/path/ambience.toml");
        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn test_config_load_invalid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "frames = \"lots\"").expect("Failed to write");

        assert_eq!(DemoConfig::load_from(&config_path), DemoConfig::default());
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let err = DemoConfig::parse("emitters = [").expect_err("should not parse");
        assert!(matches!(err, ambience_common::AmbienceError::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = DemoConfig::parse(
            r"
            frames = 10

            [scheduler]
            effect_volume = 0.5
            ",
        )
        .expect("Failed to parse");

        assert_eq!(config.frames, 10);
        assert_eq!(config.emitters, 6);
        assert!((config.scheduler.effect_volume - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.scheduler.expire_frames, 60);
    }

    #[test]
    fn test_nan_values_fall_back_to_defaults() {
        let mut config = DemoConfig::parse(
            r"
            view_half_extent = nan
            duck_interval = 1

            [scheduler]
            duck_floor = nan
            ",
        )
        .expect("Failed to parse");

        let defaults = DemoConfig::default();
        assert!((config.view_half_extent - defaults.view_half_extent).abs() < f32::EPSILON);
        assert!((config.scheduler.duck_floor - defaults.scheduler.duck_floor).abs() < f32::EPSILON);

        config.seed = Some(3);
        let mut scheduler = ambience_kernel::AmbientScheduler::new(config.scheduler.clone());
        let mut backend = ambience_kernel::VirtualBackend::new();
        let mut sim = crate::sim::Simulation::new(config, vec![ambience_common::SoundId::new(1)]);
        for _ in 0..5 {
            sim.step(&mut scheduler, &mut backend);
        }
        assert!(scheduler.duck_fade().is_finite());
    }
}
