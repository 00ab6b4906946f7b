use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::ConfigError;

/// Bytes in one 24-bit stereo frame, the largest frame the decoder reads
const MAX_FRAME_BYTES: usize = 6;

/// Engine tuning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Stream buffer capacity in bytes
    pub read_buffer_size: usize,
    /// Unread-byte watermark below which the stream buffer refills
    pub refill_threshold: usize,
    /// Frames per hardware output buffer
    pub output_frames: usize,
    /// Number of output buffers in the pool
    pub output_buffers: usize,
    /// Volume index applied at startup (0..=100)
    pub initial_volume: u8,
    /// Maximum level meter fall per tick
    pub level_fall_step: f32,
    /// Tick cadence sample rate used before a file provides its own
    pub sample_rate: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 32768,
            refill_threshold: 16384,
            output_frames: 1152,
            output_buffers: 3,
            initial_volume: 65,
            level_fall_step: 0.02,
            sample_rate: 44100,
        }
    }
}

impl EngineConfig {
    /// Check the parameters are mutually consistent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_buffer_size < MAX_FRAME_BYTES {
            return Err(ConfigError::Invalid(format!(
                "read_buffer_size {} cannot hold a single frame",
                self.read_buffer_size
            )));
        }
        if self.refill_threshold > self.read_buffer_size {
            return Err(ConfigError::Invalid(format!(
                "refill_threshold {} exceeds read_buffer_size {}",
                self.refill_threshold, self.read_buffer_size
            )));
        }
        // below one frame a partially buffered frame never triggers a refill
        if self.refill_threshold < MAX_FRAME_BYTES {
            return Err(ConfigError::Invalid(format!(
                "refill_threshold {} is smaller than one frame ({} bytes)",
                self.refill_threshold, MAX_FRAME_BYTES
            )));
        }
        if self.output_frames == 0 || self.output_buffers == 0 {
            return Err(ConfigError::Invalid(
                "output_frames and output_buffers must be non-zero".to_string(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be non-zero".to_string()));
        }
        if !(self.level_fall_step > 0.0 && self.level_fall_step <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "level_fall_step {} must be within (0, 1]",
                self.level_fall_step
            )));
        }
        Ok(())
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    config: EngineConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load from the default location, falling back to defaults
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        Self::with_path(config_path)
    }

    /// Load from an explicit file path
    pub fn with_path(config_path: PathBuf) -> Result<Self, ConfigError> {
        let config = Self::load_config(&config_path)?;
        config.validate()?;
        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn get_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn update_config<F>(&mut self, updater: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut EngineConfig),
    {
        let mut updated = self.config.clone();
        updater(&mut updated);
        updated.validate()?;
        self.config = updated;
        self.save_config()
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.config = EngineConfig::default();
        self.save_config()
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::home_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(".config")
            .join("pcm-engine");
        Ok(config_dir.join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
        if !path.exists() {
            return Ok(EngineConfig::default());
        }

        let config_content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&config_content)?;
        Ok(config)
    }

    fn save_config(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config_content = toml::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, config_content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let config_manager = ConfigManager::with_path(config_path).unwrap();
        (config_manager, temp_dir)
    }

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();

        assert_eq!(config.read_buffer_size, 32768);
        assert_eq!(config.refill_threshold, 16384);
        assert_eq!(config.output_frames, 1152);
        assert_eq!(config.initial_volume, 65);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "initial_volume = 40\n").unwrap();

        let manager = ConfigManager::with_path(config_path).unwrap();
        assert_eq!(manager.get_config().initial_volume, 40);
        assert_eq!(manager.get_config().output_frames, 1152);
    }

    #[test]
    fn test_load_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        fs::write(&config_path, "invalid toml content [[[").unwrap();

        match ConfigManager::with_path(config_path) {
            Err(ConfigError::DeserializationError(_)) => {}
            other => panic!("Expected DeserializationError, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_threshold_above_capacity_rejected() {
        let config = EngineConfig {
            read_buffer_size: 1024,
            refill_threshold: 2048,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_threshold_below_one_frame_rejected() {
        for refill_threshold in [0, 5] {
            let config = EngineConfig {
                refill_threshold,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }

        let config = EngineConfig {
            refill_threshold: 6,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_file_rejected_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "refill_threshold = 0\n").unwrap();
        assert!(matches!(
            ConfigManager::with_path(config_path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_fall_step_bounds() {
        let mut config = EngineConfig::default();
        config.level_fall_step = 0.0;
        assert!(config.validate().is_err());
        config.level_fall_step = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_update_config_persists() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        config_manager
            .update_config(|config| {
                config.output_frames = 576;
                config.initial_volume = 80;
            })
            .unwrap();

        let loaded = ConfigManager::load_config(config_manager.config_path()).unwrap();
        assert_eq!(loaded.output_frames, 576);
        assert_eq!(loaded.initial_volume, 80);
    }

    #[test]
    fn test_update_config_rejects_invalid() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();

        let result = config_manager.update_config(|config| config.output_buffers = 0);
        assert!(result.is_err());
        assert_eq!(config_manager.get_config().output_buffers, 3);
    }

    #[test]
    fn test_reset_to_defaults() {
        let (mut config_manager, _temp_dir) = create_test_config_manager();
        config_manager
            .update_config(|config| config.read_buffer_size = 8192)
            .unwrap();

        config_manager.reset_to_defaults().unwrap();
        assert_eq!(config_manager.get_config(), &EngineConfig::default());
    }

    #[test]
    fn test_toml_format() {
        let toml_string = toml::to_string_pretty(&EngineConfig::default()).unwrap();

        assert!(toml_string.contains("read_buffer_size = 32768"));
        assert!(toml_string.contains("refill_threshold"));
        assert!(toml_string.contains("level_fall_step"));
    }
}
