use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Host configuration. The pad core itself takes no flags or files; device
/// path and bus wiring are strictly the orchestration layer's business.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    /// Kernel input device carrying the pad's event stream.
    pub device_path: PathBuf,
    /// Cadence of the actuation loop sampling the snapshot.
    pub poll_interval_ms: u64,
    pub drive: DriveConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct DriveConfig {
    pub i2c_bus: u8,
    pub pca9685_address: u16,
    pub pwm_frequency_hz: f64,
    // BCM numbering. Defaults match the deployed wiring on physical pins
    // 40/38/37/35.
    pub left_forward_pin: u8,
    pub left_reverse_pin: u8,
    pub right_forward_pin: u8,
    pub right_reverse_pin: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from("/dev/input/event0"),
            poll_interval_ms: 500,
            drive: DriveConfig::default(),
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            pca9685_address: 0x70,
            pwm_frequency_hz: 60.0,
            left_forward_pin: 21,
            left_reverse_pin: 20,
            right_forward_pin: 26,
            right_reverse_pin: 19,
        }
    }
}

impl Config {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("roverpad").join("config.toml"))
    }

    /// Loads the config file if one exists, defaults otherwise. A malformed
    /// file is an error; an absent one is not.
    pub fn load() -> Result<Self, ConfigError> {
        let Some(path) = Self::config_path() else {
            warn!("No config directory available, using default configuration");
            return Ok(Self::default());
        };

        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        debug!("Loading configuration from {}", path.display());
        let contents = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&contents)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deployed_wiring() {
        let config = Config::default();
        assert_eq!(config.device_path, PathBuf::from("/dev/input/event0"));
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.drive.i2c_bus, 1);
        assert_eq!(config.drive.pca9685_address, 0x70);
    }

    #[test]
    fn partial_files_fall_back_to_defaults_per_field() {
        let config: Config = toml::from_str(
            r#"
            poll_interval_ms = 250

            [drive]
            pca9685_address = 0x41
            "#,
        )
        .unwrap();
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.drive.pca9685_address, 0x41);
        assert_eq!(config.drive.i2c_bus, 1);
        assert_eq!(config.device_path, PathBuf::from("/dev/input/event0"));
    }
}
