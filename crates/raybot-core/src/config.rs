//! Application configuration.
//!
//! Configuration is read from a TOML file. Every section has defaults, so a
//! partial file (or no file at all) yields a usable configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default values.
pub mod defaults {
    pub const PIC_PORT: &str = "/dev/ttyUSB0";
    pub const ESP_PORT: &str = "/dev/ttyUSB1";
    pub const BAUD_RATE: u32 = 9600;
    pub const COMMAND_ACK_TIMEOUT_MS: u64 = 1000;
    pub const HEARTBEAT_INTERVAL_MS: u64 = 1000;
    pub const LOG_LEVEL: &str = "info";
}

/// Environment variable names.
pub mod env_vars {
    pub const LOG_JSON: &str = "RAYBOT_LOG_JSON";
    pub const LOG_LEVEL: &str = "RAYBOT_LOG_LEVEL";
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub hardware: HardwareConfig,
    pub cloud: CloudConfig,
    pub log: LogConfig,
}

/// Serial subsystems configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HardwareConfig {
    /// Motion, cargo and battery controller.
    pub pic: SerialConfig,
    /// Auxiliary controller.
    pub esp: SerialConfig,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            pic: SerialConfig::with_port(defaults::PIC_PORT),
            esp: SerialConfig::with_port(defaults::ESP_PORT),
        }
    }
}

/// One serial link to a microcontroller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Wait for an acknowledgment event after each write.
    pub enable_ack: bool,
    pub command_ack_timeout_ms: u64,
}

impl SerialConfig {
    fn with_port(port: &str) -> Self {
        Self {
            port: port.to_string(),
            ..Default::default()
        }
    }

    /// ACK tracking disabled, everything else default.
    pub fn without_ack() -> Self {
        Self {
            enable_ack: false,
            ..Default::default()
        }
    }

    /// ACK tracking enabled with the given timeout.
    pub fn with_ack_timeout(timeout: Duration) -> Self {
        Self {
            enable_ack: true,
            command_ack_timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            ..Default::default()
        }
    }

    pub fn command_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.command_ack_timeout_ms)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(Error::Validation(format!("{name}.port must not be empty")));
        }
        if self.baud_rate == 0 {
            return Err(Error::Validation(format!(
                "{name}.baud_rate must be greater than zero"
            )));
        }
        if self.enable_ack && self.command_ack_timeout_ms == 0 {
            return Err(Error::Validation(format!(
                "{name}.command_ack_timeout_ms must be greater than zero when ACK is enabled"
            )));
        }
        Ok(())
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: defaults::PIC_PORT.to_string(),
            baud_rate: defaults::BAUD_RATE,
            enable_ack: true,
            command_ack_timeout_ms: defaults::COMMAND_ACK_TIMEOUT_MS,
        }
    }
}

/// Cloud session settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CloudConfig {
    pub heartbeat_interval_ms: u64,
}

impl CloudConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: defaults::HEARTBEAT_INTERVAL_MS,
        }
    }
}

/// Logging settings, consumed by the binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Apply `RAYBOT_LOG_*` overrides from the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Some(json) = std::env::var(env_vars::LOG_JSON)
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.log.json = json;
        }
        if let Ok(level) = std::env::var(env_vars::LOG_LEVEL) {
            if !level.trim().is_empty() {
                self.log.level = level;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.hardware.pic.validate("hardware.pic")?;
        self.hardware.esp.validate("hardware.esp")?;
        if self.cloud.heartbeat_interval_ms == 0 {
            return Err(Error::Validation(
                "cloud.heartbeat_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hardware.pic.port, defaults::PIC_PORT);
        assert_eq!(config.hardware.esp.port, defaults::ESP_PORT);
        assert!(config.hardware.pic.enable_ack);
        assert_eq!(
            config.hardware.pic.command_ack_timeout(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_zero_timeout_allowed_without_ack() {
        let mut config = AppConfig::default();
        config.hardware.esp.enable_ack = false;
        config.hardware.esp.command_ack_timeout_ms = 0;
        assert!(config.validate().is_ok());

        config.hardware.esp.enable_ack = true;
        assert!(matches!(config.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_ack_timeout_saturates() {
        let config = SerialConfig::with_ack_timeout(Duration::from_millis(250));
        assert_eq!(config.command_ack_timeout_ms, 250);

        let config = SerialConfig::with_ack_timeout(Duration::MAX);
        assert_eq!(config.command_ack_timeout_ms, u64::MAX);
    }
}
