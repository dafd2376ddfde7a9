//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and key is optional; missing values fall back to the
//! defaults below.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::bms::protocol::{BmsMessage, FrameIds};
use crate::error::{BmsError, Result};

/// Largest 29-bit extended CAN identifier
const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub bms: FrameIds,
    pub report: ReportConfig,
}

/// Serial CAN adapter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Periodic state report configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_report_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_report_format")]
    pub format: String,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_report_interval_ms(),
            format: default_report_format(),
        }
    }
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_report_interval_ms() -> u64 { 1000 }
fn default_report_format() -> String { "text".to_string() }

const VALID_BAUD_RATES: [u32; 10] = [
    9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600, 1000000, 2000000,
];

fn invalid(message: impl std::fmt::Display) -> BmsError {
    BmsError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bms_can_monitor::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !VALID_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {:?}",
                VALID_BAUD_RATES
            )));
        }

        if self.serial.reconnect_interval_ms == 0 || self.serial.reconnect_interval_ms > 60000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        for message in BmsMessage::ALL {
            let id = self.bms.id_of(message);
            if id > MAX_EXTENDED_ID {
                return Err(invalid(format!(
                    "{:?} identifier 0x{:X} exceeds 29 bits",
                    message, id
                )));
            }
        }

        if !self.bms.is_distinct() {
            return Err(invalid("bms frame identifiers must be distinct"));
        }

        if self.report.interval_ms == 0 || self.report.interval_ms > 60000 {
            return Err(invalid("report interval_ms must be between 1 and 60000"));
        }

        if self.report.format != "text" && self.report.format != "json" {
            return Err(invalid("report format must be 'text' or 'json'"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bms::protocol::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bms, FrameIds::default());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.report.format, "text");
        assert_eq!(config.bms.pack_summary, BMS_ID_PACK_SUMMARY);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyUSB0"
baud_rate = 921600

[bms]
temp_soc = 0x18FF0942

[report]
format = "json"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 921600);
        assert_eq!(config.serial.reconnect_interval_ms, 1000);
        assert_eq!(config.bms.temp_soc, 0x18FF0942);
        assert_eq!(config.bms.pack_summary, BMS_ID_PACK_SUMMARY);
        assert_eq!(config.report.format, "json");
        assert_eq!(config.report.interval_ms, 1000);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/bms-monitor.toml");
        assert!(matches!(result, Err(BmsError::Io(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::from_toml("[serial\nport = 1");
        assert!(matches!(result, Err(BmsError::Config(_))));
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = Config::default();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 12345;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &VALID_BAUD_RATES {
            let mut config = Config::default();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_reconnect_interval_zero() {
        let mut config = Config::default();
        config.serial.reconnect_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reconnect_interval_too_high() {
        let mut config = Config::default();
        config.serial.reconnect_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_frame_ids() {
        let mut config = Config::default();
        config.bms.cellgroup_3_6 = config.bms.cellgroup_1_2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frame_id_exceeds_29_bits() {
        let mut config = Config::default();
        config.bms.pack_summary = 0x2000_0000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_report_interval_zero() {
        let mut config = Config::default();
        config.report.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_report_format() {
        let mut config = Config::default();
        config.report.format = "csv".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyACM0");
        assert_eq!(default_baud_rate(), 115200);
        assert_eq!(default_reconnect_interval_ms(), 1000);
        assert_eq!(default_report_interval_ms(), 1000);
        assert_eq!(default_report_format(), "text");
    }
}
