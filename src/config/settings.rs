use clap::ArgMatches;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::modbus::protocol::RequestConfig;
use crate::utils::error::ModbusError;

pub const DEFAULT_TX_PIN: u8 = 4;
pub const DEFAULT_RX_PIN: u8 = 19;
pub const DEFAULT_BAUD_RATE: u32 = 4800;
pub const DEFAULT_UART_INDEX: u8 = 1;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 200;
pub const DEFAULT_RESPONSE_DELAY_MS: u64 = 500;

pub const OUTPUT_FORMATS: [&str; 3] = ["console", "json", "csv"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub verify_response_crc: bool,
    pub uart: UartConfig,
    pub request: RequestConfig,
    pub response_wait: ResponseWait,
    pub polling: PollingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParityConfig {
    #[default]
    None,
    Even,
    Odd,
}

/// Serial line settings. The pins only matter on boards that route the UART
/// in software; a hosted OS addresses the port by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UartConfig {
    pub uart_index: u8,
    pub tx_pin: u8,
    pub rx_pin: u8,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub parity: ParityConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            uart_index: DEFAULT_UART_INDEX,
            tx_pin: DEFAULT_TX_PIN,
            rx_pin: DEFAULT_RX_PIN,
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            parity: ParityConfig::None,
            port: None,
        }
    }
}

impl UartConfig {
    pub fn new(tx_pin: u8, rx_pin: u8, baud_rate: u32, uart_index: u8) -> Self {
        Self {
            uart_index,
            tx_pin,
            rx_pin,
            baud_rate,
            ..Default::default()
        }
    }

    /// Explicit port name if configured, otherwise the OS name of UART `uart_index`.
    pub fn port_name(&self) -> String {
        if let Some(port) = &self.port {
            return port.clone();
        }

        if cfg!(target_os = "windows") {
            format!("COM{}", self.uart_index as u16 + 1)
        } else {
            format!("/dev/ttyS{}", self.uart_index)
        }
    }
}

/// How long to wait between sending the request and reading the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResponseWait {
    /// Sleep for a fixed time, then read once.
    Fixed { delay_ms: u64 },
    /// Read every `interval_ms` until a full response arrived or `timeout_ms` elapsed.
    Poll { timeout_ms: u64, interval_ms: u64 },
}

impl Default for ResponseWait {
    fn default() -> Self {
        ResponseWait::Fixed {
            delay_ms: DEFAULT_RESPONSE_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_seconds: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "console".to_string(),
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verify_response_crc: false,
            uart: UartConfig::default(),
            request: RequestConfig::default(),
            response_wait: ResponseWait::default(),
            polling: PollingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Builds the configuration from `--config` (or defaults) and applies
    /// command line overrides on top.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, ModbusError> {
        let mut config = match matches.get_one::<String>("config") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(port) = matches.get_one::<String>("port") {
            config.uart.port = Some(port.clone());
        }
        if let Some(&uart_index) = matches.get_one::<u8>("uart") {
            config.uart.uart_index = uart_index;
        }
        if let Some(&tx_pin) = matches.get_one::<u8>("tx-pin") {
            config.uart.tx_pin = tx_pin;
        }
        if let Some(&rx_pin) = matches.get_one::<u8>("rx-pin") {
            config.uart.rx_pin = rx_pin;
        }
        if let Some(&baud_rate) = matches.get_one::<u32>("baud") {
            config.uart.baud_rate = baud_rate;
        }
        if let Some(&timeout_ms) = matches.get_one::<u64>("timeout") {
            config.uart.timeout_ms = timeout_ms;
        }
        if let Some(parity) = matches.get_one::<String>("parity") {
            config.uart.parity = match parity.as_str() {
                "even" => ParityConfig::Even,
                "odd" => ParityConfig::Odd,
                _ => ParityConfig::None,
            };
        }
        if matches.get_flag("verify-crc") {
            config.verify_response_crc = true;
        }
        if let Some(format) = matches.get_one::<String>("format") {
            config.output.format = format.clone();
        }
        if let Some(file) = matches.get_one::<String>("output-file") {
            config.output.file = Some(file.clone());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModbusError> {
        info!("📄 Loading configuration from {}", path.as_ref().display());
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ModbusError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ModbusError> {
        self.request.validate()?;

        if self.uart.baud_rate == 0 {
            return Err(ModbusError::ConfigError("Baud rate must be greater than 0".to_string()));
        }

        if let ResponseWait::Poll { interval_ms: 0, .. } = self.response_wait {
            return Err(ModbusError::ConfigError(
                "Response poll interval must be greater than 0".to_string(),
            ));
        }

        if self.polling.interval_seconds == 0 {
            return Err(ModbusError::ConfigError(
                "Polling interval must be at least 1 second".to_string(),
            ));
        }

        if !OUTPUT_FORMATS.contains(&self.output.format.as_str()) {
            return Err(ModbusError::ConfigError(format!(
                "Unknown output format '{}'. Expected one of: {}",
                self.output.format,
                OUTPUT_FORMATS.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_wiring() {
        let config = Config::default();
        assert_eq!(config.uart.tx_pin, 4);
        assert_eq!(config.uart.rx_pin, 19);
        assert_eq!(config.uart.baud_rate, 4800);
        assert_eq!(config.uart.uart_index, 1);
        assert_eq!(config.uart.timeout_ms, 200);
        assert_eq!(config.response_wait, ResponseWait::Fixed { delay_ms: 500 });
        assert!(!config.verify_response_crc);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_port_name_prefers_explicit_port() {
        let mut uart = UartConfig::new(26, 25, 4800, 2);
        if cfg!(target_os = "windows") {
            assert_eq!(uart.port_name(), "COM3");
        } else {
            assert_eq!(uart.port_name(), "/dev/ttyS2");
        }

        uart.port = Some("/dev/ttyUSB0".to_string());
        assert_eq!(uart.port_name(), "/dev/ttyUSB0");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sensor.toml");

        let mut config = Config::default();
        config.uart.port = Some("/dev/ttyUSB0".to_string());
        config.response_wait = ResponseWait::Poll { timeout_ms: 800, interval_ms: 50 };
        config.verify_response_crc = true;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [uart]
            baud_rate = 9600

            [request]
            slave_address = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.uart.baud_rate, 9600);
        assert_eq!(config.uart.tx_pin, DEFAULT_TX_PIN);
        assert_eq!(config.request.slave_address, 2);
        assert_eq!(config.request.register_count, 4);
        assert_eq!(config.output.format, "console");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.output.format = "xml".to_string();
        assert!(matches!(config.validate(), Err(ModbusError::ConfigError(_))));

        let mut config = Config::default();
        config.response_wait = ResponseWait::Poll { timeout_ms: 100, interval_ms: 0 };
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.request.register_count = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_missing_is_config_error() {
        let result = Config::from_file("/nonexistent/soil-sensor.toml");
        assert!(matches!(result, Err(ModbusError::ConfigError(_))));
    }
}
