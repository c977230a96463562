//! Modbus RTU master for RS485 soil sensors
//!
//! Reads humidity, temperature, electrical conductivity and pH from a soil
//! sensor with one fixed read-registers request per cycle. The driver lives in
//! [`devices::soil_sensor`]; the wire format and CRC in [`modbus`].

pub mod cli;
pub mod config;
pub mod devices;
pub mod modbus;
pub mod output;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, ResponseWait, UartConfig};
pub use devices::{decode_response, DeviceData, SensorReading, SoilSensor};
pub use modbus::{crc16_modbus, RequestConfig, RequestFrame, SerialTransport, Transport};
pub use output::{ConsoleFormatter, CsvFormatter, DataFormatter, DataSender, JsonFormatter};
pub use services::DataService;
pub use utils::error::ModbusError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
