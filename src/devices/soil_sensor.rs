//! Driver for RS485 soil sensors reporting humidity, temperature,
//! electrical conductivity and pH over Modbus RTU.
//!
//! One call to [`SoilSensor::get_sensor_data`] is one request/response cycle:
//! send the precomputed read request, wait, read, validate and decode.

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use super::traits::DeviceData;
use crate::config::settings::{Config, ResponseWait, UartConfig};
use crate::modbus::protocol::{hex_dump, parse_read_response, RequestConfig, RequestFrame};
use crate::modbus::transport::{SerialTransport, Transport};
use crate::utils::error::ModbusError;

/// Humidity, temperature and pH are transmitted in tenths.
const SCALE: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    pub device_address: u8,
    pub timestamp: DateTime<Utc>,
    /// Volumetric water content, %.
    pub humidity: f64,
    /// °C.
    pub temperature: f64,
    /// Electrical conductivity, µS/cm.
    pub ec: i32,
    pub ph: f64,
}

impl SensorReading {
    pub const SENTINEL: (f64, f64, i32, f64) = (-1.0, -1.0, -1, -1.0);

    /// `[humidity, temperature, ec, ph]` as read from the sensor.
    pub fn from_registers(device_address: u8, registers: [u16; 4]) -> Self {
        let [humidity, temperature, ec, ph] = registers;
        Self {
            device_address,
            timestamp: Utc::now(),
            humidity: f64::from(humidity) / SCALE,
            temperature: f64::from(temperature) / SCALE,
            ec: i32::from(ec),
            ph: f64::from(ph) / SCALE,
        }
    }

    /// The reading returned in place of an error by the non-`try_` calls.
    pub fn sentinel(device_address: u8) -> Self {
        let (humidity, temperature, ec, ph) = Self::SENTINEL;
        Self {
            device_address,
            timestamp: Utc::now(),
            humidity,
            temperature,
            ec,
            ph,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.as_tuple() == Self::SENTINEL
    }

    /// `(humidity, temperature, ec, ph)`
    pub fn as_tuple(&self) -> (f64, f64, i32, f64) {
        (self.humidity, self.temperature, self.ec, self.ph)
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Humidity: {}% | Temperature: {}°C | EC: {} µS/cm | pH: {}",
            self.humidity, self.temperature, self.ec, self.ph
        )
    }
}

impl DeviceData for SensorReading {
    fn device_address(&self) -> u8 {
        self.device_address
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn get_parameter(&self, name: &str) -> Option<String> {
        match name {
            "Humidity" => Some(format!("{:.1} %", self.humidity)),
            "Temperature" => Some(format!("{:.1}°C", self.temperature)),
            "EC" => Some(format!("{} µS/cm", self.ec)),
            "PH" => Some(format!("{:.1}", self.ph)),
            _ => None,
        }
    }

    fn get_all_parameters(&self) -> Vec<(String, String)> {
        vec![
            ("Humidity".to_string(), self.humidity.to_string()),
            ("Temperature".to_string(), self.temperature.to_string()),
            ("EC".to_string(), self.ec.to_string()),
            ("PH".to_string(), self.ph.to_string()),
        ]
    }

    fn device_type(&self) -> String {
        "soil_sensor".to_string()
    }
}

/// Validates a raw response and scales the first four registers.
pub fn decode_response(
    request: &RequestConfig,
    response: &[u8],
    verify_crc: bool,
) -> Result<SensorReading, ModbusError> {
    request.validate()?;
    match parse_read_response(request, response, verify_crc)?[..] {
        [humidity, temperature, ec, ph, ..] => Ok(SensorReading::from_registers(
            request.slave_address,
            [humidity, temperature, ec, ph],
        )),
        _ => Err(ModbusError::IncompleteResponse {
            expected: request.min_response_len(),
            received: response.len(),
        }),
    }
}

/// Modbus RTU master for a single soil sensor. Owns its transport and the
/// request frame, which is built once in the constructor.
pub struct SoilSensor<T: Transport> {
    transport: T,
    request: RequestConfig,
    frame: RequestFrame,
    response_wait: ResponseWait,
    verify_response_crc: bool,
}

impl SoilSensor<SerialTransport> {
    /// Opens the UART and talks to the sensor with the default request
    /// (slave 1, read 4 holding registers from 0x0000).
    pub fn open(uart: &UartConfig) -> Result<Self, ModbusError> {
        let transport = SerialTransport::open(uart)?;
        Self::new(transport, RequestConfig::default())
    }

    pub fn from_config(config: &Config) -> Result<Self, ModbusError> {
        let transport = SerialTransport::open(&config.uart)?;
        Ok(Self::new(transport, config.request)?
            .with_response_wait(config.response_wait)
            .with_crc_verification(config.verify_response_crc))
    }
}

impl<T: Transport> SoilSensor<T> {
    pub fn new(transport: T, request: RequestConfig) -> Result<Self, ModbusError> {
        request.validate()?;
        let frame = RequestFrame::build(&request);
        debug!("📦 Request frame for slave {}: {}", request.slave_address, frame);

        Ok(Self {
            transport,
            request,
            frame,
            response_wait: ResponseWait::default(),
            verify_response_crc: false,
        })
    }

    pub fn with_response_wait(mut self, response_wait: ResponseWait) -> Self {
        self.response_wait = response_wait;
        self
    }

    /// Off by default: the sensor's response CRC is received but not checked
    /// unless this is enabled.
    pub fn with_crc_verification(mut self, enabled: bool) -> Self {
        self.verify_response_crc = enabled;
        self
    }

    pub fn request_frame(&self) -> &RequestFrame {
        &self.frame
    }

    pub fn request_config(&self) -> &RequestConfig {
        &self.request
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Best effort: a failed write is logged and otherwise ignored.
    pub fn send_command(&mut self) {
        if let Err(e) = self.try_send_command() {
            error!("❌ Error sending command: {}", e);
        }
    }

    pub fn try_send_command(&mut self) -> Result<(), ModbusError> {
        debug!("📤 Sending frame: {}", self.frame);
        self.transport
            .write(self.frame.as_bytes())
            .map_err(|e| ModbusError::TransportWriteFailure(e.to_string()))
    }

    /// Reads and decodes whatever the transport has now. Any failure is
    /// logged and turned into [`SensorReading::sentinel`].
    pub fn read_data(&mut self) -> SensorReading {
        let result = self.try_read_data();
        self.or_sentinel(result)
    }

    pub fn try_read_data(&mut self) -> Result<SensorReading, ModbusError> {
        let response = self.receive()?;
        decode_response(&self.request, &response, self.verify_response_crc)
    }

    /// One full cycle: send, wait, read. Never fails; check
    /// [`SensorReading::is_sentinel`] on the result.
    pub fn get_sensor_data(&mut self) -> SensorReading {
        self.send_command();
        let result = self
            .wait_for_response()
            .and_then(|response| decode_response(&self.request, &response, self.verify_response_crc));
        self.or_sentinel(result)
    }

    /// Like [`get_sensor_data`](Self::get_sensor_data) but reports the failure
    /// kind. A write failure stops the cycle before any read.
    pub fn try_get_sensor_data(&mut self) -> Result<SensorReading, ModbusError> {
        self.try_send_command()?;
        let response = self.wait_for_response()?;
        let reading = decode_response(&self.request, &response, self.verify_response_crc)?;
        info!("🌱 Slave {}: {}", self.request.slave_address, reading);
        Ok(reading)
    }

    fn receive(&mut self) -> Result<Vec<u8>, ModbusError> {
        let response = self
            .transport
            .read()
            .map_err(|e| ModbusError::TransportReadFailure(e.to_string()))?;
        debug!("📥 Received {} bytes: {}", response.len(), hex_dump(&response));
        Ok(response)
    }

    fn wait_for_response(&mut self) -> Result<Vec<u8>, ModbusError> {
        match self.response_wait {
            ResponseWait::Fixed { delay_ms } => {
                thread::sleep(Duration::from_millis(delay_ms));
                self.receive()
            }
            ResponseWait::Poll { timeout_ms, interval_ms } => {
                let deadline = Instant::now() + Duration::from_millis(timeout_ms);
                let target = self.request.full_response_len();
                let mut response = Vec::new();

                loop {
                    response.extend(self.receive()?);
                    if response.len() >= target || Instant::now() >= deadline {
                        break;
                    }
                    thread::sleep(Duration::from_millis(interval_ms));
                }

                Ok(response)
            }
        }
    }

    fn or_sentinel(&self, result: Result<SensorReading, ModbusError>) -> SensorReading {
        match result {
            Ok(reading) => reading,
            Err(e) => {
                error!("❌ Error reading sensor data: {}", e);
                SensorReading::sentinel(self.request.slave_address)
            }
        }
    }
}
