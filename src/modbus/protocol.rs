use serde::{Deserialize, Serialize};
use std::fmt;

use super::crc::{crc16_bytes, crc16_modbus};
use crate::utils::error::ModbusError;

pub const READ_HOLDING_REGISTERS: u8 = 0x03;
pub const READ_INPUT_REGISTERS: u8 = 0x04;

pub const DEFAULT_SLAVE_ADDRESS: u8 = 0x01;
pub const DEFAULT_START_REGISTER: u16 = 0x0000;
/// Humidity, temperature, EC, pH.
pub const SENSOR_REGISTER_COUNT: u16 = 4;

/// Largest register count a single Modbus read may request.
pub const MAX_REGISTER_COUNT: u16 = 125;

/// Address + function + start register + register count + CRC.
pub const REQUEST_FRAME_LEN: usize = 8;

/// Parameters of the read-registers request sent to the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub slave_address: u8,
    pub function_code: u8,
    pub start_register: u16,
    pub register_count: u16,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            slave_address: DEFAULT_SLAVE_ADDRESS,
            function_code: READ_HOLDING_REGISTERS,
            start_register: DEFAULT_START_REGISTER,
            register_count: SENSOR_REGISTER_COUNT,
        }
    }
}

impl RequestConfig {
    pub fn validate(&self) -> Result<(), ModbusError> {
        if self.slave_address < 1 || self.slave_address > 247 {
            return Err(ModbusError::ConfigError(format!(
                "Invalid slave address: {}. Must be 1-247",
                self.slave_address
            )));
        }

        if self.function_code != READ_HOLDING_REGISTERS && self.function_code != READ_INPUT_REGISTERS {
            return Err(ModbusError::ConfigError(format!(
                "Unsupported function code 0x{:02X}: only 0x03 and 0x04 read registers",
                self.function_code
            )));
        }

        if self.register_count < SENSOR_REGISTER_COUNT || self.register_count > MAX_REGISTER_COUNT {
            return Err(ModbusError::ConfigError(format!(
                "Invalid register count: {}. Must be {}-{}",
                self.register_count, SENSOR_REGISTER_COUNT, MAX_REGISTER_COUNT
            )));
        }

        Ok(())
    }

    /// Byte count the slave echoes in byte 2 of its response.
    pub fn expected_byte_count(&self) -> usize {
        self.register_count as usize * 2
    }

    /// Header plus register data, without the trailing CRC.
    pub fn min_response_len(&self) -> usize {
        3 + self.expected_byte_count()
    }

    /// Full response length including the CRC.
    pub fn full_response_len(&self) -> usize {
        self.min_response_len() + 2
    }
}

/// The 8-byte read request, computed once and never modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFrame([u8; REQUEST_FRAME_LEN]);

impl RequestFrame {
    pub fn build(config: &RequestConfig) -> Self {
        let mut bytes = [0u8; REQUEST_FRAME_LEN];
        bytes[0] = config.slave_address;
        bytes[1] = config.function_code;
        bytes[2..4].copy_from_slice(&config.start_register.to_be_bytes());
        bytes[4..6].copy_from_slice(&config.register_count.to_be_bytes());

        let crc = crc16_bytes(&bytes[..6]);
        bytes[6..].copy_from_slice(&crc);

        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn crc(&self) -> u16 {
        u16::from_le_bytes([self.0[6], self.0[7]])
    }
}

impl fmt::Display for RequestFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_dump(&self.0))
    }
}

/// Upper-case hex with a space between bytes, e.g. `01 03 08`.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes.iter().map(|b| hex::encode_upper([*b])).collect::<Vec<_>>().join(" ")
}

/// Validates a read-registers response against the request that produced it
/// and returns the register values in order.
///
/// Checks run in order and the first failure wins: length, then the echoed
/// header, then (only when `verify_crc` is set) the trailing CRC.
pub fn parse_read_response(
    config: &RequestConfig,
    response: &[u8],
    verify_crc: bool,
) -> Result<Vec<u16>, ModbusError> {
    let min_len = config.min_response_len();
    if response.len() < min_len {
        return Err(ModbusError::IncompleteResponse {
            expected: min_len,
            received: response.len(),
        });
    }

    let byte_count = config.expected_byte_count();
    if response[0] != config.slave_address
        || response[1] != config.function_code
        || response[2] as usize != byte_count
    {
        return Err(ModbusError::InvalidHeader {
            address: response[0],
            function: response[1],
            byte_count: response[2],
        });
    }

    if verify_crc {
        let full_len = config.full_response_len();
        if response.len() < full_len {
            return Err(ModbusError::IncompleteResponse {
                expected: full_len,
                received: response.len(),
            });
        }
        let expected = crc16_modbus(&response[..min_len]);
        let received = u16::from_le_bytes([response[min_len], response[min_len + 1]]);
        if expected != received {
            return Err(ModbusError::CorruptResponse { expected, received });
        }
    }

    Ok(response[3..min_len]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::crc::verify_crc;

    const VALID_RESPONSE: [u8; 13] = [
        0x01, 0x03, 0x08, 0x01, 0xF4, 0x00, 0xFA, 0x00, 0x64, 0x00, 0x23, 0x39, 0xC6,
    ];

    #[test]
    fn test_default_request_frame() {
        let frame = RequestFrame::build(&RequestConfig::default());
        assert_eq!(
            frame.as_bytes(),
            &[0x01, 0x03, 0x00, 0x00, 0x00, 0x04, 0x44, 0x09]
        );
        assert_eq!(frame.crc(), 0x0944);
        assert_eq!(frame.to_string(), "01 03 00 00 00 04 44 09");
    }

    #[test]
    fn test_hex_dump_spacing() {
        assert_eq!(hex_dump(&[0x01, 0xAB, 0x0F]), "01 AB 0F");
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn test_request_frame_is_deterministic() {
        let config = RequestConfig::default();
        assert_eq!(RequestFrame::build(&config), RequestFrame::build(&config));
    }

    #[test]
    fn test_request_frame_follows_config() {
        let config = RequestConfig {
            slave_address: 0x02,
            function_code: READ_INPUT_REGISTERS,
            start_register: 0x0102,
            register_count: 7,
        };
        let frame = RequestFrame::build(&config);
        assert_eq!(&frame.as_bytes()[..6], &[0x02, 0x04, 0x01, 0x02, 0x00, 0x07]);
        assert!(verify_crc(frame.as_bytes()));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = RequestConfig::default();
        assert!(config.validate().is_ok());

        config.slave_address = 0;
        assert!(matches!(config.validate(), Err(ModbusError::ConfigError(_))));

        config = RequestConfig { function_code: 0x06, ..Default::default() };
        assert!(config.validate().is_err());

        config = RequestConfig { register_count: 3, ..Default::default() };
        assert!(config.validate().is_err());

        config = RequestConfig { register_count: 126, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_response_lengths() {
        let config = RequestConfig::default();
        assert_eq!(config.expected_byte_count(), 8);
        assert_eq!(config.min_response_len(), 11);
        assert_eq!(config.full_response_len(), 13);
    }

    #[test]
    fn test_parse_valid_response() {
        let registers = parse_read_response(&RequestConfig::default(), &VALID_RESPONSE, true).unwrap();
        assert_eq!(registers, vec![0x01F4, 0x00FA, 0x0064, 0x0023]);
    }

    #[test]
    fn test_parse_without_crc_accepts_eleven_bytes() {
        let registers =
            parse_read_response(&RequestConfig::default(), &VALID_RESPONSE[..11], false).unwrap();
        assert_eq!(registers.len(), 4);
    }

    #[test]
    fn test_parse_incomplete_response() {
        let config = RequestConfig::default();
        assert_eq!(
            parse_read_response(&config, &[], false),
            Err(ModbusError::IncompleteResponse { expected: 11, received: 0 })
        );
        assert_eq!(
            parse_read_response(&config, &VALID_RESPONSE[..10], false),
            Err(ModbusError::IncompleteResponse { expected: 11, received: 10 })
        );
    }

    #[test]
    fn test_parse_invalid_header() {
        let config = RequestConfig::default();

        let mut wrong_address = VALID_RESPONSE;
        wrong_address[0] = 0x02;
        assert!(matches!(
            parse_read_response(&config, &wrong_address, false),
            Err(ModbusError::InvalidHeader { address: 0x02, .. })
        ));

        let mut wrong_function = VALID_RESPONSE;
        wrong_function[1] = 0x83;
        assert!(matches!(
            parse_read_response(&config, &wrong_function, false),
            Err(ModbusError::InvalidHeader { function: 0x83, .. })
        ));

        let mut wrong_count = VALID_RESPONSE;
        wrong_count[2] = 0x06;
        assert!(matches!(
            parse_read_response(&config, &wrong_count, false),
            Err(ModbusError::InvalidHeader { byte_count: 0x06, .. })
        ));
    }

    #[test]
    fn test_length_check_runs_before_header_check() {
        let short_and_wrong = [0x02, 0x03, 0x08, 0x00];
        assert!(matches!(
            parse_read_response(&RequestConfig::default(), &short_and_wrong, false),
            Err(ModbusError::IncompleteResponse { .. })
        ));
    }

    #[test]
    fn test_parse_crc_mismatch_only_when_verifying() {
        let config = RequestConfig::default();
        let mut corrupted = VALID_RESPONSE;
        corrupted[12] = 0x00;

        assert!(parse_read_response(&config, &corrupted, false).is_ok());
        assert_eq!(
            parse_read_response(&config, &corrupted, true),
            Err(ModbusError::CorruptResponse { expected: 0xC639, received: 0x0039 })
        );
        assert!(matches!(
            parse_read_response(&config, &VALID_RESPONSE[..11], true),
            Err(ModbusError::IncompleteResponse { expected: 13, received: 11 })
        ));
    }
}
