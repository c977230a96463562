use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModbusError {
    #[error("Transport write failed: {0}")]
    TransportWriteFailure(String),

    #[error("No response or incomplete data: expected at least {expected} bytes, received {received}")]
    IncompleteResponse { expected: usize, received: usize },

    #[error("Invalid response header: address 0x{address:02X}, function 0x{function:02X}, byte count {byte_count}")]
    InvalidHeader {
        address: u8,
        function: u8,
        byte_count: u8,
    },

    #[error("Transport read failed: {0}")]
    TransportReadFailure(String),

    #[error("CRC checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    CorruptResponse { expected: u16, received: u16 },

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Output error: {0}")]
    OutputError(String),
}

impl From<serialport::Error> for ModbusError {
    fn from(err: serialport::Error) -> Self {
        ModbusError::ConnectionError(err.to_string())
    }
}

impl From<serde_json::Error> for ModbusError {
    fn from(err: serde_json::Error) -> Self {
        ModbusError::SerializationError(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for ModbusError {
    fn from(err: toml::de::Error) -> Self {
        ModbusError::ConfigError(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for ModbusError {
    fn from(err: toml::ser::Error) -> Self {
        ModbusError::SerializationError(format!("TOML error: {}", err))
    }
}

// Only non-transport I/O (config files, output files) goes through here;
// the driver maps transport errors to the read/write variants explicitly.
impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        ModbusError::ConfigError(format!("IO error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_failure() {
        let err = ModbusError::IncompleteResponse { expected: 11, received: 10 };
        assert!(err.to_string().contains("expected at least 11 bytes"));

        let err = ModbusError::InvalidHeader { address: 2, function: 3, byte_count: 8 };
        assert_eq!(
            err.to_string(),
            "Invalid response header: address 0x02, function 0x03, byte count 8"
        );

        let err = ModbusError::CorruptResponse { expected: 0xC639, received: 0x0000 };
        assert!(err.to_string().contains("0xC639"));
    }
}
