pub mod crc;
pub mod protocol;
pub mod transport;

pub use crc::{crc16_bytes, crc16_modbus, verify_crc};
pub use protocol::{parse_read_response, RequestConfig, RequestFrame};
pub use transport::{SerialTransport, Transport};
