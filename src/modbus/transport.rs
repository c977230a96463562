use log::{debug, error, info};
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;

use crate::config::settings::{ParityConfig, UartConfig};
use crate::utils::error::ModbusError;

/// Upper bound on bytes taken from the port per `read` call.
pub const READ_BUFFER_SIZE: usize = 256;

/// Byte-oriented serial channel the driver talks through.
pub trait Transport {
    /// Writes the whole buffer or fails.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Returns whatever bytes are available, possibly none. Must not block
    /// longer than the transport's own timeout.
    fn read(&mut self) -> io::Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn read(&mut self) -> io::Result<Vec<u8>> {
        (**self).read()
    }
}

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn open(uart: &UartConfig) -> Result<Self, ModbusError> {
        let port_name = uart.port_name();
        info!("🔌 Connecting to RS485 port: {} (UART {})", port_name, uart.uart_index);
        info!(
            "⚙️  Configuration: {} baud, 8 data bits, {:?} parity, 1 stop bit, {} ms timeout",
            uart.baud_rate, uart.parity, uart.timeout_ms
        );
        debug!("📌 Pins: TX={} RX={}", uart.tx_pin, uart.rx_pin);

        let serial_parity = match uart.parity {
            ParityConfig::None => serialport::Parity::None,
            ParityConfig::Even => serialport::Parity::Even,
            ParityConfig::Odd => serialport::Parity::Odd,
        };

        let port = serialport::new(&port_name, uart.baud_rate)
            .timeout(Duration::from_millis(uart.timeout_ms))
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serial_parity)
            .open()
            .map_err(|e| {
                error!("❌ Failed to open serial port {}: {}", port_name, e);
                ModbusError::ConnectionError(format!("Failed to open port {}: {}", port_name, e))
            })?;

        info!("✅ RS485 connection established successfully");
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn read(&mut self) -> io::Result<Vec<u8>> {
        let mut response = Vec::new();
        let mut buf = [0u8; READ_BUFFER_SIZE];

        while response.len() < READ_BUFFER_SIZE {
            let remaining = READ_BUFFER_SIZE - response.len();
            match Read::read(&mut self.port, &mut buf[..remaining]) {
                Ok(0) => break,
                Ok(n) => response.extend_from_slice(&buf[..n]),
                // A timeout just means the line went quiet.
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e),
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::Transport;
    use std::collections::VecDeque;
    use std::io;

    /// Scripted transport: replays queued reads and records every write.
    #[derive(Default)]
    pub struct MockTransport {
        pub responses: VecDeque<io::Result<Vec<u8>>>,
        pub written: Vec<Vec<u8>>,
        pub fail_writes: bool,
        pub reads: usize,
    }

    impl MockTransport {
        pub fn with_responses<I>(responses: I) -> Self
        where
            I: IntoIterator<Item = Vec<u8>>,
        {
            Self {
                responses: responses.into_iter().map(Ok).collect(),
                ..Default::default()
            }
        }

        pub fn failing_reads(kind: io::ErrorKind) -> Self {
            let mut responses = VecDeque::new();
            responses.push_back(Err(io::Error::new(kind, "mock read failure")));
            Self { responses, ..Default::default() }
        }
    }

    impl Transport for MockTransport {
        fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
            }
            self.written.push(bytes.to_vec());
            Ok(())
        }

        fn read(&mut self) -> io::Result<Vec<u8>> {
            self.reads += 1;
            self.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::Transport;
    use std::io;

    #[test]
    fn test_mock_replays_then_goes_quiet() {
        let mut transport = MockTransport::with_responses(vec![vec![0x01, 0x03]]);
        assert_eq!(transport.read().unwrap(), vec![0x01, 0x03]);
        assert!(transport.read().unwrap().is_empty());
        assert_eq!(transport.reads, 2);
    }

    #[test]
    fn test_boxed_transport_delegates() {
        let mut transport: Box<dyn Transport> = Box::new(MockTransport::failing_reads(io::ErrorKind::Other));
        assert!(transport.write(&[0xAA]).is_ok());
        assert!(transport.read().is_err());
    }
}
