use log::{error, info, warn};
use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::devices::{DeviceData, SensorReading, SoilSensor};
use crate::modbus::{SerialTransport, Transport};
use crate::output::{create_formatter, ConsoleFormatter, ConsoleSender, DataFormatter, DataSender, FileSender};
use crate::utils::error::ModbusError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub successful_reads: u32,
    pub failed_reads: u32,
}

impl MonitorStats {
    pub fn total_reads(&self) -> u32 {
        self.successful_reads + self.failed_reads
    }

    pub fn success_rate(&self) -> Option<f32> {
        let total = self.total_reads();
        if total == 0 {
            None
        } else {
            Some(self.successful_reads as f32 / total as f32 * 100.0)
        }
    }
}

/// Polls one sensor and pushes formatted readings to every configured sender.
pub struct DataService<T: Transport> {
    sensor: SoilSensor<T>,
    formatter: Box<dyn DataFormatter>,
    senders: Vec<Box<dyn DataSender>>,
    stats: MonitorStats,
    header_sent: bool,
}

impl DataService<SerialTransport> {
    pub fn from_config(config: &Config) -> Result<Self, ModbusError> {
        info!("🚀 Initializing Data Service");
        info!(
            "📡 Target sensor: slave {} on {}",
            config.request.slave_address,
            config.uart.port_name()
        );

        let sensor = SoilSensor::from_config(config)?;
        let mut service = Self::new(sensor);
        service.set_formatter(create_formatter(&config.output.format));
        service.add_sender(Box::new(ConsoleSender));
        if let Some(path) = &config.output.file {
            service.add_sender(Box::new(FileSender::new(path)));
        }

        Ok(service)
    }
}

impl<T: Transport> DataService<T> {
    pub fn new(sensor: SoilSensor<T>) -> Self {
        Self {
            sensor,
            formatter: Box::new(ConsoleFormatter),
            senders: Vec::new(),
            stats: MonitorStats::default(),
            header_sent: false,
        }
    }

    pub fn add_sender(&mut self, sender: Box<dyn DataSender>) {
        info!("📤 Added {} sender to {}", sender.sender_type(), sender.destination());
        self.senders.push(sender);
    }

    pub fn set_formatter(&mut self, formatter: Box<dyn DataFormatter>) {
        self.formatter = formatter;
        self.header_sent = false;
    }

    pub fn sensor(&self) -> &SoilSensor<T> {
        &self.sensor
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    /// Runs one request/response cycle and broadcasts the reading on success.
    pub fn read_once(&mut self) -> Result<SensorReading, ModbusError> {
        match self.sensor.try_get_sensor_data() {
            Ok(reading) => {
                self.stats.successful_reads += 1;
                self.broadcast(&reading);
                Ok(reading)
            }
            Err(e) => {
                self.stats.failed_reads += 1;
                Err(e)
            }
        }
    }

    pub fn broadcast(&mut self, data: &dyn DeviceData) {
        if !self.header_sent {
            let header = self.formatter.format_header();
            if !header.is_empty() {
                self.send_to_all(&header);
            }
            self.header_sent = true;
        }

        let line = self.formatter.format_reading(data);
        self.send_to_all(&line);
    }

    fn send_to_all(&self, data: &str) {
        for sender in &self.senders {
            if let Err(e) = sender.send(data) {
                error!(
                    "❌ Failed to send data via {} to {}: {}",
                    sender.sender_type(),
                    sender.destination(),
                    e
                );
            }
        }
    }

    /// Polls every `interval` until Ctrl+C. Each cycle blocks the worker
    /// thread for the sensor's wait and read timeout, so this needs the
    /// multi-threaded runtime.
    pub async fn run(&mut self, interval: Duration) -> Result<MonitorStats, ModbusError> {
        info!("   🛑 Press Ctrl+C to stop");
        self.run_until(interval, tokio::signal::ctrl_c()).await
    }

    /// Polls every `interval` until `shutdown` completes. The shutdown future
    /// lives across cycles, so a signal raised mid-read stops the loop once
    /// that read returns.
    pub async fn run_until<F: Future>(
        &mut self,
        interval: Duration,
        shutdown: F,
    ) -> Result<MonitorStats, ModbusError> {
        info!("🔄 Starting soil sensor monitoring");
        info!("   ⏱️  Update interval: {:?}", interval);

        let mut interval_timer = tokio::time::interval(interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("🛑 Stopping soil sensor monitor...");
                    break;
                }
                _ = interval_timer.tick() => {
                    if let Err(e) = tokio::task::block_in_place(|| self.read_once()) {
                        warn!("📵 Read failed: {}", e);
                    }

                    if let Some(rate) = self.stats.success_rate() {
                        info!(
                            "📈 Success rate: {:.1}% ({}/{})",
                            rate,
                            self.stats.successful_reads,
                            self.stats.total_reads()
                        );
                    }
                }
            }
        }

        info!("📊 Final Statistics:");
        info!("   ✅ Successful reads: {}", self.stats.successful_reads);
        info!("   ❌ Failed reads: {}", self.stats.failed_reads);
        Ok(self.stats)
    }
}
