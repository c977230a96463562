use log::{debug, error};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::utils::error::ModbusError;

pub trait DataSender: Send + Sync {
    fn send(&self, data: &str) -> Result<(), ModbusError>;
    fn sender_type(&self) -> &str;
    fn destination(&self) -> &str;
}

pub struct ConsoleSender;

impl DataSender for ConsoleSender {
    fn send(&self, data: &str) -> Result<(), ModbusError> {
        println!("{}", data);
        Ok(())
    }

    fn sender_type(&self) -> &str {
        "console"
    }

    fn destination(&self) -> &str {
        "stdout"
    }
}

/// Appends each formatted reading as one line.
pub struct FileSender {
    file_path: String,
}

impl FileSender {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_string_lossy().to_string(),
        }
    }
}

impl DataSender for FileSender {
    fn send(&self, data: &str) -> Result<(), ModbusError> {
        debug!("📝 Appending {} bytes to {}", data.len(), self.file_path);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .map_err(|e| {
                error!("❌ Failed to open file {}: {}", self.file_path, e);
                ModbusError::OutputError(format!("File open error: {}", e))
            })?;

        writeln!(file, "{}", data).map_err(|e| {
            error!("❌ Failed to write to file {}: {}", self.file_path, e);
            ModbusError::OutputError(format!("File write error: {}", e))
        })
    }

    fn sender_type(&self) -> &str {
        "file"
    }

    fn destination(&self) -> &str {
        &self.file_path
    }
}
