use crate::devices::DeviceData;

pub trait DataFormatter: Send + Sync {
    fn format_reading(&self, data: &dyn DeviceData) -> String;

    /// Printed once before the first reading; empty when the format has none.
    fn format_header(&self) -> String;
}

/// Picks the formatter for a configured output format name.
pub fn create_formatter(format: &str) -> Box<dyn DataFormatter> {
    match format {
        "json" => Box::new(JsonFormatter),
        "csv" => Box::new(CsvFormatter),
        _ => Box::new(ConsoleFormatter),
    }
}

pub struct ConsoleFormatter;

impl DataFormatter for ConsoleFormatter {
    fn format_reading(&self, data: &dyn DeviceData) -> String {
        let fields: Vec<String> = data
            .get_all_parameters()
            .into_iter()
            .map(|(name, value)| {
                let shown = data.get_parameter(&name).unwrap_or(value);
                format!("{}: {}", name, shown)
            })
            .collect();

        format!(
            "🌱 [{}] Slave {} | {}",
            data.timestamp().format("%Y-%m-%d %H:%M:%S"),
            data.device_address(),
            fields.join(" | ")
        )
    }

    fn format_header(&self) -> String {
        String::new()
    }
}

pub struct JsonFormatter;

impl DataFormatter for JsonFormatter {
    fn format_reading(&self, data: &dyn DeviceData) -> String {
        let json_data = serde_json::json!({
            "device_address": data.device_address(),
            "device_type": data.device_type(),
            "timestamp": data.unix_timestamp(),
            "data": data.to_json()
        });

        // One object per line so the output can be appended to a file.
        serde_json::to_string(&json_data).unwrap_or_default()
    }

    fn format_header(&self) -> String {
        String::new()
    }
}

pub struct CsvFormatter;

impl DataFormatter for CsvFormatter {
    fn format_reading(&self, data: &dyn DeviceData) -> String {
        let values: Vec<String> = data
            .get_all_parameters()
            .into_iter()
            .map(|(_, value)| value)
            .collect();

        format!(
            "{},{},{}",
            data.timestamp().to_rfc3339(),
            data.device_address(),
            values.join(",")
        )
    }

    fn format_header(&self) -> String {
        "Timestamp,Device,Humidity,Temperature,EC,PH".to_string()
    }
}
