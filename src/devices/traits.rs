use chrono::{DateTime, Utc};
use serde_json::Value;

/// A decoded set of readings that output formatters know how to render.
pub trait DeviceData: Send + Sync {
    fn device_address(&self) -> u8;
    fn timestamp(&self) -> DateTime<Utc>;

    fn unix_timestamp(&self) -> i64 {
        self.timestamp().timestamp()
    }

    fn to_json(&self) -> Value;
    fn get_parameter(&self, name: &str) -> Option<String>;
    fn get_all_parameters(&self) -> Vec<(String, String)>;
    fn device_type(&self) -> String;
}
