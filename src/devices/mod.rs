pub mod soil_sensor;
pub mod traits;

pub use soil_sensor::{decode_response, SensorReading, SoilSensor};
pub use traits::DeviceData;
