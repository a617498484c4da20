pub const TOPIC_SENSOR_TEMP: &str = "thermostat/sensor/temperature";
pub const TOPIC_SENSOR_STATUS: &str = "thermostat/sensor/status";

pub const SENSOR_ONLINE: &str = "online";
pub const SENSOR_OFFLINE: &str = "offline";
