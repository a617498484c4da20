use thiserror::Error;

use crate::types::Temperature;

/// Rejections of user-requested mutations. State is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThermostatError {
    #[error("desired temperature {0}F is outside 60..=85")]
    DesiredOutOfRange(Temperature),
    #[error("invalid system mode '{0}', use off, cool or heat")]
    InvalidSystemMode(String),
    #[error("invalid fan mode '{0}', use auto or on")]
    InvalidFanMode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("sensor not connected")]
    NotConnected,
    #[error("sensor has not reported a reading yet")]
    NoReading,
    #[error("latest sensor reading is {age_ms}ms old")]
    Stale { age_ms: u64 },
    #[error("malformed sensor payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("relay line {line} write failed: {source}")]
    Io {
        line: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("actuator already released")]
    Released,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("settings file i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("settings file holds an invalid value: {0}")]
    Invalid(#[from] ThermostatError),
}
