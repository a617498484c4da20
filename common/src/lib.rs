pub mod config;
pub mod devices;
pub mod error;
pub mod sensortag;
pub mod thermostat;
pub mod topics;
pub mod types;

pub use config::{NetworkConfig, PersistedSettings, RelayConfig, RuntimeConfig, ThermostatConfig};
pub use devices::{Actuator, TemperatureSensor};
pub use error::{ActuatorError, PersistenceError, SensorError, ThermostatError};
pub use thermostat::{StateUpdate, ThermostatEngine};
pub use topics::*;
pub use types::{
    ControllerStatus, FanMode, OutputState, RelayLines, SystemMode, Temperature, ThermostatState,
    NO_READING,
};
