//! Hardware seams. Concrete sensors and relay boards live in the binaries.

use crate::{
    error::{ActuatorError, SensorError},
    types::{OutputState, Temperature},
};

pub trait TemperatureSensor: Send {
    fn read_temperature(&mut self) -> Result<Temperature, SensorError>;

    /// Drops any held connection. Called once at shutdown.
    fn disconnect(&mut self) {}
}

pub trait Actuator: Send {
    fn set_state(&mut self, output: OutputState) -> Result<(), ActuatorError>;

    /// Releases the underlying device. Implementations must leave every output
    /// de-energised.
    fn release(&mut self) -> Result<(), ActuatorError> {
        self.set_state(OutputState::Off)
    }
}
