use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use thermostat_common::{
    Actuator, ActuatorError, OutputState, SensorError, Temperature, TemperatureSensor,
};

#[derive(Clone, Default)]
pub struct RecordingActuator {
    outputs: Arc<Mutex<Vec<OutputState>>>,
    releases: Arc<AtomicUsize>,
}

impl RecordingActuator {
    pub fn outputs(&self) -> Vec<OutputState> {
        self.outputs.lock().unwrap().clone()
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl Actuator for RecordingActuator {
    fn set_state(&mut self, output: OutputState) -> Result<(), ActuatorError> {
        self.outputs.lock().unwrap().push(output);
        Ok(())
    }

    fn release(&mut self) -> Result<(), ActuatorError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Replays queued results, then keeps repeating the last one.
#[derive(Clone, Default)]
pub struct ScriptedSensor {
    script: Arc<Mutex<VecDeque<Result<Temperature, SensorError>>>>,
    reads: Arc<AtomicUsize>,
    disconnected: Arc<AtomicBool>,
}

impl ScriptedSensor {
    pub fn new(script: impl IntoIterator<Item = Result<Temperature, SensorError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            ..Self::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

impl TemperatureSensor for ScriptedSensor {
    fn read_temperature(&mut self) -> Result<Temperature, SensorError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap_or(Err(SensorError::NoReading))
        } else {
            script.front().cloned().unwrap_or(Err(SensorError::NoReading))
        }
    }

    fn disconnect(&mut self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}
