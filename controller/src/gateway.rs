use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use thermostat_common::{
    Actuator, FanMode, OutputState, PersistedSettings, StateUpdate, SystemMode, Temperature,
    ThermostatEngine, ThermostatError, ThermostatState,
};

struct ActuatorSlot {
    device: Box<dyn Actuator>,
    applied: Option<OutputState>,
    released: bool,
}

impl ActuatorSlot {
    fn apply(&mut self, output: OutputState) {
        if self.released {
            debug!("actuator released, not applying {output}");
            return;
        }

        match self.device.set_state(output) {
            Ok(()) => {
                if self.applied != Some(output) {
                    let previous = self.applied.map_or("none", OutputState::as_str);
                    info!("output {previous} -> {output}");
                }
                self.applied = Some(output);
            }
            Err(err) => warn!("actuator failed to apply {output}: {err}"),
        }
    }
}

/// The only way into the thermostat state. Each operation runs under the engine
/// lock and queues its actuation on the actuator lock before the engine lock is
/// released, so actuations happen in admission order while snapshot readers wait
/// on at most the actuation already in progress.
#[derive(Clone)]
pub struct Gateway {
    engine: Arc<Mutex<ThermostatEngine>>,
    actuator: Arc<Mutex<ActuatorSlot>>,
}

impl Gateway {
    pub fn new(engine: ThermostatEngine, actuator: Box<dyn Actuator>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            actuator: Arc::new(Mutex::new(ActuatorSlot {
                device: actuator,
                applied: None,
                released: false,
            })),
        }
    }

    pub async fn snapshot(&self) -> ThermostatState {
        self.engine.lock().await.snapshot()
    }

    pub async fn settings(&self) -> PersistedSettings {
        self.engine.lock().await.settings()
    }

    /// Drives the actuator to whatever the current state implies.
    pub async fn apply_current(&self) {
        let engine = self.engine.lock().await;
        let output = engine.output();
        self.actuate(engine, output).await;
    }

    pub async fn set_desired(&self, temp_f: Temperature) -> Result<ThermostatState, ThermostatError> {
        let mut engine = self.engine.lock().await;
        let output = engine.set_desired_temperature(temp_f)?;
        debug!("desired temperature set to {temp_f}F");
        Ok(self.commit(engine, output).await)
    }

    pub async fn set_system_mode(&self, mode: &str) -> Result<ThermostatState, ThermostatError> {
        let mode: SystemMode = mode.parse()?;
        let mut engine = self.engine.lock().await;
        let output = engine.set_system_mode(mode);
        debug!("system mode set to {mode}");
        Ok(self.commit(engine, output).await)
    }

    pub async fn set_fan_mode(&self, mode: &str) -> Result<ThermostatState, ThermostatError> {
        let mode: FanMode = mode.parse()?;
        let mut engine = self.engine.lock().await;
        let output = engine.set_fan_mode(mode);
        debug!("fan mode set to {mode}");
        Ok(self.commit(engine, output).await)
    }

    pub async fn apply_update(&self, update: StateUpdate) -> Result<ThermostatState, ThermostatError> {
        let mut engine = self.engine.lock().await;
        let output = engine.apply_update(update)?;
        debug!("state update applied: {update:?}");
        Ok(self.commit(engine, output).await)
    }

    /// Returns false when the reading was discarded as outside the sanity band.
    pub async fn report_current_temperature(&self, temp_f: Temperature) -> bool {
        let mut engine = self.engine.lock().await;
        let Some(output) = engine.report_current_temperature(temp_f) else {
            return false;
        };
        self.commit(engine, output).await;
        true
    }

    pub async fn report_sensor_failure(&self) {
        let mut engine = self.engine.lock().await;
        let output = engine.report_sensor_failure();
        warn!("sensor failure, system mode forced off");
        self.commit(engine, output).await;
    }

    /// Final actuation: everything off, then the device is released. Later
    /// mutations still update state but no longer reach the hardware.
    pub async fn shutdown(&self) {
        let _engine = self.engine.lock().await;
        let mut slot = self.actuator.lock().await;
        if slot.released {
            return;
        }

        slot.apply(OutputState::Off);
        if let Err(err) = slot.device.release() {
            warn!("actuator release failed: {err}");
        }
        slot.released = true;
        info!("actuator released");
    }

    async fn commit(
        &self,
        engine: MutexGuard<'_, ThermostatEngine>,
        output: OutputState,
    ) -> ThermostatState {
        let state = engine.snapshot();
        self.actuate(engine, output).await;
        state
    }

    async fn actuate(&self, engine: MutexGuard<'_, ThermostatEngine>, output: OutputState) {
        let mut slot = self.actuator.lock().await;
        drop(engine);
        slot.apply(output);
    }
}
