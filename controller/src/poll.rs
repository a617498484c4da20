use std::time::Duration;

use tokio::{sync::watch, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use thermostat_common::{SensorError, TemperatureSensor};

use crate::gateway::Gateway;

/// Resolves once shutdown is requested or every sender is gone.
pub async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Polls the sensor every `interval`, starting immediately. A poll that has
/// started always runs to completion; shutdown is only observed between polls.
/// The sensor connection is dropped on the way out.
pub async fn run<S: TemperatureSensor>(
    gateway: Gateway,
    mut sensor: S,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("polling sensor every {}s", interval.as_secs_f32());
    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => break,
            _ = ticker.tick() => poll_once(&gateway, &mut sensor).await,
        }
    }

    sensor.disconnect();
    info!("poll loop stopped");
}

async fn poll_once<S: TemperatureSensor>(gateway: &Gateway, sensor: &mut S) {
    match sensor.read_temperature() {
        Ok(temp_f) => {
            if gateway.report_current_temperature(temp_f).await {
                debug!("sensor reading {temp_f}F");
            } else {
                debug!("discarded out-of-range reading {temp_f}F");
            }
        }
        // Nothing has ever been read; the engine already derives Off from that.
        Err(SensorError::NoReading) => debug!("waiting for the first sensor reading"),
        Err(err) => {
            warn!("sensor read failed: {err}");
            gateway.report_sensor_failure().await;
        }
    }
}
