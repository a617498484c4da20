use std::time::Duration;

use anyhow::Context;
use rumqttc::{AsyncClient, LastWill, MqttOptions, QoS};
use tracing::{debug, info, warn};

use thermostat_common::{
    sensortag::{decode_ambient_fahrenheit, encode_ambient_fahrenheit},
    RuntimeConfig, Temperature, SENSOR_OFFLINE, SENSOR_ONLINE, TOPIC_SENSOR_STATUS,
    TOPIC_SENSOR_TEMP,
};

const DEFAULT_PUBLISH_INTERVAL_SECS: u64 = 30;

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let network = RuntimeConfig::from_env().network;
    let publish_every = std::env::var("SENSOR_PUBLISH_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_PUBLISH_INTERVAL_SECS);

    let mut mqtt_options = MqttOptions::new(
        "thermostat-sensor",
        network.mqtt_host.clone(),
        network.mqtt_port,
    );
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    mqtt_options.set_last_will(LastWill::new(
        TOPIC_SENSOR_STATUS,
        SENSOR_OFFLINE,
        QoS::AtLeastOnce,
        true,
    ));
    if !network.mqtt_user.is_empty() {
        mqtt_options.set_credentials(network.mqtt_user.clone(), network.mqtt_pass.clone());
    }

    let (mqtt, mut eventloop) = AsyncClient::new(mqtt_options, 32);

    mqtt.publish(TOPIC_SENSOR_STATUS, QoS::AtLeastOnce, true, SENSOR_ONLINE)
        .await
        .context("failed to publish sensor online status")?;

    tokio::spawn(async move {
        loop {
            if let Err(err) = eventloop.poll().await {
                warn!("sensor mqtt poll error: {err}");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    });

    info!(
        "sensor node publishing to mqtt://{}:{} every {publish_every}s",
        network.mqtt_host, network.mqtt_port
    );

    let mut tick: u64 = 0;
    let mut interval = tokio::time::interval(Duration::from_secs(publish_every));

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }
        tick = tick.saturating_add(1);

        let temp_f = simulated_reading(tick).context("failed to decode simulated reading")?;
        debug!("publishing {temp_f}F");
        mqtt.publish(TOPIC_SENSOR_TEMP, QoS::AtLeastOnce, true, temp_f.to_string())
            .await
            .context("failed to publish sensor temperature")?;
    }

    info!("sensor node stopping");
    mqtt.publish(TOPIC_SENSOR_STATUS, QoS::AtLeastOnce, true, SENSOR_OFFLINE)
        .await
        .context("failed to publish sensor offline status")?;
    mqtt.disconnect()
        .await
        .context("failed to disconnect from broker")?;
    Ok(())
}

/// Slow drift around 70F, passed through the same characteristic encoding a
/// SensorTag would report so the published value is what the tag would yield.
fn simulated_reading(tick: u64) -> Result<Temperature, thermostat_common::SensorError> {
    let temp_f = 68.0 + (tick % 10) as f32 * 0.5;
    decode_ambient_fahrenheit(&encode_ambient_fahrenheit(temp_f))
}
