use std::time::{Duration, Instant};

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use thermostat_common::{
    NetworkConfig, SensorError, Temperature, TemperatureSensor, SENSOR_OFFLINE, SENSOR_ONLINE,
    TOPIC_SENSOR_STATUS, TOPIC_SENSOR_TEMP,
};

const MAX_MQTT_PAYLOAD_BYTES: usize = 64;
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
struct Reading {
    temp_f: Temperature,
    received_at: Instant,
}

/// What the controller currently knows about the remote sensor node.
#[derive(Debug, Clone, Default)]
pub struct SensorLink {
    broker_connected: bool,
    node_offline: bool,
    latest: Option<Result<Reading, String>>,
}

impl SensorLink {
    fn on_connected(&mut self) {
        self.broker_connected = true;
    }

    fn on_disconnected(&mut self) {
        self.broker_connected = false;
    }

    fn on_status(&mut self, payload: &str) {
        match payload.trim() {
            SENSOR_ONLINE => self.node_offline = false,
            SENSOR_OFFLINE => self.node_offline = true,
            other => debug!("ignoring sensor status '{other}'"),
        }
    }

    fn on_temperature(&mut self, payload: &str, now: Instant) {
        self.node_offline = false;
        self.latest = Some(parse_reading(payload).map(|temp_f| Reading {
            temp_f,
            received_at: now,
        }));
    }

    /// Until the node has published once, the link only reports `NoReading`,
    /// whatever the broker state.
    pub fn reading(&self, now: Instant, stale_after: Duration) -> Result<Temperature, SensorError> {
        let Some(latest) = &self.latest else {
            return Err(SensorError::NoReading);
        };
        if !self.broker_connected || self.node_offline {
            return Err(SensorError::NotConnected);
        }

        match latest {
            Err(reason) => Err(SensorError::Malformed(reason.clone())),
            Ok(reading) => {
                let age = now.saturating_duration_since(reading.received_at);
                if age > stale_after {
                    Err(SensorError::Stale {
                        age_ms: age.as_millis().try_into().unwrap_or(u64::MAX),
                    })
                } else {
                    Ok(reading.temp_f)
                }
            }
        }
    }
}

/// Whole degrees, fractions truncated as the node's own decoder does.
fn parse_reading(payload: &str) -> Result<Temperature, String> {
    let trimmed = payload.trim();
    match trimmed.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value.trunc() as Temperature),
        _ => Err(format!("'{trimmed}' is not a temperature")),
    }
}

/// Temperature sensor node reached through the MQTT broker.
pub struct RemoteSensor {
    client: AsyncClient,
    link: watch::Receiver<SensorLink>,
    stale_after: Duration,
    eventloop_task: JoinHandle<()>,
}

impl RemoteSensor {
    pub fn connect(network: &NetworkConfig, stale_after: Duration) -> Self {
        let mut options = MqttOptions::new(
            "thermostat-controller",
            network.mqtt_host.clone(),
            network.mqtt_port,
        );
        options.set_keep_alive(Duration::from_secs(30));
        if !network.mqtt_user.is_empty() {
            options.set_credentials(network.mqtt_user.clone(), network.mqtt_pass.clone());
        }

        let (client, eventloop) = AsyncClient::new(options, 32);
        let (link_tx, link_rx) = watch::channel(SensorLink::default());
        let eventloop_task = tokio::spawn(drive_link(client.clone(), eventloop, link_tx));

        info!(
            "sensor link via mqtt://{}:{}",
            network.mqtt_host, network.mqtt_port
        );
        Self {
            client,
            link: link_rx,
            stale_after,
            eventloop_task,
        }
    }
}

impl TemperatureSensor for RemoteSensor {
    fn read_temperature(&mut self) -> Result<Temperature, SensorError> {
        self.link.borrow().reading(Instant::now(), self.stale_after)
    }

    fn disconnect(&mut self) {
        if let Err(err) = self.client.try_disconnect() {
            debug!("mqtt disconnect request failed: {err}");
        }
        self.eventloop_task.abort();
        info!("sensor link closed");
    }
}

async fn drive_link(client: AsyncClient, mut eventloop: EventLoop, link: watch::Sender<SensorLink>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                info!("sensor link connected");
                // Clean sessions drop subscriptions, so renew them on every connect.
                for topic in [TOPIC_SENSOR_TEMP, TOPIC_SENSOR_STATUS] {
                    if let Err(err) = client.try_subscribe(topic, QoS::AtLeastOnce) {
                        warn!("failed to subscribe to {topic}: {err}");
                    }
                }
                link.send_modify(SensorLink::on_connected);
            }
            Ok(Event::Incoming(Incoming::Publish(message))) => {
                if message.payload.len() > MAX_MQTT_PAYLOAD_BYTES {
                    warn!(
                        "dropping oversized sensor payload on {} ({} bytes)",
                        message.topic,
                        message.payload.len()
                    );
                    continue;
                }

                let payload = String::from_utf8_lossy(&message.payload);
                match message.topic.as_str() {
                    TOPIC_SENSOR_TEMP => {
                        link.send_modify(|state| state.on_temperature(&payload, Instant::now()))
                    }
                    TOPIC_SENSOR_STATUS => link.send_modify(|state| state.on_status(&payload)),
                    _ => {}
                }
            }
            Ok(_) => {}
            Err(err) => {
                warn!("sensor link error: {err}");
                link.send_modify(SensorLink::on_disconnected);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
