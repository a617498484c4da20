use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    error::ThermostatError,
    types::{is_valid_desired, FanMode, SystemMode, Temperature, ThermostatState, DEFAULT_DESIRED_F},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThermostatConfig {
    pub poll_interval_ms: u64,
    pub sensor_stale_timeout_ms: u64,
}

impl Default for ThermostatConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 60_000,
            sensor_stale_timeout_ms: 300_000,
        }
    }
}

/// The user's choices that survive a restart. The on-disk shape is
/// `{"desired": 75, "sysmode": "off", "fanmode": "auto"}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedSettings {
    pub desired: Temperature,
    pub sysmode: SystemMode,
    pub fanmode: FanMode,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            desired: DEFAULT_DESIRED_F,
            sysmode: SystemMode::Off,
            fanmode: FanMode::Auto,
        }
    }
}

impl PersistedSettings {
    pub fn validate(&self) -> Result<(), ThermostatError> {
        if !is_valid_desired(self.desired) {
            return Err(ThermostatError::DesiredOutOfRange(self.desired));
        }
        Ok(())
    }
}

impl From<ThermostatState> for PersistedSettings {
    fn from(state: ThermostatState) -> Self {
        Self {
            desired: state.desired,
            sysmode: state.sysmode,
            fanmode: state.fanmode,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    pub http_port: u16,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
        }
    }
}

/// GPIO lines of the relay board. The stock board switches on a low level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayConfig {
    pub fan_line: u32,
    pub cool_line: u32,
    pub heat_line: u32,
    pub active_low: bool,
    pub gpio_root: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            fan_line: 17,
            cool_line: 21,
            heat_line: 22,
            active_low: true,
            gpio_root: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub thermostat: ThermostatConfig,
    pub network: NetworkConfig,
    pub relays: RelayConfig,
    pub data_dir: PathBuf,
    pub ui_dir: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            thermostat: ThermostatConfig::default(),
            network: NetworkConfig::default(),
            relays: RelayConfig::default(),
            data_dir: PathBuf::from("./.thermostat"),
            ui_dir: PathBuf::from("./ui"),
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whichever variables `lookup` knows. Unparsable
    /// numbers keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let number = |key: &str| lookup(key).and_then(|value| value.trim().parse::<u64>().ok());
        let port = |key: &str| lookup(key).and_then(|value| value.trim().parse::<u16>().ok());

        if let Some(port) = port("CONTROLLER_HTTP_PORT") {
            config.network.http_port = port;
        }
        if let Some(host) = lookup("MQTT_HOST") {
            config.network.mqtt_host = host;
        }
        if let Some(port) = port("MQTT_PORT") {
            config.network.mqtt_port = port;
        }
        if let Some(user) = lookup("MQTT_USER") {
            config.network.mqtt_user = user;
        }
        if let Some(pass) = lookup("MQTT_PASS") {
            config.network.mqtt_pass = pass;
        }
        if let Some(secs) = number("THERMOSTAT_POLL_SECS").filter(|secs| *secs > 0) {
            config.thermostat.poll_interval_ms = secs * 1_000;
        }
        if let Some(secs) = number("THERMOSTAT_SENSOR_STALE_SECS").filter(|secs| *secs > 0) {
            config.thermostat.sensor_stale_timeout_ms = secs * 1_000;
        }
        if let Some(dir) = lookup("THERMOSTAT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("THERMOSTAT_UI_DIR") {
            config.ui_dir = PathBuf::from(dir);
        }
        if let Some(root) = lookup("THERMOSTAT_GPIO_ROOT").filter(|root| !root.is_empty()) {
            config.relays.gpio_root = Some(PathBuf::from(root));
        }

        config
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }
}
