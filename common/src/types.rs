use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ThermostatError;

/// Whole degrees Fahrenheit.
pub type Temperature = i32;

/// Sentinel for "no reading yet".
pub const NO_READING: Temperature = 0;

pub const MIN_DESIRED_F: Temperature = 60;
pub const MAX_DESIRED_F: Temperature = 85;
pub const DEFAULT_DESIRED_F: Temperature = 75;

/// Readings must lie strictly between these bounds to be accepted.
pub const SANITY_LOW_F: Temperature = 50;
pub const SANITY_HIGH_F: Temperature = 90;

pub fn is_valid_desired(temp_f: Temperature) -> bool {
    (MIN_DESIRED_F..=MAX_DESIRED_F).contains(&temp_f)
}

pub fn is_sane_reading(temp_f: Temperature) -> bool {
    temp_f > SANITY_LOW_F && temp_f < SANITY_HIGH_F
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemMode {
    #[default]
    Off,
    Cool,
    Heat,
}

impl SystemMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Cool => "cool",
            Self::Heat => "heat",
        }
    }
}

impl FromStr for SystemMode {
    type Err = ThermostatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "cool" => Ok(Self::Cool),
            "heat" => Ok(Self::Heat),
            _ => Err(ThermostatError::InvalidSystemMode(value.to_string())),
        }
    }
}

impl fmt::Display for SystemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanMode {
    #[default]
    Auto,
    On,
}

impl FanMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::On => "on",
        }
    }
}

impl FromStr for FanMode {
    type Err = ThermostatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "on" => Ok(Self::On),
            _ => Err(ThermostatError::InvalidFanMode(value.to_string())),
        }
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single physical actuation driven at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputState {
    Off,
    Fan,
    Cool,
    Heat,
}

impl OutputState {
    /// Maps thermostat intent onto the output. Earlier rules win: no reading means
    /// off, active conditioning beats a fan-only request, and the default is off.
    pub fn decide(state: &ThermostatState) -> Self {
        if state.current == NO_READING {
            return Self::Off;
        }

        match state.sysmode {
            SystemMode::Cool if state.current > state.desired => return Self::Cool,
            SystemMode::Heat if state.current < state.desired => return Self::Heat,
            _ => {}
        }

        if state.fanmode == FanMode::On {
            Self::Fan
        } else {
            Self::Off
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Fan => "fan",
            Self::Cool => "cool",
            Self::Heat => "heat",
        }
    }

    /// Relay lines energised for this output. Conditioning always runs the fan.
    pub fn relay_lines(self) -> RelayLines {
        match self {
            Self::Off => RelayLines {
                fan: false,
                cool: false,
                heat: false,
            },
            Self::Fan => RelayLines {
                fan: true,
                cool: false,
                heat: false,
            },
            Self::Cool => RelayLines {
                fan: true,
                cool: true,
                heat: false,
            },
            Self::Heat => RelayLines {
                fan: true,
                cool: false,
                heat: true,
            },
        }
    }
}

impl fmt::Display for OutputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayLines {
    pub fan: bool,
    pub cool: bool,
    pub heat: bool,
}

/// Snapshot of the thermostat record, also the `/api` wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThermostatState {
    pub current: Temperature,
    pub desired: Temperature,
    pub sysmode: SystemMode,
    pub fanmode: FanMode,
}

impl Default for ThermostatState {
    fn default() -> Self {
        Self {
            current: NO_READING,
            desired: DEFAULT_DESIRED_F,
            sysmode: SystemMode::Off,
            fanmode: FanMode::Auto,
        }
    }
}

impl ThermostatState {
    pub fn has_reading(&self) -> bool {
        self.current != NO_READING
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub current: Temperature,
    pub desired: Temperature,
    pub sysmode: SystemMode,
    pub fanmode: FanMode,
    pub output: OutputState,
    #[serde(rename = "hasReading")]
    pub has_reading: bool,
}

impl From<ThermostatState> for ControllerStatus {
    fn from(state: ThermostatState) -> Self {
        Self {
            current: state.current,
            desired: state.desired,
            sysmode: state.sysmode,
            fanmode: state.fanmode,
            output: OutputState::decide(&state),
            has_reading: state.has_reading(),
        }
    }
}
