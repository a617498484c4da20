use std::path::Path;

use tracing::{debug, info};

use thermostat_common::{Actuator, ActuatorError, OutputState, RelayConfig, RelayLines};

/// Fan/cool/heat relay board. With a sysfs GPIO root configured, each line's
/// `value` file is written; the lines must already be exported as outputs.
/// Without one, transitions are only logged.
///
/// Writes are synchronous and run on the calling runtime thread under the
/// gateway's actuator lock; sysfs `value` writes complete in microseconds.
pub struct RelayBoard {
    config: RelayConfig,
    lines: Option<RelayLines>,
    released: bool,
}

impl RelayBoard {
    /// Opens the board with every line de-energised.
    pub fn open(config: RelayConfig) -> Result<Self, ActuatorError> {
        match &config.gpio_root {
            Some(root) => info!(
                "relay board on {} (fan={}, cool={}, heat={})",
                root.display(),
                config.fan_line,
                config.cool_line,
                config.heat_line
            ),
            None => info!("no GPIO root configured, relay transitions are logged only"),
        }

        let mut board = Self {
            config,
            lines: None,
            released: false,
        };
        board.drive(OutputState::Off)?;
        Ok(board)
    }

    fn drive(&mut self, output: OutputState) -> Result<(), ActuatorError> {
        let target = output.relay_lines();
        let plan = [
            (self.config.cool_line, target.cool),
            (self.config.heat_line, target.heat),
            (self.config.fan_line, target.fan),
        ];

        // Break before make, so cool and heat never overlap mid-transition.
        for (line, _) in plan.iter().filter(|(_, energised)| !energised) {
            self.write_line(*line, false)?;
        }
        for (line, _) in plan.iter().filter(|(_, energised)| *energised) {
            self.write_line(*line, true)?;
        }

        if self.lines != Some(target) {
            debug!("relays {target:?}");
        }
        self.lines = Some(target);
        Ok(())
    }

    fn write_line(&self, line: u32, energised: bool) -> Result<(), ActuatorError> {
        let Some(root) = &self.config.gpio_root else {
            return Ok(());
        };
        let high = energised != self.config.active_low;
        write_value(root, line, high).map_err(|source| ActuatorError::Io { line, source })
    }
}

fn write_value(root: &Path, line: u32, high: bool) -> std::io::Result<()> {
    let path = root.join(format!("gpio{line}")).join("value");
    std::fs::write(path, if high { "1" } else { "0" })
}

impl Actuator for RelayBoard {
    fn set_state(&mut self, output: OutputState) -> Result<(), ActuatorError> {
        if self.released {
            return Err(ActuatorError::Released);
        }
        self.drive(output)
    }

    fn release(&mut self) -> Result<(), ActuatorError> {
        if self.released {
            return Ok(());
        }
        let result = self.drive(OutputState::Off);
        self.released = true;
        info!("relay board released");
        result
    }
}
