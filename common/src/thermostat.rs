use crate::{
    config::PersistedSettings,
    error::ThermostatError,
    types::{
        is_sane_reading, is_valid_desired, FanMode, OutputState, SystemMode, Temperature,
        ThermostatState, NO_READING,
    },
};

/// Validated whole-record change. Every field is checked before any is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub desired: Option<Temperature>,
    pub sysmode: Option<SystemMode>,
    pub fanmode: Option<FanMode>,
}

/// Owns the thermostat record. Every accepted mutation returns the output the
/// actuator must now be driven to; callers apply it even when unchanged.
#[derive(Debug, Clone, Default)]
pub struct ThermostatEngine {
    state: ThermostatState,
}

impl ThermostatEngine {
    pub fn new(settings: PersistedSettings) -> Result<Self, ThermostatError> {
        settings.validate()?;
        Ok(Self {
            state: ThermostatState {
                desired: settings.desired,
                sysmode: settings.sysmode,
                fanmode: settings.fanmode,
                ..ThermostatState::default()
            },
        })
    }

    pub fn snapshot(&self) -> ThermostatState {
        self.state
    }

    pub fn settings(&self) -> PersistedSettings {
        PersistedSettings::from(self.state)
    }

    pub fn output(&self) -> OutputState {
        OutputState::decide(&self.state)
    }

    pub fn set_desired_temperature(
        &mut self,
        temp_f: Temperature,
    ) -> Result<OutputState, ThermostatError> {
        if !is_valid_desired(temp_f) {
            return Err(ThermostatError::DesiredOutOfRange(temp_f));
        }
        self.state.desired = temp_f;
        Ok(self.output())
    }

    pub fn set_system_mode(&mut self, mode: SystemMode) -> OutputState {
        self.state.sysmode = mode;
        self.output()
    }

    pub fn set_fan_mode(&mut self, mode: FanMode) -> OutputState {
        self.state.fanmode = mode;
        self.output()
    }

    pub fn apply_update(&mut self, update: StateUpdate) -> Result<OutputState, ThermostatError> {
        if let Some(desired) = update.desired.filter(|temp_f| !is_valid_desired(*temp_f)) {
            return Err(ThermostatError::DesiredOutOfRange(desired));
        }

        if let Some(desired) = update.desired {
            self.state.desired = desired;
        }
        if let Some(mode) = update.sysmode {
            self.state.sysmode = mode;
        }
        if let Some(mode) = update.fanmode {
            self.state.fanmode = mode;
        }
        Ok(self.output())
    }

    /// Readings outside the sanity band are noise: discarded, `None` returned.
    pub fn report_current_temperature(&mut self, temp_f: Temperature) -> Option<OutputState> {
        if !is_sane_reading(temp_f) {
            return None;
        }
        self.state.current = temp_f;
        Some(self.output())
    }

    /// Fail-safe for a broken or disconnected sensor. The system mode drops to off
    /// and the last reading is forgotten, so the derived output is off even with
    /// the fan set to on, until the sensor reports again.
    pub fn report_sensor_failure(&mut self) -> OutputState {
        self.state.sysmode = SystemMode::Off;
        self.state.current = NO_READING;
        self.output()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn engine_with(sysmode: SystemMode, desired: Temperature, fanmode: FanMode) -> ThermostatEngine {
        ThermostatEngine::new(PersistedSettings {
            desired,
            sysmode,
            fanmode,
        })
        .unwrap()
    }

    #[test]
    fn defaults_start_off_without_reading() {
        let engine = ThermostatEngine::default();

        assert_eq!(
            engine.snapshot(),
            ThermostatState {
                current: NO_READING,
                desired: 75,
                sysmode: SystemMode::Off,
                fanmode: FanMode::Auto,
            }
        );
        assert_eq!(engine.output(), OutputState::Off);
    }

    #[test]
    fn rejects_invalid_persisted_settings() {
        let result = ThermostatEngine::new(PersistedSettings {
            desired: 59,
            ..PersistedSettings::default()
        });

        assert_eq!(result.err(), Some(ThermostatError::DesiredOutOfRange(59)));
    }

    #[test]
    fn cooling_runs_above_setpoint() {
        let mut engine = engine_with(SystemMode::Cool, 72, FanMode::Auto);

        assert_eq!(engine.report_current_temperature(78), Some(OutputState::Cool));
    }

    #[test]
    fn below_setpoint_in_cool_follows_fan_mode() {
        let mut engine = engine_with(SystemMode::Cool, 72, FanMode::Auto);
        assert_eq!(engine.report_current_temperature(70), Some(OutputState::Off));

        assert_eq!(engine.set_fan_mode(FanMode::On), OutputState::Fan);
    }

    #[test]
    fn heating_runs_below_setpoint() {
        let mut engine = engine_with(SystemMode::Heat, 70, FanMode::Auto);

        assert_eq!(engine.report_current_temperature(65), Some(OutputState::Heat));
    }

    #[test]
    fn raising_desired_starts_heat() {
        let mut engine = engine_with(SystemMode::Heat, 66, FanMode::Auto);
        engine.report_current_temperature(68);
        assert_eq!(engine.output(), OutputState::Off);

        assert_eq!(engine.set_desired_temperature(72), Ok(OutputState::Heat));
    }

    #[test]
    fn sensor_failure_forces_off() {
        let mut engine = engine_with(SystemMode::Heat, 70, FanMode::On);
        engine.report_current_temperature(65);
        assert_eq!(engine.output(), OutputState::Heat);

        assert_eq!(engine.report_sensor_failure(), OutputState::Off);
        assert_eq!(engine.snapshot().sysmode, SystemMode::Off);
        assert_eq!(engine.snapshot().current, NO_READING);
        assert_eq!(engine.output(), OutputState::Off);
    }

    #[test]
    fn sensor_failure_overrides_fan_on() {
        let mut engine = engine_with(SystemMode::Cool, 70, FanMode::On);
        engine.report_current_temperature(75);

        assert_eq!(engine.report_sensor_failure(), OutputState::Off);
        assert_eq!(engine.output(), OutputState::Off);
        assert_eq!(engine.snapshot().fanmode, FanMode::On);

        assert_eq!(engine.report_current_temperature(75), Some(OutputState::Fan));
    }

    #[test]
    fn update_is_all_or_nothing() {
        let mut engine = engine_with(SystemMode::Cool, 72, FanMode::Auto);
        let before = engine.snapshot();

        let result = engine.apply_update(StateUpdate {
            desired: Some(95),
            sysmode: Some(SystemMode::Heat),
            fanmode: Some(FanMode::On),
        });

        assert_eq!(result, Err(ThermostatError::DesiredOutOfRange(95)));
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn update_applies_supplied_fields_only() {
        let mut engine = engine_with(SystemMode::Off, 72, FanMode::Auto);
        engine.report_current_temperature(66);

        let output = engine.apply_update(StateUpdate {
            sysmode: Some(SystemMode::Heat),
            ..StateUpdate::default()
        });

        assert_eq!(output, Ok(OutputState::Heat));
        assert_eq!(engine.snapshot().desired, 72);
        assert_eq!(engine.snapshot().fanmode, FanMode::Auto);
    }

    #[test]
    fn settings_drop_current_reading() {
        let mut engine = engine_with(SystemMode::Heat, 70, FanMode::On);
        engine.report_current_temperature(65);

        assert_eq!(
            engine.settings(),
            PersistedSettings {
                desired: 70,
                sysmode: SystemMode::Heat,
                fanmode: FanMode::On,
            }
        );
    }

    fn any_sysmode() -> impl Strategy<Value = SystemMode> {
        prop_oneof![
            Just(SystemMode::Off),
            Just(SystemMode::Cool),
            Just(SystemMode::Heat)
        ]
    }

    fn any_fanmode() -> impl Strategy<Value = FanMode> {
        prop_oneof![Just(FanMode::Auto), Just(FanMode::On)]
    }

    proptest! {
        #[test]
        fn desired_in_range_is_accepted(temp in 60i32..=85) {
            let mut engine = ThermostatEngine::default();
            prop_assert!(engine.set_desired_temperature(temp).is_ok());
            prop_assert_eq!(engine.snapshot().desired, temp);
        }

        #[test]
        fn desired_out_of_range_leaves_state(temp in prop_oneof![i32::MIN..60, 86i32..=i32::MAX]) {
            let mut engine = ThermostatEngine::default();
            engine.report_current_temperature(70);
            let before = engine.snapshot();

            prop_assert_eq!(
                engine.set_desired_temperature(temp),
                Err(ThermostatError::DesiredOutOfRange(temp))
            );
            prop_assert_eq!(engine.snapshot(), before);
        }

        #[test]
        fn sane_readings_update_current(temp in 51i32..=89) {
            let mut engine = ThermostatEngine::default();
            prop_assert!(engine.report_current_temperature(temp).is_some());
            prop_assert_eq!(engine.snapshot().current, temp);
        }

        #[test]
        fn insane_readings_are_discarded(temp in prop_oneof![i32::MIN..=50, 90i32..=i32::MAX]) {
            let mut engine = ThermostatEngine::default();
            engine.report_current_temperature(72);

            prop_assert_eq!(engine.report_current_temperature(temp), None);
            prop_assert_eq!(engine.snapshot().current, 72);
        }

        #[test]
        fn repeated_mutation_is_idempotent(
            sysmode in any_sysmode(),
            fanmode in any_fanmode(),
            desired in 60i32..=85,
            current in 51i32..=89,
        ) {
            let mut engine = ThermostatEngine::default();
            engine.report_current_temperature(current);
            engine.set_fan_mode(fanmode);

            let first = engine.set_system_mode(sysmode);
            let second = engine.set_system_mode(sysmode);
            prop_assert_eq!(first, second);

            let first = engine.set_desired_temperature(desired);
            let second = engine.set_desired_temperature(desired);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn without_reading_output_is_off(
            sysmode in any_sysmode(),
            fanmode in any_fanmode(),
            desired in 60i32..=85,
        ) {
            let mut engine = engine_with(sysmode, desired, fanmode);
            prop_assert_eq!(engine.output(), OutputState::Off);
            prop_assert_eq!(engine.set_fan_mode(fanmode), OutputState::Off);
        }

        #[test]
        fn failure_always_ends_off(
            sysmode in any_sysmode(),
            fanmode in any_fanmode(),
            current in 51i32..=89,
        ) {
            let mut engine = engine_with(sysmode, 72, fanmode);
            engine.report_current_temperature(current);

            prop_assert_eq!(engine.report_sensor_failure(), OutputState::Off);
            prop_assert_eq!(engine.output(), OutputState::Off);
            prop_assert_eq!(engine.snapshot().sysmode, SystemMode::Off);
        }
    }
}
