//! Tacho motor handle.
//!
//! Motors with a rotation sensor, found under `tacho-motor/motorN`. The
//! handle is a thin table of attribute names over the attribute store,
//! with setpoint validation in front of every write.

use std::time::Duration;

use strum::{Display, EnumString};

use crate::{
    chain::{ensure_listed, ensure_range, ErrorSink},
    device::{Device, DeviceClass},
    error::{Error, Result},
    locator::{Locator, Resolved, ADDRESS, DRIVER_NAME},
    state::MotorState,
    wait::{self, WaitOutcome, WaitRequest},
};

const COMMAND: &str = "command";
const COMMANDS: &str = "commands";
const COUNT_PER_M: &str = "count_per_m";
const COUNT_PER_ROT: &str = "count_per_rot";
const DUTY_CYCLE: &str = "duty_cycle";
const DUTY_CYCLE_SP: &str = "duty_cycle_sp";
const FULL_TRAVEL_COUNT: &str = "full_travel_count";
const HOLD_PID_KD: &str = "hold_pid/Kd";
const HOLD_PID_KI: &str = "hold_pid/Ki";
const HOLD_PID_KP: &str = "hold_pid/Kp";
const MAX_SPEED: &str = "max_speed";
const POLARITY: &str = "polarity";
const POSITION: &str = "position";
const POSITION_SP: &str = "position_sp";
const RAMP_DOWN_SP: &str = "ramp_down_sp";
const RAMP_UP_SP: &str = "ramp_up_sp";
const SPEED: &str = "speed";
const SPEED_PID_KD: &str = "speed_pid/Kd";
const SPEED_PID_KI: &str = "speed_pid/Ki";
const SPEED_PID_KP: &str = "speed_pid/Kp";
const SPEED_SP: &str = "speed_sp";
const STATE: &str = "state";
const STOP_ACTION: &str = "stop_action";
const STOP_ACTIONS: &str = "stop_actions";
const TIME_SP: &str = "time_sp";
const UEVENT: &str = "uevent";

/// Longest ramp the driver accepts.
pub const MAX_RAMP: Duration = Duration::from_millis(60_000);

/// Longest `time_sp` that fits the driver's 32-bit millisecond field.
pub const MAX_TIME_SP: Duration = Duration::from_millis(i32::MAX as u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Polarity {
    Normal,
    Inversed,
}

/// Gains of one of the motor's PID controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pid {
    pub kp: i32,
    pub ki: i32,
    pub kd: i32,
}

/// A located tacho motor.
#[derive(Debug)]
pub struct TachoMotor {
    device: Device,
    pending: Option<Error>,
}

impl ErrorSink for TachoMotor {
    fn pending(&mut self) -> &mut Option<Error> {
        &mut self.pending
    }
}

impl TachoMotor {
    pub const CLASS: DeviceClass = DeviceClass::TachoMotor;

    /// Find the motor at `port` (or, with an empty port, the first motor)
    /// bound to `driver`.
    pub fn resolve(locator: &Locator, port: &str, driver: &str) -> Result<Resolved<Self>> {
        Ok(locator.resolve(Self::CLASS, port, driver)?.map(Self::from_device))
    }

    fn from_device(device: Device) -> Self {
        Self {
            device,
            pending: None,
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The next motor bound to the same driver as this one.
    pub fn next(&mut self, locator: &Locator) -> Result<Self> {
        self.query(|m| {
            let driver = m.device.attr(DRIVER_NAME).read()?;
            let after = m.device.id().unwrap_or_default();
            locator
                .next(Self::CLASS, &driver, after)
                .map(Self::from_device)
        })
    }

    pub fn address(&mut self) -> Result<String> {
        self.query(|m| m.device.attr(ADDRESS).read())
    }

    pub fn driver_name(&mut self) -> Result<String> {
        self.query(|m| m.device.attr(DRIVER_NAME).read())
    }

    pub fn commands(&mut self) -> Result<Vec<String>> {
        self.query(|m| m.device.attr(COMMANDS).read_list())
    }

    /// Issue a command such as `run-forever` or `stop`. The command must be
    /// one the motor lists in `commands`.
    pub fn command(&mut self, comm: &str) -> &mut Self {
        self.act(|m| {
            let available = m.device.attr(COMMANDS).read_list()?;
            ensure_listed(COMMAND, comm, &available)?;
            m.device.attr(COMMAND).write_command(comm)
        })
    }

    pub fn count_per_rot(&mut self) -> Result<i64> {
        self.query(|m| m.device.attr(COUNT_PER_ROT).read_int())
    }

    pub fn count_per_m(&mut self) -> Result<i64> {
        self.query(|m| m.device.attr(COUNT_PER_M).read_int())
    }

    pub fn full_travel_count(&mut self) -> Result<i64> {
        self.query(|m| m.device.attr(FULL_TRAVEL_COUNT).read_int())
    }

    /// Current duty cycle in percent.
    pub fn duty_cycle(&mut self) -> Result<i64> {
        self.query(|m| m.device.attr(DUTY_CYCLE).read_int())
    }

    pub fn duty_cycle_sp(&mut self) -> Result<i64> {
        self.query(|m| m.device.attr(DUTY_CYCLE_SP).read_int())
    }

    /// Set the duty cycle setpoint, in percent from -100 to 100.
    pub fn set_duty_cycle_sp(&mut self, sp: i32) -> &mut Self {
        self.act(|m| {
            ensure_range(DUTY_CYCLE_SP, sp, -100, 100)?;
            m.device.attr(DUTY_CYCLE_SP).write_value(sp)
        })
    }

    pub fn polarity(&mut self) -> Result<Polarity> {
        self.query(|m| {
            let text = m.device.attr(POLARITY).read()?;
            text.parse().map_err(|_| Error::parse(POLARITY, text))
        })
    }

    pub fn set_polarity(&mut self, polarity: Polarity) -> &mut Self {
        self.act(|m| m.device.attr(POLARITY).write_value(polarity))
    }

    pub fn position(&mut self) -> Result<i64> {
        self.query(|m| m.device.attr(POSITION).read_int())
    }

    /// Overwrite the current position count. Must fit in 32 bits.
    pub fn set_position(&mut self, pos: i64) -> &mut Self {
        self.act(|m| {
            ensure_range(POSITION, pos, i32::MIN.into(), i32::MAX.into())?;
            m.device.attr(POSITION).write_value(pos)
        })
    }

    pub fn position_sp(&mut self) -> Result<i64> {
        self.query(|m| m.device.attr(POSITION_SP).read_int())
    }

    /// Target position for `run-to-abs-pos` and `run-to-rel-pos`. Must fit
    /// in 32 bits.
    pub fn set_position_sp(&mut self, sp: i64) -> &mut Self {
        self.act(|m| {
            ensure_range(POSITION_SP, sp, i32::MIN.into(), i32::MAX.into())?;
            m.device.attr(POSITION_SP).write_value(sp)
        })
    }

    pub fn hold_pid(&mut self) -> Result<Pid> {
        self.query(|m| m.read_pid([HOLD_PID_KP, HOLD_PID_KI, HOLD_PID_KD]))
    }

    pub fn set_hold_pid(&mut self, pid: Pid) -> &mut Self {
        self.act(|m| m.write_pid([HOLD_PID_KP, HOLD_PID_KI, HOLD_PID_KD], pid))
    }

    pub fn speed_pid(&mut self) -> Result<Pid> {
        self.query(|m| m.read_pid([SPEED_PID_KP, SPEED_PID_KI, SPEED_PID_KD]))
    }

    pub fn set_speed_pid(&mut self, pid: Pid) -> &mut Self {
        self.act(|m| m.write_pid([SPEED_PID_KP, SPEED_PID_KI, SPEED_PID_KD], pid))
    }

    pub fn max_speed(&mut self) -> Result<i64> {
        self.query(|m| m.device.attr(MAX_SPEED).read_int())
    }

    /// Current speed in tacho counts per second.
    pub fn speed(&mut self) -> Result<i64> {
        self.query(|m| m.device.attr(SPEED).read_int())
    }

    pub fn speed_sp(&mut self) -> Result<i64> {
        self.query(|m| m.device.attr(SPEED_SP).read_int())
    }

    pub fn set_speed_sp(&mut self, sp: i32) -> &mut Self {
        self.act(|m| m.device.attr(SPEED_SP).write_value(sp))
    }

    /// Current ramp-up time.
    ///
    /// A negative value on the device is reported as [`Error::Parse`]; use
    /// `device().attr(..).read_millis()` for the raw signed count.
    pub fn ramp_up_sp(&mut self) -> Result<Duration> {
        self.query(|m| m.read_duration(RAMP_UP_SP))
    }

    /// Time to ramp from 0 to 100% of max speed, at most [`MAX_RAMP`].
    pub fn set_ramp_up_sp(&mut self, sp: Duration) -> &mut Self {
        self.act(|m| m.write_duration(RAMP_UP_SP, sp, MAX_RAMP))
    }

    /// Current ramp-down time. Negative values are a parse error, as for
    /// [`ramp_up_sp`](Self::ramp_up_sp).
    pub fn ramp_down_sp(&mut self) -> Result<Duration> {
        self.query(|m| m.read_duration(RAMP_DOWN_SP))
    }

    /// Time to ramp from 100% of max speed to 0, at most [`MAX_RAMP`].
    pub fn set_ramp_down_sp(&mut self, sp: Duration) -> &mut Self {
        self.act(|m| m.write_duration(RAMP_DOWN_SP, sp, MAX_RAMP))
    }

    pub fn state(&mut self) -> Result<MotorState> {
        self.query(|m| m.device.attr(STATE).read()?.parse())
    }

    pub fn stop_action(&mut self) -> Result<String> {
        self.query(|m| m.device.attr(STOP_ACTION).read())
    }

    /// Set what happens on `stop`. Must be one of `stop_actions`.
    pub fn set_stop_action(&mut self, action: &str) -> &mut Self {
        self.act(|m| {
            let available = m.device.attr(STOP_ACTIONS).read_list()?;
            ensure_listed(STOP_ACTION, action, &available)?;
            m.device.attr(STOP_ACTION).write_value(action)
        })
    }

    pub fn stop_actions(&mut self) -> Result<Vec<String>> {
        self.query(|m| m.device.attr(STOP_ACTIONS).read_list())
    }

    /// Negative values are a parse error, as for
    /// [`ramp_up_sp`](Self::ramp_up_sp).
    pub fn time_sp(&mut self) -> Result<Duration> {
        self.query(|m| m.read_duration(TIME_SP))
    }

    /// Run time for `run-timed`.
    pub fn set_time_sp(&mut self, sp: Duration) -> &mut Self {
        self.act(|m| m.write_duration(TIME_SP, sp, MAX_TIME_SP))
    }

    pub fn uevent(&mut self) -> Result<std::collections::BTreeMap<String, String>> {
        self.query(|m| m.device.attr(UEVENT).read_map())
    }

    /// Wait until the motor's `state` satisfies `request`.
    ///
    /// Reads the device directly: a pending action error stays pending and
    /// is neither returned nor cleared here.
    pub async fn wait(&self, request: &WaitRequest) -> Result<WaitOutcome> {
        let mut source = wait::state_source(&self.device.attr(STATE), self.device.poll_interval());
        wait::wait(source.as_mut(), request).await
    }

    // Durations are unsigned; a negative count on disk does not parse.
    fn read_duration(&self, attr: &str) -> Result<Duration> {
        let ms = self.device.attr(attr).read_millis()?;
        u64::try_from(ms)
            .map(Duration::from_millis)
            .map_err(|_| Error::parse(attr, ms.to_string()))
    }

    fn write_duration(&self, attr: &str, sp: Duration, max: Duration) -> Result<()> {
        if sp > max {
            return Err(Error::validation(
                attr,
                format!("{} ms exceeds {} ms", sp.as_millis(), max.as_millis()),
            ));
        }
        self.device.attr(attr).write_value(sp.as_millis())
    }

    fn read_pid(&self, [kp, ki, kd]: [&str; 3]) -> Result<Pid> {
        let gain = |attr: &str| -> Result<i32> {
            let value = self.device.attr(attr).read_int()?;
            i32::try_from(value).map_err(|_| Error::parse(attr, value.to_string()))
        };
        Ok(Pid {
            kp: gain(kp)?,
            ki: gain(ki)?,
            kd: gain(kd)?,
        })
    }

    fn write_pid(&self, [kp, ki, kd]: [&str; 3], pid: Pid) -> Result<()> {
        self.device.attr(kp).write_value(pid.kp)?;
        self.device.attr(ki).write_value(pid.ki)?;
        self.device.attr(kd).write_value(pid.kd)
    }
}
