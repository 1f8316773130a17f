//! LED handle (`leds/<name>`).
//!
//! LED directories are named rather than numbered, e.g.
//! `led0:green:brick-status`, so they are opened by name.

use std::time::Duration;

use crate::{
    chain::{ensure_listed, ensure_range, ErrorSink},
    device::{Device, DeviceClass},
    error::{Error, Result},
    locator::Locator,
};

const BRIGHTNESS: &str = "brightness";
const DELAY_OFF: &str = "delay_off";
const DELAY_ON: &str = "delay_on";
const MAX_BRIGHTNESS: &str = "max_brightness";
const TRIGGER: &str = "trigger";

#[derive(Debug)]
pub struct Led {
    device: Device,
    pending: Option<Error>,
}

impl ErrorSink for Led {
    fn pending(&mut self) -> &mut Option<Error> {
        &mut self.pending
    }
}

impl Led {
    pub const CLASS: DeviceClass = DeviceClass::Led;

    pub fn named(locator: &Locator, name: &str) -> Result<Self> {
        Ok(Self {
            device: locator.named(Self::CLASS, name)?,
            pending: None,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn brightness(&mut self) -> Result<i64> {
        self.query(|l| l.device.attr(BRIGHTNESS).read_int())
    }

    pub fn max_brightness(&mut self) -> Result<i64> {
        self.query(|l| l.device.attr(MAX_BRIGHTNESS).read_int())
    }

    /// Set brightness in `0..=max_brightness`.
    pub fn set_brightness(&mut self, brightness: i64) -> &mut Self {
        self.act(|l| {
            let max = l.device.attr(MAX_BRIGHTNESS).read_int()?;
            ensure_range(BRIGHTNESS, brightness, 0, max)?;
            l.device.attr(BRIGHTNESS).write_value(brightness)
        })
    }

    /// All available triggers, with the brackets around the active one
    /// removed.
    pub fn triggers(&mut self) -> Result<Vec<String>> {
        self.query(|l| Ok(l.read_triggers()?.0))
    }

    /// The active trigger, or `None` if the kernel marks none of them.
    pub fn trigger(&mut self) -> Result<Option<String>> {
        self.query(|l| Ok(l.read_triggers()?.1))
    }

    pub fn set_trigger(&mut self, trigger: &str) -> &mut Self {
        self.act(|l| {
            let (available, _) = l.read_triggers()?;
            ensure_listed(TRIGGER, trigger, &available)?;
            l.device.attr(TRIGGER).write_value(trigger)
        })
    }

    /// On time of the `timer` trigger. The attribute only exists while that
    /// trigger is active.
    ///
    /// A negative value on the device is reported as [`Error::Parse`]; use
    /// `device().attr(..).read_millis()` for the raw signed count.
    pub fn delay_on(&mut self) -> Result<Duration> {
        self.query(|l| l.read_delay(DELAY_ON))
    }

    pub fn set_delay_on(&mut self, delay: Duration) -> &mut Self {
        self.act(|l| l.device.attr(DELAY_ON).write_value(delay.as_millis()))
    }

    /// Off time of the `timer` trigger. Negative values are a parse error,
    /// as for [`delay_on`](Self::delay_on).
    pub fn delay_off(&mut self) -> Result<Duration> {
        self.query(|l| l.read_delay(DELAY_OFF))
    }

    pub fn set_delay_off(&mut self, delay: Duration) -> &mut Self {
        self.act(|l| l.device.attr(DELAY_OFF).write_value(delay.as_millis()))
    }

    fn read_triggers(&self) -> Result<(Vec<String>, Option<String>)> {
        let list = self.device.attr(TRIGGER).read_list()?;
        Ok(parse_triggers(list))
    }

    fn read_delay(&self, attr: &str) -> Result<Duration> {
        let ms = self.device.attr(attr).read_millis()?;
        u64::try_from(ms)
            .map(Duration::from_millis)
            .map_err(|_| Error::parse(attr, ms.to_string()))
    }
}

/// Split a trigger list like `none [timer] heartbeat` into the bare names
/// and the bracketed one.
pub fn parse_triggers(list: Vec<String>) -> (Vec<String>, Option<String>) {
    let mut current = None;
    let names = list
        .into_iter()
        .map(|token| match token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            Some(name) => {
                current = Some(name.to_string());
                name.to_string()
            }
            None => token,
        })
        .collect();
    (names, current)
}
