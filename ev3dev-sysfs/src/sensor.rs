//! LEGO sensor handle (`lego-sensor/sensorN`).

use std::{collections::BTreeMap, time::Duration};

use crate::{
    chain::{ensure_listed, ErrorSink},
    device::{Device, DeviceClass},
    error::{Error, Result},
    locator::{Locator, Resolved, ADDRESS, DRIVER_NAME},
};

const BIN_DATA_FORMAT: &str = "bin_data_format";
const COMMAND: &str = "command";
const COMMANDS: &str = "commands";
const DECIMALS: &str = "decimals";
const MODE: &str = "mode";
const MODES: &str = "modes";
const NUM_VALUES: &str = "num_values";
const POLL_MS: &str = "poll_ms";
const UEVENT: &str = "uevent";
const UNITS: &str = "units";

/// Longest poll period that fits the driver's 32-bit millisecond field.
pub const MAX_POLL: Duration = Duration::from_millis(i32::MAX as u64);

#[derive(Debug)]
pub struct Sensor {
    device: Device,
    pending: Option<Error>,
}

impl ErrorSink for Sensor {
    fn pending(&mut self) -> &mut Option<Error> {
        &mut self.pending
    }
}

impl Sensor {
    pub const CLASS: DeviceClass = DeviceClass::Sensor;

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

    /// The next sensor bound to the same driver as this one.
    pub fn next(&mut self, locator: &Locator) -> Result<Self> {
        self.query(|s| {
            let driver = s.device.attr(DRIVER_NAME).read()?;
            let after = s.device.id().unwrap_or_default();
            locator
                .next(Self::CLASS, &driver, after)
                .map(Self::from_device)
        })
    }

    pub fn address(&mut self) -> Result<String> {
        self.query(|s| s.device.attr(ADDRESS).read())
    }

    pub fn driver_name(&mut self) -> Result<String> {
        self.query(|s| s.device.attr(DRIVER_NAME).read())
    }

    pub fn commands(&mut self) -> Result<Vec<String>> {
        self.query(|s| s.device.attr(COMMANDS).read_list())
    }

    pub fn command(&mut self, comm: &str) -> &mut Self {
        self.act(|s| {
            let available = s.device.attr(COMMANDS).read_list()?;
            ensure_listed(COMMAND, comm, &available)?;
            s.device.attr(COMMAND).write_command(comm)
        })
    }

    pub fn modes(&mut self) -> Result<Vec<String>> {
        self.query(|s| s.device.attr(MODES).read_list())
    }

    pub fn mode(&mut self) -> Result<String> {
        self.query(|s| s.device.attr(MODE).read())
    }

    /// Select a mode. Must be one of `modes`.
    pub fn set_mode(&mut self, mode: &str) -> &mut Self {
        self.act(|s| {
            let available = s.device.attr(MODES).read_list()?;
            ensure_listed(MODE, mode, &available)?;
            s.device.attr(MODE).write_value(mode)
        })
    }

    /// Number of `valueN` attributes valid in the current mode.
    pub fn num_values(&mut self) -> Result<usize> {
        self.query(|s| s.read_num_values())
    }

    /// Raw text of `value<n>`. `n` must be below `num_values`.
    pub fn value(&mut self, n: usize) -> Result<String> {
        self.query(|s| s.read_value(n))
    }

    /// `value<n>` scaled by the current mode's `decimals`.
    pub fn scaled_value(&mut self, n: usize) -> Result<f64> {
        self.query(|s| {
            let text = s.read_value(n)?;
            let attr = format!("value{n}");
            let raw: i64 = text.parse().map_err(|_| Error::parse(attr, text))?;
            let decimals = s.device.attr(DECIMALS).read_int()?;
            let decimals = i32::try_from(decimals)
                .map_err(|_| Error::parse(DECIMALS, decimals.to_string()))?;
            Ok(raw as f64 / 10f64.powi(decimals))
        })
    }

    pub fn decimals(&mut self) -> Result<i64> {
        self.query(|s| s.device.attr(DECIMALS).read_int())
    }

    pub fn units(&mut self) -> Result<String> {
        self.query(|s| s.device.attr(UNITS).read())
    }

    pub fn bin_data_format(&mut self) -> Result<String> {
        self.query(|s| s.device.attr(BIN_DATA_FORMAT).read())
    }

    /// Current polling period.
    ///
    /// A negative value on the device is reported as [`Error::Parse`]; use
    /// `device().attr(..).read_millis()` for the raw signed count.
    pub fn poll_rate(&mut self) -> Result<Duration> {
        self.query(|s| {
            let ms = s.device.attr(POLL_MS).read_millis()?;
            u64::try_from(ms)
                .map(Duration::from_millis)
                .map_err(|_| Error::parse(POLL_MS, ms.to_string()))
        })
    }

    /// Set the polling period. Zero disables polling.
    pub fn set_poll_rate(&mut self, rate: Duration) -> &mut Self {
        self.act(|s| {
            if rate > MAX_POLL {
                return Err(Error::validation(
                    POLL_MS,
                    format!("{} ms exceeds {} ms", rate.as_millis(), MAX_POLL.as_millis()),
                ));
            }
            s.device.attr(POLL_MS).write_value(rate.as_millis())
        })
    }

    pub fn uevent(&mut self) -> Result<BTreeMap<String, String>> {
        self.query(|s| s.device.attr(UEVENT).read_map())
    }

    fn read_num_values(&self) -> Result<usize> {
        let n = self.device.attr(NUM_VALUES).read_int()?;
        usize::try_from(n).map_err(|_| Error::parse(NUM_VALUES, n.to_string()))
    }

    fn read_value(&self, n: usize) -> Result<String> {
        let count = self.read_num_values()?;
        let attr = format!("value{n}");
        if n >= count {
            return Err(Error::validation(
                attr,
                format!("index {n} out of range, sensor has {count} values"),
            ));
        }
        self.device.attr(&attr).read()
    }
}
