//! Power supply handle (`power_supply/<name>`).

use std::collections::BTreeMap;

use crate::{
    chain::ErrorSink,
    device::{Device, DeviceClass},
    error::{Error, Result},
    locator::Locator,
};

/// Name of the EV3 brick's own battery.
pub const EV3_BATTERY: &str = "lego-ev3-battery";

const CURRENT_NOW: &str = "current_now";
const TECHNOLOGY: &str = "technology";
const TYPE: &str = "type";
const UEVENT: &str = "uevent";
const VOLTAGE_MAX_DESIGN: &str = "voltage_max_design";
const VOLTAGE_MIN_DESIGN: &str = "voltage_min_design";
const VOLTAGE_NOW: &str = "voltage_now";

// The kernel reports microvolts and microamps.
const MICRO: f64 = 1e-6;

#[derive(Debug)]
pub struct PowerSupply {
    device: Device,
    pending: Option<Error>,
}

impl ErrorSink for PowerSupply {
    fn pending(&mut self) -> &mut Option<Error> {
        &mut self.pending
    }
}

impl PowerSupply {
    pub const CLASS: DeviceClass = DeviceClass::PowerSupply;

    pub fn named(locator: &Locator, name: &str) -> Result<Self> {
        Ok(Self {
            device: locator.named(Self::CLASS, name)?,
            pending: None,
        })
    }

    pub fn battery(locator: &Locator) -> Result<Self> {
        Self::named(locator, EV3_BATTERY)
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Volts.
    pub fn voltage(&mut self) -> Result<f64> {
        self.query(|p| p.read_scaled(VOLTAGE_NOW))
    }

    /// Amps.
    pub fn current(&mut self) -> Result<f64> {
        self.query(|p| p.read_scaled(CURRENT_NOW))
    }

    pub fn voltage_max_design(&mut self) -> Result<f64> {
        self.query(|p| p.read_scaled(VOLTAGE_MAX_DESIGN))
    }

    pub fn voltage_min_design(&mut self) -> Result<f64> {
        self.query(|p| p.read_scaled(VOLTAGE_MIN_DESIGN))
    }

    pub fn technology(&mut self) -> Result<String> {
        self.query(|p| p.device.attr(TECHNOLOGY).read())
    }

    pub fn kind(&mut self) -> Result<String> {
        self.query(|p| p.device.attr(TYPE).read())
    }

    pub fn uevent(&mut self) -> Result<BTreeMap<String, String>> {
        self.query(|p| p.device.attr(UEVENT).read_map())
    }

    fn read_scaled(&self, attr: &str) -> Result<f64> {
        Ok(self.device.attr(attr).read_float()? * MICRO)
    }
}
