//! LEGO port handle (`lego-port/portN`).
//!
//! Ports describe the physical input/output sockets and let the caller force
//! a port into a mode or load a specific device driver on it.

use crate::{
    chain::{ensure_listed, ErrorSink},
    device::{Device, DeviceClass},
    error::{Error, Result},
    locator::{Locator, ADDRESS, DRIVER_NAME},
};

const MODE: &str = "mode";
const MODES: &str = "modes";
const SET_DEVICE: &str = "set_device";
const STATUS: &str = "status";

#[derive(Debug)]
pub struct LegoPort {
    device: Device,
    pending: Option<Error>,
}

impl ErrorSink for LegoPort {
    fn pending(&mut self) -> &mut Option<Error> {
        &mut self.pending
    }
}

impl LegoPort {
    pub const CLASS: DeviceClass = DeviceClass::Port;

    /// The port with the given address, whatever driver runs it.
    pub fn at(locator: &Locator, address: &str) -> Result<Self> {
        let resolved = locator.resolve(Self::CLASS, address, "")?;
        Ok(Self {
            device: resolved.device,
            pending: None,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn address(&mut self) -> Result<String> {
        self.query(|p| p.device.attr(ADDRESS).read())
    }

    pub fn driver_name(&mut self) -> Result<String> {
        self.query(|p| p.device.attr(DRIVER_NAME).read())
    }

    pub fn modes(&mut self) -> Result<Vec<String>> {
        self.query(|p| p.device.attr(MODES).read_list())
    }

    pub fn mode(&mut self) -> Result<String> {
        self.query(|p| p.device.attr(MODE).read())
    }

    pub fn set_mode(&mut self, mode: &str) -> &mut Self {
        self.act(|p| {
            let available = p.device.attr(MODES).read_list()?;
            ensure_listed(MODE, mode, &available)?;
            p.device.attr(MODE).write_value(mode)
        })
    }

    /// Load `driver` for the device attached to this port. Only valid in
    /// modes that do not auto-detect.
    pub fn set_device(&mut self, driver: &str) -> &mut Self {
        self.act(|p| p.device.attr(SET_DEVICE).write_value(driver))
    }

    pub fn status(&mut self) -> Result<String> {
        self.query(|p| p.device.attr(STATUS).read())
    }
}
