//! Device classes and the located-device capability.
//!
//! A [`Device`] is only ever produced by [`crate::locator::Locator`]. Handles
//! hold one and derive every attribute path from it, so application code has
//! no way to point a handle at a directory it did not discover.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    attribute::Attribute,
    error::{Error, Result},
};

/// A category of hardware with its own directory under the class root.
///
/// The string form is the class directory name, e.g. `tacho-motor`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum DeviceClass {
    #[strum(serialize = "tacho-motor")]
    TachoMotor,
    #[strum(serialize = "dc-motor")]
    DcMotor,
    #[strum(serialize = "servo-motor")]
    ServoMotor,
    #[strum(serialize = "lego-sensor")]
    Sensor,
    #[strum(serialize = "lego-port")]
    Port,
    #[strum(serialize = "leds")]
    Led,
    #[strum(serialize = "power_supply")]
    PowerSupply,
}

impl DeviceClass {
    /// Directory name under the class root.
    pub fn dir_name(self) -> &'static str {
        self.into()
    }

    /// Fixed prefix of numbered device directories, e.g. `motor` for
    /// `motor0`. `None` for classes whose entries are named, not numbered.
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            DeviceClass::TachoMotor | DeviceClass::DcMotor | DeviceClass::ServoMotor => {
                Some("motor")
            }
            DeviceClass::Sensor => Some("sensor"),
            DeviceClass::Port => Some("port"),
            DeviceClass::Led | DeviceClass::PowerSupply => None,
        }
    }
}

/// One connected device of a class, as found by the locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    class: DeviceClass,
    name: String,
    id: Option<u32>,
    dir: PathBuf,
    poll_interval: Duration,
}

impl Device {
    pub(crate) fn new(
        class: DeviceClass,
        name: String,
        id: Option<u32>,
        dir: PathBuf,
        poll_interval: Duration,
    ) -> Self {
        Self {
            class,
            name,
            id,
            dir,
            poll_interval,
        }
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    /// Directory name, e.g. `motor0` or `lego-ev3-battery`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number parsed from the directory name. Only meaningful for the
    /// enumeration pass that produced this device; `None` for named classes.
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Re-read interval used when an attribute cannot deliver change
    /// notifications.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Reference to one attribute file of this device.
    pub fn attr<'a>(&'a self, name: &'a str) -> Attribute<'a> {
        Attribute::new(&self.dir, name)
    }

    /// Names of the attribute files present in the device directory,
    /// sorted. Subdirectories and links are not attributes and are skipped.
    pub fn attribute_names(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.dir, e))?;
            let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
