//! Device discovery and matching.
//!
//! The kernel publishes one directory per connected device under
//! `<root>/<class>/`, named by a fixed class prefix and a number
//! (`motor0`, `sensor3`, ...). The locator lists those directories and
//! matches them against a requested port address and driver name.
//!
//! ## Enumeration Order
//!
//! Candidates are visited in byte-wise name order, the order a directory
//! listing presents them. This is not numeric order: `motor10` comes before
//! `motor2`. Callers that care about numeric order must sort ids themselves.
//!
//! ## Driver Mismatch
//!
//! When a port is given and the device at that port is bound to a different
//! driver, the device is still returned, paired with a [`DriverMismatch`].
//! Whether that is fatal is the caller's decision; [`Resolved::strict`]
//! turns it into an error.

use std::{fs, path::PathBuf, time::Duration};

use crate::{
    config::Config,
    device::{Device, DeviceClass},
    error::{DriverMismatch, Error, Result},
    tracing::prelude::*,
};

pub(crate) const ADDRESS: &str = "address";
pub(crate) const DRIVER_NAME: &str = "driver_name";

/// A located device, plus the driver mismatch found at its port, if any.
#[derive(Debug)]
pub struct Resolved<T = Device> {
    pub device: T,
    pub mismatch: Option<DriverMismatch>,
}

impl<T> Resolved<T> {
    /// Treat a driver mismatch as an error.
    pub fn strict(self) -> Result<T> {
        match self.mismatch {
            Some(mismatch) => Err(mismatch.into()),
            None => Ok(self.device),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved {
            device: f(self.device),
            mismatch: self.mismatch,
        }
    }
}

/// Finds devices under a class root directory.
#[derive(Debug, Clone)]
pub struct Locator {
    root: PathBuf,
    poll_interval: Duration,
}

impl Locator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::from_config(&Config {
            sysfs_root: root.into(),
            ..Config::default()
        })
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            root: config.sysfs_root.clone(),
            poll_interval: config.poll_interval,
        }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn class_dir(&self, class: DeviceClass) -> PathBuf {
        self.root.join(class.dir_name())
    }

    /// Every device of `class`, in enumeration order.
    ///
    /// For numbered classes only directories carrying the class prefix are
    /// returned, and a prefixed name without a valid number is an error.
    pub fn list(&self, class: DeviceClass) -> Result<Vec<Device>> {
        let class_dir = self.class_dir(class);
        let entries = fs::read_dir(&class_dir).map_err(|e| Error::io(&class_dir, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&class_dir, e))?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => trace!(name = ?name, "Skipping non-UTF-8 entry"),
            }
        }
        names.sort();

        let mut devices = Vec::with_capacity(names.len());
        for name in names {
            let id = match class.prefix() {
                Some(prefix) => {
                    let Some(digits) = name.strip_prefix(prefix) else {
                        continue;
                    };
                    let id = digits
                        .parse::<u32>()
                        .map_err(|_| Error::MalformedDeviceName { name: name.clone() })?;
                    Some(id)
                }
                None => None,
            };
            let dir = class_dir.join(&name);
            devices.push(Device::new(class, name, id, dir, self.poll_interval));
        }

        Ok(devices)
    }

    /// Find the device of `class` at `port` bound to `driver`.
    ///
    /// With an empty `port`, the first device whose driver name equals
    /// `driver` wins. With a non-empty `port`, the first device at that
    /// address is returned; if its driver differs from a non-empty `driver`,
    /// the result carries a [`DriverMismatch`].
    pub fn resolve(&self, class: DeviceClass, port: &str, driver: &str) -> Result<Resolved> {
        for device in self.list(class)? {
            if !port.is_empty() {
                let address = device.attr(ADDRESS).read()?;
                if address != port {
                    continue;
                }
                let have = device.attr(DRIVER_NAME).read()?;
                let mismatch = (!driver.is_empty() && have != driver).then(|| DriverMismatch {
                    want: driver.to_string(),
                    have,
                });
                debug!(
                    class = %class,
                    device = device.name(),
                    port,
                    mismatch = ?mismatch,
                    "Resolved device by port"
                );
                return Ok(Resolved { device, mismatch });
            }

            let have = device.attr(DRIVER_NAME).read()?;
            if driver.is_empty() || have == driver {
                debug!(class = %class, device = device.name(), driver, "Resolved device by driver");
                return Ok(Resolved {
                    device,
                    mismatch: None,
                });
            }
        }

        Err(Error::NotFound {
            class,
            driver: driver.to_string(),
            port: (!port.is_empty()).then(|| port.to_string()),
        })
    }

    /// The first device of `class` bound to `driver` whose id is greater
    /// than `after`.
    ///
    /// Candidates are visited in name order, not id order, so chaining
    /// `resolve` and `next` can skip devices: with `motor10` and `motor3` on
    /// one driver, `resolve` yields `motor10` and `next` from 10 finds
    /// nothing. To visit every device, take [`list`](Self::list) and sort by
    /// [`Device::id`].
    pub fn next(&self, class: DeviceClass, driver: &str, after: u32) -> Result<Device> {
        for device in self.list(class)? {
            if device.id().map_or(true, |id| id <= after) {
                continue;
            }
            if device.attr(DRIVER_NAME).read()? == driver {
                debug!(class = %class, device = device.name(), after, "Found next device");
                return Ok(device);
            }
        }

        Err(Error::NotFound {
            class,
            driver: driver.to_string(),
            port: None,
        })
    }

    /// A device of an unnumbered class (LEDs, power supplies) by its
    /// directory name.
    pub fn named(&self, class: DeviceClass, name: &str) -> Result<Device> {
        let dir = self.class_dir(class).join(name);
        fs::metadata(&dir).map_err(|e| Error::io(&dir, e))?;
        Ok(Device::new(
            class,
            name.to_string(),
            None,
            dir,
            self.poll_interval,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn add_device(root: &Path, class: &str, name: &str, address: &str, driver: &str) {
        let dir = root.join(class).join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(ADDRESS), format!("{address}\n")).unwrap();
        fs::write(dir.join(DRIVER_NAME), format!("{driver}\n")).unwrap();
    }

    fn motor_tree() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        add_device(tmp.path(), "tacho-motor", "motor10", "outD", "lego-ev3-l-motor");
        add_device(tmp.path(), "tacho-motor", "motor2", "outA", "lego-ev3-m-motor");
        add_device(tmp.path(), "tacho-motor", "motor3", "outB", "lego-ev3-l-motor");
        add_device(tmp.path(), "tacho-motor", "motor4", "outC", "lego-ev3-m-motor");
        tmp
    }

    #[test]
    fn test_list_uses_name_order() {
        let tmp = motor_tree();
        fs::write(tmp.path().join("tacho-motor").join("uevent"), "").unwrap();

        let locator = Locator::new(tmp.path());
        let ids: Vec<_> = locator
            .list(DeviceClass::TachoMotor)
            .unwrap()
            .iter()
            .map(|d| d.id().unwrap())
            .collect();
        assert_eq!(ids, vec![10, 2, 3, 4]);
    }

    #[test]
    fn test_resolve_by_driver_takes_first_in_enumeration_order() {
        let tmp = motor_tree();
        let locator = Locator::new(tmp.path());

        let resolved = locator
            .resolve(DeviceClass::TachoMotor, "", "lego-ev3-l-motor")
            .unwrap();
        assert_eq!(resolved.device.id(), Some(10));
        assert!(resolved.mismatch.is_none());

        let resolved = locator
            .resolve(DeviceClass::TachoMotor, "", "lego-ev3-m-motor")
            .unwrap();
        assert_eq!(resolved.device.id(), Some(2));
    }

    #[test]
    fn test_resolve_by_port() {
        let tmp = motor_tree();
        let locator = Locator::new(tmp.path());

        let resolved = locator
            .resolve(DeviceClass::TachoMotor, "outB", "lego-ev3-l-motor")
            .unwrap();
        assert_eq!(resolved.device.name(), "motor3");
        assert!(resolved.mismatch.is_none());

        let resolved = locator.resolve(DeviceClass::TachoMotor, "outC", "").unwrap();
        assert_eq!(resolved.device.name(), "motor4");
        assert!(resolved.mismatch.is_none());
    }

    #[test]
    fn test_resolve_reports_driver_mismatch() {
        let tmp = motor_tree();
        let locator = Locator::new(tmp.path());

        let resolved = locator
            .resolve(DeviceClass::TachoMotor, "outA", "lego-ev3-l-motor")
            .unwrap();
        assert_eq!(resolved.device.id(), Some(2));
        assert_eq!(
            resolved.mismatch,
            Some(DriverMismatch {
                want: "lego-ev3-l-motor".into(),
                have: "lego-ev3-m-motor".into(),
            })
        );
        assert!(matches!(resolved.strict(), Err(Error::DriverMismatch(_))));
    }

    #[test]
    fn test_resolve_not_found() {
        let tmp = motor_tree();
        let locator = Locator::new(tmp.path());

        let err = locator
            .resolve(DeviceClass::TachoMotor, "outZ", "lego-ev3-l-motor")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound { ref port, .. } if port.as_deref() == Some("outZ")
        ));

        let err = locator
            .resolve(DeviceClass::TachoMotor, "", "lego-nxt-motor")
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { port: None, .. }));
    }

    #[test]
    fn test_missing_class_dir_is_io_error() {
        let tmp = motor_tree();
        let locator = Locator::new(tmp.path());
        let err = locator
            .resolve(DeviceClass::Sensor, "", "lego-ev3-touch")
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_malformed_name_is_error() {
        let tmp = motor_tree();
        add_device(tmp.path(), "tacho-motor", "motorX", "outX", "lego-ev3-l-motor");
        let locator = Locator::new(tmp.path());

        let err = locator
            .resolve(DeviceClass::TachoMotor, "", "lego-ev3-l-motor")
            .unwrap_err();
        assert!(matches!(err, Error::MalformedDeviceName { ref name } if name == "motorX"));
    }

    #[test]
    fn test_next_walks_same_driver() {
        let tmp = motor_tree();
        let locator = Locator::new(tmp.path());

        let device = locator
            .next(DeviceClass::TachoMotor, "lego-ev3-m-motor", 2)
            .unwrap();
        assert_eq!(device.id(), Some(4));

        let device = locator
            .next(DeviceClass::TachoMotor, "lego-ev3-l-motor", 3)
            .unwrap();
        assert_eq!(device.id(), Some(10));

        assert!(matches!(
            locator.next(DeviceClass::TachoMotor, "lego-ev3-l-motor", 10),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_then_next_skips_lower_ids() {
        let tmp = motor_tree();
        let locator = Locator::new(tmp.path());

        let first = locator
            .resolve(DeviceClass::TachoMotor, "", "lego-ev3-l-motor")
            .unwrap()
            .device;
        assert_eq!(first.id(), Some(10));
        assert!(matches!(
            locator.next(DeviceClass::TachoMotor, "lego-ev3-l-motor", 10),
            Err(Error::NotFound { .. })
        ));

        let mut ids: Vec<_> = locator
            .list(DeviceClass::TachoMotor)
            .unwrap()
            .iter()
            .filter(|d| d.attr(DRIVER_NAME).read().unwrap() == "lego-ev3-l-motor")
            .filter_map(Device::id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, [3, 10]);
    }

    #[test]
    fn test_named_device() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("power_supply/lego-ev3-battery")).unwrap();
        let locator = Locator::new(tmp.path());

        let device = locator
            .named(DeviceClass::PowerSupply, "lego-ev3-battery")
            .unwrap();
        assert_eq!(device.id(), None);
        assert!(device.dir().ends_with("power_supply/lego-ev3-battery"));

        assert!(matches!(
            locator.named(DeviceClass::PowerSupply, "missing"),
            Err(Error::Io { .. })
        ));
    }
}
