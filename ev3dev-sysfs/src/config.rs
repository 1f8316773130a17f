//! Configuration for locating the device tree.
//!
//! Parses environment variables so the same binary can run against the real
//! `/sys/class` or against an emulated tree.

use std::{path::PathBuf, time::Duration};

use crate::tracing::prelude::*;

/// Default root of the device class directories.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class";

/// Default re-read interval for attributes without change notification.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory containing the `tacho-motor`, `lego-sensor`, ... class
    /// directories.
    pub sysfs_root: PathBuf,

    /// How often a state wait re-reads an attribute that cannot notify.
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `EV3DEV_SYSFS_ROOT`: class root (default: `/sys/class`)
    /// - `EV3DEV_POLL_INTERVAL_MS`: fallback poll interval in milliseconds
    ///   (default: 50, clamped to 1-1000)
    pub fn from_env() -> Self {
        let sysfs_root = std::env::var_os("EV3DEV_SYSFS_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSFS_ROOT));

        let poll_interval = match std::env::var("EV3DEV_POLL_INTERVAL_MS") {
            Ok(val) => match val.parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms.clamp(1, 1000)),
                Err(_) => {
                    warn!(value = %val, "Invalid EV3DEV_POLL_INTERVAL_MS, using default");
                    DEFAULT_POLL_INTERVAL
                }
            },
            Err(_) => DEFAULT_POLL_INTERVAL,
        };

        Self {
            sysfs_root,
            poll_interval,
        }
    }
}
