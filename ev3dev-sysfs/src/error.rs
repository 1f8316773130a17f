//! Error types shared by every layer of the crate.
//!
//! Attribute I/O, device matching, validation and waiting all report through
//! one [`Error`] enum so a handle's sticky slot can hold any of them.

use std::path::PathBuf;

use thiserror::Error;

use crate::{device::DeviceClass, state::MotorState};

/// A device was found where it was asked for, but it is bound to a
/// different driver than the caller expected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("driver mismatch: want {want:?}, have {have:?}")]
pub struct DriverMismatch {
    /// Driver name the caller requested.
    pub want: String,
    /// Driver name reported by the device.
    pub have: String,
}

#[derive(Debug, Error)]
pub enum Error {
    /// Backing attribute file missing, unreadable or unwritable.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Attribute contents do not match the expected encoding.
    #[error("cannot parse {attr} value {value:?}")]
    Parse { attr: String, value: String },

    /// Caller-supplied value is outside the attribute's accepted domain.
    #[error("invalid {attr}: {reason}")]
    Validation { attr: String, reason: String },

    #[error("no {class} device with driver {driver:?}{}", port_suffix(.port))]
    NotFound {
        class: DeviceClass,
        driver: String,
        port: Option<String>,
    },

    #[error("malformed device directory name {name:?}")]
    MalformedDeviceName { name: String },

    #[error(transparent)]
    DriverMismatch(#[from] DriverMismatch),

    /// A wait did not observe the requested state before its deadline.
    #[error("timed out waiting for motor state, last state {state:?}")]
    Timeout { state: MotorState },

    /// Paired motors report different current stop actions.
    #[error("stop action mismatch: left {left:?}, right {right:?}")]
    ActionMismatch { left: String, right: String },

    /// Paired motors support different sets of stop actions.
    #[error("stop actions mismatch: left {left:?}, right {right:?}")]
    ActionsMismatch {
        left: Vec<String>,
        right: Vec<String>,
    },
}

fn port_suffix(port: &Option<String>) -> String {
    match port {
        Some(port) => format!(" at port {port:?}"),
        None => String::new(),
    }
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(attr: impl Into<String>, value: impl Into<String>) -> Self {
        Error::Parse {
            attr: attr.into(),
            value: value.into(),
        }
    }

    pub(crate) fn validation(attr: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            attr: attr.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_includes_port() {
        let err = Error::NotFound {
            class: DeviceClass::TachoMotor,
            driver: "lego-ev3-l-motor".into(),
            port: Some("outA".into()),
        };
        assert_eq!(
            err.to_string(),
            "no tacho-motor device with driver \"lego-ev3-l-motor\" at port \"outA\""
        );

        let err = Error::NotFound {
            class: DeviceClass::Sensor,
            driver: "lego-ev3-touch".into(),
            port: None,
        };
        assert_eq!(
            err.to_string(),
            "no lego-sensor device with driver \"lego-ev3-touch\""
        );
    }

    #[test]
    fn test_driver_mismatch_converts() {
        let err: Error = DriverMismatch {
            want: "lego-ev3-l-motor".into(),
            have: "lego-ev3-m-motor".into(),
        }
        .into();
        assert!(matches!(err, Error::DriverMismatch(ref m) if m.have == "lego-ev3-m-motor"));
    }
}
