//! Typed access to ev3dev devices.
//!
//! The ev3dev kernel exposes every motor, sensor, port, LED and power supply
//! as a directory of small text files under `/sys/class`. This crate finds
//! those directories, reads and writes their attributes with the right
//! encodings, validates setpoints before they reach the driver, and waits
//! for motor state changes without busy polling where the kernel allows it.
//!
//! ```ignore
//! let locator = Locator::from_config(&Config::from_env());
//! let mut motor = TachoMotor::resolve(&locator, "ev3-ports:outA", "lego-ev3-l-motor")?
//!     .strict()?;
//! motor
//!     .set_speed_sp(500)
//!     .set_position_sp(360)
//!     .command("run-to-rel-pos");
//! motor.err()?;
//! motor.wait(&WaitRequest::stopped().with_timeout(Duration::from_secs(5)))
//!     .await?
//!     .into_result()?;
//! ```

pub mod attribute;
pub mod chain;
pub mod config;
pub mod device;
pub mod error;
pub mod led;
pub mod locator;
pub mod motor;
pub mod port;
pub mod power;
pub mod sensor;
pub mod state;
pub mod steering;
pub mod tracing;
pub mod wait;

pub use chain::ErrorSink;
pub use config::Config;
pub use device::{Device, DeviceClass};
pub use error::{DriverMismatch, Error, Result};
pub use led::Led;
pub use locator::{Locator, Resolved};
pub use motor::{Pid, Polarity, TachoMotor};
pub use port::LegoPort;
pub use power::PowerSupply;
pub use sensor::Sensor;
pub use state::MotorState;
pub use steering::Steering;
pub use wait::{wait, StateSource, WaitOutcome, WaitRequest};
