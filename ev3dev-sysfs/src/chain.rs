//! Sticky-error chaining for device handles.
//!
//! Handle methods come in two kinds:
//!
//! - **Actions** change device state (`set_*`, `command`). They return the
//!   handle so calls can be chained. A failure is parked in the handle's
//!   pending slot; once the slot is occupied, later actions do nothing at
//!   all, not even validation.
//! - **Queries** read device state and return a `Result`. A query first
//!   takes the pending slot: a parked error is returned without touching the
//!   device, otherwise the read happens.
//!
//! Every query leaves the slot empty, so an error is observed exactly once.
//! An error parked by actions that are never followed by a query is lost.
//!
//! ```ignore
//! motor
//!     .set_duty_cycle_sp(60)
//!     .set_ramp_up_sp(Duration::from_millis(500))
//!     .command("run-direct");
//! motor.err()?;
//! ```

use crate::{
    error::{Error, Result},
    tracing::prelude::*,
};

/// Access to a handle's pending-error slot, plus the action/query
/// discipline built on it.
pub trait ErrorSink: Sized {
    fn pending(&mut self) -> &mut Option<Error>;

    /// Run an action unless an error is already pending; park its error.
    fn act<F>(&mut self, action: F) -> &mut Self
    where
        F: FnOnce(&Self) -> Result<()>,
    {
        if self.pending().is_some() {
            trace!("Skipping action, error already pending");
            return self;
        }
        if let Err(e) = action(&*self) {
            debug!(error = %e, "Action failed, parking error");
            *self.pending() = Some(e);
        }
        self
    }

    /// Return the pending error if there is one, otherwise run the read.
    fn query<T, F>(&mut self, read: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        if let Some(e) = self.pending().take() {
            return Err(e);
        }
        read(&*self)
    }

    /// Observe and clear the outcome of the preceding actions.
    fn err(&mut self) -> Result<()> {
        self.query(|_| Ok(()))
    }
}

/// Reject `value` unless it lies in `min..=max`.
pub(crate) fn ensure_range<T>(attr: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(Error::validation(
            attr,
            format!("{value} is outside {min}..={max}"),
        ));
    }
    Ok(())
}

/// Reject `value` unless it is one of `allowed`, as read from the device.
pub(crate) fn ensure_listed(attr: &str, value: &str, allowed: &[String]) -> Result<()> {
    if !allowed.iter().any(|a| a == value) {
        return Err(Error::validation(
            attr,
            format!("{value:?} is not one of {allowed:?}"),
        ));
    }
    Ok(())
}
