//! Waiting for a motor to reach a state.
//!
//! [`wait`] re-evaluates a [`WaitRequest`] each time its [`StateSource`]
//! reports a change, and gives up at the request's deadline. It never
//! spins: between observations it is suspended on the source.
//!
//! ## Sources
//!
//! On a real device the `state` attribute supports change notification:
//! the kernel raises priority readiness (`POLLPRI`) on the open file when
//! the value changes. [`NotifyingState`] registers the file with the Tokio
//! reactor for exactly that. Plain files (an emulated tree, a test
//! directory) cannot be registered, so [`PolledState`] re-reads them on a
//! fixed interval instead. [`state_source`] picks whichever works.
//!
//! ## Cancellation
//!
//! Only the timeout is built in. To cancel early, race the wait future
//! against your own signal in `tokio::select!`; dropping the future is the
//! cancel.

use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::{
    attribute::{self, Attribute},
    error::{Error, Result},
    state::MotorState,
    tracing::prelude::*,
};

/// What to wait for, and for how long.
///
/// With `any == false` the wait is satisfied when
/// `(state & mask) ^ not == want ^ not`. With `any == true` it is satisfied
/// when `(state & mask) ^ not != 0` and `state & mask & not == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitRequest {
    pub mask: MotorState,
    pub want: MotorState,
    pub not: MotorState,
    pub any: bool,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
}

impl WaitRequest {
    pub fn new(mask: MotorState, want: MotorState) -> Self {
        Self {
            mask,
            want,
            not: MotorState::empty(),
            any: false,
            timeout: None,
        }
    }

    /// Wait until the motor is no longer running.
    pub fn stopped() -> Self {
        Self::new(MotorState::RUNNING, MotorState::empty())
    }

    pub fn with_not(mut self, not: MotorState) -> Self {
        self.not = not;
        self
    }

    pub fn with_any(mut self, any: bool) -> Self {
        self.any = any;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Timeout in milliseconds; a negative count means wait forever.
    pub fn with_timeout_millis(mut self, ms: i64) -> Self {
        self.timeout = u64::try_from(ms).ok().map(Duration::from_millis);
        self
    }

    pub fn is_satisfied(&self, state: MotorState) -> bool {
        let masked = state.bits() & self.mask.bits();
        let not = self.not.bits();
        if self.any {
            (masked ^ not) != 0 && masked & not == 0
        } else {
            masked ^ not == self.want.bits() ^ not
        }
    }
}

/// Result of a wait: the last state seen, unmasked, and whether it
/// satisfied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    pub state: MotorState,
    pub satisfied: bool,
}

impl WaitOutcome {
    /// Treat an unsatisfied outcome as [`Error::Timeout`].
    pub fn into_result(self) -> Result<MotorState> {
        if self.satisfied {
            Ok(self.state)
        } else {
            Err(Error::Timeout { state: self.state })
        }
    }
}

/// Something that can report a motor state and signal when it may have
/// changed.
#[async_trait]
pub trait StateSource: Send {
    /// Read the current state.
    async fn current(&mut self) -> Result<MotorState>;

    /// Suspend until the state may have changed. Spurious wakeups are
    /// allowed; the waiter re-reads and re-checks.
    async fn changed(&mut self) -> Result<()>;
}

/// Block until `source` satisfies `request` or the request's timeout
/// elapses.
///
/// I/O errors from the source are returned as they happen.
pub async fn wait<S>(source: &mut S, request: &WaitRequest) -> Result<WaitOutcome>
where
    S: StateSource + ?Sized,
{
    // A timeout too large to represent as an instant never expires.
    let deadline = request
        .timeout
        .and_then(|timeout| Instant::now().checked_add(timeout));

    loop {
        let state = source.current().await?;
        if request.is_satisfied(state) {
            debug!(state = %state, "Wait satisfied");
            return Ok(WaitOutcome {
                state,
                satisfied: true,
            });
        }
        trace!(state = %state, "Wait not yet satisfied");

        match deadline {
            Some(deadline) => {
                tokio::select! {
                    changed = source.changed() => changed?,
                    _ = time::sleep_until(deadline) => {
                        debug!(state = %state, "Wait timed out");
                        return Ok(WaitOutcome {
                            state,
                            satisfied: false,
                        });
                    }
                }
            }
            None => source.changed().await?,
        }
    }
}

/// Open the best available source for a `state` attribute: change
/// notification when the file supports it, otherwise polling every
/// `poll_interval`.
pub fn state_source(attr: &Attribute<'_>, poll_interval: Duration) -> Box<dyn StateSource> {
    #[cfg(target_os = "linux")]
    {
        match NotifyingState::open(attr) {
            Ok(source) => return Box::new(source),
            Err(e) => {
                debug!(path = %attr.path().display(), error = %e, "No change notification, polling");
            }
        }
    }

    Box::new(PolledState::new(attr, poll_interval))
}

/// Re-reads the attribute on a fixed interval.
pub struct PolledState {
    path: PathBuf,
    interval: Interval,
}

impl PolledState {
    pub fn new(attr: &Attribute<'_>, period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            path: attr.path(),
            interval,
        }
    }
}

#[async_trait]
impl StateSource for PolledState {
    async fn current(&mut self) -> Result<MotorState> {
        attribute::read_path(&self.path)?.parse()
    }

    async fn changed(&mut self) -> Result<()> {
        self.interval.tick().await;
        Ok(())
    }
}

#[cfg(target_os = "linux")]
pub use notify::NotifyingState;

#[cfg(target_os = "linux")]
mod notify {
    use std::{fs::File, os::unix::fs::FileExt, path::PathBuf};

    use async_trait::async_trait;
    use tokio::io::{unix::AsyncFd, Interest};

    use super::StateSource;
    use crate::{
        attribute::{trim_terminator, Attribute},
        error::{Error, Result},
        state::MotorState,
    };

    /// Largest `state` value is "running ramping holding overloaded stalled".
    const READ_BUF_LEN: usize = 64;

    /// Wakes on the kernel's change notification for the attribute.
    ///
    /// Must be created inside a Tokio runtime.
    pub struct NotifyingState {
        path: PathBuf,
        fd: AsyncFd<File>,
    }

    impl NotifyingState {
        pub fn open(attr: &Attribute<'_>) -> Result<Self> {
            let path = attr.path();
            let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
            let fd = AsyncFd::with_interest(file, Interest::PRIORITY)
                .map_err(|e| Error::io(&path, e))?;
            Ok(Self { path, fd })
        }
    }

    #[async_trait]
    impl StateSource for NotifyingState {
        async fn current(&mut self) -> Result<MotorState> {
            // Notification is re-armed by reading from the start of the file.
            let mut buf = [0u8; READ_BUF_LEN];
            let n = self
                .fd
                .get_ref()
                .read_at(&mut buf, 0)
                .map_err(|e| Error::io(&self.path, e))?;
            let text = String::from_utf8_lossy(&buf[..n]);
            trim_terminator(&text).parse()
        }

        async fn changed(&mut self) -> Result<()> {
            let mut guard = self
                .fd
                .ready(Interest::PRIORITY)
                .await
                .map_err(|e| Error::io(&self.path, e))?;
            guard.clear_ready();
            Ok(())
        }
    }
}
