//! Logging setup shared by the library and its tools.
//!
//! Library code only emits events; it never installs a subscriber. Binaries
//! call [`init_journald_or_stdout`] once at startup, and every module pulls
//! the macros in with `use crate::tracing::prelude::*`.
//!
//! Attribute reads and writes are logged at `trace`, device resolution and
//! parked errors at `debug`, so `RUST_LOG=ev3dev_sysfs=trace` shows every
//! sysfs access.

use std::env;
use time::OffsetDateTime;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Install a subscriber: journald when started by systemd, stdout otherwise.
///
/// `default_level` applies when `RUST_LOG` is unset or unparsable.
pub fn init_journald_or_stdout(default_level: LevelFilter) {
    if env::var("JOURNAL_STREAM").is_ok() {
        match tracing_journald::layer() {
            Ok(layer) => tracing_subscriber::registry()
                .with(filter(default_level))
                .with(layer)
                .init(),
            Err(e) => {
                use_stdout(default_level);
                error!(error = %e, "Failed to initialize journald logging, using stdout");
            }
        }
    } else {
        use_stdout(default_level);
    }
}

fn filter(default_level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy()
}

fn use_stdout(default_level: LevelFilter) {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTimer)
                .with_target(true),
        )
        .init();
}

// Local wall-clock time to the millisecond. Motor waits are short enough
// that whole seconds hide the ordering of events.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let stamp = now
            .format(time::macros::format_description!(
                "[hour]:[minute]:[second].[subsecond digits:3]"
            ))
            .map_err(|_| std::fmt::Error)?;
        write!(w, "{stamp}")
    }
}
