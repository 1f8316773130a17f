//! Inspect ev3dev devices from the command line.

mod output;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ev3dev_sysfs::{
    tracing::init_journald_or_stdout, Config, Device, DeviceClass, Locator, TachoMotor,
    WaitRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, level_filters::LevelFilter};

use output::{attribute_line, list_line, reading_line};

/// Query ev3dev devices under /sys/class
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Class root directory (default: $EV3DEV_SYSFS_ROOT or /sys/class)
    #[arg(short = 'r', long)]
    root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the devices of a class, e.g. `tacho-motor`
    List { class: DeviceClass },

    /// Print every readable attribute of one device
    Show {
        class: DeviceClass,
        /// Directory name (`motor0`, `led0:green:brick-status`) or port
        /// address (`ev3-ports:outA`)
        device: String,
    },

    /// Wait until the tacho motor at a port stops running
    WaitIdle {
        port: String,
        /// Give up after this many milliseconds; negative waits forever
        #[arg(short = 't', long, default_value_t = -1, allow_negative_numbers = true)]
        timeout_ms: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_journald_or_stdout(if args.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    });

    let mut config = Config::from_env();
    if let Some(root) = args.root {
        config.sysfs_root = root;
    }
    debug!(root = %config.sysfs_root.display(), poll_ms = config.poll_interval.as_millis(), "Using configuration");
    let locator = Locator::from_config(&config);

    match args.command {
        Command::List { class } => list(&locator, class),
        Command::Show { class, device } => show(&locator, class, &device),
        Command::WaitIdle { port, timeout_ms } => wait_idle(&locator, &port, timeout_ms).await,
    }
}

fn list(locator: &Locator, class: DeviceClass) -> Result<()> {
    let devices = locator
        .list(class)
        .with_context(|| format!("Failed to list {class} devices"))?;
    for device in &devices {
        println!("{}", list_line(device));
    }
    Ok(())
}

fn find(locator: &Locator, class: DeviceClass, which: &str) -> Result<Device> {
    if class.prefix().is_none() {
        return locator
            .named(class, which)
            .with_context(|| format!("No {class} device named {which:?}"));
    }

    let devices = locator
        .list(class)
        .with_context(|| format!("Failed to list {class} devices"))?;
    if let Some(device) = devices.into_iter().find(|d| d.name() == which) {
        return Ok(device);
    }

    let resolved = locator
        .resolve(class, which, "")
        .with_context(|| format!("No {class} device named or at {which:?}"))?;
    Ok(resolved.device)
}

fn show(locator: &Locator, class: DeviceClass, which: &str) -> Result<()> {
    let device = find(locator, class, which)?;
    println!("{} ({})", device.name(), device.dir().display());

    let names = device
        .attribute_names()
        .with_context(|| format!("Failed to read {}", device.dir().display()))?;
    for name in &names {
        println!("{}", attribute_line(name, device.attr(name).read()));
    }

    if class == DeviceClass::PowerSupply {
        for (attr, label, unit) in [("voltage_now", "voltage", "V"), ("current_now", "current", "A")] {
            let (micro, err) = device.attr(attr).read_float_or_nan();
            if let Some(e) = err {
                debug!(attr, error = %e, "Reading unavailable");
            }
            println!("{}", reading_line(label, micro * 1e-6, unit));
        }
    }
    Ok(())
}

async fn wait_idle(locator: &Locator, port: &str, timeout_ms: i64) -> Result<()> {
    let motor = TachoMotor::resolve(locator, port, "")
        .with_context(|| format!("No tacho motor at {port:?}"))?
        .device;
    let request = WaitRequest::stopped().with_timeout_millis(timeout_ms);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let outcome = tokio::select! {
        outcome = motor.wait(&request) => outcome.context("Failed to read motor state")?,
        _ = cancel.cancelled() => bail!("Interrupted"),
    };

    let state = outcome
        .into_result()
        .with_context(|| format!("{} still busy after {timeout_ms} ms", motor.device().name()))?;
    println!("{}: {}", motor.device().name(), display_state(&state.to_string()));
    Ok(())
}

fn display_state(state: &str) -> &str {
    if state.is_empty() {
        "idle"
    } else {
        state
    }
}
