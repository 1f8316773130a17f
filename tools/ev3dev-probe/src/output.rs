//! Text rendering for probe output.

use ev3dev_sysfs::{Device, Error};

/// One `list` line: directory name, then address and driver when the class
/// has them.
pub fn list_line(device: &Device) -> String {
    let address = device.attr("address").read().ok();
    let driver = device.attr("driver_name").read().ok();
    match (address, driver) {
        (Some(address), Some(driver)) => format!("{:<12} {:<18} {}", device.name(), address, driver),
        (None, Some(driver)) => format!("{:<12} {:<18} {}", device.name(), "-", driver),
        _ => device.name().to_string(),
    }
}

/// One `show` line per attribute. Multi-line values (`uevent`) are indented
/// under their name; unreadable attributes show the error instead.
pub fn attribute_line(name: &str, value: Result<String, Error>) -> String {
    match value {
        Ok(text) if text.contains('\n') => {
            let body: Vec<_> = text.lines().map(|l| format!("    {l}")).collect();
            format!("{name}:\n{}", body.join("\n"))
        }
        Ok(text) => format!("{name}: {text}"),
        Err(e) => format!("{name}: <{e}>"),
    }
}

/// A scaled reading, `n/a` when the attribute held no number.
pub fn reading_line(label: &str, value: f64, unit: &str) -> String {
    if value.is_nan() {
        format!("{label}: n/a")
    } else {
        format!("{label}: {value:.3} {unit}")
    }
}
