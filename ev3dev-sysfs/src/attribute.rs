//! Typed reads and writes of single attribute files.
//!
//! Every value the kernel exposes for a device lives in its own small text
//! file. Reads strip at most one trailing newline before parsing. Writes go
//! out in a single `write(2)` call: `set`-style values carry one trailing
//! newline, command tokens are written bare.
//!
//! Writes to one physical device are serialized through a process-wide lock
//! keyed by the device directory; reads are never locked.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Display,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock, Mutex, PoisonError},
};

use crate::{
    error::{Error, Result},
    tracing::prelude::*,
};

/// A (device directory, attribute name) pair naming one attribute file.
#[derive(Debug, Clone, Copy)]
pub struct Attribute<'a> {
    dir: &'a Path,
    name: &'a str,
}

impl<'a> Attribute<'a> {
    pub(crate) fn new(dir: &'a Path, name: &'a str) -> Self {
        Self { dir, name }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(self.name)
    }

    /// Raw text with the trailing newline removed.
    pub fn read(&self) -> Result<String> {
        read_path(&self.path())
    }

    pub fn read_int(&self) -> Result<i64> {
        parse_int(self.name, &self.read()?)
    }

    /// Integer millisecond count. Negative values are passed through; it is
    /// up to the caller to decide whether they make sense.
    pub fn read_millis(&self) -> Result<i64> {
        self.read_int()
    }

    pub fn read_float(&self) -> Result<f64> {
        parse_float(self.name, &self.read()?)
    }

    /// Like [`read_float`](Self::read_float), but always yields a number:
    /// NaN when the attribute could not be read or parsed, together with
    /// the error.
    pub fn read_float_or_nan(&self) -> (f64, Option<Error>) {
        match self.read_float() {
            Ok(value) => (value, None),
            Err(e) => (f64::NAN, Some(e)),
        }
    }

    pub fn read_list(&self) -> Result<Vec<String>> {
        Ok(parse_list(&self.read()?))
    }

    pub fn read_map(&self) -> Result<BTreeMap<String, String>> {
        parse_map(self.name, &self.read()?)
    }

    /// Write a value followed by one newline.
    pub fn write_value(&self, value: impl Display) -> Result<()> {
        self.write_raw(format!("{value}\n").as_bytes())
    }

    /// Write a command token as-is, without a newline.
    pub fn write_command(&self, token: &str) -> Result<()> {
        self.write_raw(token.as_bytes())
    }

    fn write_raw(&self, bytes: &[u8]) -> Result<()> {
        let path = self.path();
        let lock = write_lock(self.dir);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::io(&path, e))?;
        let written = file.write(bytes).map_err(|e| Error::io(&path, e))?;
        if written != bytes.len() {
            return Err(Error::io(
                &path,
                std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    format!("short write: {written} of {} bytes", bytes.len()),
                ),
            ));
        }

        trace!(path = %path.display(), value = ?String::from_utf8_lossy(bytes), "Wrote attribute");
        Ok(())
    }
}

pub(crate) fn read_path(path: &Path) -> Result<String> {
    let mut text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let len = trim_terminator(&text).len();
    text.truncate(len);
    trace!(path = %path.display(), value = %text, "Read attribute");
    Ok(text)
}

/// Strip at most one trailing `\n`.
pub fn trim_terminator(text: &str) -> &str {
    text.strip_suffix('\n').unwrap_or(text)
}

pub fn parse_int(attr: &str, text: &str) -> Result<i64> {
    text.parse().map_err(|_| Error::parse(attr, text))
}

pub fn parse_float(attr: &str, text: &str) -> Result<f64> {
    text.parse().map_err(|_| Error::parse(attr, text))
}

/// Split on single ASCII spaces. Other whitespace is not a separator, so a
/// tab-separated value comes back as one token.
pub fn parse_list(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split(' ').map(str::to_string).collect()
}

/// Parse newline-separated `key=value` lines. A line with no `=` or more
/// than one is rejected, naming the line.
pub fn parse_map(attr: &str, text: &str) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    if text.is_empty() {
        return Ok(map);
    }
    for line in text.split('\n') {
        let mut parts = line.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => {
                map.insert(key.to_string(), value.to_string());
            }
            _ => return Err(Error::parse(attr, line)),
        }
    }
    Ok(map)
}

/// Lock guarding writes to the device living at `dir`.
///
/// Keyed by the canonical path so handles reaching the same device through
/// different class links share one lock.
fn write_lock(dir: &Path) -> Arc<Mutex<()>> {
    static LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
        LazyLock::new(|| Mutex::new(HashMap::new()));

    let key = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    let mut locks = LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    locks.entry(key).or_default().clone()
}
