//! Durable "last successful run" timestamp.

use crate::error::Error;
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

/// Whole-value store for the last-run marker. There is no partial update:
/// `write` replaces whatever was stored.
pub trait MarkerStore {
    fn read(&self) -> Result<Option<DateTime<Utc>>, Error>;
    fn write(&self, at: DateTime<Utc>) -> Result<(), Error>;
}

/// Marker kept as POSIX epoch seconds (fractional) in a plain-text file.
#[derive(Debug, Clone)]
pub struct FileMarkerStore {
    path: PathBuf,
}

impl FileMarkerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn marker_error(&self, source: io::Error) -> Error {
        Error::Marker {
            path: self.path.clone(),
            source,
        }
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    format!("{}.{:06}", at.timestamp(), at.timestamp_subsec_micros())
}

pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let value = text.lines().next()?.trim();
    parse_decimal_seconds(value).or_else(|| parse_float_seconds(value))
}

/// Exact parse of `<secs>[.<fraction>]` without going through a float.
fn parse_decimal_seconds(value: &str) -> Option<DateTime<Utc>> {
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let secs: i64 = whole.parse().ok()?;
    let digits: String = fraction.chars().chain("000000000".chars()).take(9).collect();
    let nanos: u32 = digits.parse().ok()?;
    DateTime::from_timestamp(secs, nanos)
}

fn parse_float_seconds(value: &str) -> Option<DateTime<Utc>> {
    let seconds: f64 = value.parse().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

impl MarkerStore for FileMarkerStore {
    /// A marker that cannot be parsed is treated as "no prior run", which forces a scan.
    fn read(&self) -> Result<Option<DateTime<Utc>>, Error> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.marker_error(e)),
        };

        let parsed = parse_timestamp(&text);
        if parsed.is_none() {
            warn!(
                "Ignoring unreadable timestamp in {}: {:?}",
                self.path.display(),
                text.trim()
            );
        }
        Ok(parsed)
    }

    /// Atomic replace: written to a sibling temp file, then renamed over the marker.
    fn write(&self, at: DateTime<Utc>) -> Result<(), Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.marker_error(e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.marker_error(e))?;
        tmp.write_all(format_timestamp(at).as_bytes())
            .map_err(|e| self.marker_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.marker_error(e.error))?;
        Ok(())
    }
}

/// In-process marker, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryMarkerStore {
    value: RefCell<Option<DateTime<Utc>>>,
}

impl MemoryMarkerStore {
    pub fn new(initial: Option<DateTime<Utc>>) -> Self {
        Self {
            value: RefCell::new(initial),
        }
    }

    pub fn get(&self) -> Option<DateTime<Utc>> {
        *self.value.borrow()
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn read(&self) -> Result<Option<DateTime<Utc>>, Error> {
        Ok(self.get())
    }

    fn write(&self, at: DateTime<Utc>) -> Result<(), Error> {
        *self.value.borrow_mut() = Some(at);
        Ok(())
    }
}

impl<M: MarkerStore + ?Sized> MarkerStore for &M {
    fn read(&self) -> Result<Option<DateTime<Utc>>, Error> {
        (**self).read()
    }

    fn write(&self, at: DateTime<Utc>) -> Result<(), Error> {
        (**self).write(at)
    }
}
