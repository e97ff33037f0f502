use crate::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

pub trait PowerSource {
    fn is_on_mains_power(&self) -> Result<bool, Error>;
}

/// macOS: `pmset -g ps` reports the active power source.
#[derive(Debug)]
pub struct Pmset {
    program: String,
}

impl Default for Pmset {
    fn default() -> Self {
        Self {
            program: "/usr/bin/pmset".to_string(),
        }
    }
}

pub(crate) fn pmset_reports_ac(output: &str) -> bool {
    output.contains("Now drawing from 'AC Power'")
}

impl PowerSource for Pmset {
    fn is_on_mains_power(&self) -> Result<bool, Error> {
        let output = Command::new(&self.program)
            .args(["-g", "ps"])
            .output()
            .map_err(|e| Error::PowerQuery(format!("{}: {}", self.program, e)))?;
        if !output.status.success() {
            return Err(Error::PowerQuery(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }
        Ok(pmset_reports_ac(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Linux: inspects `/sys/class/power_supply`.
///
/// On mains when any `Mains` supply is online. A machine without any battery
/// is always treated as on mains.
#[derive(Debug)]
pub struct SysfsPowerSupply {
    root: PathBuf,
}

impl Default for SysfsPowerSupply {
    fn default() -> Self {
        Self::new("/sys/class/power_supply")
    }
}

impl SysfsPowerSupply {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn read_attr(dir: &std::path::Path, name: &str) -> Option<String> {
    fs::read_to_string(dir.join(name))
        .ok()
        .map(|s| s.trim().to_string())
}

impl PowerSource for SysfsPowerSupply {
    fn is_on_mains_power(&self) -> Result<bool, Error> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| Error::PowerQuery(format!("{}: {}", self.root.display(), e)))?;

        let mut has_battery = false;
        for entry in entries.flatten() {
            let dir = entry.path();
            match read_attr(&dir, "type").as_deref() {
                Some("Mains") => {
                    if read_attr(&dir, "online").as_deref() == Some("1") {
                        debug!("Mains supply online: {}", dir.display());
                        return Ok(true);
                    }
                }
                Some("Battery") => has_battery = true,
                _ => {}
            }
        }

        Ok(!has_battery)
    }
}

/// Power source for platforms without a query, and for callers that do not care.
#[derive(Debug, Default)]
pub struct AlwaysMains;

impl PowerSource for AlwaysMains {
    fn is_on_mains_power(&self) -> Result<bool, Error> {
        Ok(true)
    }
}

pub fn platform_default() -> Box<dyn PowerSource> {
    if cfg!(target_os = "macos") {
        Box::new(Pmset::default())
    } else if cfg!(target_os = "linux") {
        Box::new(SysfsPowerSupply::default())
    } else {
        Box::new(AlwaysMains)
    }
}

impl<P: PowerSource + ?Sized> PowerSource for Box<P> {
    fn is_on_mains_power(&self) -> Result<bool, Error> {
        (**self).is_on_mains_power()
    }
}
