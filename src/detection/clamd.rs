use super::{Detection, DetectionEngine, ScanTarget, Verdict};
use crate::error::Error;
use crate::platform;
use std::ffi::OsStr;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Explicit path lists longer than this go through a temporary `--file-list`.
const MAX_ARG_PATHS: usize = 256;

const EXIT_CLEAN: i32 = 0;
const EXIT_INFECTED: i32 = 1;

/// Runs the `clamdscan` client against a running clamd.
#[derive(Debug, Clone)]
pub struct ClamdScan {
    program: String,
    args: Vec<String>,
}

impl ClamdScan {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn run(&self, target_args: &[&OsStr]) -> Result<Verdict, Error> {
        debug!("Running {} {:?} ({} target args)", self.program, self.args, target_args.len());
        let output = Command::new(&self.program)
            .args(&self.args)
            .args(target_args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::EngineLaunch {
                program: self.program.clone(),
                source,
            })?;

        match output.status.code() {
            Some(EXIT_CLEAN) => Ok(Verdict::Clean),
            Some(EXIT_INFECTED) => Ok(Verdict::Infected(parse_detections(&output.stdout))),
            code => Err(Error::EngineFailure {
                code,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    fn scan_list_file(&self, list: &Path) -> Result<Verdict, Error> {
        self.run(&[OsStr::new("--file-list"), list.as_os_str()])
    }
}

fn write_list_file(paths: &[PathBuf]) -> Result<NamedTempFile, Error> {
    let file = NamedTempFile::new()?;
    {
        let mut writer = BufWriter::new(file.as_file());
        for path in paths {
            writer.write_all(&platform::path_bytes(path))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    Ok(file)
}

impl DetectionEngine for ClamdScan {
    fn scan(&self, target: &ScanTarget) -> Result<Verdict, Error> {
        match target {
            ScanTarget::ListFile(list) => self.scan_list_file(list),
            ScanTarget::Paths(paths) if paths.len() > MAX_ARG_PATHS => {
                let list = write_list_file(paths)?;
                self.scan_list_file(list.path())
            }
            ScanTarget::Paths(paths) => {
                let args: Vec<&OsStr> = paths.iter().map(|p| p.as_os_str()).collect();
                self.run(&args)
            }
        }
    }
}

/// Parse `clamdscan --infected --no-summary` output.
///
/// Each report line reads `<path>: <label> FOUND`. The path ends at the last `": "`
/// because signature labels never contain one. Paths are kept as raw bytes, so names
/// that are not valid UTF-8 still point at the file on disk.
pub fn parse_detections(output: &[u8]) -> Vec<Detection> {
    output
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .filter_map(|line| {
            let parsed = line
                .strip_suffix(b" FOUND")
                .and_then(split_at_last_separator)
                .filter(|(path, label)| !path.is_empty() && !label.is_empty());
            match parsed {
                Some((path, label)) => Some(Detection {
                    path: platform::path_from_bytes(path),
                    label: String::from_utf8_lossy(label).into_owned(),
                }),
                None => {
                    warn!(
                        "Ignoring unrecognized engine output: {}",
                        String::from_utf8_lossy(line)
                    );
                    None
                }
            }
        })
        .collect()
}

fn split_at_last_separator(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let at = line.windows(2).rposition(|pair| pair == b": ")?;
    Some((&line[..at], &line[at + 2..]))
}
