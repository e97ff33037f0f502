use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to launch detection engine '{program}': {source}")]
    EngineLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The detection engine exited with a status that is neither clean nor infected.
    #[error("Detection engine failed ({}): {stderr}", exit_description(.code))]
    EngineFailure { code: Option<i32>, stderr: String },

    #[error("Power source query failed: {0}")]
    PowerQuery(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Marker store error at {}: {source}", path.display())]
    Marker {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}
