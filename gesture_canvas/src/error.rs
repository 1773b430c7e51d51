use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CanvasError>;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("invalid configuration: {}", problems.join("; "))]
    InvalidConfig { problems: Vec<String> },

    #[error("filter timestamp went backwards: {now_ms}ms after {prev_ms}ms")]
    NonMonotonicTimestamp { prev_ms: u64, now_ms: u64 },

    #[error("malformed detection: {found} landmarks, expected {expected}")]
    MalformedDetection { found: usize, expected: usize },

    #[error("unrecognized command: {text:?}")]
    UnrecognizedCommand { text: String },
}
