use std::io;
use std::path::PathBuf;

/// File- and directory-level failures. These end the affected watch and
/// are always reported to the watcher's owner.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("filesystem notification error: {0}")]
    Notify(#[from] notify::Error),

    #[error("watcher task has shut down")]
    Closed,
}

impl WatchError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type WatchResult<T> = Result<T, WatchError>;

/// Record-scoped failures. Never fatal to a stream: the drain logs them and
/// moves on to the next record.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("record is not valid UTF-8: {source}")]
    Utf8 {
        raw: String,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("{}: {source}", describe_record(.event))]
    Json {
        /// Discriminator, when the envelope decoded but the body did not.
        event: Option<String>,
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// The offending record, lossily decoded, without its trailing newline.
    pub fn raw(&self) -> &str {
        match self {
            Self::Utf8 { raw, .. } | Self::Json { raw, .. } => raw,
        }
    }
}

fn describe_record(event: &Option<String>) -> String {
    match event {
        Some(name) => format!("invalid {name} record"),
        None => "malformed record".to_string(),
    }
}
