use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize conversations for {target}: {source}")]
    Serialize {
        target: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no conversation ids left to assign")]
    IdsExhausted,
}

impl StoreError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn serialize(target: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialize {
            target: target.into(),
            source,
        }
    }
}
