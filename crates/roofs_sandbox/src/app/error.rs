use std::path::PathBuf;

use roofs::RoofsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum SandboxError {
    #[error("read scenario '{path}': {source}")]
    ReadScenario {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse scenario json: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("parse scenario json at {path}: {source}")]
    ParseAt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed at {path}: {message}")]
    Invalid { path: String, message: String },
    #[error("prepare texture: {0}")]
    Texture(#[from] RoofsError),
}

impl SandboxError {
    pub(crate) fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }
}
