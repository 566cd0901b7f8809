use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoofsError {
    #[error("texture key '{key}' does not name a file under the asset root")]
    TextureKeyOutsideRoot { key: String },
    #[error("no asset root configured; cannot load texture '{key}' from disk")]
    NoAssetRoot { key: String },
    #[error("failed to load texture '{key}' from {path}: {source}")]
    TextureLoad {
        key: String,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("texture '{key}' has zero size")]
    EmptyTexture { key: String },
    #[error("failed to decode roof settings: {0}")]
    Settings(#[source] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("flag '{key}' expected {expected}, found {found}")]
pub struct FlagValueError {
    pub key: &'static str,
    pub expected: &'static str,
    pub found: String,
}
