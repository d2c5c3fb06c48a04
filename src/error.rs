//! Error types shared across the scene, registry and host loop.

use thiserror::Error;

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors that can occur while composing, registering or persisting the scene
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("editable name `{0}` is already registered in this scene")]
    DuplicateName(String),

    #[error("editable name must not be empty")]
    InvalidName,

    #[error("no editable node named `{0}` is registered")]
    UnknownName(String),

    #[error("storage namespace `{0}` is invalid")]
    InvalidNamespace(String),

    #[error("expected exactly one default camera, found {found}")]
    DefaultCamera { found: usize },

    #[error("failed to load texture {url}: {reason}")]
    Texture { url: String, reason: String },

    #[error("the event loop was closed")]
    EventLoopClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}
