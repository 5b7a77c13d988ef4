//! Engine-level errors.

use std::path::PathBuf;

use lumen_ecs::EcsError;

/// Errors produced by the engine layer.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An ECS operation failed, usually inside a system update.
    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error("failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The configuration parsed but holds values the engine cannot run with.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
