use thiserror::Error;

use crate::domain::{OverlayId, SurfaceId};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("surface {0} is not attached")]
    SurfaceNotFound(SurfaceId),
    #[error("surface {0} is already attached")]
    SurfaceAlreadyAttached(SurfaceId),
    #[error("no script registered for '{0}'")]
    UnknownScript(String),
    #[error("overlay id {0} is already live or was used before")]
    DuplicateOverlay(OverlayId),
    #[error("invalid args for command '{cmd}': {source}")]
    InvalidArgs {
        cmd: String,
        source: serde_json::Error,
    },
}

impl RelayError {
    pub fn invalid_args(cmd: impl Into<String>, source: serde_json::Error) -> Self {
        Self::InvalidArgs {
            cmd: cmd.into(),
            source,
        }
    }
}
