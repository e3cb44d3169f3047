//! Tanto Error Definitions
//!
//! Defines error types used throughout the project.

use thiserror::Error;

use super::{media::MediaError, WorkspaceId};

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Track Errors
    // =========================================================================
    #[error("Track {0} is locked.")]
    LockedTrack(String),

    #[error("No track selected.")]
    NoCurrentTrack,

    #[error("No clip selected.")]
    NoCurrentClip,

    #[error("Track {0} must contain only video clips or only audio clips to be merged.")]
    NotMergable(String),

    #[error("Track not found: {0}")]
    TrackNotFound(String),

    #[error("Head is not set.")]
    HeadNotSet,

    #[error("Clipboard is empty.")]
    EmptyClipboard,

    // =========================================================================
    // Selection Errors
    // =========================================================================
    #[error("Nonsense mark position, {0}.")]
    InvalidSelection(String),

    // =========================================================================
    // Workspace Errors
    // =========================================================================
    #[error("Not a valid workspace: {0}")]
    InvalidWorkspace(WorkspaceId),

    #[error("Cannot switch workspaces: stash of workspace {0} isn't empty.")]
    StashNotEmpty(WorkspaceId),

    // =========================================================================
    // Naming Errors
    // =========================================================================
    #[error("Could not find a free track name derived from {0}")]
    NameCollisionExhausted(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("{0}")]
    ValidationError(String),

    #[error("Media backend error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Status reported for failures that are not ordinary validation outcomes
pub const EXCEPTION_STATUS: &str = "exception";

impl CoreError {
    /// Whether this error is an expected outcome of a user action that should
    /// be reported verbatim, as opposed to an unexpected failure.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            CoreError::Media(_)
                | CoreError::IoError(_)
                | CoreError::JsonError(_)
                | CoreError::Internal(_)
                | CoreError::NameCollisionExhausted(_)
        )
    }

    /// Converts to the status string shown to the user
    pub fn to_status(&self) -> String {
        if self.is_user_facing() {
            self.to_string()
        } else {
            EXCEPTION_STATUS.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_user_facing() {
        let err = CoreError::LockedTrack("graveyard".to_string());
        assert!(err.is_user_facing());
        assert_eq!(err.to_status(), "Track graveyard is locked.");

        let err = CoreError::InvalidSelection("nothing cut".to_string());
        assert_eq!(err.to_status(), "Nonsense mark position, nothing cut.");
    }

    #[test]
    fn test_unexpected_errors_collapse_to_exception() {
        let err = CoreError::Internal("broken invariant".to_string());
        assert!(!err.is_user_facing());
        assert_eq!(err.to_status(), EXCEPTION_STATUS);

        let err = CoreError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(err.to_status(), EXCEPTION_STATUS);
    }
}
