//! Error types for the pagefold library.

use std::io;
use thiserror::Error;

use crate::tree::NodeId;

/// Result type alias for pagefold operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while driving a workspace.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files or streams.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A JSON payload could not be read or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A markup fragment is malformed or uses an unknown element.
    #[error("Markup error: {0}")]
    Markup(String),

    /// The node does not exist (or was removed from the tree).
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    /// The requested move would break the tree structure.
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    /// The containers involved in a drag are not bound to the same reorder group.
    #[error("Container {0} does not accept this item")]
    NotReorderable(NodeId),

    /// A merge affordance no longer sits between two document slots.
    #[error("Merge affordance {0} is stale")]
    StaleAffordance(NodeId),

    /// The update stream transport failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Markup(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Markup("unexpected element <table>".to_string());
        assert_eq!(err.to_string(), "Markup error: unexpected element <table>");

        let err = Error::Transport("connection reset".to_string());
        assert_eq!(err.to_string(), "Transport error: connection reset");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
