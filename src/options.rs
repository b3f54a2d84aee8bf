//! Workspace options and configuration.

use crate::model::DOCUMENT_ID_LEN;

/// Options for a [`Workspace`](crate::Workspace).
#[derive(Debug, Clone)]
pub struct WorkspaceOptions {
    /// Whether reconciliation inserts merge affordances between adjacent slots
    pub merge_affordances: bool,

    /// Prefix for generated column ids (`{prefix}-{n}`)
    pub column_prefix: String,

    /// Number of leading filename characters that form a document id
    pub id_prefix_len: usize,

    /// Message shown when the update stream is lost
    pub transport_notice: String,

    /// Message shown when a pushed payload cannot be used
    pub payload_notice: String,
}

impl WorkspaceOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable merge affordances.
    pub fn with_merge_affordances(mut self, enabled: bool) -> Self {
        self.merge_affordances = enabled;
        self
    }

    /// Set the prefix for generated column ids.
    pub fn with_column_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.column_prefix = prefix.into();
        self
    }

    /// Set how many filename characters form a document id.
    pub fn with_id_prefix_len(mut self, len: usize) -> Self {
        self.id_prefix_len = len.max(1);
        self
    }

    /// Set the lost-connection notice text.
    pub fn with_transport_notice(mut self, message: impl Into<String>) -> Self {
        self.transport_notice = message.into();
        self
    }

    /// Set the unusable-payload notice text.
    pub fn with_payload_notice(mut self, message: impl Into<String>) -> Self {
        self.payload_notice = message.into();
        self
    }
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            merge_affordances: true,
            column_prefix: "column".to_string(),
            id_prefix_len: DOCUMENT_ID_LEN,
            transport_notice: "Lost connection to the server. Reload to resume updates."
                .to_string(),
            payload_notice: "Received an update that could not be displayed.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = WorkspaceOptions::new()
            .with_merge_affordances(false)
            .with_column_prefix("col")
            .with_id_prefix_len(0);

        assert!(!options.merge_affordances);
        assert_eq!(options.column_prefix, "col");
        assert_eq!(options.id_prefix_len, 1);
    }

    #[test]
    fn test_default_options() {
        let options = WorkspaceOptions::default();
        assert!(options.merge_affordances);
        assert_eq!(options.id_prefix_len, 15);
    }
}
