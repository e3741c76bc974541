//! Error types for schema building, configuration and sharing.

use thiserror::Error;

/// Errors raised while turning a schema document into a graph.
///
/// A build either produces a complete [`Graph`](crate::graph::Graph) or one of
/// these; there is no partially built state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Declaration kind outside {entity, relation, permission, logic}.
    #[error("unknown node kind '{kind}' for '{id}'")]
    UnknownKind { id: String, kind: String },

    /// Relationship endpoint that was never declared.
    #[error("relationship #{relationship} references undeclared element '{endpoint}'")]
    UnresolvedReference { relationship: usize, endpoint: String },

    /// Self edge on a relationship not marked reflexive.
    #[error("relationship #{relationship} is a self-loop on '{id}' but is not marked reflexive")]
    SelfLoop { relationship: usize, id: String },

    /// Structured definition refers to a relation its entity does not declare.
    #[error("relation '{relation}' not found on entity '{entity}'")]
    RelationNotFound { entity: String, relation: String },

    /// Two structured entity definitions share a name.
    #[error("entity '{0}' is defined more than once")]
    DuplicateEntity(String),
}

/// Errors raised when validating a [`VisualizerConfig`](crate::config::VisualizerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid colour '{value}' at {field}")]
    InvalidColor { field: String, value: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failure reported by an external store.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors surfaced by the share flow. Never retried internally.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("upload of '{path}' failed: {source}")]
    Upload {
        path: String,
        #[source]
        source: UploadError,
    },

    #[error("fetch of '{path}' failed: {source}")]
    Fetch {
        path: String,
        #[source]
        source: UploadError,
    },

    #[error("shared document '{path}' is malformed: {source}")]
    Deserialize {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid share id '{0}'")]
    InvalidId(String),
}

impl ShareError {
    /// True when the same request may succeed if the user tries again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ShareError::Upload { .. } | ShareError::Fetch { .. })
    }
}
