//! Error types for Gait.

use thiserror::Error;

/// A shared error type for the Gait workspace.
///
/// Typed, structured variants with `From` conversions for the I/O and
/// serialization errors the storage layer runs into.
#[derive(Error, Debug, Clone)]
pub enum GaitError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "JSON", "TOML", "gzip"
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A document failed structural validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Git subprocess or repository error
    #[error("Git error: {0}")]
    Git(String),

    /// Merge could not be completed
    #[error("Merge error: {0}")]
    Merge(String),

    /// Session reader (external collaborator) failure
    #[error("Session reader error: {0}")]
    Reader(String),
}

impl GaitError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn git(message: impl Into<String>) -> Self {
        Self::Git(message.into())
    }

    pub fn merge(message: impl Into<String>) -> Self {
        Self::Merge(message.into())
    }

    pub fn reader(message: impl Into<String>) -> Self {
        Self::Reader(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an IO error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Check if this is a serialization error
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_git(&self) -> bool {
        matches!(self, Self::Git(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for GaitError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for GaitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for GaitError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for GaitError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<regex::Error> for GaitError {
    fn from(err: regex::Error) -> Self {
        Self::Config(format!("invalid pattern: {}", err))
    }
}

/// A type alias for `Result<T, GaitError>`.
pub type Result<T> = std::result::Result<T, GaitError>;
