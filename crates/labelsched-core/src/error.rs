// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for snapshot handling
#[derive(Error, Debug, Diagnostic)]
pub enum CoreError {
    /// A resource is missing a field the scheduler needs
    #[error("{kind} is missing required field '{field}'")]
    #[diagnostic(
        code(labelsched::missing_field),
        help("The control plane returned an incomplete {kind}. Check the object with `kubectl get -o json`")
    )]
    MissingField {
        #[allow(unused)]
        kind: String,
        #[allow(unused)]
        field: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(labelsched::serialization_error),
        help("Ensure the data matches the expected Kubernetes resource shape")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create a MissingField error
    pub fn missing_field(kind: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            kind: kind.into(),
            field: field.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }
}
